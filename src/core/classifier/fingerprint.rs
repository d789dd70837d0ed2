//! Boundary-chunk content fingerprints.
//!
//! A fingerprint is the MD5 of the first `chunk_size` bytes followed by the
//! last `chunk_size` bytes. Files no larger than two chunks are hashed whole.
//! Two distinct files of equal size whose boundary chunks match will share a
//! fingerprint; that false-positive risk is accepted in exchange for reading
//! at most two chunks per file.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Default number of bytes read from each end of a file
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 128-bit content fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Fingerprint a file on disk
pub fn fingerprint_file(path: &Path, chunk_size: usize) -> io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    fingerprint_reader(&mut file, size, chunk_size)
}

/// Fingerprint any seekable source of known length
pub fn fingerprint_reader<R: Read + Seek>(
    reader: &mut R,
    size: u64,
    chunk_size: usize,
) -> io::Result<Fingerprint> {
    let mut hasher = Md5::new();
    let chunk = chunk_size as u64;

    if size <= chunk.saturating_mul(2) {
        let mut content = Vec::with_capacity(size as usize);
        reader.seek(SeekFrom::Start(0))?;
        reader.take(size).read_to_end(&mut content)?;
        hasher.update(&content);
    } else {
        let mut buffer = vec![0u8; chunk_size];

        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut buffer)?;
        hasher.update(&buffer);

        reader.seek(SeekFrom::Start(size - chunk))?;
        reader.read_exact(&mut buffer)?;
        hasher.update(&buffer);
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    Ok(Fingerprint(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fp(bytes: &[u8], chunk: usize) -> Fingerprint {
        fingerprint_reader(&mut Cursor::new(bytes), bytes.len() as u64, chunk).unwrap()
    }

    #[test]
    fn identical_content_shares_fingerprint() {
        let data = vec![7u8; 10_000];
        assert_eq!(fp(&data, 4096), fp(&data.clone(), 4096));
    }

    #[test]
    fn middle_bytes_are_not_read() {
        // Same boundaries, different middle: the documented false positive.
        let mut a = vec![1u8; 10_000];
        let mut b = a.clone();
        a[5_000] = 42;
        b[5_000] = 43;
        assert_eq!(fp(&a, 4096), fp(&b, 4096));
    }

    #[test]
    fn tail_difference_changes_fingerprint() {
        let a = vec![1u8; 10_000];
        let mut b = a.clone();
        b[9_999] = 2;
        assert_ne!(fp(&a, 4096), fp(&b, 4096));
    }

    #[test]
    fn small_files_are_hashed_whole() {
        let a = vec![1u8; 6_000];
        let mut b = a.clone();
        b[5_000] = 9;
        assert_ne!(fp(&a, 4096), fp(&b, 4096));
    }

    #[test]
    fn display_is_32_hex_chars() {
        let text = fp(b"hello", 4096).to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text, "5d41402abc4b2a76b9719d911017c592");
    }
}
