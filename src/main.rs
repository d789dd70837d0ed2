//! # media-organize CLI
//!
//! Finds duplicate media and sorts files into date/location folders.
//!
//! ## Usage
//! ```bash
//! media-organize inventory --dirs ~/Camera
//! media-organize organize --inventory media_inventory.csv --root ~/Organized
//! ```

mod cli;

use media_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}
