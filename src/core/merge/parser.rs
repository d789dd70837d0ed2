//! Directory-name parsing.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// What a directory name says about its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryName {
    /// `YYYY-MM-DD` or `YYYY-MM-DD_location`
    Parsed {
        date: NaiveDate,
        location: Option<String>,
    },
    /// Anything else, including impossible dates
    Unparsed,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:_(.*))?$").expect("directory name pattern is valid")
    })
}

/// Parse a directory name. Never fails; unrecognised names are `Unparsed`.
pub fn parse_directory_name(name: &str) -> DirectoryName {
    let Some(captures) = pattern().captures(name) else {
        return DirectoryName::Unparsed;
    };

    let Ok(date) = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d") else {
        return DirectoryName::Unparsed;
    };

    let location = captures
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    DirectoryName::Parsed { date, location }
}
