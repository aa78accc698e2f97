//! Human-readable byte sizes ("50MB", "2 GB", "4096").

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '50MB', '2GB', or '1048576'")]
pub struct SizeParseError {
    input: String,
}

impl SizeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;
const TB: u64 = 1024 * GB;

/// Suffixes, longest first so "MB" is tried before "B".
const UNITS: &[(&str, u64)] = &[
    ("TB", TB),
    ("GB", GB),
    ("MB", MB),
    ("KB", KB),
    ("T", TB),
    ("G", GB),
    ("M", MB),
    ("K", KB),
    ("B", 1),
];

/// Parse a human-readable size into bytes.
///
/// Binary multiples, case-insensitive, whitespace between number and unit is
/// allowed. A bare number is a byte count.
///
/// ```
/// use tilestash::config::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("50MB").unwrap(), 50 * 1024 * 1024);
/// assert_eq!(parse_size("2 gb").unwrap(), 2 * 1024 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            upper
                .strip_suffix(suffix)
                .map(|number| (number.trim_end(), *multiplier))
        })
        .unwrap_or((upper.as_str(), 1));

    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SizeParseError::new(trimmed));
    }

    number
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| SizeParseError::new(trimmed))
}

/// Format a byte count using the largest unit that divides it exactly.
///
/// ```
/// use tilestash::config::format_size;
///
/// assert_eq!(format_size(50 * 1024 * 1024), "50MB");
/// assert_eq!(format_size(1000), "1000");
/// ```
pub fn format_size(bytes: u64) -> String {
    for (suffix, unit) in [("TB", TB), ("GB", GB), ("MB", MB), ("KB", KB)] {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    bytes.to_string()
}

/// A byte count that reads and prints in human-readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Size(pub u64);

impl Size {
    pub fn bytes(self) -> u64 {
        self.0
    }

    pub fn from_mb(mb: u64) -> Self {
        Self(mb.saturating_mul(MB))
    }

    pub fn from_gb(gb: u64) -> Self {
        Self(gb.saturating_mul(GB))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_size(self.0))
    }
}

impl FromStr for Size {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_size(s).map(Size)
    }
}
