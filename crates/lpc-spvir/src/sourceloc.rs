//! Source location tracking for IR operations.
//!
//! Locations come from `OpLine` debug instructions: a file name plus line and
//! column. Operations created without an active debug line carry
//! `Location::Unknown`.

use alloc::string::String;
use core::fmt;

/// File name used when an `OpLine` names no known `OpString`.
pub const UNKNOWN_FILE: &str = "<unknown>";

/// Source location attached to an operation or reported with an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Location {
    #[default]
    Unknown,
    FileLineCol {
        file: String,
        line: u32,
        column: u32,
    },
}

impl Location {
    pub fn file_line_col(file: impl Into<String>, line: u32, column: u32) -> Self {
        Location::FileLineCol {
            file: file.into(),
            line,
            column,
        }
    }

    /// Check if this is the unknown location.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Location::Unknown)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Unknown => f.write_str("loc(unknown)"),
            Location::FileLineCol { file, line, column } => {
                write!(f, "loc(\"{}\":{}:{})", file, line, column)
            }
        }
    }
}
