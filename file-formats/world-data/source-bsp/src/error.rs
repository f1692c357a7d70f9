//! Error handling for BSP parsing and overlay loading

use std::io;
use thiserror::Error;

use crate::header::LumpKind;

/// Errors that can occur when reading a BSP file or building its overlay
#[derive(Debug, Error)]
pub enum BspError {
    /// An I/O error other than a short read occurred
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// The header magic is not `VBSP`
    #[error("Not a bsp file: expected magic 0x{expected:08X}, found 0x{found:08X}")]
    NotThisFormat {
        /// The expected magic value
        expected: u32,
        /// The magic value found in the file
        found: u32,
    },

    /// The header version is not one we know how to read
    #[error("Unsupported bsp version: {0}")]
    UnsupportedVersion(i32),

    /// A read ran past the end of the file, or a lump points outside it
    #[error("Unexpected EOF while reading {0}")]
    TruncatedFile(String),

    /// A lump length is not a whole number of records
    #[error("Lump {lump} has length {length}, which is not a multiple of the {record_size}-byte record size")]
    MisalignedLump {
        /// The lump being read
        lump: LumpKind,
        /// The declared lump length in bytes
        length: usize,
        /// Size of one record in bytes
        record_size: usize,
    },

    /// A landmark entity has no closing brace
    #[error("Bad entity lump: unterminated entity at byte {0}")]
    MalformedEntityLump(usize),

    /// A record refers to an index outside its target lump
    #[error("Invalid reference: {field} value {value} exceeds maximum {max}")]
    InvalidReference {
        /// Which field held the reference
        field: &'static str,
        /// The offending value
        value: i64,
        /// Number of records available in the target lump
        max: usize,
    },

    /// The node tree revisits nodes
    #[error("Malformed node tree: visited more than {0} nodes")]
    MalformedTree(usize),
}

impl BspError {
    /// Build a `TruncatedFile` error for the named section
    pub(crate) fn truncated(what: impl Into<String>) -> Self {
        Self::TruncatedFile(what.into())
    }

    /// Wrap an I/O error, treating a short read as a truncated file
    pub(crate) fn from_io(err: io::Error, what: impl Into<String>) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::TruncatedFile(what.into())
        } else {
            Self::Io(err)
        }
    }
}

impl From<io::Error> for BspError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err, "file")
    }
}

/// Type alias for Results from BSP operations
pub type Result<T> = std::result::Result<T, BspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BspError::UnsupportedVersion(21);
        assert_eq!(format!("{}", error), "Unsupported bsp version: 21");

        let error = BspError::NotThisFormat {
            expected: 0x5053_4256,
            found: 0x5053_4249,
        };
        assert_eq!(
            format!("{}", error),
            "Not a bsp file: expected magic 0x50534256, found 0x50534249"
        );
    }

    #[test]
    fn test_short_read_maps_to_truncated() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            BspError::from_io(err, "planes"),
            BspError::TruncatedFile(what) if what == "planes"
        ));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(BspError::from(err), BspError::Io(_)));
    }
}
