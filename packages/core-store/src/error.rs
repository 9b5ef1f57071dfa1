//! Error types for the core layer.

use thiserror::Error;

use crate::{DecodeError, Format, SchemaVersion};

/// Errors at the core layer.
///
/// Only `VersionMismatch`, `UnknownVersion` and the backend-level variants
/// normally reach a caller; identifier decode failures are recovered inside
/// the parse routines, and absent fields take their defaults there.
#[derive(Debug, Error)]
pub enum Error {
    /// An identifier could not be decoded.
    #[error("identifier decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A parse routine was asked for a version it does not implement.
    #[error("{record}: version {requested} requested, but version {supported} is implemented")]
    VersionMismatch {
        record: &'static str,
        requested: SchemaVersion,
        supported: SchemaVersion,
    },

    /// A container holds a version number that no parse routine knows.
    #[error("{record}: unsupported version {found:?} (newest known is {newest})")]
    UnknownVersion {
        record: &'static str,
        found: String,
        newest: SchemaVersion,
    },

    /// A backend could not decode its input.
    #[error("decode error ({format}): {message}")]
    Malformed { format: Format, message: String },

    /// A backend could not encode a value.
    #[error("encode error ({format}): {message}")]
    Encode { format: Format, message: String },

    /// No record type is registered under this name.
    #[error("unknown record type: {0}")]
    UnknownRecord(String),

    /// The record type is registered but has not been loaded.
    #[error("record not loaded: {0}")]
    NotLoaded(String),

    /// Reading a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(format: Format, message: impl Into<String>) -> Self {
        Error::Malformed {
            format,
            message: message.into(),
        }
    }

    pub fn encode(format: Format, message: impl Into<String>) -> Self {
        Error::Encode {
            format,
            message: message.into(),
        }
    }

    /// True for errors that mean the stored data has a schema this build does
    /// not understand, as opposed to ordinary corruption.
    pub fn is_version_error(&self) -> bool {
        matches!(
            self,
            Error::VersionMismatch { .. } | Error::UnknownVersion { .. }
        )
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn version_mismatch_display() {
        let e = Error::VersionMismatch {
            record: "Palette",
            requested: SchemaVersion::new(3),
            supported: SchemaVersion::V1,
        };
        let display = e.to_string();
        assert!(display.contains("Palette"));
        assert!(display.contains("version 3 requested"));
        assert!(e.is_version_error());
    }

    #[test]
    fn unknown_version_display() {
        let e = Error::UnknownVersion {
            record: "Palette",
            found: "banana".to_string(),
            newest: SchemaVersion::V1,
        };
        assert!(e.to_string().contains("\"banana\""));
        assert!(e.is_version_error());
    }

    #[test]
    fn malformed_display() {
        let e = Error::malformed(Format::TEXT, "unterminated string on line 4");
        let display = e.to_string();
        assert!(display.contains("decode error"));
        assert!(display.contains("text/x-keyvalues"));
        assert!(display.contains("line 4"));
        assert!(!e.is_version_error());
    }

    #[test]
    fn encode_display() {
        let e = Error::encode(Format::BINARY, "null values cannot be stored");
        assert!(e.to_string().contains("encode error"));
    }

    #[test]
    fn decode_error_converts_with_source() {
        let e: Error = DecodeError::BinaryLength(3).into();
        assert!(matches!(e, Error::Decode(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
