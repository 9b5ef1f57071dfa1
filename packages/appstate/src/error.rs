//! Error types for the record store.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by the dispatcher and the on-disk store.
///
/// Malformed field data never reaches here; records recover it to defaults.
/// What does reach here is structural: unreadable files, syntax errors in a
/// container, or a record whose stored version this build cannot parse.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] appstate_core::Error),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A container file could not be decoded at all.
    #[error("{}: {source}", path.display())]
    Container {
        path: PathBuf,
        #[source]
        source: appstate_core::Error,
    },

    /// One record failed to load; the others are unaffected.
    #[error("record {name} failed to load: {source}")]
    Record {
        name: String,
        #[source]
        source: Arc<appstate_core::Error>,
    },

    #[error("record type {0} is already registered")]
    DuplicateRecord(String),

    #[error("record {record} has no entry {key:?}")]
    UnknownKey { record: String, key: String },

    #[error("invalid setting {name}: {message}")]
    Setting { name: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the stored data was written by a newer schema.
    pub fn is_version_error(&self) -> bool {
        match self {
            StoreError::Core(e) => e.is_version_error(),
            StoreError::Record { source, .. } => source.is_version_error(),
            _ => false,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use appstate_core::SchemaVersion;

    #[test]
    fn record_error_keeps_version_classification() {
        let e = StoreError::Record {
            name: "Palette".to_string(),
            source: Arc::new(appstate_core::Error::UnknownVersion {
                record: "Palette",
                found: "7".to_string(),
                newest: SchemaVersion::V1,
            }),
        };
        assert!(e.is_version_error());
        assert!(e.to_string().contains("Palette failed to load"));
    }

    #[test]
    fn container_error_names_path() {
        let e = StoreError::Container {
            path: PathBuf::from("/tmp/config.vdf"),
            source: appstate_core::Error::malformed(appstate_core::Format::TEXT, "line 3: unexpected '}'"),
        };
        let display = e.to_string();
        assert!(display.contains("config.vdf"));
        assert!(display.contains("line 3"));
        assert!(!e.is_version_error());
    }
}
