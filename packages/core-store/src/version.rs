//! Schema versions.

use std::fmt;

use crate::Error;

/// The schema version of a record type: a small positive integer.
///
/// Each record type declares the one version its parse routines implement.
/// Containers carry the version a record was written with.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    pub const V1: SchemaVersion = SchemaVersion(1);

    /// # Panics
    ///
    /// Panics (at compile time, in const contexts) if `v` is zero.
    pub const fn new(v: u32) -> Self {
        assert!(v > 0, "schema versions start at 1");
        SchemaVersion(v)
    }

    /// Validate a raw version number read from a container.
    pub fn from_raw(v: i64) -> Option<Self> {
        u32::try_from(v).ok().filter(|v| *v > 0).map(SchemaVersion)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Fail with `VersionMismatch` unless `requested` is exactly this version.
    ///
    /// Parse routines call this before touching any data, so a mismatch never
    /// yields a partially parsed record.
    pub fn require(self, record: &'static str, requested: SchemaVersion) -> Result<(), Error> {
        if self == requested {
            Ok(())
        } else {
            Err(Error::VersionMismatch {
                record,
                requested,
                supported: self,
            })
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
