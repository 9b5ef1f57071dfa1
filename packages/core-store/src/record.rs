//! The contract every persisted record type implements.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::{Error, LegacySource, Node, SchemaVersion};

/// A versioned application-state record that can live in any backend.
///
/// Implementations are immutable value types: parse routines construct a new
/// record, updates construct a replacement. Every ingestion path (legacy,
/// text, binary) must produce a record that satisfies the type's invariants,
/// however permissive the external data was.
///
/// Parse and export come in per-backend pairs because the backends disagree
/// on native types (identifiers are hex text in one, raw bytes in the other).
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use appstate_core::{Error, LegacySource, Node, Record, SchemaVersion, Value};
///
/// #[derive(Clone, Debug, PartialEq, serde::Serialize)]
/// struct Volume(i64);
///
/// impl Record for Volume {
///     const NAME: &'static str = "Volume";
///     const VERSION: SchemaVersion = SchemaVersion::V1;
///
///     fn from_legacy(_: &dyn LegacySource) -> BTreeMap<String, Self> {
///         BTreeMap::from([(String::new(), Volume(50))])
///     }
///
///     fn parse_text(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error> {
///         Self::VERSION.require(Self::NAME, version)?;
///         let level = data
///             .get("level")
///             .and_then(Value::as_str)
///             .and_then(appstate_core::conv::parse_int)
///             .unwrap_or(50);
///         Ok(Volume(level))
///     }
///
///     fn export_text(&self, out: &mut dyn Node) {
///         out.set("level", Value::Integer(self.0));
///     }
///
///     fn parse_binary(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error> {
///         Self::VERSION.require(Self::NAME, version)?;
///         Ok(Volume(data.get("level").and_then(Value::as_integer).unwrap_or(50)))
///     }
///
///     fn export_binary(&self, out: &mut dyn Node) {
///         out.set("level", Value::Integer(self.0));
///     }
/// }
/// ```
pub trait Record: Clone + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Logical name; the container block/element this record lives under.
    const NAME: &'static str;

    /// The schema version the parse routines implement.
    const VERSION: SchemaVersion;

    /// Whether several instances are stored, keyed by sub-key.
    ///
    /// When false the record always lives under the empty sub-key.
    const USES_ID: bool = false;

    /// Build records from the legacy configuration.
    ///
    /// Never fails: every field falls back to its default on a missing or
    /// malformed legacy value.
    fn from_legacy(source: &dyn LegacySource) -> BTreeMap<String, Self>;

    /// Parse from a text property block written with `version`.
    ///
    /// Fails with `Error::VersionMismatch` unless `version == Self::VERSION`.
    fn parse_text(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error>;

    /// Write into a text property block.
    fn export_text(&self, out: &mut dyn Node);

    /// Parse from a binary element written with `version`.
    ///
    /// Fails with `Error::VersionMismatch` unless `version == Self::VERSION`.
    fn parse_binary(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error>;

    /// Write into a binary element.
    fn export_binary(&self, out: &mut dyn Node);
}
