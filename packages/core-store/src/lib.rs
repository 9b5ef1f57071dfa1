//! appstate core: the versioned record contract
//!
//! This crate defines what every persisted application-state record must
//! satisfy, independent of how it is stored:
//! - `Record`: the contract (legacy migration, per-backend parse/export pairs)
//! - `Node`: the closed interface backends expose to record code
//! - `Value`: the data carried by nodes
//! - `Identifier`: UUIDs with their text and binary codecs
//! - `SchemaVersion`: per-record version gating
//! - `LegacySource`: the read-only view of the old flat configuration
//!
//! Backends (`appstate-kv`, `appstate-element`) implement `Node`; the
//! dispatcher in `appstate` routes records between them.

pub mod conv;
mod error;
mod format;
mod identifier;
mod legacy;
mod node;
mod record;
mod value;
mod version;

pub use error::{Error, Result};
pub use format::Format;
pub use identifier::{DecodeError, Identifier, BINARY_LEN, TEXT_LEN};
pub use legacy::{EmptySource, LegacySource};
pub use node::Node;
pub use record::Record;
pub use value::Value;
pub use version::SchemaVersion;
