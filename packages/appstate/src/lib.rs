//! Versioned application-state records.
//!
//! Records are small immutable values (see `appstate_core::Record`) stored in
//! one of two structured containers, a text property tree or a binary element
//! graph, and migrated once from the old INI configuration when neither
//! container has them yet.
//!
//! - `Registry` / `Dispatcher`: route records between containers and types
//! - `StateStore`: files on disk, atomic saves, format conversion
//! - `Settings`: where the files live and which format is active
//! - `records`: the record types this application persists
//!
//! # Example
//!
//! ```rust,no_run
//! use appstate::{records::PaletteState, Settings, StateStore};
//!
//! # fn main() -> appstate::Result<()> {
//! let mut store = StateStore::open(Settings::from_env()?)?;
//! let palette = store.load::<PaletteState>()?;
//! store.save(palette.with_save_settings(true))?;
//! # Ok(())
//! # }
//! ```

pub mod consts;
mod dispatcher;
mod error;
pub mod records;
mod registry;
mod settings;
mod store;

pub use dispatcher::{
    Dispatcher, LoadReport, RecordStatus, BINARY_ROOT, ELEMENT_CLASS, VERSION_KEY,
};
pub use error::{Result, StoreError};
pub use registry::{AnyRecord, RecordKind, Registry};
pub use settings::{Settings, StorageFormat, DIR_ENV, FORMAT_ENV};
pub use store::StateStore;

pub use appstate_core::{Identifier, Record, SchemaVersion};
