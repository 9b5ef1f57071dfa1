//! Reader for the legacy flat configuration.
//!
//! Before records were stored in structured formats, application state lived
//! in an INI file of named sections holding string values. This crate reads
//! that file once, at migration time, and exposes it through
//! `appstate_core::LegacySource`. It never writes it.
//!
//! # Usage
//!
//! ```rust
//! use appstate_legacy::LegacyConfig;
//! use appstate_core::LegacySource;
//!
//! let conf = LegacyConfig::parse("[General]\npalette_save_settings = 1\n");
//! assert_eq!(conf.get_bool("General", "palette_save_settings"), Some(true));
//! ```

mod ini;

pub use ini::LegacyConfig;

pub use appstate_core::{EmptySource, LegacySource};
