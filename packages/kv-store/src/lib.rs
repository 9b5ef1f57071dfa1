//! Text property-tree backend.
//!
//! Reads and writes the KeyValues-style text format: quoted keys followed by
//! either a quoted value or a `{ ... }` block of children. Keys may repeat and
//! compare case-insensitively. All leaf values are strings; records recover
//! booleans, integers and identifiers from the text themselves.
//!
//! ```text
//! "Palette"
//! 	{
//! 	"_version" "1"
//! 	"selected" "00000000000000000000000000000002"
//! 	"save_settings" "0"
//! 	"hidden" "5a1c2bd9e4f04f0c9d3d2a4a6f1b8e77"
//! 	}
//! ```
//!
//! # Example
//!
//! ```rust
//! use appstate_kv::Property;
//! use appstate_core::{Node, Value};
//!
//! let root = Property::parse(r#""Palette" { "save_settings" "1" }"#).unwrap();
//! let block = root.find_block("palette").unwrap();
//! assert_eq!(block.get("save_settings"), Some(&Value::from("1")));
//! ```

mod parser;
mod property;

pub use parser::MAX_DEPTH;
pub use property::{PropValue, Property};

pub use appstate_core::{Error, Format, Node, Value};
