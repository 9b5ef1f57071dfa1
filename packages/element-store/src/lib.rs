//! Binary element-graph backend.
//!
//! An element is a named, classed node with a UUID and a set of typed
//! attributes. Attributes hold scalar values, byte strings, homogeneous
//! arrays, or other elements. On disk the graph is flattened into an element
//! table; attributes refer to other elements by index.
//!
//! # Example
//!
//! ```rust
//! use appstate_element::{decode, encode, Element};
//! use appstate_core::{Node, Value};
//!
//! let mut elem = Element::new("Palette", "DmElement");
//! elem.set("save_settings", Value::Bool(true));
//!
//! let bytes = encode(&elem).unwrap();
//! let back = decode(&bytes).unwrap();
//! assert_eq!(back.get("save_settings"), Some(&Value::Bool(true)));
//! ```

mod codec;
mod element;

pub use codec::{decode, encode, ENCODING_VERSION, MAGIC, MAX_DEPTH, MAX_SHARED};
pub use element::{Attribute, Element};

pub use appstate_core::{Error, Format, Node, Value};
