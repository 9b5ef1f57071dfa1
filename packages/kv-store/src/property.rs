//! The property tree.

use std::fmt;

use appstate_core::{Error, Node, Value};

use crate::parser::parse_document;

/// What a property holds: a single string, or a block of children.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// A string leaf. Always `Value::String`.
    Leaf(Value),
    /// Ordered children. Keys may repeat.
    Block(Vec<Property>),
}

/// A named node of the text property tree.
///
/// The document itself is an unnamed root block; `parse` returns it and
/// `serialize` on it writes only its children.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: String,
    value: PropValue,
}

/// Keys compare ASCII case-insensitively.
fn key_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl Property {
    // === Construction ===

    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PropValue::Leaf(Value::String(value.into())),
        }
    }

    pub fn block(name: impl Into<String>, children: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            value: PropValue::Block(children),
        }
    }

    /// An unnamed document root.
    pub fn root(children: Vec<Property>) -> Self {
        Self::block(String::new(), children)
    }

    /// Parse a whole document.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Ok(Self::root(parse_document(text)?))
    }

    // === Inspection ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value(&self) -> &PropValue {
        &self.value
    }

    pub fn is_block(&self) -> bool {
        matches!(self.value, PropValue::Block(_))
    }

    /// The string of a leaf. `None` for blocks.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropValue::Leaf(v) => v.as_str(),
            PropValue::Block(_) => None,
        }
    }

    /// Children of a block. Empty for leaves.
    pub fn children(&self) -> &[Property] {
        match &self.value {
            PropValue::Block(children) => children,
            PropValue::Leaf(_) => &[],
        }
    }

    /// Children of a block, turning a leaf into an empty block first.
    pub fn children_mut(&mut self) -> &mut Vec<Property> {
        if !self.is_block() {
            self.value = PropValue::Block(Vec::new());
        }
        match &mut self.value {
            PropValue::Block(children) => children,
            PropValue::Leaf(_) => unreachable!("converted to a block above"),
        }
    }

    pub fn push(&mut self, child: Property) {
        self.children_mut().push(child);
    }

    /// The last child block named `name`.
    pub fn find_block(&self, name: &str) -> Option<&Property> {
        self.children()
            .iter()
            .rev()
            .find(|c| c.is_block() && key_eq(&c.name, name))
    }

    pub fn find_block_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.children_mut()
            .iter_mut()
            .rev()
            .find(|c| c.is_block() && key_eq(&c.name, name))
    }

    /// Remove every child named `name`, returning how many were removed.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let children = self.children_mut();
        let before = children.len();
        children.retain(|c| !key_eq(&c.name, name));
        before - children.len()
    }

    // === Serialization ===

    /// Write the tree as text.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if self.name.is_empty() {
            for child in self.children() {
                child.write_into(&mut out, 0);
            }
        } else {
            self.write_into(&mut out, 0);
        }
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        match &self.value {
            PropValue::Leaf(v) => {
                out.push_str(&format!(
                    "{}\"{}\" \"{}\"\n",
                    indent,
                    escape(&self.name),
                    escape(v.as_str().unwrap_or_default())
                ));
            }
            PropValue::Block(children) => {
                let inner = "\t".repeat(depth + 1);
                out.push_str(&format!("{}\"{}\"\n{}{{\n", indent, escape(&self.name), inner));
                for child in children {
                    child.write_into(out, depth + 1);
                }
                out.push_str(&format!("{}}}\n", inner));
            }
        }
    }

    fn append(children: &mut Vec<Property>, key: &str, value: Value) {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    Self::append(children, key, item);
                }
            }
            Value::Map(map) => {
                let mut block = Property::block(key, Vec::new());
                for (k, v) in map {
                    block.set(&k, v);
                }
                children.push(block);
            }
            scalar => children.push(Property::leaf(key, scalar_text(scalar))),
        }
    }
}

/// The text form of a scalar value.
fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Bool(b) => appstate_core::conv::bool_as_int(b).to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bytes(b) => b.iter().map(|byte| format!("{:02x}", byte)).collect(),
        Value::Null | Value::Array(_) | Value::Map(_) => String::new(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl Node for Property {
    fn get(&self, key: &str) -> Option<&Value> {
        self.children()
            .iter()
            .rev()
            .find(|c| key_eq(&c.name, key))
            .and_then(|c| match &c.value {
                PropValue::Leaf(v) => Some(v),
                PropValue::Block(_) => None,
            })
    }

    fn set(&mut self, key: &str, value: Value) {
        let children = self.children_mut();
        children.retain(|c| !key_eq(&c.name, key));
        Self::append(children, key, value);
    }

    fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        let key = key.to_string();
        Box::new(self.children().iter().filter_map(move |c| match &c.value {
            PropValue::Leaf(v) if key_eq(&c.name, &key) => Some(v),
            _ => None,
        }))
    }
}
