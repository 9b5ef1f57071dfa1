//! Elements and their attributes.

use std::collections::BTreeMap;

use appstate_core::{Node, Value};
use uuid::Uuid;

/// A typed attribute of an element.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    /// A scalar, byte string, or homogeneous array of those.
    Value(Value),
    /// A child element.
    Element(Element),
    /// An ordered list of child elements.
    ElementArray(Vec<Element>),
}

/// A node of the binary element graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    id: Uuid,
    name: String,
    class: String,
    attributes: BTreeMap<String, Attribute>,
}

impl Element {
    /// Create an element with a fresh random id.
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, class)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            class: class.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, key: impl Into<String>, attr: Attribute) -> Option<Attribute> {
        self.attributes.insert(key.into(), attr)
    }

    pub fn remove(&mut self, key: &str) -> Option<Attribute> {
        self.attributes.remove(key)
    }

    /// The child element stored under `key`.
    pub fn child(&self, key: &str) -> Option<&Element> {
        match self.attributes.get(key) {
            Some(Attribute::Element(e)) => Some(e),
            _ => None,
        }
    }

    /// Every attribute holding a child element, in key order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.attributes.iter().filter_map(|(k, v)| match v {
            Attribute::Element(e) => Some((k.as_str(), e)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Node for Element {
    fn get(&self, key: &str) -> Option<&Value> {
        match self.attributes.get(key) {
            Some(Attribute::Value(v)) => Some(v),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: Value) {
        if value.is_null() {
            self.attributes.remove(key);
        } else {
            self.attributes
                .insert(key.to_string(), Attribute::Value(value));
        }
    }

    fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        match self.get(key) {
            Some(Value::Array(items)) => Box::new(items.iter()),
            Some(v) => Box::new(std::iter::once(v)),
            None => Box::new(std::iter::empty()),
        }
    }
}
