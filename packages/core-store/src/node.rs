//! The closed interface record code uses to talk to a format backend.

use crate::Value;

/// A keyed node of a structured format: a text property block or a binary
/// element.
///
/// Record implementations read and write only through this trait, never
/// through a backend's concrete type. Each backend decides how a `Value` maps
/// onto its native types.
///
/// # Object Safety
///
/// This trait is object-safe: record code takes `&dyn Node`.
pub trait Node {
    /// The value stored under `key`, if any.
    ///
    /// When a key repeats (text backend), this is the last occurrence.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Replace every value stored under `key`.
    ///
    /// Setting `Value::Null` removes the key.
    fn set(&mut self, key: &str, value: Value);

    /// Every value stored under `key`, in storage order.
    ///
    /// The text backend yields each repeated leaf; the binary backend yields
    /// the items of an array attribute, or the lone value of a scalar one.
    fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a>;

    /// Whether anything is stored under `key`.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<T: Node + ?Sized> Node for &mut T {
    fn get(&self, key: &str) -> Option<&Value> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        (**self).set(key, value)
    }

    fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        (**self).each(key)
    }
}

impl<T: Node + ?Sized> Node for Box<T> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.as_ref().get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.as_mut().set(key, value)
    }

    fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        self.as_ref().each(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Minimal map-backed node for testing.
    #[derive(Default)]
    struct MapNode {
        data: BTreeMap<String, Value>,
    }

    impl Node for MapNode {
        fn get(&self, key: &str) -> Option<&Value> {
            self.data.get(key)
        }

        fn set(&mut self, key: &str, value: Value) {
            if value.is_null() {
                self.data.remove(key);
            } else {
                self.data.insert(key.to_string(), value);
            }
        }

        fn each<'a>(&'a self, key: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
            match self.data.get(key) {
                Some(Value::Array(items)) => Box::new(items.iter()),
                Some(v) => Box::new(std::iter::once(v)),
                None => Box::new(std::iter::empty()),
            }
        }
    }

    #[test]
    fn object_safety_works() {
        let mut node = MapNode::default();
        let dyn_node: &mut dyn Node = &mut node;

        dyn_node.set("a", Value::from("x"));
        dyn_node.set("list", Value::Array(vec![Value::from(1i64), Value::from(2i64)]));

        assert!(dyn_node.contains("a"));
        assert_eq!(dyn_node.each("list").count(), 2);
        assert_eq!(dyn_node.each("a").count(), 1);
        assert_eq!(dyn_node.each("missing").count(), 0);

        dyn_node.set("a", Value::Null);
        assert!(!dyn_node.contains("a"));
    }

    #[test]
    fn boxed_node_forwards() {
        let mut boxed: Box<dyn Node> = Box::new(MapNode::default());
        boxed.set("k", Value::Bool(true));
        assert_eq!(boxed.get("k"), Some(&Value::Bool(true)));
    }
}
