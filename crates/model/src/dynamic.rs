//! Key/value bags whose property set is whatever keys they currently hold.

use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// A map-like object addressed by string keys.
///
/// Reading a key that is not present is not an error; it yields `Null`.
pub trait DynamicBag: fmt::Debug {
    /// Current keys in the bag's own enumeration order.
    fn keys(&self) -> Vec<String>;

    fn get(&self, key: &str) -> Value;

    fn contains(&self, key: &str) -> bool;

    fn set(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str) -> Option<Value>;
}

impl DynamicBag for IndexMap<String, Value> {
    fn keys(&self) -> Vec<String> {
        IndexMap::keys(self).cloned().collect()
    }

    fn get(&self, key: &str) -> Value {
        IndexMap::get(self, key).cloned().unwrap_or_default()
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.shift_remove(key)
    }
}

impl DynamicBag for HashMap<String, Value> {
    fn keys(&self) -> Vec<String> {
        HashMap::keys(self).cloned().collect()
    }

    fn get(&self, key: &str) -> Value {
        HashMap::get(self, key).cloned().unwrap_or_default()
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        HashMap::remove(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_reads_null() {
        let bag: IndexMap<String, Value> = IndexMap::new();
        assert_eq!(DynamicBag::get(&bag, "nope"), Value::Null);
        assert!(!bag.contains("nope"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut bag: IndexMap<String, Value> = IndexMap::new();
        DynamicBag::set(&mut bag, "b", 1.into());
        DynamicBag::set(&mut bag, "a", 2.into());
        DynamicBag::set(&mut bag, "c", 3.into());
        assert_eq!(DynamicBag::remove(&mut bag, "a"), Some(Value::from(2)));
        assert_eq!(DynamicBag::keys(&bag), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_hash_map_bag() {
        let mut bag: HashMap<String, Value> = HashMap::new();
        DynamicBag::set(&mut bag, "k", "v".into());
        assert!(bag.contains("k"));
        assert_eq!(DynamicBag::get(&bag, "k"), Value::from("v"));
    }
}
