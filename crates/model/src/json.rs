//! Conversion of `serde_json` documents into object graphs.
//!
//! JSON objects become dynamic bags in serde_json's key order, arrays become
//! shared lists and scalars map onto the matching `Value` variant.

use crate::value::Value;
use indexmap::IndexMap;

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::list(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(fields) => {
                let bag: IndexMap<String, Value> =
                    fields.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect();
                Value::map(bag)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}
