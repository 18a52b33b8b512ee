//! Structured objects with a fixed, declared set of properties.

use crate::error::ModelError;
use crate::introspect::{BeanInfo, PropertyDescriptor};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// An object whose properties are described up front.
///
/// `describe` is called once per type name and cached by the
/// [`Introspector`](crate::Introspector); implementations must return the same
/// description for every instance of a type.
pub trait Bean: fmt::Debug {
    fn type_name(&self) -> &str;

    fn describe(&self) -> BeanInfo;

    /// Reads a property by its accessor name.
    fn get(&self, property: &str) -> Result<Value, ModelError>;

    /// Writes a property by its accessor name.
    fn set(&mut self, property: &str, value: Value) -> Result<(), ModelError>;
}

/// A general-purpose [`Bean`] backed by an ordered map.
///
/// ```
/// use objpath_model::{Record, Value};
///
/// let person = Record::new("Person")
///     .with("name", "Ada")
///     .with_collection("tags", vec!["a".into(), "b".into()]);
/// assert_eq!(person.value("name"), Some(&Value::from("Ada")));
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    atomic: bool,
    descriptors: Vec<PropertyDescriptor>,
    values: IndexMap<String, Value>,
    failures: IndexMap<String, String>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            atomic: false,
            descriptors: Vec::new(),
            values: IndexMap::new(),
            failures: IndexMap::new(),
        }
    }

    /// A record that path expressions treat as a leaf value.
    pub fn atomic(type_name: impl Into<String>) -> Self {
        Self {
            atomic: true,
            ..Self::new(type_name)
        }
    }

    /// Declares a property whose collection-ness follows its runtime value.
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.with_property(PropertyDescriptor::new(name), value)
    }

    pub fn with_scalar(self, name: &str, value: impl Into<Value>) -> Self {
        self.with_property(PropertyDescriptor::new(name).scalar(), value)
    }

    pub fn with_collection(self, name: &str, items: Vec<Value>) -> Self {
        self.with_property(PropertyDescriptor::new(name).collection(), Value::list(items))
    }

    /// Declares a property addressed as `@name` in paths.
    pub fn with_attribute(self, name: &str, value: impl Into<Value>) -> Self {
        self.with_property(PropertyDescriptor::new(name).attribute(), value)
    }

    pub fn with_property(mut self, descriptor: PropertyDescriptor, value: impl Into<Value>) -> Self {
        self.values.insert(descriptor.name.clone(), value.into());
        self.descriptors.retain(|d| d.name != descriptor.name);
        self.descriptors.push(descriptor);
        self
    }

    /// Declares a property whose accessor always fails with `message`.
    pub fn with_failing(mut self, name: &str, message: &str) -> Self {
        self.descriptors.push(PropertyDescriptor::new(name));
        self.failures.insert(name.to_string(), message.to_string());
        self
    }

    /// Marks an already declared property as read-only.
    pub fn read_only(mut self, name: &str) -> Self {
        for descriptor in self.descriptors.iter_mut().filter(|d| d.name == name) {
            descriptor.writable = false;
        }
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn descriptor(&self, name: &str) -> Result<&PropertyDescriptor, ModelError> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ModelError::NoSuchProperty {
                type_name: self.type_name.clone(),
                property: name.to_string(),
            })
    }
}

impl Bean for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn describe(&self) -> BeanInfo {
        if self.atomic {
            BeanInfo::atomic(self.type_name.clone())
        } else {
            BeanInfo::new(self.type_name.clone(), self.descriptors.clone())
        }
    }

    fn get(&self, property: &str) -> Result<Value, ModelError> {
        self.descriptor(property)?;
        if let Some(message) = self.failures.get(property) {
            return Err(ModelError::Accessor {
                property: property.to_string(),
                message: message.clone(),
            });
        }
        Ok(self.values.get(property).cloned().unwrap_or_default())
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), ModelError> {
        if !self.descriptor(property)?.writable {
            return Err(ModelError::ReadOnly {
                type_name: self.type_name.clone(),
                property: property.to_string(),
            });
        }
        self.values.insert(property.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut record = Record::new("Person").with("name", "Ada").with("age", 36);
        assert_eq!(record.get("name").unwrap(), Value::from("Ada"));
        record.set("age", 37.into()).unwrap();
        assert_eq!(record.get("age").unwrap(), Value::from(37));
    }

    #[test]
    fn test_unknown_property() {
        let record = Record::new("Person");
        assert_eq!(
            record.get("missing"),
            Err(ModelError::NoSuchProperty {
                type_name: "Person".into(),
                property: "missing".into()
            })
        );
    }

    #[test]
    fn test_read_only_property_rejects_writes() {
        let mut record = Record::new("Person").with("id", 7).read_only("id");
        assert!(matches!(record.set("id", 8.into()), Err(ModelError::ReadOnly { .. })));
        assert_eq!(record.get("id").unwrap(), Value::from(7));
    }

    #[test]
    fn test_failing_accessor() {
        let record = Record::new("Broken").with_failing("boom", "exploded");
        assert!(matches!(record.get("boom"), Err(ModelError::Accessor { .. })));
        assert_eq!(record.describe().properties().len(), 1);
    }

    #[test]
    fn test_redeclaring_replaces_descriptor() {
        let record = Record::new("T").with("x", 1).with_scalar("x", 2);
        let info = record.describe();
        assert_eq!(info.properties().len(), 1);
        assert_eq!(record.get("x").unwrap(), Value::from(2));
    }
}
