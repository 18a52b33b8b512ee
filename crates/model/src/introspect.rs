//! Property descriptors for structured objects and the cache that serves them.

use crate::identifier::PropertyIdentifier;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Whether a property is declared to hold a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionHint {
    /// Never a collection, whatever the runtime value.
    Scalar,
    /// Always a collection.
    Collection,
    /// Decided by inspecting the current value.
    Unknown,
}

/// Describes one property of a structured object.
///
/// `name` is the key handed to the object's accessors; `id` is the name the
/// property is addressed by in paths. They differ for properties mapped to a
/// different XML-style name or exposed as attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub id: PropertyIdentifier,
    pub hint: CollectionHint,
    pub writable: bool,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: PropertyIdentifier::unqualified(name.clone()),
            name,
            hint: CollectionHint::Unknown,
            writable: true,
        }
    }

    pub fn scalar(mut self) -> Self {
        self.hint = CollectionHint::Scalar;
        self
    }

    pub fn collection(mut self) -> Self {
        self.hint = CollectionHint::Collection;
        self
    }

    pub fn attribute(mut self) -> Self {
        self.id = self.id.as_attribute(true);
        self
    }

    pub fn mapped_to(mut self, id: PropertyIdentifier) -> Self {
        self.id = id;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

/// The property table of one object type, sorted by identifier.
#[derive(Debug, Clone)]
pub struct BeanInfo {
    type_name: String,
    atomic: bool,
    properties: Vec<PropertyDescriptor>,
}

impl BeanInfo {
    pub fn new(type_name: impl Into<String>, mut properties: Vec<PropertyDescriptor>) -> Self {
        properties.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            type_name: type_name.into(),
            atomic: false,
            properties,
        }
    }

    /// A type with no decomposable properties.
    pub fn atomic(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            atomic: true,
            properties: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        if self.atomic { &[] } else { &self.properties[..] }
    }

    pub fn property_ids(&self) -> Vec<PropertyIdentifier> {
        self.properties().iter().map(|p| p.id.clone()).collect()
    }

    /// Finds a descriptor by exact identifier, falling back to the local name.
    pub fn find(&self, id: &PropertyIdentifier) -> Option<(usize, &PropertyDescriptor)> {
        let props = self.properties();
        props
            .iter()
            .position(|p| &p.id == id)
            .or_else(|| props.iter().position(|p| p.id.local_name() == id.local_name()))
            .map(|i| (i, &props[i]))
    }
}

/// Caches `BeanInfo` per type name. Populated on first use, never evicted.
///
/// Scalars, lists, maps and DOM nodes are described as atomic types so that
/// callers can treat every value uniformly.
#[derive(Debug, Default)]
pub struct Introspector {
    cache: RefCell<HashMap<String, Rc<BeanInfo>>>,
}

impl Introspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an explicit description, replacing whatever `describe()`
    /// would have produced.
    pub fn register(&self, info: BeanInfo) {
        self.cache
            .borrow_mut()
            .insert(info.type_name().to_string(), Rc::new(info));
    }

    pub fn bean_info(&self, value: &Value) -> Rc<BeanInfo> {
        let type_name = value.type_name();
        if let Some(info) = self.cache.borrow().get(&type_name) {
            return info.clone();
        }
        let info = match value {
            Value::Object(bean) => match bean.try_borrow() {
                Ok(bean) => bean.describe(),
                Err(_) => {
                    log::warn!("Object of type '{}' is mutably borrowed; describing it as atomic", type_name);
                    return Rc::new(BeanInfo::atomic(type_name));
                }
            },
            _ => BeanInfo::atomic(type_name.clone()),
        };
        log::debug!(
            "Introspected type '{}' ({} properties, atomic: {})",
            type_name,
            info.properties().len(),
            info.is_atomic()
        );
        let info = Rc::new(info);
        self.cache.borrow_mut().insert(type_name, info.clone());
        info
    }

    pub fn is_atomic(&self, value: &Value) -> bool {
        match value {
            Value::Object(_) => self.bean_info(value).is_atomic(),
            Value::List(_) | Value::Map(_) | Value::Node(_) => false,
            _ => true,
        }
    }

    pub fn cached_types(&self) -> usize {
        self.cache.borrow().len()
    }
}
