//! Pointers to dynamic bags (maps) and their keys.

use super::beans::{
    compare_properties, owner_attribute_iterator, owner_child_iterator, owner_create_attribute, owner_create_child,
    owner_remove, owner_set_value, property_child, same_property,
};
use super::{ElementIndex, NodePointer, PointerKind, PointerVariant, escape};
use crate::error::XPathError;
use crate::iter::{NameTest, NodeIterator, StepTest};
use objpath_model::{BagRef, PropertyIdentifier, Value};
use std::cmp::Ordering;

/// A map (`D`). Its properties are whatever keys it holds.
#[derive(Debug, Clone)]
pub(crate) struct DynamicNode {
    pub(crate) name: Option<PropertyIdentifier>,
    pub(crate) value: Value,
}

impl DynamicNode {
    pub(crate) fn new(name: Option<PropertyIdentifier>, value: Value) -> Self {
        Self { name, value }
    }
}

impl PointerVariant for DynamicNode {
    fn letter(&self) -> char {
        'D'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        self.name.clone()
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(self.value.clone())
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(false)
    }

    fn child_iterator(
        &self,
        ptr: &NodePointer,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        owner_child_iterator(ptr, test, reverse, start_with)
    }

    fn attribute_iterator(
        &self,
        ptr: &NodePointer,
        name: &NameTest,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        owner_attribute_iterator(ptr, name)
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        if ptr.parent.is_some() {
            ptr.default_path()
        } else {
            "/".to_string()
        }
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        let PointerKind::Dynamic(theirs) = &other.kind else {
            return false;
        };
        ptr.same_parent(other)
            && self.name == theirs.name
            && ptr.index.collapsed() == other.index.collapsed()
            && self.value.same_instance(&theirs.value)
    }

    fn compare_children(&self, _ptr: &NodePointer, a: &NodePointer, b: &NodePointer) -> Ordering {
        compare_properties(a, b)
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        owner_set_value(ptr, value)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        owner_create_child(ptr, name, index)
    }

    fn create_attribute(&self, ptr: &NodePointer, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
        owner_create_attribute(ptr, name)
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        owner_remove(ptr)
    }
}

/// One key of a map (`d`).
///
/// Property names are the bag's keys in sorted order. A key that was asked
/// for by name but is absent is listed too, so that it keeps a stable index
/// and can be created later.
#[derive(Debug, Clone, Default)]
pub(crate) struct DynamicProperty {
    pub(crate) property: Option<usize>,
    name: Option<String>,
    required: Option<String>,
    pub(crate) attribute: bool,
}

impl DynamicProperty {
    pub(crate) fn names(&self, ptr: &NodePointer) -> Vec<String> {
        self.names_with(ptr, self.required.as_deref())
    }

    pub(crate) fn names_with(&self, ptr: &NodePointer, required: Option<&str>) -> Vec<String> {
        let mut names = match bag(ptr) {
            Ok(bag) => bag.borrow().keys(),
            Err(e) => {
                log::debug!("No keys for '{}': {}", ptr.as_path(), e);
                Vec::new()
            }
        };
        names.sort();
        if let Some(required) = required {
            if let Err(at) = names.binary_search_by(|n| n.as_str().cmp(required)) {
                names.insert(at, required.to_string());
            }
        }
        names
    }

    pub(crate) fn select_index(&mut self, index: usize) {
        self.property = Some(index);
        self.name = None;
    }

    pub(crate) fn select_name(&mut self, name: &str, names: &[String]) {
        self.name = Some(name.to_string());
        self.required = Some(name.to_string());
        self.property = names.iter().position(|n| n == name);
    }

    fn key(&self, ptr: &NodePointer) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.property
            .and_then(|i| self.names(ptr).into_iter().nth(i))
            .unwrap_or_else(|| "*".to_string())
    }

    fn write_key(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        bag(ptr)?.borrow_mut().set(&self.key(ptr), value);
        Ok(())
    }

    fn remove_key(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        bag(ptr)?.borrow_mut().remove(&self.key(ptr));
        Ok(())
    }
}

fn bag(ptr: &NodePointer) -> Result<BagRef, XPathError> {
    match ptr.owner_node()? {
        Value::Map(bag) => Ok(bag),
        other => Err(XPathError::invalid_access(
            ptr.as_path(),
            format!("expected a map, found {}", other.type_name()),
        )),
    }
}

impl PointerVariant for DynamicProperty {
    fn letter(&self) -> char {
        'd'
    }

    fn name(&self, ptr: &NodePointer) -> Option<PropertyIdentifier> {
        Some(PropertyIdentifier::unqualified(self.key(ptr)))
    }

    fn base_value(&self, ptr: &NodePointer) -> Result<Value, XPathError> {
        let key = self.key(ptr);
        if key == "*" {
            return Ok(Value::Null);
        }
        Ok(bag(ptr)?.borrow().get(&key))
    }

    fn length(&self, ptr: &NodePointer) -> Result<usize, XPathError> {
        let base = ptr.base_value()?;
        Ok(if base.is_null() { 1 } else { base.length() })
    }

    fn is_collection(&self, ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(ptr.base_value()?.is_collection())
    }

    fn is_container(&self, _ptr: &NodePointer) -> bool {
        true
    }

    fn exists(&self, ptr: &NodePointer) -> bool {
        bag(ptr).is_ok_and(|bag| bag.borrow().contains(&self.key(ptr)))
    }

    fn declared(&self, ptr: &NodePointer) -> bool {
        self.property.is_some_and(|i| i < self.names(ptr).len())
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        Ok(Some(ptr.child(self.name(ptr), ptr.immediate_node()?)))
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        let mut buffer = ptr.parent.as_ref().map(|p| p.as_path()).unwrap_or_default();
        if buffer.is_empty() {
            buffer.push_str("/.");
        } else if buffer.ends_with('/') {
            buffer.push('.');
        }
        buffer.push_str(&format!("[@name='{}']", escape(&self.key(ptr))));
        if let ElementIndex::At(i) = ptr.index {
            if ptr.is_collection() {
                buffer.push_str(&format!("[{}]", i + 1));
            }
        }
        buffer
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        same_property(ptr, other)
    }

    fn compare_children(&self, ptr: &NodePointer, a: &NodePointer, b: &NodePointer) -> Ordering {
        match ptr.value_pointer() {
            Ok(value) => value.compare_children(a, b),
            Err(_) => Ordering::Equal,
        }
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        match ptr.index {
            ElementIndex::Whole => self.write_key(ptr, value),
            ElementIndex::At(i) => {
                let base = ptr.base_value()?;
                if base.is_collection() {
                    Ok(base.set_element(i, value)?)
                } else if i == 0 {
                    self.write_key(ptr, value)
                } else {
                    Err(XPathError::invalid_access(
                        ptr.as_path(),
                        format!("key '{}' does not hold a collection", self.key(ptr)),
                    ))
                }
            }
        }
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        let path = ptr.as_path();
        let key = self.key(ptr);
        let mut base = ptr.base_value()?;
        if base.is_null() {
            let owner = ptr.owner_node()?;
            let factory = ptr.env.factory(&path)?;
            if !factory.create_object(&owner, &key, ptr.index.collapsed())? {
                return Err(XPathError::cannot_create(
                    &path,
                    format!("the factory could not create key '{}'", key),
                ));
            }
            log::debug!("Factory created '{}'", path);
            base = ptr.fresh().base_value()?;
        }
        if let ElementIndex::At(i) = ptr.index {
            if base.is_collection() {
                base.expand_to(i + 1)?;
            } else if i > 0 {
                return Err(XPathError::cannot_create(
                    &path,
                    format!("key '{}' does not hold a collection", key),
                ));
            }
        }
        Ok(ptr.fresh())
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        if let ElementIndex::At(i) = ptr.index {
            let base = ptr.base_value()?;
            if !(base.is_null() && i == 0) {
                self.create_path(ptr)?;
            }
        }
        let mut target = ptr.fresh();
        target.set_value(value)?;
        Ok(target)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        property_child(ptr, name, index, None)
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        property_child(ptr, name, index, Some(value))
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        match ptr.index {
            ElementIndex::Whole => self.remove_key(ptr),
            ElementIndex::At(i) if ptr.is_collection() => {
                ptr.base_value()?.remove_element(i)?;
                Ok(())
            }
            ElementIndex::At(0) => self.remove_key(ptr),
            ElementIndex::At(_) => Err(XPathError::invalid_access(ptr.as_path(), "no such element")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use indexmap::IndexMap;
    use std::rc::Rc;

    fn map_root() -> NodePointer {
        let mut bag: IndexMap<String, Value> = IndexMap::new();
        bag.insert("b".into(), 2.into());
        bag.insert("a".into(), Value::list(vec![1.into(), 2.into()]));
        NodePointer::root(Value::map(bag), Rc::new(PointerEnv::default()))
    }

    fn entry(root: &NodePointer, key: &str) -> NodePointer {
        let mut p = root.property_pointer().unwrap();
        p.set_property_name(&PropertyIdentifier::unqualified(key));
        p
    }

    #[test]
    fn test_names_are_sorted_and_include_required() {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = map_root();
        let missing = entry(&root, "ab");
        let names: Vec<String> = missing
            .property_names()
            .into_iter()
            .map(|n| n.local_name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "ab", "b"]);
        assert_eq!(missing.property_index(), Some(1));
    }

    #[test]
    fn test_absent_key_is_declared_but_not_actual() {
        let root = map_root();
        let missing = entry(&root, "zz");
        assert!(missing.is_declared());
        assert!(!missing.is_actual());
        assert_eq!(missing.signature(), "Dd");
        assert_eq!(missing.value_pointer().unwrap().signature(), "DdN");
    }

    #[test]
    fn test_path_rendering() {
        let root = map_root();
        assert_eq!(entry(&root, "b").as_path(), "/.[@name='b']");
        let mut list = entry(&root, "a");
        list.set_index(ElementIndex::At(1));
        assert_eq!(list.as_path(), "/.[@name='a'][2]");
        assert_eq!(list.value().unwrap(), Value::from(2));
    }

    #[test]
    fn test_write_and_remove_key() {
        let root = map_root();
        let mut c = entry(&root, "c");
        c.set_value("new".into()).unwrap();
        assert!(entry(&root, "c").is_actual());
        entry(&root, "c").remove().unwrap();
        assert!(!entry(&root, "c").is_actual());
    }

    #[test]
    fn test_expand_list_entry() {
        let root = map_root();
        let mut a = entry(&root, "a");
        a.set_index(ElementIndex::At(3));
        a.create_path_with_value(9.into()).unwrap();
        let list = entry(&root, "a").value().unwrap();
        assert_eq!(list.length(), 4);
        assert_eq!(list.element(3), Value::from(9));
    }
}
