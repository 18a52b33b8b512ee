//! Pointers to structured objects and their declared properties.

use super::{ElementIndex, NodePointer, PointerVariant};
use crate::error::XPathError;
use crate::iter::{NameTest, NodeIterator, PointerListIterator, PropertyIterator, StepTest};
use crate::value::format_number;
use objpath_model::{BeanInfo, CollectionHint, PropertyDescriptor, PropertyIdentifier, Value};
use std::cmp::Ordering;
use std::rc::Rc;

/// A structured object or a scalar (`B`).
#[derive(Debug, Clone)]
pub(crate) struct BeanNode {
    pub(crate) name: Option<PropertyIdentifier>,
    pub(crate) value: Value,
    pub(crate) info: Rc<BeanInfo>,
}

impl BeanNode {
    pub(crate) fn new(name: Option<PropertyIdentifier>, value: Value, info: Rc<BeanInfo>) -> Self {
        Self { name, value, info }
    }
}

impl PointerVariant for BeanNode {
    fn letter(&self) -> char {
        'B'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        self.name.clone()
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(self.value.clone())
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(self.value.is_null() || self.info.is_atomic())
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
            return ptr.default_path();
        }
        match &self.value {
            Value::Null => "null()".to_string(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(true) => "true()".to_string(),
            Value::Boolean(false) => "false()".to_string(),
            Value::String(s) => format!("'{}'", super::escape(s)),
            _ => "/".to_string(),
        }
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        let super::PointerKind::Bean(theirs) = &other.kind else {
            return false;
        };
        ptr.same_parent(other)
            && self.name == theirs.name
            && ptr.index.collapsed() == other.index.collapsed()
            && if self.value.is_scalar() {
                self.value == theirs.value
            } else {
                self.value.same_instance(&theirs.value)
            }
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

/// A declared property of a structured object (`b`).
#[derive(Debug, Clone)]
pub(crate) struct BeanProperty {
    pub(crate) info: Rc<BeanInfo>,
    pub(crate) property: Option<usize>,
    name: Option<PropertyIdentifier>,
    pub(crate) attribute: bool,
}

impl BeanProperty {
    pub(crate) fn new(info: Rc<BeanInfo>) -> Self {
        Self {
            info,
            property: None,
            name: None,
            attribute: false,
        }
    }

    pub(crate) fn select_index(&mut self, index: usize) {
        self.property = Some(index);
        self.name = None;
        self.attribute = self.descriptor().is_some_and(|d| d.id.is_attribute());
    }

    pub(crate) fn select_name(&mut self, name: &PropertyIdentifier) {
        let found = self.info.find(name).map(|(i, d)| (i, d.id.is_attribute()));
        match found {
            Some((index, attribute)) => {
                self.property = Some(index);
                self.attribute = attribute;
            }
            None => {
                self.property = None;
                self.attribute = name.is_attribute();
            }
        }
        self.name = Some(name.clone());
    }

    fn descriptor(&self) -> Option<&PropertyDescriptor> {
        self.property.and_then(|i| self.info.properties().get(i))
    }

    fn property_name(&self) -> PropertyIdentifier {
        match (self.descriptor(), &self.name) {
            (Some(descriptor), _) => descriptor.id.clone(),
            (None, Some(name)) => name.as_attribute(self.attribute),
            (None, None) => PropertyIdentifier::wildcard(),
        }
    }

    fn require_descriptor(&self, ptr: &NodePointer) -> Result<&PropertyDescriptor, XPathError> {
        self.descriptor().ok_or_else(|| {
            XPathError::invalid_access(
                ptr.as_path(),
                format!("type '{}' has no property '{}'", self.info.type_name(), self.property_name()),
            )
        })
    }

    fn write_whole(&self, ptr: &NodePointer, descriptor: &PropertyDescriptor, value: Value) -> Result<(), XPathError> {
        match ptr.owner_node()? {
            Value::Object(bean) => {
                bean.borrow_mut().set(&descriptor.name, value)?;
                Ok(())
            }
            other => Err(XPathError::invalid_access(
                ptr.as_path(),
                format!("cannot write a property of a {}", other.type_name()),
            )),
        }
    }
}

impl PointerVariant for BeanProperty {
    fn letter(&self) -> char {
        'b'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        Some(self.property_name())
    }

    fn base_value(&self, ptr: &NodePointer) -> Result<Value, XPathError> {
        let Some(descriptor) = self.descriptor() else {
            return Ok(Value::Null);
        };
        match ptr.owner_node()? {
            Value::Object(bean) => Ok(bean.borrow().get(&descriptor.name)?),
            _ => Ok(Value::Null),
        }
    }

    fn length(&self, ptr: &NodePointer) -> Result<usize, XPathError> {
        match self.descriptor() {
            None => Ok(1),
            Some(d) if d.hint == CollectionHint::Scalar => Ok(1),
            Some(_) => {
                let base = ptr.base_value()?;
                Ok(if base.is_null() { 1 } else { base.length() })
            }
        }
    }

    fn is_collection(&self, ptr: &NodePointer) -> Result<bool, XPathError> {
        match self.descriptor().map(|d| d.hint) {
            None | Some(CollectionHint::Scalar) => Ok(false),
            Some(CollectionHint::Collection) => Ok(true),
            Some(CollectionHint::Unknown) => Ok(ptr.base_value()?.is_collection()),
        }
    }

    fn is_container(&self, _ptr: &NodePointer) -> bool {
        true
    }

    fn exists(&self, _ptr: &NodePointer) -> bool {
        self.descriptor().is_some()
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        Ok(Some(ptr.child(Some(self.property_name()), ptr.immediate_node()?)))
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
        let descriptor = self.require_descriptor(ptr)?;
        match ptr.index {
            ElementIndex::Whole => self.write_whole(ptr, descriptor, value),
            ElementIndex::At(i) => {
                let base = ptr.base_value()?;
                if base.is_collection() {
                    Ok(base.set_element(i, value)?)
                } else if i == 0 {
                    self.write_whole(ptr, descriptor, value)
                } else {
                    Err(XPathError::invalid_access(
                        ptr.as_path(),
                        format!("property '{}' is not a collection", descriptor.name),
                    ))
                }
            }
        }
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        if !ptr.immediate_node()?.is_null() {
            return Ok(ptr.fresh());
        }
        let path = ptr.as_path();
        let descriptor = self
            .descriptor()
            .ok_or_else(|| XPathError::cannot_create(&path, format!("no property '{}'", self.property_name())))?;
        let base = ptr.base_value()?;
        if let (ElementIndex::At(i), true) = (ptr.index, base.is_collection()) {
            base.expand_to(i + 1)?;
        }
        let owner = ptr.owner_node()?;
        let factory = ptr.env.factory(&path)?;
        if !factory.create_object(&owner, &descriptor.name, ptr.index.collapsed())? {
            return Err(XPathError::cannot_create(
                &path,
                format!("the factory could not create property '{}'", descriptor.name),
            ));
        }
        log::debug!("Factory created '{}'", path);
        Ok(ptr.fresh())
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        if let ElementIndex::At(i) = ptr.index {
            let mut base = ptr.base_value()?;
            if base.is_null() && i > 0 {
                self.create_path(ptr)?;
                base = ptr.fresh().base_value()?;
            }
            if base.is_collection() && i >= base.length() {
                base.expand_to(i + 1)?;
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
            ElementIndex::Whole => self.set_value(ptr, Value::Null),
            ElementIndex::At(i) if ptr.is_collection() => {
                ptr.base_value()?.remove_element(i)?;
                Ok(())
            }
            ElementIndex::At(0) => self.set_value(ptr, Value::Null),
            ElementIndex::At(_) => Err(XPathError::invalid_access(ptr.as_path(), "no such element")),
        }
    }
}

/// Equality shared by property pointers: same owner, same property and
/// the same element once `Whole` is read as 0.
pub(super) fn same_property(ptr: &NodePointer, other: &NodePointer) -> bool {
    ptr.same_parent(other)
        && ptr.property_index() == other.property_index()
        && ptr.name() == other.name()
        && ptr.index.collapsed() == other.index.collapsed()
}

/// Children of a property owner compare by property name, then element.
pub(super) fn compare_properties(a: &NodePointer, b: &NodePointer) -> Ordering {
    let name_a = a.name().map(|n| n.to_string()).unwrap_or_default();
    let name_b = b.name().map(|n| n.to_string()).unwrap_or_default();
    name_a
        .cmp(&name_b)
        .then_with(|| a.index.collapsed().cmp(&b.index.collapsed()))
}

/// Clones a property pointer onto `name[index]` and materializes it.
pub(super) fn property_child(
    ptr: &NodePointer,
    name: Option<&PropertyIdentifier>,
    index: ElementIndex,
    value: Option<Value>,
) -> Result<NodePointer, XPathError> {
    let mut property = ptr.fresh();
    if let Some(name) = name {
        property.set_property_name(name);
    }
    property.set_index(index);
    match value {
        Some(value) => property.create_path_with_value(value),
        None => property.create_path(),
    }
}

pub(super) fn owner_child_iterator(
    ptr: &NodePointer,
    test: &StepTest,
    reverse: bool,
    start_with: Option<&NodePointer>,
) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
    let name = match test {
        StepTest::Node => None,
        StepTest::Name(name) if name.prefix.is_some() && name.namespace_uri.is_none() => return Ok(None),
        StepTest::Name(name) if name.is_wildcard() => None,
        StepTest::Name(name) => Some(PropertyIdentifier::new(
            name.namespace_uri.clone(),
            name.local.clone(),
            false,
        )),
        _ => return Ok(None),
    };
    let iterator = PropertyIterator::new(ptr, name, reverse, start_with)?;
    Ok(Some(Box::new(iterator)))
}

pub(super) fn owner_attribute_iterator(
    ptr: &NodePointer,
    name: &NameTest,
) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
    if name.prefix.is_some() && name.namespace_uri.is_none() {
        return Ok(None);
    }
    if !name.is_wildcard() {
        let id = PropertyIdentifier::new(name.namespace_uri.clone(), name.local.clone(), true);
        let iterator = PropertyIterator::new(ptr, Some(id), false, None)?;
        return Ok(Some(Box::new(iterator)));
    }
    let Some(mut property) = ptr.property_pointer() else {
        return Ok(None);
    };
    let mut attributes = Vec::new();
    for (i, id) in property.property_names().into_iter().enumerate() {
        if id.is_attribute() {
            property.set_property_index(i);
            attributes.push(property.value_pointer()?);
        }
    }
    Ok(Some(Box::new(PointerListIterator::new(attributes))))
}

pub(super) fn owner_set_value(ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
    match &ptr.parent {
        Some(parent) if parent.is_container() => {
            let mut parent = (**parent).clone();
            parent.set_value(value)
        }
        Some(_) if ptr.index.is_whole() => Err(XPathError::invalid_access(
            ptr.as_path(),
            "the object is not a property of another object",
        )),
        Some(_) => Err(XPathError::invalid_access(ptr.as_path(), "the collection element does not exist")),
        None => Err(XPathError::invalid_access(ptr.as_path(), "cannot replace the root object")),
    }
}

pub(super) fn owner_remove(ptr: &NodePointer) -> Result<(), XPathError> {
    match &ptr.parent {
        Some(parent) => {
            let mut parent = (**parent).clone();
            parent.remove()
        }
        None => Err(XPathError::invalid_access(
            ptr.as_path(),
            "cannot remove an object that is not a property or a collection element",
        )),
    }
}

pub(super) fn owner_create_child(
    ptr: &NodePointer,
    name: Option<&PropertyIdentifier>,
    index: ElementIndex,
) -> Result<NodePointer, XPathError> {
    match ptr.property_pointer() {
        Some(property) => property.create_child(name, index),
        None => Err(XPathError::cannot_create(ptr.as_path(), "not a property owner")),
    }
}

pub(super) fn owner_create_attribute(ptr: &NodePointer, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
    let mut property = ptr
        .property_pointer()
        .ok_or_else(|| XPathError::cannot_create(ptr.as_path(), "not a property owner"))?;
    property.set_property_name(&name.as_attribute(true));
    Ok(property)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use objpath_model::Record;

    fn bean_root() -> NodePointer {
        let nested = Record::new("Inner").with("name", "inner");
        let bean = Record::new("Outer")
            .with("count", 2)
            .with_collection("tags", vec!["a".into(), "b".into()])
            .with_scalar("pair", vec![Value::from(1), Value::from(2)])
            .with("inner", Value::object(nested))
            .with("empty", Value::Null);
        NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()))
    }

    fn property(root: &NodePointer, name: &str) -> NodePointer {
        let mut p = root.property_pointer().unwrap();
        p.set_property_name(&PropertyIdentifier::unqualified(name));
        p
    }

    #[test]
    fn test_collection_hints() {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = bean_root();
        let tags = property(&root, "tags");
        assert!(tags.is_collection());
        assert_eq!(tags.length(), 2);

        let pair = property(&root, "pair");
        assert!(!pair.is_collection());
        assert_eq!(pair.length(), 1);

        let empty = property(&root, "empty");
        assert_eq!(empty.length(), 1);
        assert!(!empty.is_collection());
    }

    #[test]
    fn test_missing_property_is_not_actual() {
        let root = bean_root();
        let missing = property(&root, "nope");
        assert!(!missing.is_actual());
        assert_eq!(missing.as_path(), "/nope");
        assert_eq!(missing.value().unwrap(), Value::Null);
    }

    #[test]
    fn test_scalar_index_zero_stays_whole() {
        let root = bean_root();
        let mut count = property(&root, "count");
        count.set_index(ElementIndex::At(0));
        assert_eq!(count.index(), ElementIndex::Whole);

        let mut tags = property(&root, "tags");
        tags.set_index(ElementIndex::At(1));
        assert_eq!(tags.value().unwrap(), Value::from("b"));
        assert_eq!(tags.as_path(), "/tags[2]");
    }

    #[test]
    fn test_write_collection_element() {
        let root = bean_root();
        let mut tags = property(&root, "tags");
        tags.set_index(ElementIndex::At(0));
        tags.set_value("z".into()).unwrap();
        assert_eq!(property(&root, "tags").value().unwrap().element(0), Value::from("z"));
    }

    #[test]
    fn test_expand_collection_on_write() {
        let root = bean_root();
        let mut tags = property(&root, "tags");
        tags.set_index(ElementIndex::At(3));
        assert!(!tags.is_actual());
        tags.create_path_with_value("d".into()).unwrap();
        let tags = property(&root, "tags").value().unwrap();
        assert_eq!(tags.length(), 4);
        assert_eq!(tags.element(2), Value::Null);
    }

    #[test]
    fn test_create_path_without_factory_fails() {
        let root = bean_root();
        let mut empty = property(&root, "empty");
        assert!(matches!(empty.create_path(), Err(XPathError::CannotCreatePath { .. })));
    }

    #[test]
    fn test_remove_element_and_property() {
        let root = bean_root();
        let mut tags = property(&root, "tags");
        tags.set_index(ElementIndex::At(0));
        tags.remove().unwrap();
        assert_eq!(property(&root, "tags").length(), 1);

        let mut count = property(&root, "count");
        count.remove().unwrap();
        assert_eq!(property(&root, "count").value().unwrap(), Value::Null);
    }

    #[test]
    fn test_children_compare_by_name() {
        let root = bean_root();
        let a = property(&root, "count").value_pointer().unwrap();
        let b = property(&root, "tags").value_pointer().unwrap();
        assert_eq!(compare_properties(&a, &b), Ordering::Less);
    }
}
