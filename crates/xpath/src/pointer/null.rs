//! Pointers to locations that do not exist yet. They render as paths and
//! can be materialized with `create_path`.

use super::beans::same_property;
use super::{ElementIndex, NodePointer, PointerKind, PointerVariant, escape};
use crate::error::XPathError;
use crate::iter::{NameTest, NodeIterator, StepTest};
use objpath_model::{PropertyIdentifier, Value};

/// A null value (`N`). Acts as a property owner with no properties.
#[derive(Debug, Clone)]
pub(crate) struct NullNode {
    pub(crate) name: Option<PropertyIdentifier>,
}

impl NullNode {
    pub(crate) fn new(name: Option<PropertyIdentifier>) -> Self {
        Self { name }
    }

    fn parent(ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        match &ptr.parent {
            Some(parent) => Ok((**parent).clone()),
            None => Err(XPathError::cannot_create(ptr.as_path(), "cannot create the root object")),
        }
    }
}

impl PointerVariant for NullNode {
    fn letter(&self) -> char {
        'N'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        self.name.clone()
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Null)
    }

    fn length(&self, _ptr: &NodePointer) -> Result<usize, XPathError> {
        Ok(0)
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(true)
    }

    fn exists(&self, _ptr: &NodePointer) -> bool {
        false
    }

    fn child_iterator(
        &self,
        _ptr: &NodePointer,
        _test: &StepTest,
        _reverse: bool,
        _start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        Ok(None)
    }

    fn attribute_iterator(
        &self,
        _ptr: &NodePointer,
        _name: &NameTest,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        Ok(None)
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        match &ptr.parent {
            Some(_) => ptr.default_path(),
            None => "null()".to_string(),
        }
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        let PointerKind::Null(theirs) = &other.kind else {
            return false;
        };
        self.name == theirs.name && ptr.same_parent(other) && ptr.index.collapsed() == other.index.collapsed()
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        super::beans::owner_set_value(ptr, value)
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        Self::parent(ptr)?.create_path()?.value_pointer()
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        Self::parent(ptr)?.create_path_with_value(value)?.value_pointer()
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        self.create_path(ptr)?.create_child(name, index)
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        self.create_path(ptr)?.create_child_with_value(name, index, value)
    }

    fn create_attribute(&self, ptr: &NodePointer, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
        self.create_path(ptr)?.create_attribute(name)
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        match &ptr.parent {
            Some(parent) => (**parent).clone().remove(),
            None => Ok(()),
        }
    }
}

/// A property that the owner does not have (`n`).
///
/// With `by_name_attribute` it stands for a `[@name='key']` lookup that
/// found nothing.
#[derive(Debug, Clone)]
pub(crate) struct NullProperty {
    pub(crate) name: String,
    pub(crate) by_name_attribute: bool,
    pub(crate) attribute: bool,
}

impl NullProperty {
    pub(crate) fn new(name: &str, attribute: bool) -> Self {
        Self {
            name: name.to_string(),
            by_name_attribute: false,
            attribute,
        }
    }

    pub(crate) fn select_name(&mut self, name: &PropertyIdentifier) {
        self.name = name.local_name().to_string();
        self.attribute = name.is_attribute();
    }

    fn identifier(&self) -> PropertyIdentifier {
        PropertyIdentifier::new(None, self.name.clone(), self.attribute)
    }

    /// The parent after materialization, opened to the property pointer
    /// that can receive a child.
    fn created_parent(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        let Some(parent) = &ptr.parent else {
            return Err(XPathError::cannot_create(ptr.as_path(), "the property has no owner"));
        };
        let created = (**parent).clone().create_path()?;
        if matches!(created.kind, PointerKind::Null(_)) {
            return Err(XPathError::cannot_create(
                ptr.as_path(),
                "the factory did not create the owning object",
            ));
        }
        Ok(match created.property_pointer() {
            Some(property) => property,
            None => created,
        })
    }

    fn owner_after_creation(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        let Some(parent) = &ptr.parent else {
            return Err(XPathError::cannot_create(ptr.as_path(), "the property has no owner"));
        };
        (**parent).clone().create_path()
    }
}

impl PointerVariant for NullProperty {
    fn letter(&self) -> char {
        'n'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        Some(self.identifier())
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Null)
    }

    fn length(&self, _ptr: &NodePointer) -> Result<usize, XPathError> {
        Ok(0)
    }

    fn is_collection(&self, ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(!ptr.index.is_whole())
    }

    fn is_container(&self, _ptr: &NodePointer) -> bool {
        true
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(true)
    }

    fn exists(&self, _ptr: &NodePointer) -> bool {
        false
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        Ok(Some(ptr.null_child(Some(self.identifier()))))
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        if !self.by_name_attribute {
            return ptr.default_path();
        }
        let mut buffer = ptr.parent.as_ref().map(|p| p.as_path()).unwrap_or_default();
        buffer.push_str(&format!("[@name='{}']", escape(&self.name)));
        if let ElementIndex::At(i) = ptr.index {
            buffer.push_str(&format!("[{}]", i + 1));
        }
        buffer
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        same_property(ptr, other)
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        let Some(parent) = ptr.parent.as_ref().filter(|p| !p.is_container()) else {
            return Err(XPathError::invalid_access(
                ptr.as_path(),
                "cannot set a property of a null object",
            ));
        };
        if let PointerKind::Dynamic(_) = parent.kind {
            if let Some(mut property) = parent.property_pointer() {
                property.set_property_name(&self.identifier());
                return property.set_value(value);
            }
        }
        Err(XPathError::invalid_access(
            ptr.as_path(),
            "the path does not match a changeable location",
        ))
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        if self.attribute {
            return self.owner_after_creation(ptr)?.create_attribute(&self.identifier());
        }
        self.created_parent(ptr)?.create_child(Some(&self.identifier()), ptr.index)
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        if self.attribute {
            let mut attribute = self.owner_after_creation(ptr)?.create_attribute(&self.identifier())?;
            attribute.set_value(value)?;
            return Ok(attribute);
        }
        self.created_parent(ptr)?
            .create_child_with_value(Some(&self.identifier()), ptr.index, value)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        self.create_path(ptr)?.create_child(name, index)
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        self.create_path(ptr)?.create_child_with_value(name, index, value)
    }

    fn remove(&self, _ptr: &NodePointer) -> Result<(), XPathError> {
        Ok(())
    }
}

/// A collection element past the end (`E`).
#[derive(Debug, Clone)]
pub(crate) struct NullElement;

impl PointerVariant for NullElement {
    fn letter(&self) -> char {
        'E'
    }

    fn name(&self, ptr: &NodePointer) -> Option<PropertyIdentifier> {
        ptr.parent.as_ref().and_then(|p| p.name())
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Null)
    }

    fn immediate_node(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Null)
    }

    fn length(&self, _ptr: &NodePointer) -> Result<usize, XPathError> {
        Ok(0)
    }

    fn is_container(&self, _ptr: &NodePointer) -> bool {
        true
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(true)
    }

    fn exists(&self, _ptr: &NodePointer) -> bool {
        false
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        Ok(Some(ptr.null_child(None)))
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        let mut buffer = ptr.parent.as_ref().map(|p| p.as_path()).unwrap_or_default();
        if let ElementIndex::At(i) = ptr.index {
            buffer.push_str(&format!("[{}]", i + 1));
        }
        buffer
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        ptr.same_parent(other) && ptr.index == other.index
    }

    fn set_value(&self, ptr: &NodePointer, _value: Value) -> Result<(), XPathError> {
        Err(XPathError::invalid_access(ptr.as_path(), "the collection element does not exist"))
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        match &ptr.parent {
            Some(parent) => parent.create_child(None, ptr.index),
            None => Err(XPathError::cannot_create(ptr.as_path(), "the element has no collection")),
        }
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        match &ptr.parent {
            Some(parent) => parent.create_child_with_value(None, ptr.index, value),
            None => Err(XPathError::cannot_create(ptr.as_path(), "the element has no collection")),
        }
    }

    fn remove(&self, _ptr: &NodePointer) -> Result<(), XPathError> {
        Ok(())
    }
}
