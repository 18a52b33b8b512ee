//! Pointer to a variable of the shared scope (`V`).

use super::{ElementIndex, NodePointer, PointerKind, PointerVariant, VariableScope};
use crate::error::XPathError;
use objpath_model::{PropertyIdentifier, Value};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub(crate) struct VariableRef {
    pub(crate) name: String,
    scope: VariableScope,
}

impl VariableRef {
    pub(crate) fn new(name: &str, scope: VariableScope) -> Self {
        Self {
            name: name.to_string(),
            scope,
        }
    }

    fn is_declared(&self) -> bool {
        self.scope.borrow().contains_key(&self.name)
    }

    /// Declares the variable through the factory if needed.
    fn ensure_declared(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        if self.is_declared() {
            return Ok(());
        }
        let path = ptr.as_path();
        let initial = ptr
            .env
            .factory(&path)?
            .declare_variable(&self.name)
            .ok_or_else(|| XPathError::cannot_create(&path, "the factory cannot declare the variable"))?;
        log::debug!("Declared variable '{}' through the factory", self.name);
        self.scope.borrow_mut().insert(self.name.clone(), initial);
        Ok(())
    }

    /// Makes the variable hold a collection with at least `index + 1`
    /// elements.
    fn ensure_collection(&self, ptr: &NodePointer, index: ElementIndex) -> Result<Value, XPathError> {
        self.ensure_declared(ptr)?;
        let collection = ptr.fresh().base_value()?;
        if collection.is_null() {
            return Err(XPathError::cannot_create(
                ptr.as_path(),
                "the variable holds no collection",
            ));
        }
        let index = index.collapsed();
        if index >= collection.length() {
            collection.expand_to(index + 1)?;
        }
        Ok(collection)
    }
}

impl PointerVariant for VariableRef {
    fn letter(&self) -> char {
        'V'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        Some(PropertyIdentifier::unqualified(self.name.clone()))
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        self.scope
            .borrow()
            .get(&self.name)
            .cloned()
            .ok_or_else(|| XPathError::UnknownVariable(self.name.clone()))
    }

    fn immediate_node(&self, ptr: &NodePointer) -> Result<Value, XPathError> {
        if !self.is_declared() {
            return Ok(Value::Null);
        }
        let base = ptr.base_value()?;
        Ok(match ptr.index {
            ElementIndex::Whole => base,
            ElementIndex::At(i) => base.element(i),
        })
    }

    fn length(&self, ptr: &NodePointer) -> Result<usize, XPathError> {
        if !self.is_declared() {
            return Ok(0);
        }
        let base = ptr.base_value()?;
        Ok(if base.is_null() { 0 } else { base.length() })
    }

    fn is_collection(&self, ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(self.is_declared() && ptr.base_value()?.is_collection())
    }

    fn is_container(&self, _ptr: &NodePointer) -> bool {
        true
    }

    fn exists(&self, _ptr: &NodePointer) -> bool {
        self.is_declared()
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        if !self.is_declared() {
            return Ok(Some(ptr.null_child(None)));
        }
        Ok(Some(ptr.child(None, ptr.immediate_node()?)))
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        let mut buffer = format!("${}", self.name);
        if let ElementIndex::At(i) = ptr.index {
            let indexed = !self.is_declared() || ptr.immediate_node().is_ok_and(|n| n.is_null()) || ptr.is_collection();
            if indexed {
                buffer.push_str(&format!("[{}]", i + 1));
            }
        }
        buffer
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        let PointerKind::Variable(theirs) = &other.kind else {
            return false;
        };
        self.name == theirs.name && Rc::ptr_eq(&self.scope, &theirs.scope) && ptr.index == other.index
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        if !self.is_declared() {
            return Err(XPathError::invalid_access(ptr.as_path(), "cannot set an undefined variable"));
        }
        match ptr.index {
            ElementIndex::Whole => {
                self.scope.borrow_mut().insert(self.name.clone(), value);
                Ok(())
            }
            ElementIndex::At(i) => {
                let collection = ptr.base_value()?;
                if collection.is_collection() {
                    Ok(collection.set_element(i, value)?)
                } else if i == 0 {
                    self.scope.borrow_mut().insert(self.name.clone(), value);
                    Ok(())
                } else {
                    Err(XPathError::invalid_access(ptr.as_path(), "the variable is not a collection"))
                }
            }
        }
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        self.ensure_declared(ptr)?;
        Ok(ptr.fresh())
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        if let ElementIndex::At(i) = ptr.index {
            let collection = self.ensure_collection(ptr, ptr.index)?;
            collection.set_element(i, value)?;
            return Ok(ptr.fresh());
        }
        self.ensure_declared(ptr)?;
        let mut created = ptr.fresh();
        created.set_value(value)?;
        Ok(created)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        _name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        let collection = self.ensure_collection(ptr, index)?;
        let position = index.collapsed();
        if position != 0 || !ptr.is_actual() {
            let created = ptr.env.factory(&ptr.as_path())?.create_object(&collection, &self.name, position)?;
            if !created {
                return Err(XPathError::cannot_create(
                    format!("${}[{}]", self.name, position + 1),
                    "the factory did not create the element",
                ));
            }
        }
        let mut element = ptr.fresh();
        element.index = index;
        Ok(element)
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        _name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        let collection = self.ensure_collection(ptr, index)?;
        let position = index.collapsed();
        if collection.is_collection() {
            collection.set_element(position, value)?;
        } else {
            self.scope.borrow_mut().insert(self.name.clone(), value);
        }
        let mut element = ptr.fresh();
        element.index = index;
        Ok(element)
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        if !self.is_declared() {
            return Ok(());
        }
        match ptr.index {
            ElementIndex::Whole => {
                self.scope.borrow_mut().shift_remove(&self.name);
            }
            ElementIndex::At(i) => {
                let collection = ptr.base_value()?;
                if collection.is_collection() && i < collection.length() {
                    collection.remove_element(i)?;
                }
            }
        }
        Ok(())
    }
}
