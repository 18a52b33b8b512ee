//! Pointer to a list value (`C`).

use super::{ElementIndex, NodePointer, PointerKind, PointerVariant};
use crate::error::XPathError;
use crate::iter::{CollectionChildIterator, NameTest, NodeIterator, StepTest};
use objpath_model::{PropertyIdentifier, Value};
use std::cmp::Ordering;

/// A list. At `Whole` it stands for the list itself; with an index it is a
/// container for one element.
#[derive(Debug, Clone)]
pub(crate) struct CollectionNode {
    pub(crate) value: Value,
}

impl CollectionNode {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl PointerVariant for CollectionNode {
    fn letter(&self) -> char {
        'C'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        None
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(self.value.clone())
    }

    fn length(&self, _ptr: &NodePointer) -> Result<usize, XPathError> {
        Ok(self.value.length())
    }

    fn is_collection(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(true)
    }

    fn is_container(&self, ptr: &NodePointer) -> bool {
        !ptr.index.is_whole()
    }

    fn value_pointer(&self, ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        match ptr.index {
            ElementIndex::Whole => Ok(None),
            ElementIndex::At(i) => Ok(Some(ptr.child(None, self.value.element(i)))),
        }
    }

    fn child_iterator(
        &self,
        ptr: &NodePointer,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        match ptr.index {
            ElementIndex::Whole => Ok(Some(Box::new(CollectionChildIterator::children(
                ptr, test, reverse, start_with,
            )?))),
            ElementIndex::At(_) => ptr.value_pointer()?.child_iterator(test, reverse, start_with),
        }
    }

    fn attribute_iterator(
        &self,
        ptr: &NodePointer,
        name: &NameTest,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        match ptr.index {
            ElementIndex::Whole => Ok(Some(Box::new(CollectionChildIterator::attributes(ptr, name)?))),
            ElementIndex::At(_) => ptr.value_pointer()?.attribute_iterator(name),
        }
    }

    fn test_node(&self, ptr: &NodePointer, test: &StepTest) -> bool {
        match ptr.index {
            ElementIndex::Whole => *test == StepTest::Node,
            ElementIndex::At(_) => ptr.value_pointer().is_ok_and(|vp| vp.test_node(test)),
        }
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        let mut buffer = ptr.parent.as_ref().map(|p| p.as_path()).unwrap_or_default();
        let ElementIndex::At(i) = ptr.index else {
            return if buffer.is_empty() { "/".to_string() } else { buffer };
        };
        let parent_indexed = ptr.parent.as_ref().is_some_and(|p| !p.index.is_whole());
        if buffer.is_empty() || parent_indexed {
            if !buffer.ends_with('/') {
                buffer.push('/');
            }
            buffer.push('.');
        }
        buffer.push_str(&format!("[{}]", i + 1));
        buffer
    }

    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool {
        let PointerKind::Collection(theirs) = &other.kind else {
            return false;
        };
        self.value.same_instance(&theirs.value) && ptr.index == other.index
    }

    fn compare_children(&self, _ptr: &NodePointer, a: &NodePointer, b: &NodePointer) -> Ordering {
        a.index.collapsed().cmp(&b.index.collapsed())
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        match ptr.index {
            ElementIndex::At(i) => Ok(self.value.set_element(i, value)?),
            ElementIndex::Whole => match &ptr.parent {
                Some(parent) => (**parent).clone().set_value(value),
                None => Err(XPathError::invalid_access(ptr.as_path(), "cannot replace the root collection")),
            },
        }
    }

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        if let ElementIndex::At(i) = ptr.index {
            self.value.expand_to(i + 1)?;
        }
        Ok(ptr.fresh())
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        let mut created = self.create_path(ptr)?;
        created.set_value(value)?;
        Ok(created)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        _name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        let mut element = ptr.fresh();
        element.set_index(index);
        element.create_path()
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        _name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        let mut element = ptr.fresh();
        element.set_index(index);
        element.create_path_with_value(value)
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        match ptr.index {
            ElementIndex::At(i) => {
                self.value.remove_element(i)?;
                Ok(())
            }
            ElementIndex::Whole => match &ptr.parent {
                Some(parent) => (**parent).clone().remove(),
                None => Err(XPathError::invalid_access(ptr.as_path(), "cannot remove the root collection")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use std::rc::Rc;

    fn list_root() -> NodePointer {
        let list = Value::list(vec!["a".into(), Value::Null, 3.into()]);
        NodePointer::root(list, Rc::new(PointerEnv::default()))
    }

    #[test]
    fn test_element_value_pointers() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut root = list_root();
        assert_eq!(root.as_path(), "/");
        assert!(!root.is_container());
        root.set_index(ElementIndex::At(0));
        assert!(root.is_container());
        assert_eq!(root.as_path(), "/.[1]");
        assert_eq!(root.value_pointer().unwrap().signature(), "CB");
        root.set_index(ElementIndex::At(1));
        assert_eq!(root.value_pointer().unwrap().signature(), "CN");
        root.set_index(ElementIndex::At(7));
        assert!(!root.is_actual());
    }

    #[test]
    fn test_equality_uses_identity_and_exact_index() {
        let root = list_root();
        let mut element = root.clone();
        element.set_index(ElementIndex::At(0));
        assert_ne!(root, element);
        let other = NodePointer::root(Value::list(vec!["a".into()]), root.env.clone());
        assert_ne!(root, other);
        assert_eq!(root, root.fresh());
    }

    #[test]
    fn test_create_child_expands() {
        let root = list_root();
        let created = root.create_child_with_value(None, ElementIndex::At(4), "e".into()).unwrap();
        assert_eq!(created.value().unwrap(), Value::from("e"));
        assert_eq!(root.length(), 5);
    }
}
