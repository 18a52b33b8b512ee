use super::{EvalContext, SetCursor, inherited_order};
use crate::error::XPathError;
use crate::iter::{NodeIterator, StepTest};
use crate::pointer::NodePointer;

/// The `descendant` and `descendant-or-self` axes: a depth-first walk
/// driven by a stack of child iterators. Objects that contain themselves
/// are entered only once per branch.
pub(crate) struct DescendantContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    include_self: bool,
    stack: Vec<Box<dyn NodeIterator>>,
    current: Option<NodePointer>,
    started: bool,
    position: usize,
    cursor: SetCursor,
}

impl<'a> DescendantContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest, include_self: bool) -> Self {
        Self {
            parent,
            test,
            include_self,
            stack: Vec::new(),
            current: None,
            started: false,
            position: 0,
            cursor: SetCursor::default(),
        }
    }

    fn push_children(&mut self, pointer: &NodePointer) -> Result<(), XPathError> {
        if !pointer.is_leaf() {
            if let Some(iterator) = pointer.child_iterator(&StepTest::Node, false, None)? {
                self.stack.push(iterator);
            }
        }
        Ok(())
    }

    /// True if the current node is already open further down the stack.
    fn is_recursive(&mut self) -> Result<bool, XPathError> {
        let Some(current) = &self.current else {
            return Ok(false);
        };
        let node = current.node()?;
        let below_top = self.stack.len().saturating_sub(1);
        for iterator in self.stack[..below_top].iter_mut().rev() {
            if let Some(pointer) = iterator.node_pointer()? {
                if pointer.node()?.same_instance(&node) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl EvalContext for DescendantContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 && !self.set_position(1)? {
            return Ok(None);
        }
        Ok(self.current.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        if !self.started {
            self.started = true;
            self.stack.clear();
            self.current = self.parent.current_node_pointer()?;
            if let Some(current) = self.current.clone() {
                self.push_children(&current)?;
                if self.include_self && current.test_node(&self.test) {
                    self.position += 1;
                    return Ok(true);
                }
            }
        }
        while let Some(top) = self.stack.last_mut() {
            if !top.set_position(top.position() + 1)? {
                self.stack.pop();
                continue;
            }
            self.current = top.node_pointer()?;
            if self.is_recursive()? {
                continue;
            }
            if let Some(current) = self.current.clone() {
                self.push_children(&current)?;
                if current.test_node(&self.test) {
                    self.position += 1;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn next_set(&mut self) -> Result<bool, XPathError> {
        self.reset();
        self.cursor.advance(self.parent.as_mut())
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        if position < self.position {
            self.reset();
        }
        while self.position < position {
            if !self.next_node()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn reset(&mut self) {
        self.position = 0;
        self.started = false;
    }

    fn document_order(&self) -> i32 {
        inherited_order(self.parent.as_ref())
    }

    fn is_child_ordering_required(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::{InitialContext, PointerStream};
    use crate::iter::NameTest;
    use crate::pointer::PointerEnv;
    use objpath_model::{DomNode, Record, Value};
    use std::rc::Rc;

    fn names(root: Value, test: StepTest, include_self: bool) -> Vec<String> {
        let root = NodePointer::root(root, Rc::new(PointerEnv::default()));
        let ctx = DescendantContext::new(Box::new(InitialContext::new(Some(root))), test, include_self);
        PointerStream::new(Box::new(ctx)).map(|p| p.unwrap().as_path()).collect()
    }

    #[test]
    fn test_dom_descendants_in_document_order() {
        let _ = env_logger::builder().is_test(true).try_init();
        let doc = DomNode::parse("<a><b><c/></b><c/></a>").unwrap();
        let found = names(Value::Node(doc), StepTest::Name(NameTest::new("c")), false);
        assert_eq!(found, vec!["/a[1]/b[1]/c[1]", "/a[1]/c[1]"]);
    }

    #[test]
    fn test_descendant_or_self_includes_start() {
        let doc = DomNode::parse("<a><a/></a>").unwrap();
        let element = doc.children().remove(0);
        let found = names(Value::Node(element), StepTest::Name(NameTest::new("a")), true);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_bean_descendants_by_name() {
        let leaf = Record::new("Leaf").with("name", "deep");
        let branch = Record::new("Branch").with("name", "mid").with("leaf", Value::object(leaf));
        let root = Record::new("Tree").with("branch", Value::object(branch));
        let found = names(Value::object(root), StepTest::Name(NameTest::new("name")), false);
        assert_eq!(found, vec!["/branch/name", "/branch/leaf/name"]);
    }
}
