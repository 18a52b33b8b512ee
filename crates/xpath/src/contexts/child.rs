use super::{EvalContext, SetCursor, inherited_order};
use crate::error::XPathError;
use crate::iter::{NodeIterator, StepTest};
use crate::pointer::NodePointer;

/// The `child` axis, and the sibling axes when `start_from_parent` is set:
/// those iterate the children of the parent, starting after (or before,
/// when `reverse`) the current node.
pub(crate) struct ChildContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    start_from_parent: bool,
    reverse: bool,
    iterator: Option<Box<dyn NodeIterator>>,
    position: usize,
    cursor: SetCursor,
}

impl<'a> ChildContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest, start_from_parent: bool, reverse: bool) -> Self {
        Self {
            parent,
            test,
            start_from_parent,
            reverse,
            iterator: None,
            position: 0,
            cursor: SetCursor::default(),
        }
    }

    fn prepare(&mut self) -> Result<(), XPathError> {
        self.iterator = None;
        let Some(current) = self.parent.current_node_pointer()? else {
            return Ok(());
        };
        if self.start_from_parent {
            if let Some(parent) = current.parent() {
                self.iterator = parent.child_iterator(&self.test, self.reverse, Some(&current))?;
            }
        } else {
            self.iterator = current.child_iterator(&self.test, self.reverse, None)?;
        }
        Ok(())
    }
}

impl EvalContext for ChildContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 {
            if !self.set_position(1)? {
                return Ok(None);
            }
            self.position = 0;
        }
        match self.iterator.as_mut() {
            Some(iterator) => iterator.node_pointer(),
            None => Ok(None),
        }
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        self.set_position(self.position + 1)
    }

    fn next_set(&mut self) -> Result<bool, XPathError> {
        self.reset();
        self.cursor.advance(self.parent.as_mut())
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        let old = self.position;
        self.position = position;
        if old == 0 {
            self.prepare()?;
        }
        match self.iterator.as_mut() {
            Some(iterator) => iterator.set_position(position),
            None => Ok(false),
        }
    }

    fn reset(&mut self) {
        self.position = 0;
        self.iterator = None;
    }

    fn document_order(&self) -> i32 {
        inherited_order(self.parent.as_ref())
    }

    /// Without moving, the first match: for a collection-valued property
    /// this is the whole collection.
    fn single_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position != 0 {
            return self.current_node_pointer();
        }
        while self.next_set()? {
            self.prepare()?;
            let Some(iterator) = self.iterator.as_mut() else {
                return Ok(None);
            };
            if let Some(pointer) = iterator.node_pointer()? {
                return Ok(Some(pointer));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::InitialContext;
    use crate::contexts::tests::bean_root;
    use crate::iter::NameTest;

    fn child_of_root(name: &str) -> ChildContext<'static> {
        let initial = InitialContext::new(Some(bean_root()));
        ChildContext::new(Box::new(initial), StepTest::Name(NameTest::new(name)), false, false)
    }

    #[test]
    fn test_single_node_pointer_is_whole_collection() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = child_of_root("b");
        let pointer = ctx.single_node_pointer().unwrap().unwrap();
        assert_eq!(pointer.signature(), "BbC");
        assert_eq!(pointer.length(), 3);
    }

    #[test]
    fn test_current_node_pointer_peeks_without_moving() {
        let mut ctx = child_of_root("b");
        assert!(ctx.next_set().unwrap());
        let first = ctx.current_node_pointer().unwrap().unwrap();
        assert_eq!(first.as_path(), "/b[1]");
        assert_eq!(ctx.current_position(), 0);
        assert!(ctx.next_node().unwrap());
        assert!(ctx.set_position(3).unwrap());
        assert_eq!(ctx.current_node_pointer().unwrap().unwrap().as_path(), "/b[3]");
        assert!(!ctx.next_node().unwrap());
    }

    #[test]
    fn test_following_sibling_starts_after_current() {
        let a = child_of_root("a");
        let mut siblings = ChildContext::new(Box::new(a), StepTest::Node, true, false);
        let mut found = Vec::new();
        while siblings.next_set().unwrap() {
            while siblings.next_node().unwrap() {
                found.push(siblings.current_node_pointer().unwrap().unwrap().as_path());
            }
        }
        assert_eq!(found, vec!["/b[1]", "/b[2]", "/b[3]", "/c"]);
    }
}
