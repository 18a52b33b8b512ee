use super::{EvalContext, SetCursor, inherited_order};
use crate::error::XPathError;
use crate::iter::StepTest;
use crate::pointer::NodePointer;

/// The `self` axis: the parent's current node, if it passes the test.
pub(crate) struct SelfContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    pointer: Option<NodePointer>,
    started: bool,
    position: usize,
    cursor: SetCursor,
}

impl<'a> SelfContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest) -> Self {
        Self {
            parent,
            test,
            pointer: None,
            started: false,
            position: 0,
            cursor: SetCursor::default(),
        }
    }
}

impl EvalContext for SelfContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 && !self.set_position(1)? {
            return Ok(None);
        }
        Ok(self.pointer.clone())
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
        if position != 1 {
            return Ok(false);
        }
        self.position = position;
        if !self.started {
            self.started = true;
            self.pointer = self.parent.current_node_pointer()?;
        }
        Ok(self.pointer.as_ref().is_some_and(|p| p.test_node(&self.test)))
    }

    fn reset(&mut self) {
        self.position = 0;
        self.started = false;
    }

    fn document_order(&self) -> i32 {
        inherited_order(self.parent.as_ref())
    }

    fn single_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        self.parent.single_node_pointer()
    }
}
