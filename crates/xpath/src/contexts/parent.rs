use super::{EvalContext, SetCursor};
use crate::error::XPathError;
use crate::iter::StepTest;
use crate::pointer::NodePointer;

/// The `parent` axis. Containers are skipped, so the parent of a
/// property value is the object that owns the property.
pub(crate) struct ParentContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    current: Option<NodePointer>,
    started: bool,
    position: usize,
    cursor: SetCursor,
}

impl<'a> ParentContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest) -> Self {
        Self {
            parent,
            test,
            current: None,
            started: false,
            position: 0,
            cursor: SetCursor::default(),
        }
    }
}

impl EvalContext for ParentContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.current.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        if self.started {
            return Ok(false);
        }
        self.started = true;
        self.current = self.parent.current_node_pointer()?.and_then(|p| p.parent());
        if self.current.as_ref().is_some_and(|p| p.test_node(&self.test)) {
            self.position += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn next_set(&mut self) -> Result<bool, XPathError> {
        self.reset();
        self.cursor.advance(self.parent.as_mut())
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        if position == 1 && !self.started {
            return self.next_node();
        }
        Ok(position == 1 && self.position == 1)
    }

    fn reset(&mut self) {
        self.position = 0;
        self.started = false;
    }

    fn document_order(&self) -> i32 {
        -1
    }
}
