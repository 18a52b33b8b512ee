use super::{EvalContext, SetCursor};
use crate::error::XPathError;
use crate::iter::{NodeIterator, StepTest};
use crate::pointer::NodePointer;

/// The `following` and `preceding` axes. Starting at the context node, the
/// walk visits the subtrees of later (or earlier) siblings, then climbs one
/// level and repeats until it reaches the root.
pub(crate) struct PrecedingOrFollowingContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    reverse: bool,
    stack: Vec<Box<dyn NodeIterator>>,
    root_location: Option<NodePointer>,
    current: Option<NodePointer>,
    started: bool,
    position: usize,
    cursor: SetCursor,
}

impl<'a> PrecedingOrFollowingContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest, reverse: bool) -> Self {
        Self {
            parent,
            test,
            reverse,
            stack: Vec::new(),
            root_location: None,
            current: None,
            started: false,
            position: 0,
            cursor: SetCursor::default(),
        }
    }

    /// Pushes an iterator over the siblings of `location` on the side the
    /// axis walks.
    fn push_siblings(&mut self, location: &NodePointer) -> Result<(), XPathError> {
        if let Some(parent) = location.parent() {
            if let Some(iterator) = parent.child_iterator(&StepTest::Node, self.reverse, Some(location))? {
                self.stack.push(iterator);
            }
        }
        Ok(())
    }

    fn push_children(&mut self, pointer: &NodePointer) -> Result<(), XPathError> {
        if let Some(iterator) = pointer.child_iterator(&StepTest::Node, self.reverse, None)? {
            self.stack.push(iterator);
        }
        Ok(())
    }

    fn accept(&mut self) -> bool {
        if self.current.as_ref().is_some_and(|p| p.test_node(&self.test)) {
            self.position += 1;
            return true;
        }
        false
    }

    /// Forward walk: a node is reported before its subtree.
    fn step_forward(&mut self) -> Result<Option<bool>, XPathError> {
        let Some(top) = self.stack.last_mut() else {
            return Ok(None);
        };
        if !top.set_position(top.position() + 1)? {
            self.stack.pop();
            return Ok(Some(false));
        }
        self.current = top.node_pointer()?;
        if let Some(current) = self.current.clone() {
            if !current.is_leaf() {
                self.push_children(&current)?;
            }
        }
        Ok(Some(self.accept()))
    }

    /// Reverse walk: a node is reported after its subtree.
    fn step_reverse(&mut self) -> Result<Option<bool>, XPathError> {
        let Some(top) = self.stack.last_mut() else {
            return Ok(None);
        };
        if top.set_position(top.position() + 1)? {
            self.current = top.node_pointer()?;
            if let Some(current) = self.current.clone() {
                if !current.is_leaf() {
                    self.push_children(&current)?;
                    return Ok(Some(false));
                }
            }
            return Ok(Some(self.accept()));
        }
        self.stack.pop();
        if let Some(top) = self.stack.last_mut() {
            self.current = top.node_pointer()?;
            return Ok(Some(self.accept()));
        }
        Ok(Some(false))
    }
}

impl EvalContext for PrecedingOrFollowingContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.current.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        if !self.started {
            self.started = true;
            self.stack.clear();
            self.root_location = self.parent.current_node_pointer()?;
            if let Some(location) = self.root_location.clone() {
                self.push_siblings(&location)?;
            }
        }
        loop {
            if self.stack.is_empty() {
                self.root_location = self.root_location.as_ref().and_then(NodePointer::parent);
                match self.root_location.clone() {
                    Some(location) if !location.is_root() => self.push_siblings(&location)?,
                    _ => return Ok(false),
                }
            }
            while !self.stack.is_empty() {
                let found = if self.reverse {
                    self.step_reverse()?
                } else {
                    self.step_forward()?
                };
                if found == Some(true) {
                    return Ok(true);
                }
            }
        }
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
        if self.reverse { -1 } else { 1 }
    }
}
