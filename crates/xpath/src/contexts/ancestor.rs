use super::{EvalContext, SetCursor};
use crate::error::XPathError;
use crate::iter::StepTest;
use crate::pointer::NodePointer;

/// The `ancestor` and `ancestor-or-self` axes, nearest first. Every link
/// of the chain is visited, containers included.
pub(crate) struct AncestorContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    include_self: bool,
    current: Option<NodePointer>,
    started: bool,
    position: usize,
    cursor: SetCursor,
}

impl<'a> AncestorContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest, include_self: bool) -> Self {
        Self {
            parent,
            test,
            include_self,
            current: None,
            started: false,
            position: 0,
            cursor: SetCursor::default(),
        }
    }
}

impl EvalContext for AncestorContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.current.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        if !self.started {
            self.started = true;
            self.current = self.parent.current_node_pointer()?;
            if self.include_self && self.current.as_ref().is_some_and(|p| p.test_node(&self.test)) {
                self.position += 1;
                return Ok(true);
            }
        }
        loop {
            self.current = self
                .current
                .as_ref()
                .and_then(|p| p.immediate_parent().cloned());
            match &self.current {
                None => return Ok(false),
                Some(p) if p.test_node(&self.test) => {
                    self.position += 1;
                    return Ok(true);
                }
                Some(_) => {}
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
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::{ChildContext, InitialContext, PointerStream, ParentContext};
    use crate::iter::NameTest;
    use crate::pointer::PointerEnv;
    use objpath_model::{Record, Value};
    use std::rc::Rc;

    fn deep_child() -> Box<dyn EvalContext + 'static> {
        let inner = Record::new("Inner").with("leaf", 5);
        let outer = Record::new("Outer").with("inner", Value::object(inner));
        let root = NodePointer::root(Value::object(outer), Rc::new(PointerEnv::default()));
        let initial = InitialContext::new(Some(root));
        let inner = ChildContext::new(Box::new(initial), StepTest::Name(NameTest::new("inner")), false, false);
        Box::new(ChildContext::new(Box::new(inner), StepTest::Name(NameTest::new("leaf")), false, false))
    }

    #[test]
    fn test_ancestors_by_name() {
        let _ = env_logger::builder().is_test(true).try_init();
        let ctx = AncestorContext::new(deep_child(), StepTest::Name(NameTest::new("inner")), false);
        let found: Vec<String> = PointerStream::new(Box::new(ctx)).map(|p| p.unwrap().as_path()).collect();
        assert_eq!(found, vec!["/inner"]);
    }

    #[test]
    fn test_parent_skips_containers() {
        let ctx = ParentContext::new(deep_child(), StepTest::Node);
        let found: Vec<String> = PointerStream::new(Box::new(ctx)).map(|p| p.unwrap().signature()).collect();
        assert_eq!(found, vec!["BbB"]);
    }
}
