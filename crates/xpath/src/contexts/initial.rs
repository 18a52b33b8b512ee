use super::EvalContext;
use crate::error::XPathError;
use crate::pointer::{ElementIndex, NodePointer};

/// The start of a context chain: a single pointer, or every element of it
/// when the pointer addresses a whole collection.
pub(crate) struct InitialContext {
    pointer: Option<NodePointer>,
    collection: bool,
    position: usize,
    started: bool,
}

impl InitialContext {
    pub(crate) fn new(pointer: Option<NodePointer>) -> Self {
        let collection = pointer.as_ref().is_some_and(|p| p.index().is_whole());
        Self {
            pointer,
            collection,
            position: 0,
            started: false,
        }
    }
}

impl EvalContext for InitialContext {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.pointer.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        self.set_position(self.position + 1)
    }

    fn next_set(&mut self) -> Result<bool, XPathError> {
        if self.started {
            return Ok(false);
        }
        self.started = true;
        Ok(true)
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        self.position = position;
        let Some(pointer) = self.pointer.as_mut() else {
            return Ok(false);
        };
        if !self.collection {
            return Ok(position == 1);
        }
        if position >= 1 && position <= pointer.length() {
            pointer.set_index(ElementIndex::At(position - 1));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn single_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.pointer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use crate::pointer::VariableScope;
    use indexmap::IndexMap;
    use objpath_model::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_whole_collection_iterates_elements() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut vars = IndexMap::new();
        vars.insert("list".to_string(), Value::list(vec!["x".into(), "y".into()]));
        let scope: VariableScope = Rc::new(RefCell::new(vars));
        let var = NodePointer::variable("list", scope, Rc::new(PointerEnv::default()));
        let mut ctx = InitialContext::new(Some(var));
        assert!(ctx.next_set().unwrap());
        let mut values = Vec::new();
        while ctx.next_node().unwrap() {
            values.push(ctx.current_node_pointer().unwrap().unwrap().value().unwrap());
        }
        assert_eq!(values, vec![Value::from("x"), Value::from("y")]);
        assert!(!ctx.next_set().unwrap());
    }

    #[test]
    fn test_missing_pointer_is_empty() {
        let mut ctx = InitialContext::new(None);
        assert!(ctx.next_set().unwrap());
        assert!(!ctx.next_node().unwrap());
        assert!(ctx.single_node_pointer().unwrap().is_none());
    }
}
