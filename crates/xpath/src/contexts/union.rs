use super::{EvalContext, push_unique, sort_pointers};
use crate::error::XPathError;
use crate::pointer::NodePointer;

/// A single set holding the nodes of several contexts, deduplicated. With
/// more than one operand the nodes are put in document order.
///
/// Also used with one operand to flatten a context into one set between
/// consecutive predicates.
pub(crate) struct UnionContext<'a> {
    contexts: Vec<Box<dyn EvalContext + 'a>>,
    pointers: Vec<NodePointer>,
    prepared: bool,
    started: bool,
    position: usize,
}

impl<'a> UnionContext<'a> {
    pub(crate) fn new(contexts: Vec<Box<dyn EvalContext + 'a>>) -> Self {
        Self {
            contexts,
            pointers: Vec::new(),
            prepared: false,
            started: false,
            position: 0,
        }
    }

    /// A node set known up front, kept in the given order.
    pub(crate) fn of_pointers(pointers: Vec<NodePointer>) -> Self {
        Self {
            contexts: Vec::new(),
            pointers,
            prepared: true,
            started: false,
            position: 0,
        }
    }

    fn prepare(&mut self) -> Result<(), XPathError> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;
        let mut pointers = Vec::new();
        for context in &mut self.contexts {
            while context.next_set()? {
                while context.next_node()? {
                    if let Some(pointer) = context.current_node_pointer()? {
                        push_unique(&mut pointers, pointer);
                    }
                }
            }
        }
        let order = self.document_order();
        if order != 0 {
            sort_pointers(&mut pointers, order);
        }
        log::trace!("Union collected {} node(s)", pointers.len());
        self.pointers = pointers;
        Ok(())
    }
}

impl EvalContext for UnionContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 && !self.set_position(1)? {
            return Ok(None);
        }
        Ok(self.pointers.get(self.position - 1).cloned())
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
        self.prepare()?;
        self.position = position;
        Ok(position >= 1 && position <= self.pointers.len())
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn document_order(&self) -> i32 {
        if self.contexts.len() > 1 { 1 } else { 0 }
    }

    fn single_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        self.prepare()?;
        Ok(self.pointers.first().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::tests::bean_root;
    use crate::contexts::{ChildContext, InitialContext, PointerStream};
    use crate::iter::{NameTest, StepTest};

    fn child(name: &str) -> Box<dyn EvalContext + 'static> {
        let initial = InitialContext::new(Some(bean_root()));
        Box::new(ChildContext::new(Box::new(initial), StepTest::Name(NameTest::new(name)), false, false))
    }

    #[test]
    fn test_union_sorts_and_deduplicates() {
        let _ = env_logger::builder().is_test(true).try_init();
        let union = UnionContext::new(vec![child("c"), child("a"), child("a")]);
        let found: Vec<String> = PointerStream::new(Box::new(union)).map(|p| p.unwrap().as_path()).collect();
        assert_eq!(found, vec!["/a", "/c"]);
    }

    #[test]
    fn test_single_operand_is_one_set() {
        let mut union = UnionContext::new(vec![child("b")]);
        assert!(union.next_set().unwrap());
        assert!(union.set_position(3).unwrap());
        assert_eq!(union.current_node_pointer().unwrap().unwrap().as_path(), "/b[3]");
        assert!(!union.next_node().unwrap());
        assert!(!union.next_set().unwrap());
        assert_eq!(union.single_node_pointer().unwrap().unwrap().as_path(), "/b[1]");
    }
}
