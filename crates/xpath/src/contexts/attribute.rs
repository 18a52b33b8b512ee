use super::{EvalContext, SetCursor, inherited_order};
use crate::error::XPathError;
use crate::iter::{NodeIterator, StepTest};
use crate::pointer::NodePointer;

/// The `attribute` axis.
pub(crate) struct AttributeContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    test: StepTest,
    iterator: Option<Box<dyn NodeIterator>>,
    started: bool,
    current: Option<NodePointer>,
    position: usize,
    cursor: SetCursor,
}

impl<'a> AttributeContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, test: StepTest) -> Self {
        Self {
            parent,
            test,
            iterator: None,
            started: false,
            current: None,
            position: 0,
            cursor: SetCursor::default(),
        }
    }
}

impl EvalContext for AttributeContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.current.clone())
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        self.position += 1;
        if !self.started {
            self.started = true;
            let Some(name) = self.test.attribute_name() else {
                return Ok(false);
            };
            self.iterator = match self.parent.current_node_pointer()? {
                Some(owner) => owner.attribute_iterator(&name)?,
                None => None,
            };
        }
        let Some(iterator) = self.iterator.as_mut() else {
            return Ok(false);
        };
        if !iterator.set_position(iterator.position() + 1)? {
            return Ok(false);
        }
        self.current = iterator.node_pointer()?;
        Ok(true)
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
        self.started = false;
        self.iterator = None;
        self.position = 0;
    }

    fn document_order(&self) -> i32 {
        inherited_order(self.parent.as_ref())
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

    fn attributes(root: Value, test: StepTest) -> Vec<String> {
        let root = NodePointer::root(root, Rc::new(PointerEnv::default()));
        let ctx = AttributeContext::new(Box::new(InitialContext::new(Some(root))), test);
        PointerStream::new(Box::new(ctx))
            .map(|p| p.unwrap().value().unwrap().as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_dom_and_bean_attributes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let doc = DomNode::parse(r#"<r id="7" kind="k"/>"#).unwrap();
        let element = doc.children().remove(0);
        assert_eq!(attributes(Value::Node(element.clone()), StepTest::Node), vec!["7", "k"]);
        assert_eq!(attributes(Value::Node(element), StepTest::Name(NameTest::new("kind"))), vec!["k"]);

        let bean = Record::new("Tagged").with_attribute("id", "b1").with("body", "text");
        assert_eq!(attributes(Value::object(bean), StepTest::Name(NameTest::wildcard())), vec!["b1"]);
    }

    #[test]
    fn test_type_tests_select_no_attributes() {
        let doc = DomNode::parse(r#"<r id="7"/>"#).unwrap();
        let element = doc.children().remove(0);
        assert!(attributes(Value::Node(element), StepTest::Text).is_empty());
    }
}
