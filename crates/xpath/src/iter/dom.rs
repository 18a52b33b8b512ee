use super::{NameTest, NodeIterator, StepTest};
use crate::error::XPathError;
use crate::pointer::{NodePointer, dom_matches, dom_name_matches};
use objpath_model::{DomNode, Value};

fn dom_node(ptr: &NodePointer) -> Option<DomNode> {
    match ptr.node() {
        Ok(Value::Node(node)) => Some(node),
        _ => None,
    }
}

/// Children of a DOM node that pass a node test.
pub(crate) struct DomChildIterator {
    parent: NodePointer,
    children: Vec<DomNode>,
    position: usize,
}

impl DomChildIterator {
    pub(crate) fn new(parent: &NodePointer, test: &StepTest, reverse: bool, start_with: Option<&NodePointer>) -> Self {
        let all = dom_node(parent).map(|n| n.children()).unwrap_or_default();
        let start = start_with.and_then(dom_node);
        let mut children: Vec<DomNode> = match &start {
            Some(start) => {
                let at = all.iter().position(|c| c == start);
                match (at, reverse) {
                    (Some(at), false) => all[at + 1..].to_vec(),
                    (Some(at), true) => all[..at].to_vec(),
                    (None, _) => Vec::new(),
                }
            }
            None => all,
        };
        if reverse {
            children.reverse();
        }
        children.retain(|c| dom_matches(c, test));
        Self {
            parent: parent.clone(),
            children,
            position: 0,
        }
    }
}

impl NodeIterator for DomChildIterator {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        self.position = position;
        Ok(position >= 1 && position <= self.children.len())
    }

    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        let child = self.children.get(self.position.max(1) - 1).cloned();
        Ok(child.map(|c| self.parent.dom_child(c)))
    }
}

/// Attributes of a DOM element, excluding namespace declarations.
pub(crate) struct DomAttributeIterator {
    parent: NodePointer,
    attributes: Vec<DomNode>,
    position: usize,
}

impl DomAttributeIterator {
    pub(crate) fn new(parent: &NodePointer, name: &NameTest) -> Self {
        let attributes = dom_node(parent)
            .filter(DomNode::is_element)
            .map(|node| node.attributes())
            .unwrap_or_default()
            .into_iter()
            .filter(|a| !is_namespace_declaration(a) && dom_name_matches(a, name))
            .collect();
        Self {
            parent: parent.clone(),
            attributes,
            position: 0,
        }
    }
}

fn is_namespace_declaration(attribute: &DomNode) -> bool {
    attribute
        .name()
        .is_some_and(|q| q.prefix.as_deref() == Some("xmlns") || (q.prefix.is_none() && q.local_part == "xmlns"))
}

impl NodeIterator for DomAttributeIterator {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        self.position = position;
        Ok(position >= 1 && position <= self.attributes.len())
    }

    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        let attribute = self.attributes.get(self.position.max(1) - 1).cloned();
        Ok(attribute.map(|a| self.parent.dom_child(a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use std::rc::Rc;

    fn root() -> NodePointer {
        let doc = DomNode::parse(r#"<r a="1" b="2"><x/>text<y/><x/><!--c--></r>"#).unwrap();
        let root = NodePointer::root(Value::Node(doc), Rc::new(PointerEnv::default()));
        let mut it = DomChildIterator::new(&root, &StepTest::Node, false, None);
        it.node_pointer().unwrap().unwrap()
    }

    fn paths(mut it: impl NodeIterator) -> Vec<String> {
        let mut out = Vec::new();
        let mut position = 1;
        while it.set_position(position).unwrap() {
            out.push(it.node_pointer().unwrap().unwrap().as_path());
            position += 1;
        }
        out
    }

    #[test]
    fn test_child_tests_and_direction() {
        let _ = env_logger::builder().is_test(true).try_init();
        let r = root();
        assert_eq!(
            paths(DomChildIterator::new(&r, &StepTest::Name(NameTest::new("x")), false, None)),
            vec!["/r[1]/x[1]", "/r[1]/x[2]"]
        );
        assert_eq!(
            paths(DomChildIterator::new(&r, &StepTest::Name(NameTest::wildcard()), true, None)),
            vec!["/r[1]/x[2]", "/r[1]/y[1]", "/r[1]/x[1]"]
        );
        assert_eq!(paths(DomChildIterator::new(&r, &StepTest::Text, false, None)), vec!["/r[1]/text()[1]"]);
        assert_eq!(paths(DomChildIterator::new(&r, &StepTest::Comment, false, None)), vec!["/r[1]/comment()[1]"]);
    }

    #[test]
    fn test_start_with_selects_siblings() {
        let r = root();
        let mut ys = DomChildIterator::new(&r, &StepTest::Name(NameTest::new("y")), false, None);
        let y = ys.node_pointer().unwrap().unwrap();
        let following = DomChildIterator::new(&r, &StepTest::Node, false, Some(&y));
        assert_eq!(paths(following), vec!["/r[1]/x[2]", "/r[1]/comment()[1]"]);
        let preceding = DomChildIterator::new(&r, &StepTest::Node, true, Some(&y));
        assert_eq!(paths(preceding), vec!["/r[1]/text()[1]", "/r[1]/x[1]"]);
    }

    #[test]
    fn test_attributes() {
        let r = root();
        assert_eq!(paths(DomAttributeIterator::new(&r, &NameTest::wildcard())), vec!["/r[1]/@a", "/r[1]/@b"]);
        assert_eq!(paths(DomAttributeIterator::new(&r, &NameTest::new("b"))), vec!["/r[1]/@b"]);
        assert!(paths(DomAttributeIterator::new(&r, &NameTest::new("zz"))).is_empty());
    }
}
