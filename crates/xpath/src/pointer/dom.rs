//! Pointer to a node of a DOM document (`M`), including attribute nodes.

use super::{ElementIndex, NodePointer, PointerKind, PointerVariant, escape};
use crate::error::XPathError;
use crate::iter::{DomAttributeIterator, DomChildIterator, NameTest, NodeIterator, StepTest};
use crate::value::value_to_string;
use objpath_model::{DomNode, NodeType, PropertyIdentifier, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub(crate) struct DomPointer {
    pub(crate) node: DomNode,
    /// Set when the node was reached through `id()`.
    id: Option<String>,
}

impl DomPointer {
    pub(crate) fn new(node: DomNode, id: Option<String>) -> Self {
        Self { node, id }
    }

    fn relative_position(&self) -> usize {
        self.node.sibling_index()
    }

    /// 1-based position among all element siblings.
    fn element_position(&self) -> usize {
        let Some(parent) = self.node.parent() else {
            return 1;
        };
        parent
            .children()
            .into_iter()
            .filter(DomNode::is_element)
            .position(|c| c == self.node)
            .map_or(1, |p| p + 1)
    }
}

/// Applies a node test to a DOM node.
pub(crate) fn node_matches(node: &DomNode, test: &StepTest) -> bool {
    match test {
        StepTest::Node => true,
        StepTest::Text => node.node_type() == NodeType::Text,
        StepTest::Comment => node.node_type() == NodeType::Comment,
        StepTest::ProcessingInstruction => node.node_type() == NodeType::ProcessingInstruction,
        StepTest::Name(name) => node.is_element() && name_matches(node, name),
    }
}

/// Name comparison shared by elements and attributes. An unregistered
/// prefix falls back to comparing the literal prefixes.
pub(crate) fn name_matches(node: &DomNode, test: &NameTest) -> bool {
    let Some(qname) = node.name() else {
        return false;
    };
    if test.is_wildcard() && test.prefix.is_none() {
        return true;
    }
    if !test.is_wildcard() && test.local != qname.local_part {
        return false;
    }
    test.namespace_uri == qname.namespace_uri
        || (test.namespace_uri.is_none() && test.prefix.is_some() && test.prefix == qname.prefix)
}

impl PointerVariant for DomPointer {
    fn letter(&self) -> char {
        'M'
    }

    fn name(&self, _ptr: &NodePointer) -> Option<PropertyIdentifier> {
        let attribute = match self.node.node_type() {
            NodeType::Element | NodeType::ProcessingInstruction => false,
            NodeType::Attribute => true,
            _ => return None,
        };
        self.node
            .name()
            .map(|q| PropertyIdentifier::new(q.namespace_uri, q.local_part, attribute).with_prefix(q.prefix))
    }

    fn base_value(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Node(self.node.clone()))
    }

    fn immediate_node(&self, _ptr: &NodePointer) -> Result<Value, XPathError> {
        Ok(Value::Node(self.node.clone()))
    }

    fn is_leaf(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(self.node.children().is_empty())
    }

    fn child_iterator(
        &self,
        ptr: &NodePointer,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        Ok(Some(Box::new(DomChildIterator::new(ptr, test, reverse, start_with))))
    }

    fn attribute_iterator(
        &self,
        ptr: &NodePointer,
        name: &NameTest,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        Ok(Some(Box::new(DomAttributeIterator::new(ptr, name))))
    }

    fn test_node(&self, _ptr: &NodePointer, test: &StepTest) -> bool {
        node_matches(&self.node, test)
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        if let Some(id) = &self.id {
            return format!("id('{}')", escape(id));
        }
        let mut buffer = ptr.parent.as_ref().map(|p| p.as_path()).unwrap_or_default();
        let under_dom = ptr
            .parent
            .as_ref()
            .is_some_and(|p| matches!(p.kind, PointerKind::Dom(_)));
        let separate = |buffer: &mut String| {
            if !buffer.ends_with('/') {
                buffer.push('/');
            }
        };
        match self.node.node_type() {
            NodeType::Element if under_dom => {
                separate(&mut buffer);
                match self.node.name() {
                    Some(q) if q.namespace_uri.is_some() && q.prefix.is_none() => {
                        buffer.push_str(&format!("node()[{}]", self.element_position()));
                    }
                    Some(q) => buffer.push_str(&format!("{}[{}]", q, self.relative_position())),
                    None => {}
                }
            }
            NodeType::Attribute => {
                separate(&mut buffer);
                buffer.push('@');
                buffer.push_str(&self.node.name().map(|q| q.to_string()).unwrap_or_default());
            }
            NodeType::Text => {
                separate(&mut buffer);
                buffer.push_str(&format!("text()[{}]", self.relative_position()));
            }
            NodeType::Comment => {
                separate(&mut buffer);
                buffer.push_str(&format!("comment()[{}]", self.relative_position()));
            }
            NodeType::ProcessingInstruction => {
                separate(&mut buffer);
                let target = self.node.local_name();
                buffer.push_str(&format!("processing-instruction('{}')[{}]", target, self.relative_position()));
            }
            _ => {}
        }
        if buffer.is_empty() {
            buffer.push('/');
        }
        buffer
    }

    fn same_target(&self, _ptr: &NodePointer, other: &NodePointer) -> bool {
        matches!(&other.kind, PointerKind::Dom(theirs) if theirs.node == self.node)
    }

    fn compare_children(&self, _ptr: &NodePointer, a: &NodePointer, b: &NodePointer) -> Ordering {
        match (&a.kind, &b.kind) {
            (PointerKind::Dom(a), PointerKind::Dom(b)) => a.node.compare_document_order(&b.node),
            _ => Ordering::Equal,
        }
    }

    fn language(&self, _ptr: &NodePointer) -> Option<String> {
        self.node.language()
    }

    fn set_value(&self, _ptr: &NodePointer, value: Value) -> Result<(), XPathError> {
        self.node.set_text(&value_to_string(&value));
        Ok(())
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        let index = index.collapsed();
        let name = name.ok_or_else(|| XPathError::cannot_create(ptr.as_path(), "a DOM child needs a name"))?;
        let qualified = name.qualified_name();
        let path = format!("{}/{}[{}]", ptr.as_path(), qualified, index + 1);
        let created_by_factory = match &ptr.env.factory {
            Some(factory) => factory.create_object(&Value::Node(self.node.clone()), &qualified, index)?,
            None => false,
        };
        if !created_by_factory {
            let existing = self
                .node
                .children()
                .into_iter()
                .filter(|c| c.is_element() && c.name().is_some_and(|q| q.to_string() == qualified))
                .count();
            for _ in existing..=index {
                self.node.append_element(&qualified);
            }
            log::debug!("Appended elements up to '{}'", path);
        }
        let mut test = NameTest::new(name.local_name());
        if let Some(prefix) = name.prefix() {
            test.prefix = Some(prefix.to_string());
        }
        let mut children = DomChildIterator::new(ptr, &StepTest::Name(test), false, None);
        if children.set_position(index + 1)? {
            if let Some(child) = children.node_pointer()? {
                return Ok(child);
            }
        }
        Err(XPathError::cannot_create(path, "the element could not be created"))
    }

    fn create_attribute(&self, ptr: &NodePointer, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
        if !self.node.is_element() {
            return Err(XPathError::cannot_create(
                format!("{}/@{}", ptr.as_path(), name.qualified_name()),
                "only elements have attributes",
            ));
        }
        let attribute = self
            .node
            .attributes()
            .into_iter()
            .find(|a| a.local_name() == name.local_name())
            .unwrap_or_else(|| self.node.set_attribute(name.local_name(), ""));
        Ok(ptr.dom_child(attribute))
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError> {
        if self.node.parent().is_none() {
            return Err(XPathError::invalid_access(ptr.as_path(), "cannot remove the document root"));
        }
        self.node.detach();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use std::rc::Rc;

    fn document() -> NodePointer {
        let doc = DomNode::parse(
            r#"<shop xml:lang="de"><item sku="1">Apple</item><item sku="2">Pear</item><note>fresh</note></shop>"#,
        )
        .unwrap();
        NodePointer::root(Value::Node(doc), Rc::new(PointerEnv::default()))
    }

    fn child(ptr: &NodePointer, name: &str, position: usize) -> NodePointer {
        let mut it = ptr
            .child_iterator(&StepTest::Name(NameTest::new(name)), false, None)
            .unwrap()
            .unwrap();
        assert!(it.set_position(position).unwrap());
        it.node_pointer().unwrap().unwrap()
    }

    #[test]
    fn test_paths_use_sibling_positions() {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = document();
        assert_eq!(root.as_path(), "/");
        let shop = child(&root, "shop", 1);
        let pear = child(&shop, "item", 2);
        assert_eq!(pear.as_path(), "/shop[1]/item[2]");
        assert_eq!(pear.value().unwrap(), Value::from("Pear"));
        assert_eq!(child(&shop, "note", 1).as_path(), "/shop[1]/note[1]");

        let mut attrs = pear.attribute_iterator(&NameTest::new("sku")).unwrap().unwrap();
        let sku = attrs.node_pointer().unwrap().unwrap();
        assert_eq!(sku.as_path(), "/shop[1]/item[2]/@sku");
        assert!(sku.is_attribute());
    }

    #[test]
    fn test_language_comes_from_ancestors() {
        let root = document();
        let item = child(&child(&root, "shop", 1), "item", 1);
        assert!(item.is_language("de"));
        assert!(!item.is_language("en"));
        assert!(root.is_language("en"));
    }

    #[test]
    fn test_create_child_appends_elements() {
        let root = document();
        let shop = child(&root, "shop", 1);
        let created = shop
            .create_child(Some(&PropertyIdentifier::unqualified("note")), ElementIndex::At(2))
            .unwrap();
        assert_eq!(created.as_path(), "/shop[1]/note[3]");
        let mut created = created;
        created.set_value("late".into()).unwrap();
        assert_eq!(created.value().unwrap(), Value::from("late"));
    }

    #[test]
    fn test_equality_ignores_parent() {
        let root = document();
        let shop = child(&root, "shop", 1);
        let item = child(&shop, "item", 1);
        let Value::Node(node) = item.node().unwrap() else {
            panic!("expected a DOM node");
        };
        let detached = NodePointer::root(Value::Node(node), root.env.clone());
        assert_eq!(item, detached);
    }
}
