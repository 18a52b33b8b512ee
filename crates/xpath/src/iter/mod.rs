//! Random-access cursors over the children or attributes of one pointer.

mod collection;
mod dom;
mod property;

pub(crate) use collection::CollectionChildIterator;
pub(crate) use dom::{DomAttributeIterator, DomChildIterator};
pub(crate) use property::PropertyIterator;

use crate::ast::{NodeTest, NodeTypeTest};
use crate::error::XPathError;
use crate::pointer::NodePointer;
use indexmap::IndexMap;

/// A cursor with 1-based positions. Position 0 means "before the first".
pub trait NodeIterator {
    fn position(&self) -> usize;

    /// Moves to `position`, returning false when nothing is there.
    fn set_position(&mut self, position: usize) -> Result<bool, XPathError>;

    /// The pointer at the current position; position 0 reads as 1.
    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError>;
}

/// A name test with its prefix resolved against the registered namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTest {
    pub prefix: Option<String>,
    /// Local name, or `*`.
    pub local: String,
    /// `None` when there is no prefix or the prefix is not registered.
    pub namespace_uri: Option<String>,
}

impl NameTest {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace_uri: None,
        }
    }

    pub fn wildcard() -> Self {
        Self::new("*")
    }

    pub fn is_wildcard(&self) -> bool {
        self.local == "*"
    }

    /// Parses `p:local`, `p:*` or `local`.
    pub fn resolve(name: &str, namespaces: &IndexMap<String, String>) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
                namespace_uri: namespaces.get(prefix).cloned(),
            },
            None => Self::new(name),
        }
    }
}

/// A node test ready to be applied to pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTest {
    Name(NameTest),
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

impl StepTest {
    pub fn resolve(test: &NodeTest, namespaces: &IndexMap<String, String>) -> Self {
        match test {
            NodeTest::Name(name) => StepTest::Name(NameTest::resolve(name, namespaces)),
            NodeTest::Wildcard => StepTest::Name(NameTest::wildcard()),
            NodeTest::NodeType(NodeTypeTest::Node) => StepTest::Node,
            NodeTest::NodeType(NodeTypeTest::Text) => StepTest::Text,
            NodeTest::NodeType(NodeTypeTest::Comment) => StepTest::Comment,
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction) => StepTest::ProcessingInstruction,
        }
    }

    /// The name to look up on the attribute axis. Type tests other than
    /// `node()` select no attributes.
    pub fn attribute_name(&self) -> Option<NameTest> {
        match self {
            StepTest::Name(name) => Some(name.clone()),
            StepTest::Node => Some(NameTest::wildcard()),
            _ => None,
        }
    }
}

/// Iterates a list of pointers collected up front.
#[derive(Debug, Default)]
pub(crate) struct PointerListIterator {
    pointers: Vec<NodePointer>,
    position: usize,
}

impl PointerListIterator {
    pub(crate) fn new(pointers: Vec<NodePointer>) -> Self {
        Self { pointers, position: 0 }
    }
}

impl NodeIterator for PointerListIterator {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        self.position = position;
        Ok(position >= 1 && position <= self.pointers.len())
    }

    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 && !self.set_position(1)? {
            return Ok(None);
        }
        Ok(self.pointers.get(self.position.wrapping_sub(1)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefixed_name() {
        let mut namespaces = IndexMap::new();
        namespaces.insert("v".to_string(), "urn:vendor".to_string());
        let test = NameTest::resolve("v:item", &namespaces);
        assert_eq!(test.prefix.as_deref(), Some("v"));
        assert_eq!(test.local, "item");
        assert_eq!(test.namespace_uri.as_deref(), Some("urn:vendor"));

        let unknown = NameTest::resolve("x:*", &namespaces);
        assert!(unknown.is_wildcard());
        assert_eq!(unknown.namespace_uri, None);
    }

    #[test]
    fn test_attribute_name_of_type_tests() {
        assert_eq!(StepTest::Node.attribute_name(), Some(NameTest::wildcard()));
        assert_eq!(StepTest::Text.attribute_name(), None);
    }

    #[test]
    fn test_empty_list_iterator() {
        let mut it = PointerListIterator::default();
        assert!(!it.set_position(1).unwrap());
        assert!(it.node_pointer().unwrap().is_none());
    }
}
