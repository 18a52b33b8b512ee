//! A small mutable XML document model.
//!
//! Nodes live in an arena owned by the `Document`; a `DomNode` is a shared
//! handle to the document plus a node id. Detached nodes stay in the arena
//! but are no longer reachable from the root.

use crate::error::ModelError;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local_part: String,
    pub namespace_uri: Option<String>,
}

impl QName {
    pub fn local(local_part: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_part: local_part.into(),
            namespace_uri: None,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => write!(f, "{}", self.local_part),
        }
    }
}

#[derive(Debug)]
struct NodeData {
    kind: NodeType,
    name: Option<QName>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<usize>,
}

impl NodeData {
    fn new(kind: NodeType, name: Option<QName>, value: String, parent: Option<usize>) -> Self {
        Self {
            kind,
            name,
            value,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
}

impl Document {
    fn push(&self, data: NodeData) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        nodes.len() - 1
    }
}

/// A handle to one node of a [`Document`].
#[derive(Clone)]
pub struct DomNode {
    doc: Rc<Document>,
    id: usize,
}

impl DomNode {
    /// Creates an empty document and returns its root node.
    pub fn new_document() -> Self {
        let doc = Rc::new(Document {
            nodes: RefCell::new(vec![NodeData::new(NodeType::Root, None, String::new(), None)]),
        });
        DomNode { doc, id: 0 }
    }

    /// Parses XML text into a new document and returns its root node.
    /// Whitespace-only text nodes are dropped.
    pub fn parse(xml: &str) -> Result<Self, ModelError> {
        let parsed = roxmltree::Document::parse(xml).map_err(|e| ModelError::XmlParse(e.to_string()))?;
        let root = Self::new_document();
        for child in parsed.root().children() {
            root.import(child);
        }
        log::debug!("Parsed XML document with {} nodes", root.doc.nodes.borrow().len());
        Ok(root)
    }

    fn import(&self, node: roxmltree::Node<'_, '_>) {
        if node.is_element() {
            let tag = node.tag_name();
            let name = QName {
                prefix: tag.namespace().and_then(|ns| node.lookup_prefix(ns)).map(str::to_string),
                local_part: tag.name().to_string(),
                namespace_uri: tag.namespace().map(str::to_string),
            };
            let element = self.append(NodeType::Element, Some(name), String::new());
            for attr in node.attributes() {
                let prefix = match attr.namespace() {
                    Some(XML_NAMESPACE) => Some("xml".to_string()),
                    Some(ns) => node.lookup_prefix(ns).map(str::to_string),
                    None => None,
                };
                let name = QName {
                    prefix,
                    local_part: attr.name().to_string(),
                    namespace_uri: attr.namespace().map(str::to_string),
                };
                element.push_attribute(name, attr.value().to_string());
            }
            for child in node.children() {
                element.import(child);
            }
        } else if node.is_text() {
            let text = node.text().unwrap_or_default();
            if !text.trim().is_empty() {
                self.append(NodeType::Text, None, text.to_string());
            }
        } else if node.is_comment() {
            self.append(NodeType::Comment, None, node.text().unwrap_or_default().to_string());
        } else if let Some(pi) = node.pi() {
            self.append(
                NodeType::ProcessingInstruction,
                Some(QName::local(pi.target)),
                pi.value.unwrap_or_default().to_string(),
            );
        }
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        f(&self.doc.nodes.borrow()[self.id])
    }

    fn handle(&self, id: usize) -> DomNode {
        DomNode {
            doc: self.doc.clone(),
            id,
        }
    }

    fn append(&self, kind: NodeType, name: Option<QName>, value: String) -> DomNode {
        let id = self.doc.push(NodeData::new(kind, name, value, Some(self.id)));
        self.doc.nodes.borrow_mut()[self.id].children.push(id);
        self.handle(id)
    }

    fn push_attribute(&self, name: QName, value: String) -> DomNode {
        let id = self.doc.push(NodeData::new(NodeType::Attribute, Some(name), value, Some(self.id)));
        self.doc.nodes.borrow_mut()[self.id].attributes.push(id);
        self.handle(id)
    }

    pub fn node_type(&self) -> NodeType {
        self.with_data(|d| d.kind)
    }

    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    pub fn name(&self) -> Option<QName> {
        self.with_data(|d| d.name.clone())
    }

    pub fn local_name(&self) -> String {
        self.with_data(|d| d.name.as_ref().map(|n| n.local_part.clone()).unwrap_or_default())
    }

    pub fn namespace_uri(&self) -> Option<String> {
        self.with_data(|d| d.name.as_ref().and_then(|n| n.namespace_uri.clone()))
    }

    /// The XPath string-value: concatenated descendant text for elements and
    /// the root, the node's own text otherwise.
    pub fn string_value(&self) -> String {
        match self.node_type() {
            NodeType::Root | NodeType::Element => {
                let mut out = String::new();
                self.collect_text(&mut out);
                out
            }
            _ => self.with_data(|d| d.value.clone()),
        }
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.children() {
            match child.node_type() {
                NodeType::Text => child.with_data(|d| out.push_str(&d.value)),
                NodeType::Element => child.collect_text(out),
                _ => {}
            }
        }
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.with_data(|d| d.children.clone())
            .into_iter()
            .map(|id| self.handle(id))
            .collect()
    }

    pub fn attributes(&self) -> Vec<DomNode> {
        self.with_data(|d| d.attributes.clone())
            .into_iter()
            .map(|id| self.handle(id))
            .collect()
    }

    /// Value of the first attribute with the given local name.
    pub fn attribute(&self, local_name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|a| a.local_name() == local_name)
            .map(|a| a.string_value())
    }

    pub fn parent(&self) -> Option<DomNode> {
        self.with_data(|d| d.parent).map(|id| self.handle(id))
    }

    pub fn root(&self) -> DomNode {
        self.handle(0)
    }

    pub fn append_element(&self, name: &str) -> DomNode {
        let qname = match name.split_once(':') {
            Some((prefix, local)) => QName {
                prefix: Some(prefix.to_string()),
                local_part: local.to_string(),
                namespace_uri: self.resolve_prefix(prefix),
            },
            None => QName::local(name),
        };
        self.append(NodeType::Element, Some(qname), String::new())
    }

    pub fn append_text(&self, text: &str) -> DomNode {
        self.append(NodeType::Text, None, text.to_string())
    }

    /// Sets an attribute by local name, creating it when absent.
    pub fn set_attribute(&self, name: &str, value: &str) -> DomNode {
        match self.attributes().into_iter().find(|a| a.local_name() == name) {
            Some(attr) => {
                attr.set_text(value);
                attr
            }
            None => self.push_attribute(QName::local(name), value.to_string()),
        }
    }

    /// Replaces the node's text. For elements, all children are replaced
    /// by a single text node.
    pub fn set_text(&self, text: &str) {
        match self.node_type() {
            NodeType::Root | NodeType::Element => {
                for child in self.children() {
                    child.detach();
                }
                if !text.is_empty() {
                    self.append_text(text);
                }
            }
            _ => self.doc.nodes.borrow_mut()[self.id].value = text.to_string(),
        }
    }

    /// Unlinks the node from its parent.
    pub fn detach(&self) {
        let Some(parent) = self.with_data(|d| d.parent) else {
            return;
        };
        let mut nodes = self.doc.nodes.borrow_mut();
        let parent = &mut nodes[parent];
        parent.children.retain(|&c| c != self.id);
        parent.attributes.retain(|&a| a != self.id);
        nodes[self.id].parent = None;
    }

    /// The nearest `xml:lang` in scope.
    pub fn language(&self) -> Option<String> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let lang = node
                .attributes()
                .into_iter()
                .find(|a| a.local_name() == "lang" && a.namespace_uri().as_deref() == Some(XML_NAMESPACE));
            if let Some(lang) = lang {
                return Some(lang.string_value());
            }
            current = node.parent();
        }
        None
    }

    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if let Some(name) = node.name().filter(|n| n.prefix.as_deref() == Some(prefix)) {
                return name.namespace_uri;
            }
            current = node.parent();
        }
        None
    }

    /// 1-based position among preceding siblings of the same kind. Elements
    /// are counted by name, text nodes among text nodes.
    pub fn sibling_index(&self) -> usize {
        let Some(parent) = self.parent() else {
            return 1;
        };
        let kind = self.node_type();
        let name = self.name();
        let mut index = 0;
        for sibling in parent.children() {
            if sibling.node_type() == kind && (kind != NodeType::Element || sibling.name() == name) {
                index += 1;
            }
            if sibling == *self {
                break;
            }
        }
        index.max(1)
    }

    /// First element in the document whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<DomNode> {
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if node.is_element() && node.attribute("id").as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(node.children().into_iter().rev());
        }
        None
    }

    pub fn same_document(&self, other: &DomNode) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc)
    }

    fn order_key(&self) -> Vec<(u8, usize)> {
        let nodes = self.doc.nodes.borrow();
        let mut key = Vec::new();
        let mut id = self.id;
        while let Some(parent) = nodes[id].parent {
            let data = &nodes[parent];
            let entry = match data.attributes.iter().position(|&a| a == id) {
                Some(i) => (0, i),
                None => (1, data.children.iter().position(|&c| c == id).unwrap_or(0)),
            };
            key.push(entry);
            id = parent;
        }
        key.reverse();
        key
    }

    /// Document order. Attributes sort before children; nodes from different
    /// documents compare equal.
    pub fn compare_document_order(&self, other: &DomNode) -> Ordering {
        if !self.same_document(other) {
            return Ordering::Equal;
        }
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc) && self.id == other.id
    }
}

impl Eq for DomNode {}

impl Hash for DomNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.doc) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.node_type(), self.name()) {
            (NodeType::Root, _) => write!(f, "DomNode(/)"),
            (NodeType::Attribute, Some(name)) => write!(f, "DomNode(@{})", name),
            (_, Some(name)) => write!(f, "DomNode(<{}>)", name),
            (kind, None) => write!(f, "DomNode({:?} {:?})", kind, self.string_value()),
        }
    }
}
