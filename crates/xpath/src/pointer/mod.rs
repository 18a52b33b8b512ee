//! Node pointers: positions in an object graph that path expressions walk,
//! read and write.
//!
//! A pointer is a chain of links back to the root. Each link has a kind
//! (bean, property of a bean, map, map entry, collection, DOM node, variable
//! or one of the null kinds for locations that do not exist yet) and an
//! element index selecting one element of a collection-valued location.

mod beans;
mod collection;
mod dom;
mod dynamic;
mod null;
mod order;
mod variable;

pub(crate) use beans::{BeanNode, BeanProperty};
pub(crate) use collection::CollectionNode;
pub(crate) use dom::{DomPointer, name_matches as dom_name_matches, node_matches as dom_matches};
pub(crate) use dynamic::{DynamicNode, DynamicProperty};
pub(crate) use null::{NullElement, NullNode, NullProperty};
pub use order::sort_in_document_order;
pub(crate) use variable::VariableRef;

use crate::error::XPathError;
use crate::iter::{NameTest, NodeIterator, StepTest};
use indexmap::IndexMap;
use objpath_model::{DomNode, Introspector, ObjectFactory, PropertyIdentifier, Value};
use std::cell::{OnceCell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Variables visible to pointers, shared between a context and its
/// relative contexts.
pub type VariableScope = Rc<RefCell<IndexMap<String, Value>>>;

/// Selects either a whole location or one element of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementIndex {
    Whole,
    At(usize),
}

impl ElementIndex {
    /// The index with `Whole` read as element 0.
    pub fn collapsed(self) -> usize {
        match self {
            ElementIndex::Whole => 0,
            ElementIndex::At(i) => i,
        }
    }

    pub fn is_whole(self) -> bool {
        self == ElementIndex::Whole
    }
}

/// Settings shared by every pointer of one evaluation.
#[derive(Debug)]
pub struct PointerEnv {
    pub introspector: Rc<Introspector>,
    /// Fallback language for `lang()` when no node declares one.
    pub language: String,
    pub factory: Option<Rc<dyn ObjectFactory>>,
}

impl PointerEnv {
    pub fn new(introspector: Rc<Introspector>) -> Self {
        Self {
            introspector,
            language: "en".to_string(),
            factory: None,
        }
    }

    pub(crate) fn factory(&self, path: &str) -> Result<&dyn ObjectFactory, XPathError> {
        self.factory
            .as_deref()
            .ok_or_else(|| XPathError::cannot_create(path, "no object factory is configured"))
    }
}

impl Default for PointerEnv {
    fn default() -> Self {
        Self::new(Rc::new(Introspector::new()))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PointerKind {
    Bean(BeanNode),
    BeanProperty(BeanProperty),
    Dynamic(DynamicNode),
    DynamicProperty(DynamicProperty),
    Collection(CollectionNode),
    Dom(DomPointer),
    Null(NullNode),
    NullProperty(NullProperty),
    NullElement(NullElement),
    Variable(VariableRef),
}

/// Behavior that differs between pointer kinds. Every method receives the
/// pointer that owns the variant so shared state (parent, index, cache) is
/// reachable.
pub(crate) trait PointerVariant {
    /// One-letter code used in pointer signatures.
    fn letter(&self) -> char;

    fn name(&self, ptr: &NodePointer) -> Option<PropertyIdentifier>;

    /// The value at this location before the element index is applied.
    fn base_value(&self, ptr: &NodePointer) -> Result<Value, XPathError>;

    fn immediate_node(&self, ptr: &NodePointer) -> Result<Value, XPathError> {
        let base = ptr.base_value()?;
        Ok(match ptr.index {
            ElementIndex::Whole => base,
            ElementIndex::At(i) => base.element(i),
        })
    }

    fn length(&self, _ptr: &NodePointer) -> Result<usize, XPathError> {
        Ok(1)
    }

    fn is_collection(&self, _ptr: &NodePointer) -> Result<bool, XPathError> {
        Ok(false)
    }

    /// Containers hold a value without being a node themselves; the value
    /// pointer below them is the node.
    fn is_container(&self, _ptr: &NodePointer) -> bool {
        false
    }

    fn is_leaf(&self, ptr: &NodePointer) -> Result<bool, XPathError> {
        let node = ptr.node()?;
        Ok(node.is_null() || ptr.env.introspector.is_atomic(&node))
    }

    /// Whether the addressed entity exists, ignoring the element index.
    fn exists(&self, _ptr: &NodePointer) -> bool {
        true
    }

    /// Like `exists`, but a map entry counts as soon as its key is known.
    fn declared(&self, ptr: &NodePointer) -> bool {
        self.exists(ptr)
    }

    /// The next pointer in the value-pointer chain, `None` for self.
    fn value_pointer(&self, _ptr: &NodePointer) -> Result<Option<NodePointer>, XPathError> {
        Ok(None)
    }

    fn child_iterator(
        &self,
        ptr: &NodePointer,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        match self.value_pointer(ptr)? {
            Some(_) => ptr.value_pointer()?.child_iterator(test, reverse, start_with),
            None => Ok(None),
        }
    }

    fn attribute_iterator(
        &self,
        ptr: &NodePointer,
        name: &NameTest,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        match self.value_pointer(ptr)? {
            Some(_) => ptr.value_pointer()?.attribute_iterator(name),
            None => Ok(None),
        }
    }

    fn test_node(&self, ptr: &NodePointer, test: &StepTest) -> bool {
        ptr.default_test_node(test)
    }

    fn as_path(&self, ptr: &NodePointer) -> String {
        ptr.default_path()
    }

    /// Structural equality with another pointer of the same kind.
    fn same_target(&self, ptr: &NodePointer, other: &NodePointer) -> bool;

    /// Orders two children of `ptr` in document order.
    fn compare_children(&self, _ptr: &NodePointer, _a: &NodePointer, _b: &NodePointer) -> Ordering {
        Ordering::Equal
    }

    /// The `xml:lang` declared at this location, if any.
    fn language(&self, _ptr: &NodePointer) -> Option<String> {
        None
    }

    fn set_value(&self, ptr: &NodePointer, value: Value) -> Result<(), XPathError>;

    fn create_path(&self, ptr: &NodePointer) -> Result<NodePointer, XPathError> {
        Ok(ptr.fresh())
    }

    fn create_path_with_value(&self, ptr: &NodePointer, value: Value) -> Result<NodePointer, XPathError> {
        let mut created = self.create_path(ptr)?;
        created.set_value(value)?;
        Ok(created)
    }

    fn create_child(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        let _ = (name, index);
        Err(XPathError::cannot_create(
            ptr.as_path(),
            format!("a {} location cannot have children", ptr.kind_name()),
        ))
    }

    fn create_child_with_value(
        &self,
        ptr: &NodePointer,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        let mut child = self.create_child(ptr, name, index)?;
        child.set_value(value)?;
        Ok(child)
    }

    fn create_attribute(&self, ptr: &NodePointer, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
        Err(XPathError::cannot_create(
            format!("{}/@{}", ptr.as_path(), name.qualified_name()),
            "attributes can only be created on DOM elements",
        ))
    }

    fn remove(&self, ptr: &NodePointer) -> Result<(), XPathError>;
}

/// A position in the object graph.
#[derive(Clone)]
pub struct NodePointer {
    pub(crate) parent: Option<Rc<NodePointer>>,
    pub(crate) env: Rc<PointerEnv>,
    pub(crate) index: ElementIndex,
    pub(crate) kind: PointerKind,
    cache: OnceCell<Value>,
}

impl NodePointer {
    pub(crate) fn with_kind(parent: Option<Rc<NodePointer>>, env: Rc<PointerEnv>, kind: PointerKind) -> Self {
        Self {
            parent,
            env,
            index: ElementIndex::Whole,
            kind,
            cache: OnceCell::new(),
        }
    }

    /// A parentless pointer to `value`.
    pub fn root(value: Value, env: Rc<PointerEnv>) -> Self {
        Self::new_child(None, None, value, env)
    }

    /// A root pointer that names nothing, as returned by `null()`.
    pub fn null(env: Rc<PointerEnv>) -> Self {
        Self::with_kind(None, env, PointerKind::Null(NullNode::new(None)))
    }

    pub fn variable(name: &str, scope: VariableScope, env: Rc<PointerEnv>) -> Self {
        Self::with_kind(None, env, PointerKind::Variable(VariableRef::new(name, scope)))
    }

    /// Picks the pointer kind that fits `value`.
    pub(crate) fn new_child(
        parent: Option<Rc<NodePointer>>,
        name: Option<PropertyIdentifier>,
        value: Value,
        env: Rc<PointerEnv>,
    ) -> Self {
        let kind = match value {
            Value::Null => PointerKind::Null(NullNode::new(name)),
            Value::Node(node) => PointerKind::Dom(DomPointer::new(node, None)),
            Value::List(_) => PointerKind::Collection(CollectionNode::new(value)),
            Value::Map(_) => PointerKind::Dynamic(DynamicNode::new(name, value)),
            other => {
                let info = env.introspector.bean_info(&other);
                PointerKind::Bean(BeanNode::new(name, other, info))
            }
        };
        Self::with_kind(parent, env, kind)
    }

    /// A child of `self` holding `value`.
    pub(crate) fn child(&self, name: Option<PropertyIdentifier>, value: Value) -> Self {
        Self::new_child(Some(Rc::new(self.clone())), name, value, self.env.clone())
    }

    pub(crate) fn dom_child(&self, node: DomNode) -> Self {
        Self::with_kind(
            Some(Rc::new(self.clone())),
            self.env.clone(),
            PointerKind::Dom(DomPointer::new(node, None)),
        )
    }

    /// A DOM pointer reached through `id()`, which renders as `id('...')`.
    pub(crate) fn dom_by_id(node: DomNode, id: &str, env: Rc<PointerEnv>) -> Self {
        Self::with_kind(None, env, PointerKind::Dom(DomPointer::new(node, Some(id.to_string()))))
    }

    pub(crate) fn null_child(&self, name: Option<PropertyIdentifier>) -> Self {
        Self::with_kind(
            Some(Rc::new(self.clone())),
            self.env.clone(),
            PointerKind::Null(NullNode::new(name)),
        )
    }

    pub(crate) fn null_property(&self, name: &str, attribute: bool) -> Self {
        Self::with_kind(
            Some(Rc::new(self.clone())),
            self.env.clone(),
            PointerKind::NullProperty(NullProperty::new(name, attribute)),
        )
    }

    pub(crate) fn null_element(&self, index: usize) -> Self {
        let mut element = Self::with_kind(
            Some(Rc::new(self.clone())),
            self.env.clone(),
            PointerKind::NullElement(NullElement),
        );
        element.index = ElementIndex::At(index);
        element
    }

    /// A copy that re-reads its value on next access.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            cache: OnceCell::new(),
            ..self.clone()
        }
    }

    fn invalidate(&mut self) {
        self.cache = OnceCell::new();
    }

    pub(crate) fn variant(&self) -> &dyn PointerVariant {
        match &self.kind {
            PointerKind::Bean(v) => v,
            PointerKind::BeanProperty(v) => v,
            PointerKind::Dynamic(v) => v,
            PointerKind::DynamicProperty(v) => v,
            PointerKind::Collection(v) => v,
            PointerKind::Dom(v) => v,
            PointerKind::Null(v) => v,
            PointerKind::NullProperty(v) => v,
            PointerKind::NullElement(v) => v,
            PointerKind::Variable(v) => v,
        }
    }

    pub(crate) fn letter(&self) -> char {
        self.variant().letter()
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            PointerKind::Bean(_) => "bean",
            PointerKind::BeanProperty(_) => "bean property",
            PointerKind::Dynamic(_) => "map",
            PointerKind::DynamicProperty(_) => "map entry",
            PointerKind::Collection(_) => "collection",
            PointerKind::Dom(_) => "DOM node",
            PointerKind::Null(_) => "null",
            PointerKind::NullProperty(_) => "missing property",
            PointerKind::NullElement(_) => "missing element",
            PointerKind::Variable(_) => "variable",
        }
    }

    /// Kind letters from the root down to this pointer, e.g. `BbDd`.
    pub fn signature(&self) -> String {
        let mut signature = self.parent.as_ref().map(|p| p.signature()).unwrap_or_default();
        signature.push(self.letter());
        signature
    }

    pub fn index(&self) -> ElementIndex {
        self.index
    }

    pub fn set_index(&mut self, index: ElementIndex) {
        if let PointerKind::BeanProperty(_) = self.kind {
            // A scalar property's element 0 is the property itself.
            if self.index.is_whole() && index == ElementIndex::At(0) && !self.is_collection() {
                return;
            }
        }
        self.index = index;
        self.invalidate();
    }

    pub(crate) fn immediate_parent(&self) -> Option<&NodePointer> {
        self.parent.as_deref()
    }

    /// The nearest ancestor that is a node rather than a container.
    pub fn parent(&self) -> Option<NodePointer> {
        let mut current = self.parent.as_deref();
        while let Some(p) = current {
            if !p.is_container() {
                return Some(p.clone());
            }
            current = p.parent.as_deref();
        }
        None
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn name(&self) -> Option<PropertyIdentifier> {
        self.variant().name(self)
    }

    pub fn is_attribute(&self) -> bool {
        self.name().is_some_and(|n| n.is_attribute())
    }

    pub fn base_value(&self) -> Result<Value, XPathError> {
        if let Some(value) = self.cache.get() {
            return Ok(value.clone());
        }
        let value = self.variant().base_value(self)?;
        let _ = self.cache.set(value.clone());
        Ok(value)
    }

    pub fn immediate_node(&self) -> Result<Value, XPathError> {
        self.variant().immediate_node(self)
    }

    /// The pointer that stands for the value at this location, following
    /// property and variable links down to a node.
    pub fn value_pointer(&self) -> Result<NodePointer, XPathError> {
        let mut current = self.clone();
        while let Some(next) = current.variant().value_pointer(&current)? {
            current = next;
        }
        Ok(current)
    }

    /// The object at this location.
    pub fn node(&self) -> Result<Value, XPathError> {
        self.value_pointer()?.immediate_node()
    }

    /// The value at this location as handed to callers. DOM nodes yield
    /// their trimmed string value.
    pub fn value(&self) -> Result<Value, XPathError> {
        let pointer = self.value_pointer()?;
        match &pointer.kind {
            PointerKind::Dom(dom) => Ok(Value::String(dom.node.string_value().trim().to_string())),
            _ => pointer.immediate_node(),
        }
    }

    /// Owner object of a property pointer.
    pub(crate) fn owner_node(&self) -> Result<Value, XPathError> {
        match &self.parent {
            Some(parent) => parent.node(),
            None => Ok(Value::Null),
        }
    }

    pub fn length(&self) -> usize {
        self.variant().length(self).unwrap_or_else(|e| {
            log::debug!("Length of '{}' treated as 0: {}", self.as_path(), e);
            0
        })
    }

    pub fn is_collection(&self) -> bool {
        self.variant().is_collection(self).unwrap_or_else(|e| {
            log::debug!("'{}' treated as a non-collection: {}", self.as_path(), e);
            false
        })
    }

    pub fn is_container(&self) -> bool {
        self.variant().is_container(self)
    }

    pub fn is_leaf(&self) -> bool {
        self.variant().is_leaf(self).unwrap_or_else(|e| {
            log::debug!("'{}' treated as a leaf: {}", self.as_path(), e);
            true
        })
    }

    /// True only if every link of the chain and the addressed element exist.
    pub fn is_actual(&self) -> bool {
        self.check_existence(false)
    }

    /// Like `is_actual`, but a map entry exists as soon as it is named.
    pub(crate) fn is_declared(&self) -> bool {
        self.check_existence(true)
    }

    fn check_existence(&self, declared_only: bool) -> bool {
        if let Some(parent) = &self.parent {
            if !parent.check_existence(declared_only) {
                return false;
            }
        }
        let exists = if declared_only {
            self.variant().declared(self)
        } else {
            self.variant().exists(self)
        };
        exists
            && match self.index {
                ElementIndex::Whole => true,
                ElementIndex::At(i) => i < self.length(),
            }
    }

    pub fn as_path(&self) -> String {
        self.variant().as_path(self)
    }

    /// Path rendering shared by most kinds: the parent's path, a separator,
    /// the name and, for collections, the element position.
    pub(crate) fn default_path(&self) -> String {
        let mut buffer = String::new();
        if let Some(parent) = &self.parent {
            if parent.is_container() {
                return parent.as_path();
            }
            buffer.push_str(&parent.as_path());
        }
        if !buffer.ends_with('/') {
            buffer.push('/');
        }
        match self.name() {
            Some(name) => {
                if name.is_attribute() {
                    buffer.push('@');
                }
                buffer.push_str(&name.qualified_name());
            }
            None => buffer.push('*'),
        }
        if let ElementIndex::At(i) = self.index {
            if self.is_collection() {
                buffer.push_str(&format!("[{}]", i + 1));
            }
        }
        buffer
    }

    /// The language in scope at this location.
    pub fn language(&self) -> String {
        if let Some(lang) = self.variant().language(self) {
            return lang;
        }
        match &self.parent {
            Some(parent) => parent.language(),
            None => self.env.language.clone(),
        }
    }

    /// Case-insensitive prefix match of the language in scope.
    pub fn is_language(&self, lang: &str) -> bool {
        self.language().to_uppercase().starts_with(&lang.to_uppercase())
    }

    pub(crate) fn test_node(&self, test: &StepTest) -> bool {
        self.variant().test_node(self, test)
    }

    pub(crate) fn default_test_node(&self, test: &StepTest) -> bool {
        match test {
            StepTest::Node => true,
            StepTest::Name(name_test) => {
                if self.is_container() {
                    return false;
                }
                let Some(name) = self.name() else {
                    return false;
                };
                if name_test.prefix.as_deref() != name.prefix()
                    && name_test.namespace_uri.as_deref() != name.namespace_uri()
                {
                    return false;
                }
                name_test.is_wildcard() || name_test.local == name.local_name()
            }
            _ => false,
        }
    }

    pub(crate) fn child_iterator(
        &self,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        self.variant().child_iterator(self, test, reverse, start_with)
    }

    pub(crate) fn attribute_iterator(&self, name: &NameTest) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        self.variant().attribute_iterator(self, name)
    }

    pub(crate) fn compare_children(&self, a: &NodePointer, b: &NodePointer) -> Ordering {
        self.variant().compare_children(self, a, b)
    }

    /// Orders two pointers of the same tree in document order.
    pub fn compare_document_order(&self, other: &NodePointer) -> Ordering {
        order::compare(self, other)
    }

    pub(crate) fn same_parent(&self, other: &NodePointer) -> bool {
        match (&self.parent, &other.parent) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || **a == **b,
            _ => false,
        }
    }

    // --- property owners and their property pointers ---

    pub(crate) fn is_property_owner(&self) -> bool {
        matches!(
            self.kind,
            PointerKind::Bean(_) | PointerKind::Dynamic(_) | PointerKind::Null(_)
        )
    }

    /// A fresh pointer to an unselected property of this owner.
    pub(crate) fn property_pointer(&self) -> Option<NodePointer> {
        let kind = match &self.kind {
            PointerKind::Bean(bean) => PointerKind::BeanProperty(BeanProperty::new(bean.info.clone())),
            PointerKind::Dynamic(_) => PointerKind::DynamicProperty(DynamicProperty::default()),
            PointerKind::Null(_) => PointerKind::NullProperty(NullProperty::new("*", false)),
            _ => return None,
        };
        Some(Self::with_kind(Some(Rc::new(self.clone())), self.env.clone(), kind))
    }

    pub(crate) fn property_names(&self) -> Vec<PropertyIdentifier> {
        match &self.kind {
            PointerKind::BeanProperty(p) => p.info.property_ids(),
            PointerKind::DynamicProperty(p) => p
                .names(self)
                .into_iter()
                .map(PropertyIdentifier::unqualified)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn property_count(&self) -> usize {
        match &self.kind {
            PointerKind::BeanProperty(p) => p.info.properties().len(),
            PointerKind::DynamicProperty(p) => p.names(self).len(),
            _ => 0,
        }
    }

    pub(crate) fn property_index(&self) -> Option<usize> {
        match &self.kind {
            PointerKind::BeanProperty(p) => p.property,
            PointerKind::DynamicProperty(p) => p.property,
            _ => None,
        }
    }

    pub(crate) fn set_property_index(&mut self, index: usize) {
        match &mut self.kind {
            PointerKind::BeanProperty(p) => p.select_index(index),
            PointerKind::DynamicProperty(p) => p.select_index(index),
            _ => return,
        }
        self.index = ElementIndex::Whole;
        self.invalidate();
    }

    pub(crate) fn set_property_name(&mut self, name: &PropertyIdentifier) {
        let keys = match &self.kind {
            PointerKind::DynamicProperty(p) => p.names_with(self, Some(name.local_name())),
            _ => Vec::new(),
        };
        match &mut self.kind {
            PointerKind::BeanProperty(p) => p.select_name(name),
            PointerKind::DynamicProperty(p) => p.select_name(name.local_name(), &keys),
            PointerKind::NullProperty(p) => p.select_name(name),
            _ => return,
        }
        self.index = ElementIndex::Whole;
        self.invalidate();
    }

    pub(crate) fn set_attribute(&mut self, attribute: bool) {
        match &mut self.kind {
            PointerKind::BeanProperty(p) => p.attribute = attribute,
            PointerKind::DynamicProperty(p) => p.attribute = attribute,
            PointerKind::NullProperty(p) => p.attribute = attribute,
            _ => {}
        }
    }

    /// Turns a missing property into a `[@name='key']` lookup.
    pub(crate) fn set_name_attribute_value(&mut self, key: &str) {
        if let PointerKind::NullProperty(p) = &mut self.kind {
            p.name = key.to_string();
            p.attribute = false;
            p.by_name_attribute = true;
        }
    }

    pub(crate) fn is_null_property(&self) -> bool {
        matches!(self.kind, PointerKind::NullProperty(_))
    }

    // --- writes ---

    /// Writes `value` to this location.
    pub fn set_value(&mut self, value: Value) -> Result<(), XPathError> {
        log::trace!("Setting '{}'", self.as_path());
        self.variant().set_value(self, value)?;
        self.invalidate();
        Ok(())
    }

    /// Materializes every missing link of the chain, returning a pointer to
    /// the now existing location.
    pub fn create_path(&mut self) -> Result<NodePointer, XPathError> {
        let created = self.variant().create_path(self)?;
        self.invalidate();
        Ok(created.fresh())
    }

    /// Like `create_path`, then writes `value` to the final location.
    pub fn create_path_with_value(&mut self, value: Value) -> Result<NodePointer, XPathError> {
        let created = self.variant().create_path_with_value(self, value)?;
        self.invalidate();
        Ok(created.fresh())
    }

    pub(crate) fn create_child(
        &self,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
    ) -> Result<NodePointer, XPathError> {
        self.variant().create_child(self, name, index)
    }

    pub(crate) fn create_child_with_value(
        &self,
        name: Option<&PropertyIdentifier>,
        index: ElementIndex,
        value: Value,
    ) -> Result<NodePointer, XPathError> {
        self.variant().create_child_with_value(self, name, index, value)
    }

    pub(crate) fn create_attribute(&self, name: &PropertyIdentifier) -> Result<NodePointer, XPathError> {
        self.variant().create_attribute(self, name)
    }

    /// Deletes the addressed entity from its owner.
    pub fn remove(&mut self) -> Result<(), XPathError> {
        log::trace!("Removing '{}'", self.as_path());
        self.variant().remove(self)?;
        self.invalidate();
        Ok(())
    }
}

impl PartialEq for NodePointer {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (self.letter() == other.letter() && self.variant().same_target(self, other))
    }
}

impl Eq for NodePointer {}

impl Hash for NodePointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.kind {
            PointerKind::Dom(dom) => dom.node.hash(state),
            PointerKind::Variable(var) => {
                var.name.hash(state);
                self.index.collapsed().hash(state);
            }
            PointerKind::Collection(_) => {
                'C'.hash(state);
                self.index.collapsed().hash(state);
            }
            _ => {
                self.letter().hash(state);
                self.name().hash(state);
                self.index.collapsed().hash(state);
                if let Some(parent) = &self.parent {
                    parent.hash(state);
                }
            }
        }
    }
}

impl fmt::Debug for NodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.signature(), self.as_path())
    }
}

impl fmt::Display for NodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

/// Quotes a key for use inside `[@name='...']`.
pub(crate) fn escape(key: &str) -> String {
    key.replace('\'', "&apos;").replace('"', "&quot;")
}
