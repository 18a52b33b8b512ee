//! Names of properties as seen by path expressions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

const WILDCARD: &str = "*";

/// Names a property of a property owner: an optional namespace, a local
/// name and whether the property is exposed as an attribute.
///
/// The prefix is carried for display only; it takes no part in equality,
/// hashing or ordering.
#[derive(Debug, Clone)]
pub struct PropertyIdentifier {
    namespace_uri: Option<String>,
    prefix: Option<String>,
    local_name: String,
    attribute: bool,
}

impl PropertyIdentifier {
    pub fn new(namespace_uri: Option<String>, local_name: impl Into<String>, attribute: bool) -> Self {
        Self {
            namespace_uri,
            prefix: None,
            local_name: local_name.into(),
            attribute,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// An element-style identifier with no namespace.
    pub fn unqualified(local_name: impl Into<String>) -> Self {
        Self::new(None, local_name, false)
    }

    /// An attribute-style identifier with no namespace.
    pub fn attribute(local_name: impl Into<String>) -> Self {
        Self::new(None, local_name, true)
    }

    /// The reserved identifier meaning "any property, none selected".
    pub fn wildcard() -> Self {
        Self::unqualified(WILDCARD)
    }

    pub fn is_wildcard(&self) -> bool {
        self.local_name == WILDCARD
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    /// The same name with the attribute flag replaced.
    pub fn as_attribute(&self, attribute: bool) -> Self {
        Self {
            attribute,
            ..self.clone()
        }
    }

    /// `prefix:local` when a prefix is known, otherwise the local name.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl PartialEq for PropertyIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.attribute == other.attribute
            && self.local_name == other.local_name
            && self.namespace_uri == other.namespace_uri
    }
}

impl Eq for PropertyIdentifier {}

impl Hash for PropertyIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
        self.attribute.hash(state);
    }
}

impl PartialOrd for PropertyIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then(self.attribute.cmp(&other.attribute))
            .then_with(|| self.namespace_uri.cmp(&other.namespace_uri))
    }
}

impl fmt::Display for PropertyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace_uri {
            write!(f, "{{{}}}", ns)?;
        }
        if self.attribute {
            write!(f, "@")?;
        }
        write!(f, "{}", self.local_name)
    }
}
