//! Path expressions for reading and writing object graphs.
//!
//! `objpath` evaluates XPath-style expressions against beans, dynamic bags,
//! collections and XML documents. The object model lives in
//! [`objpath_model`], the engine in [`objpath_xpath`]; this crate re-exports
//! both and adds constructors for JSON and XML sources.

pub use objpath_model as model;
pub use objpath_xpath as xpath;

pub use objpath_model::{
    Bean, BeanInfo, DomNode, DynamicBag, Introspector, ModelError, ObjectFactory, PropertyDescriptor,
    PropertyIdentifier, Record, Value,
};
pub use objpath_xpath::{CompiledExpression, NodePointer, PathContext, XPathError, XPathValue};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjPathError {
    #[error("JSON parsing error: {0}")]
    Json(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Path(#[from] XPathError),
}

impl From<serde_json::Error> for ObjPathError {
    fn from(e: serde_json::Error) -> Self {
        ObjPathError::Json(e.to_string())
    }
}

/// A context over a JSON document. Objects become dynamic bags, arrays
/// become collections.
pub fn context_for_json(text: &str) -> Result<PathContext, ObjPathError> {
    let document: serde_json::Value = serde_json::from_str(text)?;
    log::debug!("Loaded JSON document ({} bytes)", text.len());
    Ok(PathContext::new(Value::from(document)))
}

/// A context over an XML document, rooted at the document node.
pub fn context_for_xml(text: &str) -> Result<PathContext, ObjPathError> {
    let document = DomNode::parse(text)?;
    Ok(PathContext::new(Value::Node(document)))
}
