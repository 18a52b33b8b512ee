pub mod bean;
pub mod dom;
pub mod dynamic;
pub mod error;
pub mod factory;
pub mod identifier;
pub mod introspect;
pub mod json;
pub mod value;

pub use bean::{Bean, Record};
pub use dom::{Document, DomNode, NodeType, QName};
pub use dynamic::DynamicBag;
pub use error::ModelError;
pub use factory::ObjectFactory;
pub use identifier::PropertyIdentifier;
pub use introspect::{BeanInfo, CollectionHint, Introspector, PropertyDescriptor};
pub use value::{BagRef, BeanRef, ListRef, Value};
