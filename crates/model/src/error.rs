use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No such property '{property}' on {type_name}")]
    NoSuchProperty { type_name: String, property: String },

    #[error("Property '{property}' of {type_name} is read-only")]
    ReadOnly { type_name: String, property: String },

    #[error("Cannot address element {index} of a non-collection {type_name} value")]
    NotACollection { type_name: String, index: usize },

    #[error("Index {index} is out of range for a collection of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Accessor for '{property}' failed: {message}")]
    Accessor { property: String, message: String },

    #[error("XML parse error: {0}")]
    XmlParse(String),
}
