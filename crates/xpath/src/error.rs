use objpath_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath parse error in '{0}': {1}")]
    XPathParse(String, String),

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("No value for path '{0}'")]
    NotFound(String),

    #[error("Cannot create path '{path}': {reason}")]
    CannotCreatePath { path: String, reason: String },

    #[error("Invalid access to '{path}': {reason}")]
    InvalidAccess { path: String, reason: String },

    #[error("Start pointer '{0}' does not descend from the iterated node")]
    InvalidStartPointer(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl XPathError {
    pub(crate) fn invalid_access(path: impl Into<String>, reason: impl Into<String>) -> Self {
        XPathError::InvalidAccess {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn cannot_create(path: impl Into<String>, reason: impl Into<String>) -> Self {
        XPathError::CannotCreatePath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
