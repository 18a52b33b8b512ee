//! Hook for materializing missing objects while a path is being created.

use crate::error::ModelError;
use crate::value::Value;
use std::fmt;

/// Creates missing intermediate objects on request.
///
/// `parent` is the object that should receive the new value, `property` the
/// name of the missing property and `index` the collection slot (0 for a
/// non-collection). The factory writes the new object into `parent` itself
/// and returns `Ok(false)` when it does not know how to build it.
pub trait ObjectFactory: fmt::Debug {
    fn create_object(&self, parent: &Value, property: &str, index: usize) -> Result<bool, ModelError>;

    /// Supplies the initial value of a variable that a path creation needs
    /// but that is not declared yet. `None` leaves it undeclared.
    fn declare_variable(&self, _name: &str) -> Option<Value> {
        None
    }
}
