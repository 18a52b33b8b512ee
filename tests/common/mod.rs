#![allow(dead_code)]

pub mod fixtures;

use objpath::{PathContext, Value};
use std::rc::Rc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A strict context over [`fixtures::test_bean`].
pub fn bean_context() -> PathContext {
    PathContext::new(fixtures::test_bean())
}

/// A context over a fresh [`fixtures::holder`] that can create missing
/// objects.
pub fn holder_context() -> PathContext {
    PathContext::new(fixtures::holder()).with_factory(Rc::new(fixtures::HolderFactory))
}

/// The paths of every pointer `path` selects.
pub fn selected_paths(context: &PathContext, path: &str) -> Result<Vec<String>, objpath::XPathError> {
    Ok(context.select_pointers(path)?.iter().map(|p| p.as_path()).collect())
}

pub fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::from(*s)).collect()
}
