//! `PathContext`: the configured entry point for reading and writing an
//! object graph with path expressions.

use crate::ast::Expression;
use crate::contexts::PointerStream;
use crate::engine::{Computed, Environment, compute, compute_value, iterate};
use crate::error::XPathError;
use crate::parser::parse_expression;
use crate::pointer::{NodePointer, PointerEnv, VariableScope, sort_in_document_order};
use crate::value::XPathValue;
use indexmap::IndexMap;
use objpath_model::{Introspector, ObjectFactory, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A parsed expression, reusable across contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    expression: Expression,
}

impl CompiledExpression {
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn get_value(&self, context: &PathContext) -> Result<Value, XPathError> {
        context.value_of(self)
    }

    pub fn get_pointer(&self, context: &PathContext) -> Result<NodePointer, XPathError> {
        context.pointer_of(self)
    }

    pub fn iterate_pointers<'a>(&'a self, context: &PathContext) -> Result<PointerStream<'a>, XPathError> {
        context.iterate_pointers(self)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Evaluates path expressions against a root value.
///
/// Configuration uses `with_*` builder methods:
///
/// ```ignore
/// let context = PathContext::new(root)
///     .with_variable("limit", Value::from(3))
///     .with_lenient(true);
/// let names = context.iterate("/items[position() <= $limit]/name")?;
/// ```
///
/// In strict mode (the default) reading a path that selects nothing fails
/// with `XPathError::NotFound`; lenient contexts return `Value::Null`.
#[derive(Debug, Clone)]
pub struct PathContext {
    root: Value,
    /// Root of the context this one was derived from by `relative`.
    absolute_root: Option<NodePointer>,
    relative_to: Option<NodePointer>,
    variables: VariableScope,
    namespaces: IndexMap<String, String>,
    ids: HashMap<String, Value>,
    keys: HashMap<String, HashMap<String, Vec<Value>>>,
    language: String,
    introspector: Rc<Introspector>,
    factory: Option<Rc<dyn ObjectFactory>>,
    lenient: bool,
}

impl PathContext {
    pub fn new(root: impl Into<Value>) -> Self {
        Self {
            root: root.into(),
            absolute_root: None,
            relative_to: None,
            variables: Rc::new(RefCell::new(IndexMap::new())),
            namespaces: IndexMap::new(),
            ids: HashMap::new(),
            keys: HashMap::new(),
            language: "en".to_string(),
            introspector: Rc::new(Introspector::new()),
            factory: None,
            lenient: false,
        }
    }

    pub fn with_variable(self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.borrow_mut().insert(name.to_string(), value.into());
        self
    }

    /// The factory consulted when `create_path` meets a missing object.
    pub fn with_factory(mut self, factory: Rc<dyn ObjectFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.insert(prefix.to_string(), uri.to_string());
        self
    }

    /// Language reported by `lang()` where no node declares one.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Shares a bean-info cache between contexts.
    pub fn with_introspector(mut self, introspector: Rc<Introspector>) -> Self {
        self.introspector = introspector;
        self
    }

    /// Registers `value` as the node `id(id)` returns.
    pub fn with_id(mut self, id: &str, value: impl Into<Value>) -> Self {
        self.ids.insert(id.to_string(), value.into());
        self
    }

    /// Indexes `target` under `key(name, value)`.
    pub fn with_key(mut self, name: &str, value: &str, target: impl Into<Value>) -> Self {
        self.keys
            .entry(name.to_string())
            .or_default()
            .entry(value.to_string())
            .or_default()
            .push(target.into());
        self
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// The live variable scope. Changes are visible to later evaluations
    /// and to relative contexts.
    pub fn variables(&self) -> VariableScope {
        self.variables.clone()
    }

    pub fn compile(&self, path: &str) -> Result<CompiledExpression, XPathError> {
        let expression = parse_expression(path)?;
        log::debug!("Compiled '{}'", path);
        Ok(CompiledExpression {
            source: path.to_string(),
            expression,
        })
    }

    /// A context whose relative paths start at `pointer`. Absolute paths
    /// still start at this context's root. Variables and configuration are
    /// shared.
    pub fn relative(&self, pointer: &NodePointer) -> PathContext {
        PathContext {
            absolute_root: Some(self.root_pointer(&self.pointer_env())),
            relative_to: Some(pointer.clone()),
            ..self.clone()
        }
    }

    fn pointer_env(&self) -> Rc<PointerEnv> {
        Rc::new(PointerEnv {
            introspector: self.introspector.clone(),
            language: self.language.clone(),
            factory: self.factory.clone(),
        })
    }

    fn root_pointer(&self, pointer_env: &Rc<PointerEnv>) -> NodePointer {
        match &self.absolute_root {
            Some(root) => root.clone(),
            None => NodePointer::root(self.root.clone(), pointer_env.clone()),
        }
    }

    fn environment(&self) -> Rc<Environment> {
        let pointer_env = self.pointer_env();
        let root = self.root_pointer(&pointer_env);
        let context_pointer = self.relative_to.clone().unwrap_or_else(|| root.clone());
        Rc::new(
            Environment::new(root, self.variables.clone())
                .with_context_pointer(context_pointer)
                .with_namespaces(self.namespaces.clone())
                .with_ids(self.ids.clone())
                .with_keys(self.keys.clone()),
        )
    }

    /// The value `path` selects.
    pub fn get_value(&self, path: &str) -> Result<Value, XPathError> {
        self.value_of(&self.compile(path)?)
    }

    /// A pointer to the location `path` selects. Paths that select nothing
    /// yield a pointer that is not actual, describing where the value would
    /// be.
    pub fn get_pointer(&self, path: &str) -> Result<NodePointer, XPathError> {
        self.pointer_of(&self.compile(path)?)
    }

    /// The full result of `path`, with node sets drained.
    pub fn evaluate(&self, path: &str) -> Result<XPathValue, XPathError> {
        let compiled = self.compile(path)?;
        let env = self.environment();
        let mut context = env.initial_context();
        compute(&compiled.expression, context.as_mut(), &env)?.into_xpath_value()
    }

    /// The values of every node `path` selects.
    pub fn iterate(&self, path: &str) -> Result<Vec<Value>, XPathError> {
        let compiled = self.compile(path)?;
        let env = self.environment();
        let mut context = env.initial_context();
        match compute(&compiled.expression, context.as_mut(), &env)? {
            Computed::Nodes(nodes) => PointerStream::new(nodes).map(|p| p?.value()).collect(),
            Computed::Pointer(pointer) => Ok(vec![pointer.value()?]),
            Computed::String(s) => Ok(vec![Value::String(s)]),
            Computed::Number(n) => Ok(vec![Value::Number(n)]),
            Computed::Boolean(b) => Ok(vec![Value::Boolean(b)]),
        }
    }

    pub fn select_pointers(&self, path: &str) -> Result<Vec<NodePointer>, XPathError> {
        let compiled = self.compile(path)?;
        self.iterate_pointers(&compiled)?.collect()
    }

    /// Streams the pointers of a compiled expression lazily.
    pub fn iterate_pointers<'a>(&self, compiled: &'a CompiledExpression) -> Result<PointerStream<'a>, XPathError> {
        let env = self.environment();
        let mut context = env.initial_context();
        iterate(&compiled.expression, context.as_mut(), &env)
    }

    pub fn set_value(&self, path: &str, value: impl Into<Value>) -> Result<(), XPathError> {
        let mut pointer = self.get_pointer(path)?;
        pointer.set_value(value.into())
    }

    /// Materializes the location `path` names, creating missing objects
    /// through the factory.
    pub fn create_path(&self, path: &str) -> Result<NodePointer, XPathError> {
        let mut pointer = self.writable_pointer(path)?;
        pointer.create_path()
    }

    pub fn create_path_and_set_value(&self, path: &str, value: impl Into<Value>) -> Result<NodePointer, XPathError> {
        let mut pointer = self.writable_pointer(path)?;
        pointer.create_path_with_value(value.into())
    }

    /// Removes the location `path` selects. Removing an absent location
    /// is an error unless the context is lenient.
    pub fn remove_path(&self, path: &str) -> Result<(), XPathError> {
        let mut pointer = self.get_pointer(path)?;
        if !pointer.is_actual() {
            if self.lenient {
                return Ok(());
            }
            return Err(XPathError::NotFound(path.to_string()));
        }
        pointer.remove()
    }

    /// Removes every node `path` selects, last in document order first so
    /// earlier collection indexes stay valid.
    pub fn remove_all(&self, path: &str) -> Result<(), XPathError> {
        let mut pointers = self.select_pointers(path)?;
        sort_in_document_order(&mut pointers);
        log::debug!("Removing {} node(s) selected by '{}'", pointers.len(), path);
        for mut pointer in pointers.into_iter().rev() {
            pointer.remove()?;
        }
        Ok(())
    }

    fn value_of(&self, compiled: &CompiledExpression) -> Result<Value, XPathError> {
        let env = self.environment();
        let mut context = env.initial_context();
        let pointer = match compute_value(&compiled.expression, context.as_mut(), &env)? {
            Computed::Nodes(mut nodes) => nodes.single_node_pointer()?,
            Computed::Pointer(pointer) => Some(pointer),
            Computed::String(s) => return Ok(Value::String(s)),
            Computed::Number(n) => return Ok(Value::Number(n)),
            Computed::Boolean(b) => return Ok(Value::Boolean(b)),
        };
        let Some(pointer) = pointer else {
            return self.not_found(compiled);
        };
        let pointer = pointer.value_pointer()?;
        if !self.lenient && is_path(&compiled.expression) && !is_present(&pointer) {
            return self.not_found(compiled);
        }
        pointer.value()
    }

    fn not_found(&self, compiled: &CompiledExpression) -> Result<Value, XPathError> {
        if self.lenient {
            Ok(Value::Null)
        } else {
            Err(XPathError::NotFound(compiled.source.clone()))
        }
    }

    fn pointer_of(&self, compiled: &CompiledExpression) -> Result<NodePointer, XPathError> {
        let env = self.environment();
        let mut context = env.initial_context();
        Ok(match compute_value(&compiled.expression, context.as_mut(), &env)? {
            Computed::Nodes(mut nodes) => nodes.single_node_pointer()?.unwrap_or_else(|| env.null_pointer()),
            Computed::Pointer(pointer) => pointer,
            Computed::String(s) => env.constant(Value::String(s)),
            Computed::Number(n) => env.constant(Value::Number(n)),
            Computed::Boolean(b) => env.constant(Value::Boolean(b)),
        })
    }

    fn writable_pointer(&self, path: &str) -> Result<NodePointer, XPathError> {
        let compiled = self.compile(path)?;
        if !is_path(&compiled.expression) {
            return Err(XPathError::cannot_create(path, "the expression is not a path"));
        }
        // Undeclared variables are left to the factory to declare.
        if let Expression::Variable(name) = &compiled.expression {
            if !self.variables.borrow().contains_key(name) {
                return Ok(NodePointer::variable(name, self.variables.clone(), self.pointer_env()));
            }
        }
        self.pointer_of(&compiled)
    }
}

fn is_path(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::LocationPath(_) | Expression::Variable(_) | Expression::Filter { .. }
    )
}

/// A location exists, or is a declared property whose value is null.
fn is_present(pointer: &NodePointer) -> bool {
    if pointer.is_actual() {
        return true;
    }
    pointer
        .immediate_parent()
        .is_some_and(|parent| parent.is_container() && parent.is_actual())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objpath_model::Record;

    fn context() -> PathContext {
        let bean = Record::new("Order")
            .with("id", 7)
            .with("note", Value::Null)
            .with_collection("lines", vec!["a".into(), "b".into()]);
        PathContext::new(Value::object(bean))
    }

    #[test]
    fn test_strict_and_lenient_reads() {
        let _ = env_logger::builder().is_test(true).try_init();
        let strict = context();
        assert_eq!(strict.get_value("id").unwrap(), Value::from(7));
        assert_eq!(strict.get_value("note").unwrap(), Value::Null);
        assert_eq!(strict.get_value("null()").unwrap(), Value::Null);
        assert!(matches!(strict.get_value("missing"), Err(XPathError::NotFound(p)) if p == "missing"));

        let lenient = context().with_lenient(true);
        assert_eq!(lenient.get_value("missing").unwrap(), Value::Null);
        let pointer = lenient.get_pointer("missing").unwrap();
        assert!(!pointer.is_actual());
        assert_eq!(pointer.as_path(), "/missing");
    }

    #[test]
    fn test_variables_are_shared_with_relative_contexts() {
        let context = context().with_variable("n", 2);
        let line = context.get_pointer("lines[1]").unwrap();
        let relative = context.relative(&line);
        assert_eq!(relative.get_value(".").unwrap(), Value::from("a"));
        assert_eq!(relative.get_value("/id").unwrap(), Value::from(7));

        context.variables().borrow_mut().insert("n".into(), Value::from(1));
        assert_eq!(relative.get_value("/lines[$n]").unwrap(), Value::from("a"));
    }

    #[test]
    fn test_compiled_expression_reuse() {
        let context = context();
        let compiled = context.compile("lines").unwrap();
        assert_eq!(compiled.to_string(), "lines");
        let count = compiled.iterate_pointers(&context).unwrap().count();
        assert_eq!(count, 2);
        assert_eq!(compiled.get_value(&context).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_json_documents() {
        let document = serde_json::json!({
            "store": {"books": [{"title": "A", "price": 8}, {"title": "B", "price": 12}]}
        });
        let context = PathContext::new(Value::from(document));
        assert_eq!(context.get_value("store/books[2]/title").unwrap(), Value::from("B"));
        let cheap = context.iterate("store/books[price < 10]/title").unwrap();
        assert_eq!(cheap, vec![Value::from("A")]);
        assert_eq!(context.evaluate("sum(store/books/price)").unwrap().to_number(), 20.0);
    }

    #[test]
    fn test_writes_require_a_path() {
        let context = context();
        assert!(matches!(
            context.create_path("1 + 1"),
            Err(XPathError::CannotCreatePath { .. })
        ));
        assert!(matches!(context.remove_path("missing"), Err(XPathError::NotFound(_))));
        assert!(context.clone().with_lenient(true).remove_path("missing").is_ok());
    }
}
