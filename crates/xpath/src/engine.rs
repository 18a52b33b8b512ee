//! Expression evaluation.
//!
//! `compute` turns an expression into either a lazily evaluated node set
//! (a context chain) or an atomic value. `compute_value` asks for a single
//! result instead: paths resolve to one pointer, which may address a
//! location that does not exist yet. `iterate` streams the pointers of a
//! node-set expression.

use crate::ast::{Axis, BinaryOperator, Expression, LocationPath, Step, UnaryOperator};
use crate::contexts::{
    AncestorContext, AttributeContext, ChildContext, DescendantContext, EvalContext, InitialContext, ParentContext,
    PointerStream, PrecedingOrFollowingContext, PredicateContext, SelfContext, UnionContext,
};
use crate::error::XPathError;
use crate::iter::StepTest;
use crate::pointer::{NodePointer, PointerEnv, VariableScope};
use crate::value::{XPathValue, format_number, parse_number, pointer_to_bool, pointer_to_number, pointer_to_string};
use crate::{functions, operators, simple_path};
use indexmap::IndexMap;
use objpath_model::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// Everything an expression can see besides the context node.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Start of absolute paths.
    pub(crate) root: NodePointer,
    /// Start of relative paths.
    pub(crate) context_pointer: NodePointer,
    pub(crate) pointer_env: Rc<PointerEnv>,
    pub(crate) variables: VariableScope,
    pub(crate) namespaces: IndexMap<String, String>,
    pub(crate) ids: HashMap<String, Value>,
    /// Key name, then key value, then the nodes indexed under it.
    pub(crate) keys: HashMap<String, HashMap<String, Vec<Value>>>,
}

impl Environment {
    pub fn new(root: NodePointer, variables: VariableScope) -> Self {
        Self {
            context_pointer: root.clone(),
            pointer_env: root.env.clone(),
            root,
            variables,
            namespaces: IndexMap::new(),
            ids: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    pub fn with_context_pointer(mut self, pointer: NodePointer) -> Self {
        self.context_pointer = pointer;
        self
    }

    pub fn with_namespaces(mut self, namespaces: IndexMap<String, String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_ids(mut self, ids: HashMap<String, Value>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_keys(mut self, keys: HashMap<String, HashMap<String, Vec<Value>>>) -> Self {
        self.keys = keys;
        self
    }

    /// The context relative paths start from.
    pub fn initial_context(&self) -> Box<dyn EvalContext + 'static> {
        Box::new(InitialContext::new(Some(self.context_pointer.clone())))
    }

    pub(crate) fn variable(&self, name: &str) -> Result<NodePointer, XPathError> {
        if !self.variables.borrow().contains_key(name) {
            return Err(XPathError::UnknownVariable(name.to_string()));
        }
        Ok(NodePointer::variable(name, self.variables.clone(), self.pointer_env.clone()))
    }

    /// A parentless pointer to a computed value.
    pub(crate) fn constant(&self, value: Value) -> NodePointer {
        NodePointer::root(value, self.pointer_env.clone())
    }

    pub(crate) fn null_pointer(&self) -> NodePointer {
        NodePointer::null(self.pointer_env.clone())
    }
}

/// The result of computing an expression.
pub enum Computed<'a> {
    /// A node set, not yet evaluated.
    Nodes(Box<dyn EvalContext + 'a>),
    Pointer(NodePointer),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a> Computed<'a> {
    pub fn into_string(self) -> Result<String, XPathError> {
        match self {
            Computed::Nodes(mut nodes) => match nodes.single_node_pointer()? {
                Some(pointer) => pointer_to_string(&pointer),
                None => Ok(String::new()),
            },
            Computed::Pointer(pointer) => pointer_to_string(&pointer),
            Computed::String(s) => Ok(s),
            Computed::Number(n) => Ok(format_number(n)),
            Computed::Boolean(b) => Ok(b.to_string()),
        }
    }

    pub fn into_number(self) -> Result<f64, XPathError> {
        match self {
            Computed::Nodes(mut nodes) => match nodes.single_node_pointer()? {
                Some(pointer) => pointer_to_number(&pointer),
                None => Ok(f64::NAN),
            },
            Computed::Pointer(pointer) => pointer_to_number(&pointer),
            Computed::String(s) => Ok(parse_number(&s)),
            Computed::Number(n) => Ok(n),
            Computed::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        }
    }

    pub fn into_bool(self) -> Result<bool, XPathError> {
        match self {
            Computed::Nodes(mut nodes) => match nodes.single_node_pointer()? {
                Some(pointer) => pointer_to_bool(&pointer),
                None => Ok(false),
            },
            Computed::Pointer(pointer) => pointer_to_bool(&pointer),
            Computed::String(s) => Ok(!s.is_empty()),
            Computed::Number(n) => Ok(n != 0.0 && !n.is_nan()),
            Computed::Boolean(b) => Ok(b),
        }
    }

    /// Drains a node set; atomic results are returned as they are.
    pub fn into_xpath_value(self) -> Result<XPathValue, XPathError> {
        Ok(match self {
            Computed::Nodes(nodes) => XPathValue::NodeSet(PointerStream::new(nodes).collect::<Result<_, _>>()?),
            Computed::Pointer(pointer) => XPathValue::NodeSet(vec![pointer]),
            Computed::String(s) => XPathValue::String(s),
            Computed::Number(n) => XPathValue::Number(n),
            Computed::Boolean(b) => XPathValue::Boolean(b),
        })
    }

    /// Views the result as a context: node sets as they are, pointers and
    /// atomic values as a single node.
    pub(crate) fn into_context(self, env: &Environment) -> Box<dyn EvalContext + 'a> {
        let pointer = match self {
            Computed::Nodes(nodes) => return nodes,
            Computed::Pointer(pointer) => pointer,
            Computed::String(s) => env.constant(Value::String(s)),
            Computed::Number(n) => env.constant(Value::Number(n)),
            Computed::Boolean(b) => env.constant(Value::Boolean(b)),
        };
        Box::new(InitialContext::new(Some(pointer)))
    }
}

/// Computes `expression` in `context`. Paths and unions come back as
/// unevaluated node sets.
pub fn compute<'a>(
    expression: &'a Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Computed<'a>, XPathError> {
    match expression {
        Expression::Literal(s) => Ok(Computed::String(s.clone())),
        Expression::Number(n) => Ok(Computed::Number(*n)),
        Expression::Variable(name) => Ok(Computed::Nodes(Box::new(InitialContext::new(Some(env.variable(name)?))))),
        Expression::LocationPath(path) => match &path.start_point {
            Some(start) => expression_path(start, &path.steps, context, env, false),
            None => {
                let start = path_start(path, context, env)?;
                Ok(Computed::Nodes(eval_steps(
                    Box::new(InitialContext::new(start)),
                    &path.steps,
                    env,
                )))
            }
        },
        Expression::Filter { .. } => expression_path(expression, &[], context, env, false),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Union,
            right,
        } => union(left, right, context, env),
        _ => compute_value(expression, context, env),
    }
}

/// Computes a single result. A path resolves to its first matching pointer,
/// or to a pointer for the location it would address when nothing matches.
pub fn compute_value<'a>(
    expression: &'a Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Computed<'a>, XPathError> {
    match expression {
        Expression::Literal(_) | Expression::Number(_) => compute(expression, context, env),
        Expression::Variable(name) => Ok(Computed::Pointer(env.variable(name)?)),
        Expression::LocationPath(path) => match &path.start_point {
            Some(start) => expression_path(start, &path.steps, context, env, true),
            None => {
                let start = path_start(path, context, env)?;
                let found = single_pointer_for_steps(Box::new(InitialContext::new(start)), &path.steps, context, env)?;
                Ok(Computed::Pointer(found.unwrap_or_else(|| env.null_pointer())))
            }
        },
        Expression::Filter { .. } => expression_path(expression, &[], context, env, true),
        Expression::CoreFunction { function, args } => functions::call(*function, args, context, env),
        Expression::FunctionCall { name, .. } => Err(XPathError::UnknownFunction(name.clone())),
        Expression::NameAttributeTest { attribute, key } => {
            operators::equals(attribute, key, false, context, env).map(Computed::Boolean)
        }
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Union,
            right,
        } => union(left, right, context, env),
        Expression::BinaryOp { left, op, right } => operators::binary(left, *op, right, context, env),
        Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => Ok(Computed::Number(-compute_value(expr, context, env)?.into_number()?)),
    }
}

/// Streams the pointers selected by `expression`.
pub fn iterate<'a>(
    expression: &'a Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<PointerStream<'a>, XPathError> {
    let nodes = compute(expression, context, env)?.into_context(env);
    Ok(PointerStream::new(nodes))
}

fn path_start(
    path: &LocationPath,
    context: &mut dyn EvalContext,
    env: &Environment,
) -> Result<Option<NodePointer>, XPathError> {
    if path.is_absolute {
        Ok(Some(env.root.clone()))
    } else {
        context.current_node_pointer()
    }
}

/// Chains one context per step, and one per predicate of each step.
pub(crate) fn eval_steps<'a>(
    mut context: Box<dyn EvalContext + 'a>,
    steps: &'a [Step],
    env: &Rc<Environment>,
) -> Box<dyn EvalContext + 'a> {
    for step in steps {
        context = step_context(context, step, env);
        context = with_predicates(context, &step.predicates, env);
    }
    context
}

fn with_predicates<'a>(
    mut context: Box<dyn EvalContext + 'a>,
    predicates: &'a [Expression],
    env: &Rc<Environment>,
) -> Box<dyn EvalContext + 'a> {
    for (i, predicate) in predicates.iter().enumerate() {
        if i != 0 {
            context = Box::new(UnionContext::new(vec![context]));
        }
        context = Box::new(PredicateContext::new(context, predicate, env.clone()));
    }
    context
}

fn step_context<'a>(parent: Box<dyn EvalContext + 'a>, step: &Step, env: &Environment) -> Box<dyn EvalContext + 'a> {
    let test = StepTest::resolve(&step.node_test, &env.namespaces);
    match step.axis {
        Axis::Child => Box::new(ChildContext::new(parent, test, false, false)),
        Axis::FollowingSibling => Box::new(ChildContext::new(parent, test, true, false)),
        Axis::PrecedingSibling => Box::new(ChildContext::new(parent, test, true, true)),
        Axis::Attribute => Box::new(AttributeContext::new(parent, test)),
        Axis::SelfAxis => Box::new(SelfContext::new(parent, test)),
        Axis::Parent => Box::new(ParentContext::new(parent, test)),
        Axis::Ancestor => Box::new(AncestorContext::new(parent, test, false)),
        Axis::AncestorOrSelf => Box::new(AncestorContext::new(parent, test, true)),
        Axis::Descendant => Box::new(DescendantContext::new(parent, test, false)),
        Axis::DescendantOrSelf => Box::new(DescendantContext::new(parent, test, true)),
        Axis::Following => Box::new(PrecedingOrFollowingContext::new(parent, test, false)),
        Axis::Preceding => Box::new(PrecedingOrFollowingContext::new(parent, test, true)),
    }
}

/// The first pointer reached by `steps` from `context`.
fn single_pointer_for_steps<'a>(
    mut start: Box<dyn EvalContext + 'a>,
    steps: &'a [Step],
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Option<NodePointer>, XPathError> {
    let pointer = start.single_node_pointer()?;
    if steps.is_empty() {
        return Ok(pointer);
    }
    if simple_path::is_simple_path(steps) {
        return simple_path::interpret_location_path(context, env, pointer, steps);
    }
    search_for_path(pointer, steps, context, env)
}

/// Evaluates the full chain; when it selects nothing, backs off step by
/// step to the longest prefix that exists and describes the rest as an
/// absent location below it.
fn search_for_path(
    start: Option<NodePointer>,
    steps: &[Step],
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Option<NodePointer>, XPathError> {
    let first = |count: usize| -> Result<Option<NodePointer>, XPathError> {
        eval_steps(Box::new(InitialContext::new(start.clone())), &steps[..count], env).single_node_pointer()
    };
    if let Some(found) = first(steps.len())? {
        return Ok(Some(found));
    }
    for count in (1..steps.len()).rev() {
        if let Some(prefix) = first(count)? {
            log::trace!("Path matched {} of {} step(s) from '{}'", count, steps.len(), prefix);
            return simple_path::create_null_pointer(context, env, prefix, steps, count).map(Some);
        }
    }
    Ok(None)
}

/// A path that starts with a primary expression, e.g. `$list[2]/name`.
fn expression_path<'a>(
    start: &'a Expression,
    steps: &'a [Step],
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
    first_match: bool,
) -> Result<Computed<'a>, XPathError> {
    let (primary, predicates) = match start {
        Expression::Filter { primary, predicates } => (primary.as_ref(), predicates.as_slice()),
        other => (other, &[][..]),
    };
    let nodes: Box<dyn EvalContext + 'a> = match compute(primary, context, env)? {
        // Variables and empty paths already yield a single-pointer context
        // that walks collections element by element.
        Computed::Nodes(nodes) if starts_single(primary) => nodes,
        Computed::Nodes(nodes) => Box::new(UnionContext::new(vec![nodes])),
        other => other.into_context(env),
    };
    let mut nodes = nodes;

    if first_match
        && matches!(primary, Expression::Variable(_))
        && simple_path::are_basic_predicates(predicates)
        && simple_path::is_simple_path(steps)
    {
        if let Some(pointer) = nodes.single_node_pointer()? {
            if pointer.index().is_whole() || predicates.is_empty() {
                let found = simple_path::interpret_expression_path(context, env, pointer, predicates, steps)?;
                return Ok(Computed::Pointer(found.unwrap_or_else(|| env.null_pointer())));
            }
        }
    }

    let nodes = with_predicates(nodes, predicates, env);
    if first_match {
        let found = single_pointer_for_steps(nodes, steps, context, env)?;
        return Ok(Computed::Pointer(found.unwrap_or_else(|| env.null_pointer())));
    }
    Ok(Computed::Nodes(eval_steps(nodes, steps, env)))
}

fn starts_single(expression: &Expression) -> bool {
    match expression {
        Expression::Variable(_) => true,
        Expression::LocationPath(path) => path.start_point.is_none() && path.steps.is_empty(),
        _ => false,
    }
}

fn union<'a>(
    left: &'a Expression,
    right: &'a Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Computed<'a>, XPathError> {
    let mut operands = Vec::new();
    union_operands(left, &mut operands);
    union_operands(right, &mut operands);
    let mut contexts = Vec::with_capacity(operands.len());
    for operand in operands {
        contexts.push(compute(operand, context, env)?.into_context(env));
    }
    Ok(Computed::Nodes(Box::new(UnionContext::new(contexts))))
}

/// Flattens `a | b | c` into its operands.
fn union_operands<'a>(expression: &'a Expression, operands: &mut Vec<&'a Expression>) {
    match expression {
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Union,
            right,
        } => {
            union_operands(left, operands);
            union_operands(right, operands);
        }
        other => operands.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use objpath_model::Record;
    use std::cell::RefCell;

    fn env() -> Rc<Environment> {
        let bean = Record::new("Shelf")
            .with("a", 1)
            .with_collection("b", vec![10.into(), 20.into(), 30.into()])
            .with("c", "x");
        let root = NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()));
        let mut vars = IndexMap::new();
        vars.insert("list".to_string(), Value::list(vec!["p".into(), "q".into()]));
        Rc::new(Environment::new(root, Rc::new(RefCell::new(vars))))
    }

    fn paths(expression: &str) -> Vec<String> {
        let env = env();
        let expression = parse_expression(expression).unwrap();
        let mut context = env.initial_context();
        iterate(&expression, context.as_mut(), &env)
            .unwrap()
            .map(|p| p.unwrap().as_path())
            .collect()
    }

    fn value(expression: &str) -> Computed<'static> {
        let env = env();
        let expression: &'static Expression = Box::leak(Box::new(parse_expression(expression).unwrap()));
        let mut context = env.initial_context();
        compute_value(expression, context.as_mut(), &env).unwrap()
    }

    #[test]
    fn test_iterate_paths_and_unions() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert_eq!(paths("b"), vec!["/b[1]", "/b[2]", "/b[3]"]);
        assert_eq!(paths("b[2]"), vec!["/b[2]"]);
        assert_eq!(paths("c | a | /a"), vec!["/a", "/c"]);
        assert_eq!(paths("$list"), vec!["$list[1]", "$list[2]"]);
        assert!(paths("missing").is_empty());
    }

    #[test]
    fn test_compute_value_of_paths() {
        let Computed::Pointer(pointer) = value("b[3]") else {
            panic!("expected a pointer");
        };
        assert_eq!(pointer.value().unwrap(), Value::from(30));

        let Computed::Pointer(absent) = value("/nothing/here") else {
            panic!("expected a pointer");
        };
        assert!(!absent.is_actual());
        assert_eq!(absent.as_path(), "/nothing/here");
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let env = env();
        let expression = parse_expression("$nope").unwrap();
        let mut context = env.initial_context();
        assert!(matches!(
            compute_value(&expression, context.as_mut(), &env),
            Err(XPathError::UnknownVariable(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_atomic_results() {
        assert_eq!(value("1 + 2 * 3").into_number().unwrap(), 7.0);
        assert_eq!(value("-a").into_number().unwrap(), -1.0);
        assert_eq!(value("c").into_string().unwrap(), "x");
        assert!(value("b = 20").into_bool().unwrap());
    }
}
