//! Direct resolution of simple paths to a single pointer.
//!
//! A simple path only uses `child::name`, `attribute::name` and
//! `self::node()` steps with basic predicates. Such paths are walked
//! property by property instead of through a context chain. When a link is
//! missing the walk produces a chain of null pointers describing the
//! absent location, which `create_path` can later materialize.
//!
//! Inside collections every element is tried and the candidate whose chain
//! has the fewest missing links wins.

use crate::ast::{Axis, Expression, NodeTest, NodeTypeTest, Step};
use crate::contexts::EvalContext;
use crate::engine::{Computed, Environment, compute_value};
use crate::error::XPathError;
use crate::iter::{NameTest, NodeIterator, StepTest};
use crate::pointer::{ElementIndex, NodePointer};
use crate::value::value_to_bool;
use objpath_model::{PropertyIdentifier, Value};
use std::rc::Rc;

const PERFECT_MATCH: i32 = 1000;

/// True when every step can be resolved without a context chain.
pub(crate) fn is_simple_path(steps: &[Step]) -> bool {
    steps.iter().all(|step| {
        let simple_step = match (&step.axis, &step.node_test) {
            (Axis::Child | Axis::Attribute, NodeTest::Name(name)) => !name.ends_with('*'),
            (Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node)) => true,
            _ => false,
        };
        simple_step && are_basic_predicates(&step.predicates)
    })
}

/// Name tests with a context-independent key, plus at most one
/// context-independent index.
pub(crate) fn are_basic_predicates(predicates: &[Expression]) -> bool {
    let mut seen_index = false;
    for predicate in predicates {
        match predicate {
            Expression::NameAttributeTest { key, .. } => {
                if key.is_context_dependent() {
                    return false;
                }
            }
            other if other.is_context_dependent() => return false,
            _ => {
                if seen_index {
                    return false;
                }
                seen_index = true;
            }
        }
    }
    true
}

pub(crate) fn interpret_location_path(
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
    root: Option<NodePointer>,
    steps: &[Step],
) -> Result<Option<NodePointer>, XPathError> {
    let Some(root) = root else {
        return Ok(None);
    };
    Interpreter { context, env }.step(root, steps, 0)
}

/// Resolves `$var[predicates]/steps` starting from the variable's pointer.
pub(crate) fn interpret_expression_path(
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
    root: NodePointer,
    predicates: &[Expression],
    steps: &[Step],
) -> Result<Option<NodePointer>, XPathError> {
    Interpreter { context, env }.predicate(root, steps, 0, predicates, 0)
}

/// A null chain for `steps[current..]` below `parent`.
pub(crate) fn create_null_pointer(
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
    parent: NodePointer,
    steps: &[Step],
    current: usize,
) -> Result<NodePointer, XPathError> {
    Interpreter { context, env }.null_pointer(parent, steps, current)
}

/// Number of existing links, counted from the tip of the chain.
fn quality(pointer: &NodePointer) -> i32 {
    let mut quality = PERFECT_MATCH;
    let mut current = Some(pointer);
    while let Some(p) = current {
        if p.is_actual() {
            break;
        }
        quality -= 1;
        current = p.immediate_parent();
    }
    quality
}

/// Keeps the best candidate seen so far. Returns true on a perfect match.
fn consider(best: &mut Option<(i32, NodePointer)>, candidate: NodePointer) -> bool {
    let quality = quality(&candidate);
    let perfect = quality == PERFECT_MATCH;
    if perfect || best.as_ref().is_none_or(|(q, _)| quality > *q) {
        *best = Some((quality, candidate));
    }
    perfect
}

fn is_name_attribute_equal(pointer: &NodePointer, key: &str) -> Result<bool, XPathError> {
    let Some(mut attributes) = pointer.attribute_iterator(&NameTest::new("name"))? else {
        return Ok(false);
    };
    if !attributes.set_position(1)? {
        return Ok(false);
    }
    match attributes.node_pointer()? {
        Some(name) => Ok(name.value()?.as_str() == Some(key)),
        None => Ok(false),
    }
}

fn is_collection_element(pointer: &NodePointer, index: i64) -> bool {
    pointer.is_actual()
        && (index == 0 || (pointer.is_collection() && index >= 0 && (index as usize) < pointer.length()))
}

fn step_name(step: &Step) -> Option<&str> {
    match &step.node_test {
        NodeTest::Name(name) => Some(name),
        _ => None,
    }
}

struct Interpreter<'c> {
    context: &'c mut dyn EvalContext,
    env: &'c Rc<Environment>,
}

impl Interpreter<'_> {
    fn step(&mut self, parent: NodePointer, steps: &[Step], current: usize) -> Result<Option<NodePointer>, XPathError> {
        if current == steps.len() {
            return Ok(Some(parent));
        }
        let parent = parent.value_pointer()?;
        let has_predicates = !steps[current].predicates.is_empty();
        match (parent.is_property_owner(), has_predicates) {
            (true, false) => self.step_property_owner(parent, steps, current),
            (true, true) => self.step_property_owner_with_predicates(parent, steps, current),
            (false, false) => self.step_standard(parent, steps, current),
            (false, true) => self.step_standard_with_predicates(parent, steps, current),
        }
    }

    fn step_property_owner(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        current: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let Some(mut child) = child_pointer_for_step(&parent, &steps[current]) else {
            return Ok(None);
        };
        // An absent map key still resolves to an entry of the map.
        if !child.is_declared() {
            return self.null_pointer(parent, steps, current).map(Some);
        }
        if current + 1 == steps.len() {
            return Ok(Some(child));
        }
        if !child.is_collection() {
            return self.step(child, steps, current + 1);
        }

        let mut best = None;
        for i in 0..child.length() {
            child.set_index(ElementIndex::At(i));
            if let Some(found) = self.step(child.clone(), steps, current + 1)? {
                if consider(&mut best, found) {
                    break;
                }
            }
        }
        match best {
            Some((_, found)) => Ok(Some(found)),
            None => self.null_pointer(child, steps, current).map(Some),
        }
    }

    fn step_property_owner_with_predicates(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        current: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let step = &steps[current];
        let Some(child) = child_pointer_for_step(&parent, step) else {
            return Ok(None);
        };
        if !child.is_declared() {
            return self.null_pointer(parent, steps, current).map(Some);
        }
        self.predicate(child, steps, current + 1, &step.predicates, 0)
    }

    fn step_standard(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        current: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        if steps[current].axis == Axis::SelfAxis {
            return self.step(parent, steps, current + 1);
        }
        let mut best = None;
        if let Some(mut children) = self.node_iterator(&parent, &steps[current])? {
            let mut position = 1;
            while children.set_position(position)? {
                position += 1;
                let Some(child) = children.node_pointer()? else {
                    continue;
                };
                if current + 1 == steps.len() {
                    return Ok(Some(child));
                }
                if let Some(found) = self.step(child, steps, current + 1)? {
                    if consider(&mut best, found) {
                        break;
                    }
                }
            }
        }
        match best {
            Some((_, found)) => Ok(Some(found)),
            None => self.null_pointer(parent, steps, current).map(Some),
        }
    }

    fn step_standard_with_predicates(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        current: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let step = &steps[current];
        if step.axis == Axis::SelfAxis {
            return self.predicate(parent, steps, current + 1, &step.predicates, 0);
        }

        if let [predicate] = step.predicates.as_slice() {
            let mut found = None;
            if let Some(mut children) = self.node_iterator(&parent, step)? {
                if let Expression::NameAttributeTest { key, .. } = predicate {
                    let key = self.key(key)?;
                    let mut position = 1;
                    while children.set_position(position)? {
                        position += 1;
                        if let Some(child) = children.node_pointer()? {
                            if is_name_attribute_equal(&child, &key)? {
                                found = Some(child);
                                break;
                            }
                        }
                    }
                } else {
                    let index = self.index(predicate)?;
                    if index >= 0 && children.set_position(index as usize + 1)? {
                        found = children.node_pointer()?;
                    }
                }
            }
            if let Some(found) = found {
                return self.step(found, steps, current + 1);
            }
        } else if let Some(mut children) = self.node_iterator(&parent, step)? {
            let mut candidates = Vec::new();
            let mut position = 1;
            while children.set_position(position)? {
                position += 1;
                if let Some(child) = children.node_pointer()? {
                    candidates.push(child);
                }
            }
            if let Some(found) = self.predicates_standard(candidates, steps, current + 1, &step.predicates, 0)? {
                return Ok(Some(found));
            }
        }
        self.null_pointer(parent, steps, current).map(Some)
    }

    /// Applies `predicates[index..]` to `parent`, then continues with
    /// `steps[next_step..]`.
    fn predicate(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        next_step: usize,
        predicates: &[Expression],
        index: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        match predicates.get(index) {
            None => self.step(parent, steps, next_step),
            Some(Expression::NameAttributeTest { key, .. }) => {
                let key = self.key(key)?;
                self.predicate_name(parent, &key, steps, next_step, predicates, index)
            }
            Some(_) => self.predicate_index(parent, steps, next_step, predicates, index),
        }
    }

    fn predicate_name(
        &mut self,
        parent: NodePointer,
        key: &str,
        steps: &[Step],
        next_step: usize,
        predicates: &[Expression],
        index: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let mut child = parent.value_pointer()?;
        if child.is_property_owner() {
            if let Some(mut property) = child.property_pointer() {
                property.set_property_name(&PropertyIdentifier::unqualified(key));
                if property.is_declared() {
                    return self.predicate(property, steps, next_step, predicates, index + 1);
                }
            }
        } else if child.is_collection() {
            // Elements that own properties or are collections take the
            // lookup themselves; others must carry a matching name attribute.
            let mut best = None;
            for i in 0..child.length() {
                child.set_index(ElementIndex::At(i));
                let element = child.value_pointer()?;
                let found = if element.is_property_owner() || element.is_collection() {
                    self.predicate_name(element, key, steps, next_step, predicates, index)?
                } else if is_name_attribute_equal(&element, key)? {
                    self.predicate(element, steps, next_step, predicates, index + 1)?
                } else {
                    None
                };
                if let Some(found) = found {
                    if consider(&mut best, found) {
                        break;
                    }
                }
            }
            if let Some((_, found)) = best {
                return Ok(Some(found));
            }
        } else if let Some(found) = self.predicates_standard(vec![child.clone()], steps, next_step, predicates, index)? {
            return Ok(Some(found));
        }
        self.null_pointer_for_predicates(child, steps, next_step, predicates, index)
            .map(Some)
    }

    /// Applies `predicates[index..]` to a list of sibling candidates.
    fn predicates_standard(
        &mut self,
        parents: Vec<NodePointer>,
        steps: &[Step],
        next_step: usize,
        predicates: &[Expression],
        index: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let Some(first) = parents.first() else {
            return Ok(None);
        };
        let Some(predicate) = predicates.get(index) else {
            return self.step(first.clone(), steps, next_step);
        };
        if let Expression::NameAttributeTest { key, .. } = predicate {
            let key = self.key(key)?;
            let mut matching = Vec::new();
            for pointer in parents {
                if is_name_attribute_equal(&pointer, &key)? {
                    matching.push(pointer);
                }
            }
            return self.predicates_standard(matching, steps, next_step, predicates, index + 1);
        }
        let position = self.index(predicate)?;
        match usize::try_from(position).ok().and_then(|i| parents.get(i)) {
            Some(pointer) => self.predicate(pointer.clone(), steps, next_step, predicates, index + 1),
            None => Ok(None),
        }
    }

    fn predicate_index(
        &mut self,
        parent: NodePointer,
        steps: &[Step],
        next_step: usize,
        predicates: &[Expression],
        index: usize,
    ) -> Result<Option<NodePointer>, XPathError> {
        let position = self.index(&predicates[index])?;
        if is_collection_element(&parent, position) {
            let mut element = parent;
            element.set_index(ElementIndex::At(position as usize));
            return self.predicate(element, steps, next_step, predicates, index + 1);
        }
        self.null_pointer_for_predicates(parent, steps, next_step, predicates, index)
            .map(Some)
    }

    fn null_pointer(&mut self, parent: NodePointer, steps: &[Step], current: usize) -> Result<NodePointer, XPathError> {
        if current == steps.len() {
            return Ok(parent);
        }
        let mut parent = parent.value_pointer()?;
        let step = &steps[current];
        if matches!(step.axis, Axis::Child | Axis::Attribute) {
            if let Some(name) = step_name(step) {
                parent = parent.null_property(name, step.axis == Axis::Attribute);
            }
        }
        self.null_pointer_for_predicates(parent, steps, current + 1, &step.predicates, 0)
    }

    fn null_pointer_for_predicates(
        &mut self,
        mut parent: NodePointer,
        steps: &[Step],
        next_step: usize,
        predicates: &[Expression],
        index: usize,
    ) -> Result<NodePointer, XPathError> {
        for predicate in &predicates[index..] {
            if let Expression::NameAttributeTest { key, .. } = predicate {
                let key = self.key(key)?;
                let mut lookup = parent.value_pointer()?.null_property("*", false);
                lookup.set_name_attribute_value(&key);
                parent = lookup;
                continue;
            }
            let position = self.index(predicate)?;
            parent = match usize::try_from(position) {
                Ok(position) if parent.is_null_property() => {
                    parent.set_index(ElementIndex::At(position));
                    parent
                }
                Ok(position) => parent.null_element(position),
                Err(_) => parent.null_child(None),
            };
        }
        self.null_pointer(parent, steps, next_step)
    }

    fn node_iterator(&self, parent: &NodePointer, step: &Step) -> Result<Option<Box<dyn NodeIterator>>, XPathError> {
        let test = StepTest::resolve(&step.node_test, &self.env.namespaces);
        if step.axis == Axis::Attribute {
            return match test.attribute_name() {
                Some(name) => parent.attribute_iterator(&name),
                None => Ok(None),
            };
        }
        parent.child_iterator(&test, false, None)
    }

    fn key(&mut self, expression: &Expression) -> Result<String, XPathError> {
        compute_value(expression, self.context, self.env)?.into_string()
    }

    /// Zero-based index selected by a predicate. Numbers round half up;
    /// other values select the first element when true and nothing when
    /// false.
    fn index(&mut self, predicate: &Expression) -> Result<i64, XPathError> {
        let value = match compute_value(predicate, self.context, self.env)? {
            Computed::Nodes(mut nodes) => match nodes.single_node_pointer()? {
                Some(pointer) => pointer.value()?,
                None => Value::Null,
            },
            Computed::Pointer(pointer) => pointer.value()?,
            Computed::String(s) => Value::String(s),
            Computed::Number(n) => Value::Number(n),
            Computed::Boolean(b) => Value::Boolean(b),
        };
        match value {
            Value::Null => Err(XPathError::TypeError(format!("predicate value is null: {:?}", predicate))),
            Value::Number(n) => Ok((n + 0.5) as i64 - 1),
            other => Ok(if value_to_bool(&other) { 0 } else { -1 }),
        }
    }
}

/// The property pointer a child or attribute step selects on a property
/// owner. Prefixed names select nothing; `self::node()` stays on the owner.
fn child_pointer_for_step(parent: &NodePointer, step: &Step) -> Option<NodePointer> {
    if !matches!(step.axis, Axis::Child | Axis::Attribute) {
        return Some(parent.clone());
    }
    let name = step_name(step)?;
    if name.contains(':') {
        return None;
    }
    let mut child = parent.property_pointer()?;
    let attribute = step.axis == Axis::Attribute;
    child.set_property_name(&PropertyIdentifier::new(None, name, attribute));
    child.set_attribute(attribute);
    Some(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::pointer::PointerEnv;
    use indexmap::IndexMap;
    use objpath_model::Record;
    use std::cell::RefCell;

    fn env() -> Rc<Environment> {
        let mut map = IndexMap::new();
        map.insert("foo".to_string(), Value::from("bar"));
        let nested = Record::new("Nested").with("name", "inner").with("int", 7);
        let bean = Record::new("Fixture")
            .with("int", 1)
            .with("map", Value::map(map))
            .with("nested", Value::object(nested))
            .with_collection("list", (1..=5).map(Value::from).collect());
        let root = NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()));
        Rc::new(Environment::new(root, Rc::new(RefCell::new(IndexMap::new()))))
    }

    fn resolve(path: &str) -> NodePointer {
        let env = env();
        let expression = parse_expression(path).unwrap();
        let Expression::LocationPath(location) = &expression else {
            panic!("not a path: {}", path);
        };
        assert!(is_simple_path(&location.steps));
        let mut context = env.initial_context();
        interpret_location_path(context.as_mut(), &env, Some(env.root.clone()), &location.steps)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_simple_path_detection() {
        let steps = |path: &str| match parse_expression(path).unwrap() {
            Expression::LocationPath(location) => location.steps,
            other => panic!("not a path: {:?}", other),
        };
        assert!(is_simple_path(&steps("/a/b[2]/@c")));
        assert!(is_simple_path(&steps("a[@name='k'][1]")));
        assert!(!is_simple_path(&steps("a/*")));
        assert!(!is_simple_path(&steps("//a")));
        assert!(!is_simple_path(&steps("a[position() = 1]")));
        assert!(!is_simple_path(&steps("a[1][2]")));
    }

    #[test]
    fn test_existing_locations() {
        let _ = env_logger::builder().is_test(true).try_init();
        let int = resolve("/int");
        assert_eq!(int.signature(), "Bb");
        assert_eq!(int.value().unwrap(), Value::from(1));

        let entry = resolve("/map/foo");
        assert_eq!(entry.signature(), "BbDd");
        assert_eq!(entry.as_path(), "/map[@name='foo']");

        let element = resolve("/list[3]");
        assert_eq!(element.value().unwrap(), Value::from(3));
        assert_eq!(resolve("/nested/int").value().unwrap(), Value::from(7));
    }

    #[test]
    fn test_absent_locations_build_null_chains() {
        let missing = resolve("/foo");
        assert_eq!(missing.signature(), "Bn");
        assert!(!missing.is_actual());

        let element = resolve("/list[6]");
        assert_eq!(element.signature(), "BbE");
        assert_eq!(element.as_path(), "/list[6]");

        let deep = resolve("/nested/foo/bar");
        assert_eq!(deep.signature(), "BbBnNn");
        assert_eq!(deep.as_path(), "/nested/foo/bar");
    }

    #[test]
    fn test_quality_counts_missing_links() {
        let found = resolve("/int");
        assert_eq!(quality(&found), PERFECT_MATCH);
        let missing = resolve("/nested/foo/bar");
        assert_eq!(quality(&missing), PERFECT_MATCH - 3);
    }
}
