//! Evaluation contexts: lazily evaluated node sets chained step by step.
//!
//! Each location step wraps the context of the previous step. A context
//! iterates in "sets": for every node of its parent it produces the nodes
//! reachable from that node. `next_set` moves to the next parent node,
//! `next_node` moves within the current set.

mod ancestor;
mod attribute;
mod child;
mod descendant;
mod initial;
mod parent;
mod preceding_following;
mod predicate;
mod self_axis;
mod union;

pub(crate) use ancestor::AncestorContext;
pub(crate) use attribute::AttributeContext;
pub(crate) use child::ChildContext;
pub(crate) use descendant::DescendantContext;
pub(crate) use initial::InitialContext;
pub(crate) use parent::ParentContext;
pub(crate) use preceding_following::PrecedingOrFollowingContext;
pub(crate) use predicate::PredicateContext;
pub(crate) use self_axis::SelfContext;
pub(crate) use union::UnionContext;

use crate::error::XPathError;
use crate::pointer::NodePointer;

pub trait EvalContext {
    /// The node at the current position. At position 0 some contexts peek
    /// at the first node without moving.
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError>;

    /// 1-based; 0 before the first node.
    fn current_position(&self) -> usize;

    fn next_node(&mut self) -> Result<bool, XPathError>;

    /// Moves to the next non-empty set of nodes.
    fn next_set(&mut self) -> Result<bool, XPathError>;

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError>;

    /// Rewinds iteration within the current set.
    fn reset(&mut self);

    /// 1 when nodes come out in document order and need sorting, -1 when
    /// they come out in reverse, 0 when the natural order is kept.
    fn document_order(&self) -> i32 {
        0
    }

    fn is_child_ordering_required(&self) -> bool {
        self.document_order() != 0
    }

    /// The first node of the first non-empty set.
    fn single_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        self.reset();
        while self.next_set()? {
            if self.next_node()? {
                return self.current_node_pointer();
            }
        }
        Ok(None)
    }
}

/// Set-advancing logic shared by every context that has a parent.
#[derive(Debug, Default)]
pub(crate) struct SetCursor {
    started: bool,
}

impl SetCursor {
    /// Moves `parent` to its next node, crossing into later parent sets as
    /// needed. The caller resets itself first.
    pub(crate) fn advance(&mut self, parent: &mut dyn EvalContext) -> Result<bool, XPathError> {
        if self.started {
            if parent.next_node()? {
                return Ok(true);
            }
        } else {
            self.started = true;
        }
        while parent.next_set()? {
            if parent.next_node()? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Document order of a context whose parent may demand ordered children.
pub(crate) fn inherited_order(parent: &dyn EvalContext) -> i32 {
    if parent.is_child_ordering_required() { 1 } else { 0 }
}

/// Sorts in document order, or in reverse for reverse axes.
pub(crate) fn sort_pointers(pointers: &mut [NodePointer], order: i32) {
    if order < 0 {
        pointers.sort_by(|a, b| b.compare_document_order(a));
    } else {
        pointers.sort_by(|a, b| a.compare_document_order(b));
    }
}

/// Adds `pointer` unless an equal pointer is already collected.
pub(crate) fn push_unique(pointers: &mut Vec<NodePointer>, pointer: NodePointer) {
    if !pointers.contains(&pointer) {
        pointers.push(pointer);
    }
}

/// Every node of every set of `context`, deduplicated.
pub(crate) fn collect_all(context: &mut dyn EvalContext) -> Result<Vec<NodePointer>, XPathError> {
    let mut pointers = Vec::new();
    while context.next_set()? {
        while context.next_node()? {
            if let Some(pointer) = context.current_node_pointer()? {
                push_unique(&mut pointers, pointer);
            }
        }
    }
    Ok(pointers)
}

/// Iterates the nodes of a context. Contexts with a document order are
/// drained and sorted up front; the others are walked lazily.
pub struct PointerStream<'a> {
    context: Box<dyn EvalContext + 'a>,
    sorted: Option<std::vec::IntoIter<NodePointer>>,
    done: bool,
}

impl<'a> PointerStream<'a> {
    pub(crate) fn new(context: Box<dyn EvalContext + 'a>) -> Self {
        Self {
            context,
            sorted: None,
            done: false,
        }
    }

    fn step(&mut self) -> Result<bool, XPathError> {
        if self.context.current_position() != 0 && self.context.next_node()? {
            return Ok(true);
        }
        while self.context.next_set()? {
            if self.context.next_node()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn advance(&mut self) -> Result<Option<NodePointer>, XPathError> {
        let order = self.context.document_order();
        if order != 0 {
            if self.sorted.is_none() {
                let mut pointers = collect_all(self.context.as_mut())?;
                sort_pointers(&mut pointers, order);
                self.sorted = Some(pointers.into_iter());
            }
            return Ok(self.sorted.as_mut().and_then(Iterator::next));
        }
        if self.step()? {
            self.context.current_node_pointer()
        } else {
            Ok(None)
        }
    }
}

impl Iterator for PointerStream<'_> {
    type Item = Result<NodePointer, XPathError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(pointer)) => Some(Ok(pointer)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Computed, Environment, compute};
    use crate::iter::{NameTest, StepTest};
    use crate::parser::parse_expression;
    use crate::pointer::PointerEnv;
    use indexmap::IndexMap;
    use objpath_model::{Record, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) fn bean_root() -> NodePointer {
        let bean = Record::new("Shelf")
            .with("a", 1)
            .with_collection("b", vec![10.into(), 20.into(), 30.into()])
            .with("c", "x");
        NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()))
    }

    fn paths(stream: PointerStream<'_>) -> Vec<String> {
        stream.map(|p| p.unwrap().as_path()).collect()
    }

    #[test]
    fn test_stream_walks_child_context_lazily() {
        let _ = env_logger::builder().is_test(true).try_init();
        let initial = InitialContext::new(Some(bean_root()));
        let child = ChildContext::new(Box::new(initial), StepTest::Name(NameTest::new("b")), false, false);
        assert_eq!(paths(PointerStream::new(Box::new(child))), vec!["/b[1]", "/b[2]", "/b[3]"]);
    }

    /// Builds the context chain for `path` over [`bean_root`] and hands it
    /// to `check`.
    fn with_context(path: &str, check: impl FnOnce(&mut dyn EvalContext)) {
        let expression = parse_expression(path).unwrap();
        let env = Rc::new(Environment::new(bean_root(), Rc::new(RefCell::new(IndexMap::new()))));
        let mut initial = env.initial_context();
        match compute(&expression, initial.as_mut(), &env).unwrap() {
            Computed::Nodes(mut context) => check(context.as_mut()),
            _ => panic!("'{}' is not a node set", path),
        }
    }

    fn drain_set(context: &mut dyn EvalContext) -> Vec<NodePointer> {
        let mut pointers = Vec::new();
        while context.next_node().unwrap() {
            pointers.push(context.current_node_pointer().unwrap().unwrap());
        }
        pointers
    }

    const SHAPES: [&str; 6] = [
        "*",
        "b[. > 10]",
        "*[2]",
        "b[last()]",
        "/c/preceding-sibling::*",
        "/*[position() > 1]",
    ];

    #[test]
    fn test_peeking_at_position_zero_is_stable() {
        for path in SHAPES {
            with_context(path, |context| {
                assert!(context.next_set().unwrap(), "{}", path);
                let first = context.current_node_pointer().unwrap();
                let second = context.current_node_pointer().unwrap();
                assert!(first.is_some(), "{}", path);
                assert_eq!(first, second, "{}", path);

                context.reset();
                let walked = drain_set(context);
                assert_eq!(first.as_ref(), walked.first(), "{}", path);
            });
        }
    }

    #[test]
    fn test_rewind_matches_sequential_walk() {
        for path in SHAPES {
            with_context(path, |context| {
                assert!(context.next_set().unwrap(), "{}", path);
                let walked = drain_set(context);
                assert!(!walked.is_empty(), "{}", path);
                for (i, expected) in walked.iter().enumerate() {
                    context.reset();
                    assert!(context.set_position(i + 1).unwrap(), "{} at {}", path, i + 1);
                    let pointer = context.current_node_pointer().unwrap();
                    assert_eq!(pointer.as_ref(), Some(expected), "{} at {}", path, i + 1);
                }
            });
        }
    }

    #[test]
    fn test_stream_sorts_reverse_axes() {
        let initial = InitialContext::new(Some(bean_root()));
        let child = ChildContext::new(Box::new(initial), StepTest::Name(NameTest::new("b")), false, false);
        let ancestors = AncestorContext::new(Box::new(child), StepTest::Node, true);
        let stream = PointerStream::new(Box::new(ancestors));
        // Nearest first; the value pointer of each element collapses onto
        // its property pointer.
        let collected = paths(stream);
        assert_eq!(collected.last().map(String::as_str), Some("/"));
        assert_eq!(collected.first().map(String::as_str), Some("/b[3]"));
    }
}
