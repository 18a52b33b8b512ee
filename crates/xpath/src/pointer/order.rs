//! Document order between pointers.

use super::{NodePointer, PointerKind};
use std::cmp::Ordering;

/// Compares two pointers through their closest common ancestor. Pointers
/// from unrelated trees compare equal.
pub(crate) fn compare(a: &NodePointer, b: &NodePointer) -> Ordering {
    if std::ptr::eq(a, b) {
        return Ordering::Equal;
    }
    if let (PointerKind::Dom(x), PointerKind::Dom(y)) = (&a.kind, &b.kind) {
        if x.node.same_document(&y.node) {
            return x.node.compare_document_order(&y.node);
        }
    }
    if a.same_parent(b) {
        return match &a.parent {
            Some(parent) => parent.compare_children(a, b),
            None => Ordering::Equal,
        };
    }
    compare_at_depth(Some(a), depth(a), Some(b), depth(b))
}

fn depth(ptr: &NodePointer) -> usize {
    let mut depth = 0;
    let mut current = Some(ptr);
    while let Some(p) = current {
        depth += 1;
        current = p.parent.as_deref();
    }
    depth
}

fn compare_at_depth(a: Option<&NodePointer>, depth_a: usize, b: Option<&NodePointer>, depth_b: usize) -> Ordering {
    if depth_a < depth_b {
        let up = b.and_then(|p| p.parent.as_deref());
        return match compare_at_depth(a, depth_a, up, depth_b - 1) {
            Ordering::Equal => Ordering::Less,
            other => other,
        };
    }
    if depth_a > depth_b {
        let up = a.and_then(|p| p.parent.as_deref());
        return match compare_at_depth(up, depth_a - 1, b, depth_b) {
            Ordering::Equal => Ordering::Greater,
            other => other,
        };
    }
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };
    if a == b || depth_a == 1 {
        return Ordering::Equal;
    }
    let (parent_a, parent_b) = (a.parent.as_deref(), b.parent.as_deref());
    match compare_at_depth(parent_a, depth_a - 1, parent_b, depth_b - 1) {
        Ordering::Equal => parent_a.map_or(Ordering::Equal, |p| p.compare_children(a, b)),
        other => other,
    }
}

/// Sorts pointers in document order. The sort is stable, so pointers that
/// compare equal keep their relative order.
pub fn sort_in_document_order(pointers: &mut [NodePointer]) {
    pointers.sort_by(compare);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use objpath_model::{PropertyIdentifier, Record, Value};
    use std::rc::Rc;

    fn property(owner: &NodePointer, name: &str) -> NodePointer {
        let mut property = owner.property_pointer().unwrap();
        property.set_property_name(&PropertyIdentifier::unqualified(name));
        property
    }

    #[test]
    fn test_properties_sort_by_name_then_element() {
        let _ = env_logger::builder().is_test(true).try_init();
        let inner = Record::new("Leaf").with("v", 1);
        let bean = Record::new("Tree")
            .with("alpha", Value::list(vec![1.into(), 2.into()]))
            .with("beta", Value::object(inner));
        let root = NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()));
        let alpha = property(&root, "alpha");
        let mut alpha_two = alpha.clone();
        alpha_two.set_index(crate::pointer::ElementIndex::At(1));
        let beta = property(&root, "beta");
        let deep = property(&beta.value_pointer().unwrap(), "v");

        let mut pointers = vec![deep.clone(), alpha_two.clone(), beta.clone(), alpha.clone()];
        sort_in_document_order(&mut pointers);
        assert_eq!(pointers, vec![alpha, alpha_two, beta, deep]);
    }

    #[test]
    fn test_ancestor_precedes_descendant() {
        let bean = Record::new("Wrapper").with("inner", Value::object(Record::new("Inside").with("x", 1)));
        let root = NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()));
        let inner = property(&root, "inner");
        let x = property(&inner.value_pointer().unwrap(), "x");
        assert_eq!(compare(&inner, &x), Ordering::Less);
        assert_eq!(compare(&x, &inner), Ordering::Greater);
        assert_eq!(compare(&root, &x), Ordering::Less);
    }
}
