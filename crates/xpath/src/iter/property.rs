//! Iteration over the properties of a bean or map.
//!
//! Positions are mapped onto (property, element) addresses by walking the
//! per-property length table, so `set_position` is random access without a
//! materialized list.

use super::NodeIterator;
use crate::error::XPathError;
use crate::pointer::{ElementIndex, NodePointer};
use objpath_model::PropertyIdentifier;

/// Property index before one has been chosen.
const UNSPECIFIED: isize = isize::MIN;

pub(crate) struct PropertyIterator {
    reverse: bool,
    /// `None` iterates every property.
    name: Option<PropertyIdentifier>,
    property: NodePointer,
    empty: bool,
    start_index: isize,
    target_ready: bool,
    position: usize,
    start_property_index: isize,
    include_start: bool,
}

impl PropertyIterator {
    pub(crate) fn new(
        owner: &NodePointer,
        name: Option<PropertyIdentifier>,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Self, XPathError> {
        let mut property = owner
            .property_pointer()
            .ok_or_else(|| XPathError::invalid_access(owner.as_path(), "not a property owner"))?;
        property.set_attribute(name.as_ref().is_some_and(|n| n.is_attribute()));
        if let Some(name) = &name {
            property.set_property_name(name);
        }
        let mut iterator = Self {
            reverse,
            name,
            property,
            empty: false,
            start_index: 0,
            target_ready: false,
            position: 0,
            start_property_index: 0,
            include_start: true,
        };
        if reverse {
            iterator.start_property_index = UNSPECIFIED;
            iterator.start_index = -1;
        }
        if let Some(start) = start_with {
            let mut current = Some(start);
            while let Some(candidate) = current {
                if candidate.immediate_parent().is_some_and(|p| p == owner) {
                    break;
                }
                current = candidate.immediate_parent();
            }
            let start = current.ok_or_else(|| XPathError::InvalidStartPointer(start.as_path()))?;
            iterator.start_property_index = start.property_index().map_or(UNSPECIFIED, |i| i as isize);
            iterator.start_index = start.index().collapsed() as isize;
            iterator.include_start = false;
        }
        Ok(iterator)
    }

    fn length(&self) -> isize {
        self.property.length() as isize
    }

    fn select_element(&mut self, index: isize) {
        self.property.set_index(ElementIndex::At(index.max(0) as usize));
    }

    fn reset(&mut self) {
        self.position = 0;
        self.target_ready = false;
    }

    fn set_position_individual(&mut self, position: usize) -> bool {
        self.position = position;
        if position < 1 {
            return false;
        }
        if !self.target_ready {
            self.prepare_individual();
        }
        if self.empty {
            return false;
        }
        let length = self.length();
        let position = position as isize;
        let index = if !self.reverse {
            let mut index = position + self.start_index;
            if !self.include_start {
                index += 1;
            }
            if index > length {
                return false;
            }
            index
        } else {
            let end = if self.start_index == -1 { length - 1 } else { self.start_index };
            let mut index = end - position + 2;
            if !self.include_start {
                index -= 1;
            }
            if index < 1 {
                return false;
            }
            index
        };
        self.select_element(index - 1);
        true
    }

    fn set_position_all(&mut self, position: usize) -> bool {
        self.position = position;
        if position < 1 {
            return false;
        }
        let position = position as isize;
        let count = self.property.property_count() as isize;
        let mut index = 1;
        if !self.reverse {
            let first = self.start_property_index.max(0);
            for i in first..count {
                self.property.set_property_index(i as usize);
                let mut length = self.length();
                let offset;
                if i == self.start_property_index {
                    length -= self.start_index;
                    if !self.include_start {
                        length -= 1;
                    }
                    offset = self.start_index + position - index + if self.include_start { 0 } else { 1 };
                } else {
                    offset = position - index;
                }
                if index <= position && position < index + length {
                    self.select_element(offset);
                    return true;
                }
                index += length;
            }
        } else {
            let start = if self.start_property_index == UNSPECIFIED {
                count - 1
            } else {
                self.start_property_index
            };
            for i in (0..=start).rev() {
                self.property.set_property_index(i as usize);
                let mut length = self.length();
                let offset;
                if i == self.start_property_index {
                    let end = if self.start_index == -1 { length - 1 } else { self.start_index };
                    length = end + 1;
                    if self.include_start {
                        offset = end - position + 1;
                    } else {
                        offset = end - position;
                        length -= 1;
                    }
                } else {
                    offset = length - (position - index) - 1;
                }
                if index <= position && position < index + length {
                    self.select_element(offset);
                    return true;
                }
                index += length;
            }
        }
        false
    }

    /// Finds the named property, scanning from the start property in the
    /// iteration direction.
    fn prepare_individual(&mut self) {
        self.target_ready = true;
        self.empty = true;
        let Some(name) = self.name.clone() else {
            return;
        };
        let names = self.property.property_names();
        let count = names.len() as isize;
        if !self.reverse {
            if self.start_property_index == UNSPECIFIED {
                self.start_property_index = 0;
            }
            for i in self.start_property_index.max(0)..count {
                if names[i as usize] == name {
                    self.property.set_property_index(i as usize);
                    if i != self.start_property_index {
                        self.start_index = 0;
                        self.include_start = true;
                    }
                    self.empty = false;
                    break;
                }
            }
        } else {
            if self.start_property_index == UNSPECIFIED {
                self.start_property_index = count - 1;
            }
            let mut i = self.start_property_index.min(count - 1);
            while i >= 0 {
                if names[i as usize] == name {
                    self.property.set_property_index(i as usize);
                    if i != self.start_property_index {
                        self.start_index = -1;
                        self.include_start = true;
                    }
                    self.empty = false;
                    break;
                }
                i -= 1;
            }
        }
    }
}

impl NodeIterator for PropertyIterator {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        Ok(match self.name {
            Some(_) => self.set_position_individual(position),
            None => self.set_position_all(position),
        })
    }

    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 {
            if self.name.is_some() {
                if !self.target_ready {
                    self.prepare_individual();
                }
                if self.empty {
                    return Ok(None);
                }
            } else {
                if !self.set_position_all(1) {
                    return Ok(None);
                }
                self.reset();
            }
        }
        match self.property.value_pointer() {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                log::debug!("Value of '{}' replaced by a null pointer: {}", self.property.as_path(), e);
                let Some(owner) = self.property.immediate_parent() else {
                    return Err(e);
                };
                let name = self.property.name().map(|n| n.local_name().to_string()).unwrap_or_default();
                let mut missing = owner.null_property(&name, self.property.is_attribute());
                missing.set_index(self.property.index());
                Ok(Some(missing.value_pointer()?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use indexmap::IndexMap;
    use objpath_model::{Record, Value};
    use std::rc::Rc;

    fn owner() -> NodePointer {
        let bean = Record::new("Shelf")
            .with("a", 1)
            .with_collection("b", vec![10.into(), 20.into(), 30.into()])
            .with("c", "x");
        NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()))
    }

    fn collect(mut it: PropertyIterator) -> Vec<String> {
        let mut paths = Vec::new();
        let mut position = 1;
        while it.set_position(position).unwrap() {
            paths.push(it.node_pointer().unwrap().unwrap().as_path());
            position += 1;
        }
        paths
    }

    #[test]
    fn test_all_properties_forward_and_reverse() {
        let _ = env_logger::builder().is_test(true).try_init();
        let owner = owner();
        let forward = collect(PropertyIterator::new(&owner, None, false, None).unwrap());
        assert_eq!(forward, vec!["/a", "/b[1]", "/b[2]", "/b[3]", "/c"]);
        let reverse = collect(PropertyIterator::new(&owner, None, true, None).unwrap());
        assert_eq!(reverse, vec!["/c", "/b[3]", "/b[2]", "/b[1]", "/a"]);
    }

    #[test]
    fn test_random_access_positions() {
        let owner = owner();
        let mut it = PropertyIterator::new(&owner, None, false, None).unwrap();
        assert!(it.set_position(4).unwrap());
        assert_eq!(it.node_pointer().unwrap().unwrap().as_path(), "/b[3]");
        assert!(it.set_position(2).unwrap());
        assert_eq!(it.node_pointer().unwrap().unwrap().as_path(), "/b[1]");
        assert!(!it.set_position(6).unwrap());
    }

    #[test]
    fn test_named_property_and_absent_name() {
        let owner = owner();
        let b = collect(PropertyIterator::new(&owner, Some(PropertyIdentifier::unqualified("b")), false, None).unwrap());
        assert_eq!(b, vec!["/b[1]", "/b[2]", "/b[3]"]);
        let mut missing =
            PropertyIterator::new(&owner, Some(PropertyIdentifier::unqualified("zz")), false, None).unwrap();
        assert!(!missing.set_position(1).unwrap());
        assert!(missing.node_pointer().unwrap().is_none());
    }

    #[test]
    fn test_start_with_excludes_start() {
        let owner = owner();
        let mut first = PropertyIterator::new(&owner, None, false, None).unwrap();
        assert!(first.set_position(3).unwrap());
        let start = first.node_pointer().unwrap().unwrap();
        assert_eq!(start.as_path(), "/b[2]");

        let following = collect(PropertyIterator::new(&owner, None, false, Some(&start)).unwrap());
        assert_eq!(following, vec!["/b[3]", "/c"]);
        let preceding = collect(PropertyIterator::new(&owner, None, true, Some(&start)).unwrap());
        assert_eq!(preceding, vec!["/b[1]", "/a"]);
    }

    /// Owners with scalars, empty and non-empty collections, a null and
    /// map keys.
    fn varied_owners() -> Vec<NodePointer> {
        let env = Rc::new(PointerEnv::default());
        let mut map = IndexMap::new();
        map.insert("k2".to_string(), Value::list(vec!["p".into(), "q".into()]));
        map.insert("k1".to_string(), Value::from(1));
        let owners = vec![
            Value::object(Record::new("Empty")),
            Value::object(
                Record::new("Shelf")
                    .with("a", 1)
                    .with_collection("b", vec![10.into(), 20.into(), 30.into()])
                    .with("c", "x"),
            ),
            Value::object(
                Record::new("Mixed")
                    .with_collection("first", vec![1.into(), 2.into()])
                    .with("mid", Value::Null)
                    .with_collection("none", vec![])
                    .with_collection("last", vec!["w".into(), "x".into(), "y".into(), "z".into()]),
            ),
            Value::map(map),
        ];
        owners.into_iter().map(|owner| NodePointer::root(owner, env.clone())).collect()
    }

    fn assert_mirrored(forward: &[String], reverse: &[String], label: &str) {
        let n = forward.len();
        assert_eq!(n, reverse.len(), "{}", label);
        for i in 0..n {
            assert_eq!(forward[i], reverse[n - 1 - i], "{} at {}", label, i + 1);
        }
    }

    #[test]
    fn test_reverse_positions_mirror_forward_positions() {
        for owner in varied_owners() {
            let label = owner.as_path();
            let forward = collect(PropertyIterator::new(&owner, None, false, None).unwrap());
            let reverse = collect(PropertyIterator::new(&owner, None, true, None).unwrap());
            assert_mirrored(&forward, &reverse, &label);

            let names = owner.property_pointer().unwrap().property_names();
            for name in names {
                let forward = collect(PropertyIterator::new(&owner, Some(name.clone()), false, None).unwrap());
                let reverse = collect(PropertyIterator::new(&owner, Some(name.clone()), true, None).unwrap());
                assert_mirrored(&forward, &reverse, &format!("{} {}", label, name));
            }
        }
    }

    #[test]
    fn test_start_with_splits_forward_order() {
        for owner in varied_owners() {
            let all = collect(PropertyIterator::new(&owner, None, false, None).unwrap());
            for position in 1..=all.len() {
                let mut it = PropertyIterator::new(&owner, None, false, None).unwrap();
                assert!(it.set_position(position).unwrap());
                let start = it.node_pointer().unwrap().unwrap();

                let mut preceding = collect(PropertyIterator::new(&owner, None, true, Some(&start)).unwrap());
                let following = collect(PropertyIterator::new(&owner, None, false, Some(&start)).unwrap());
                preceding.reverse();
                preceding.push(start.as_path());
                preceding.extend(following);
                assert_eq!(preceding, all, "split at {}", position);
            }
        }
    }

    #[test]
    fn test_failing_length_is_treated_as_empty() {
        let bean = Record::new("Fragile")
            .with("a", 1)
            .with_failing("boom", "exploded")
            .with("c", 2);
        let owner = NodePointer::root(Value::object(bean), Rc::new(PointerEnv::default()));
        let forward = collect(PropertyIterator::new(&owner, None, false, None).unwrap());
        assert_eq!(forward, vec!["/a", "/c"]);
        let reverse = collect(PropertyIterator::new(&owner, None, true, None).unwrap());
        assert_eq!(reverse, vec!["/c", "/a"]);
        let boom = PropertyIterator::new(&owner, Some(PropertyIdentifier::unqualified("boom")), false, None).unwrap();
        assert!(collect(boom).is_empty());
    }

    #[test]
    fn test_start_with_must_descend_from_owner() {
        let owner = owner();
        let stranger = NodePointer::root(Value::from(1), owner.env.clone());
        let result = PropertyIterator::new(&owner, None, false, Some(&stranger));
        assert!(matches!(result, Err(XPathError::InvalidStartPointer(_))));
    }
}
