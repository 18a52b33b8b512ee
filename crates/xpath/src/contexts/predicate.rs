use super::{EvalContext, inherited_order};
use crate::ast::Expression;
use crate::engine::{Computed, Environment, compute_value};
use crate::error::XPathError;
use crate::pointer::{ElementIndex, NodePointer};
use crate::value::value_to_bool;
use objpath_model::Value;
use std::rc::Rc;

/// Narrows the parent context by one bracketed predicate.
///
/// A numeric predicate selects a single position of the parent and ends the
/// set. Any other value filters parent nodes by its boolean value. A
/// `[@name = key]` predicate on a property owner looks the key up among the
/// owner's declared properties instead, so a name that is not present
/// yields no node even for maps, which answer for any key.
pub(crate) struct PredicateContext<'a> {
    parent: Box<dyn EvalContext + 'a>,
    expression: &'a Expression,
    name_key: Option<&'a Expression>,
    env: Rc<Environment>,
    /// Property selected by a name predicate.
    property: Option<NodePointer>,
    done: bool,
    position: usize,
}

impl<'a> PredicateContext<'a> {
    pub(crate) fn new(parent: Box<dyn EvalContext + 'a>, expression: &'a Expression, env: Rc<Environment>) -> Self {
        let name_key = match expression {
            Expression::NameAttributeTest { key, .. } => Some(key.as_ref()),
            _ => None,
        };
        Self {
            parent,
            expression,
            name_key,
            env,
            property: None,
            done: false,
            position: 0,
        }
    }

    /// An unselected property pointer of the parent's current node, if that
    /// node owns properties.
    fn owner_property(&mut self) -> Result<Option<NodePointer>, XPathError> {
        let Some(current) = self.parent.current_node_pointer()? else {
            return Ok(None);
        };
        let owner = current.value_pointer()?;
        if !owner.is_property_owner() {
            return Ok(None);
        }
        Ok(owner.property_pointer())
    }

    fn set_position_standard(&mut self, position: usize) -> Result<bool, XPathError> {
        if position < self.position {
            self.reset();
        }
        while self.position < position {
            if !self.next_node()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl EvalContext for PredicateContext<'_> {
    fn current_node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        if self.position == 0 && !self.set_position(1)? {
            return Ok(None);
        }
        match &self.property {
            Some(property) => Ok(Some(property.value_pointer()?)),
            None => self.parent.current_node_pointer(),
        }
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn next_node(&mut self) -> Result<bool, XPathError> {
        if self.done {
            return Ok(false);
        }
        while self.parent.next_node()? {
            self.property = None;
            if let Some(key_expression) = self.name_key {
                if let Some(mut property) = self.owner_property()? {
                    let key = compute_value(key_expression, self.parent.as_mut(), &self.env)?.into_string()?;
                    let declared = property
                        .property_names()
                        .into_iter()
                        .rev()
                        .find(|name| name.local_name() == key);
                    if let Some(name) = declared {
                        property.set_property_name(&name);
                        self.property = Some(property);
                        self.position += 1;
                        return Ok(true);
                    }
                    continue;
                }
            }

            let value = match compute_value(self.expression, self.parent.as_mut(), &self.env)? {
                Computed::Nodes(mut nodes) => match nodes.single_node_pointer()? {
                    Some(pointer) => Computed::Pointer(pointer),
                    None => continue,
                },
                other => other,
            };
            let node = match value {
                Computed::Pointer(pointer) => pointer.node()?,
                Computed::Number(n) => Value::Number(n),
                Computed::Boolean(b) => Value::Boolean(b),
                Computed::String(s) => Value::String(s),
                Computed::Nodes(_) => Value::Null,
            };
            if let Value::Number(n) = node {
                self.position += 1;
                self.done = true;
                // Truncated like an integer cast; NaN selects nothing.
                let target = n as i64;
                if target < 1 {
                    return Ok(false);
                }
                return self.parent.set_position(target as usize);
            }
            if value_to_bool(&node) {
                self.position += 1;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next_set(&mut self) -> Result<bool, XPathError> {
        self.reset();
        self.parent.next_set()
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        if self.name_key.is_none() {
            return self.set_position_standard(position);
        }
        let Some(property) = self.property.as_mut() else {
            return self.set_position_standard(position);
        };
        if position < 1 || position > property.length() {
            return Ok(false);
        }
        property.set_index(ElementIndex::At(position - 1));
        Ok(true)
    }

    fn reset(&mut self) {
        self.position = 0;
        self.parent.reset();
        self.done = false;
        self.property = None;
    }

    fn document_order(&self) -> i32 {
        inherited_order(self.parent.as_ref())
    }
}
