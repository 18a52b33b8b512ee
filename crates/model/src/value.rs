//! The dynamically-typed values an object graph is made of.

use crate::bean::Bean;
use crate::dom::DomNode;
use crate::dynamic::DynamicBag;
use crate::error::ModelError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type BeanRef = Rc<RefCell<dyn Bean>>;
pub type BagRef = Rc<RefCell<dyn DynamicBag>>;

/// A value held by a property, a map entry, a collection slot or a variable.
///
/// Composite values are shared handles: cloning a `Value::List` or a
/// `Value::Object` clones the handle, not the data, so writes made through a
/// pointer are visible to every holder.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    List(ListRef),
    Object(BeanRef),
    Map(BagRef),
    Node(DomNode),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn object<B: Bean + 'static>(bean: B) -> Self {
        Value::Object(Rc::new(RefCell::new(bean)))
    }

    pub fn map<M: DynamicBag + 'static>(bag: M) -> Self {
        Value::Map(Rc::new(RefCell::new(bag)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// Element count of a collection; any other value counts as one element.
    pub fn length(&self) -> usize {
        match self {
            Value::List(items) => items.borrow().len(),
            _ => 1,
        }
    }

    /// The element at `index`. A non-collection is its own element 0.
    /// Out-of-range reads yield `Null`.
    pub fn element(&self, index: usize) -> Value {
        match self {
            Value::List(items) => items.borrow().get(index).cloned().unwrap_or(Value::Null),
            other if index == 0 => other.clone(),
            _ => Value::Null,
        }
    }

    pub fn set_element(&self, index: usize, value: Value) -> Result<(), ModelError> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(ModelError::IndexOutOfRange { index, len }),
                }
            }
            other => Err(ModelError::NotACollection {
                type_name: other.type_name(),
                index,
            }),
        }
    }

    pub fn remove_element(&self, index: usize) -> Result<Value, ModelError> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                if index < items.len() {
                    Ok(items.remove(index))
                } else {
                    Err(ModelError::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })
                }
            }
            other => Err(ModelError::NotACollection {
                type_name: other.type_name(),
                index,
            }),
        }
    }

    /// Pads a collection with `Null` until it holds at least `len` elements.
    pub fn expand_to(&self, len: usize) -> Result<(), ModelError> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                if items.len() < len {
                    log::debug!("Expanding collection from {} to {} elements", items.len(), len);
                    items.resize(len, Value::Null);
                }
                Ok(())
            }
            other => Err(ModelError::NotACollection {
                type_name: other.type_name(),
                index: len.saturating_sub(1),
            }),
        }
    }

    /// Identity comparison: true when both values are the same shared
    /// instance. Scalars never share an identity.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Object(bean) => bean
                .try_borrow()
                .map(|b| b.type_name().to_string())
                .unwrap_or_else(|_| "object".to_string()),
            Value::Map(_) => "map".to_string(),
            Value::Node(_) => "node".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&DomNode> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => write!(f, "[..]"),
            },
            Value::Object(bean) => match bean.try_borrow() {
                Ok(bean) => write!(f, "{:?}", bean),
                Err(_) => write!(f, "<object>"),
            },
            Value::Map(bag) => match bag.try_borrow() {
                Ok(bag) => write!(f, "Map{:?}", bag.keys()),
                Err(_) => write!(f, "Map{{..}}"),
            },
            Value::Node(node) => write!(f, "{:?}", node),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<DomNode> for Value {
    fn from(node: DomNode) -> Self {
        Value::Node(node)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_access_is_lenient() {
        let list = Value::list(vec![1.into(), 2.into()]);
        assert_eq!(list.element(1), Value::Number(2.0));
        assert_eq!(list.element(5), Value::Null);

        let scalar = Value::from("x");
        assert_eq!(scalar.length(), 1);
        assert_eq!(scalar.element(0), Value::from("x"));
        assert_eq!(scalar.element(1), Value::Null);
    }

    #[test]
    fn test_shared_list_mutation() {
        let list = Value::list(vec![1.into()]);
        let alias = list.clone();
        alias.expand_to(3).unwrap();
        alias.set_element(2, "z".into()).unwrap();
        assert_eq!(list.length(), 3);
        assert_eq!(list.element(1), Value::Null);
        assert_eq!(list.element(2), Value::from("z"));
        assert!(list.same_instance(&alias));
    }

    #[test]
    fn test_set_element_errors() {
        let list = Value::list(vec![]);
        assert_eq!(
            list.set_element(0, 1.into()),
            Err(ModelError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert!(matches!(
            Value::from(1).set_element(0, 2.into()),
            Err(ModelError::NotACollection { .. })
        ));
    }

    #[test]
    fn test_scalars_have_no_identity() {
        assert!(!Value::from(1).same_instance(&Value::from(1)));
        assert_eq!(Value::from(1), Value::from(1));
    }
}
