//! Expression results and the XPath 1.0 conversions between them.

use crate::error::XPathError;
use crate::pointer::{NodePointer, PointerKind};
use objpath_model::Value;
use std::fmt;

/// Represents the possible result types of an expression evaluation.
#[derive(Debug, Clone)]
pub enum XPathValue {
    NodeSet(Vec<NodePointer>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl XPathValue {
    /// Coerces the value to a boolean as per XPath 1.0 rules. A node set is
    /// true when its first node exists.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => nodes.first().is_some_and(|p| {
                pointer_to_bool(p).unwrap_or_else(|e| {
                    log::debug!("'{}' read as false: {}", p, e);
                    false
                })
            }),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or(f64::NAN, |p| p.value().map_or(f64::NAN, |v| value_to_number(&v))),
        }
    }

    /// The nodes of a node set, or an empty slice for atomic values.
    pub fn nodes(&self) -> &[NodePointer] {
        match self {
            XPathValue::NodeSet(nodes) => nodes,
            _ => &[],
        }
    }
}

impl fmt::Display for XPathValue {
    /// Coerces the value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => {
                let first = nodes.first().and_then(|p| p.value().ok());
                write!(f, "{}", first.map(|v| value_to_string(&v)).unwrap_or_default())
            }
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Renders a number the way XPath does: integers without a fraction,
/// `NaN` and `Infinity` spelled out.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parses the XPath `Number` production with optional surrounding
/// whitespace and a leading minus. Anything else is NaN.
pub(crate) fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !well_formed {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Node(node) => node.string_value(),
        Value::List(items) => items.borrow().first().map(value_to_string).unwrap_or_default(),
        other => format!("{:?}", other),
    }
}

pub(crate) fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(true) => 1.0,
        Value::Boolean(false) => 0.0,
        Value::Null => f64::NAN,
        other => parse_number(&value_to_string(other)),
    }
}

pub(crate) fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::List(items) => !items.borrow().is_empty(),
        Value::Object(_) | Value::Map(_) | Value::Node(_) => true,
    }
}

/// A pointer is true when it addresses an existing location. A variable
/// is judged by the value it holds.
pub(crate) fn pointer_to_bool(pointer: &NodePointer) -> Result<bool, XPathError> {
    if let PointerKind::Variable(_) = pointer.kind {
        return Ok(value_to_bool(&pointer.node()?));
    }
    Ok(pointer.value_pointer()?.is_actual())
}

pub(crate) fn pointer_to_string(pointer: &NodePointer) -> Result<String, XPathError> {
    Ok(value_to_string(&pointer.value()?))
}

pub(crate) fn pointer_to_number(pointer: &NodePointer) -> Result<f64, XPathError> {
    Ok(value_to_number(&pointer.value()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerEnv;
    use std::rc::Rc;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_parse_number_accepts_only_xpath_numbers() {
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number("-.5"), -0.5);
        assert!(parse_number("").is_nan());
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("1.2.3").is_nan());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&Value::from(true)), "true");
        assert_eq!(value_to_string(&Value::list(vec!["a".into(), "b".into()])), "a");
        assert_eq!(value_to_number(&Value::from(false)), 0.0);
        assert_eq!(value_to_number(&Value::from("7")), 7.0);
        assert!(value_to_number(&Value::Null).is_nan());
        assert!(!value_to_bool(&Value::from("")));
        assert!(!value_to_bool(&Value::list(vec![])));
    }

    #[test]
    fn test_xpath_value_coercions() {
        let _ = env_logger::builder().is_test(true).try_init();
        let env = Rc::new(PointerEnv::default());
        let set = XPathValue::NodeSet(vec![NodePointer::root("42".into(), env)]);
        assert!(set.to_bool());
        assert_eq!(set.to_number(), 42.0);
        assert_eq!(set.to_string(), "42");
        assert!(!XPathValue::NodeSet(vec![]).to_bool());
        assert!(XPathValue::NodeSet(vec![]).to_number().is_nan());
        assert_eq!(XPathValue::Number(1.0).to_string(), "1");
        assert!(!XPathValue::Number(f64::NAN).to_bool());
    }
}
