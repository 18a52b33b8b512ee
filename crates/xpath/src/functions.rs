//! The built-in function library.

use crate::ast::{CoreFunction, Expression};
use crate::contexts::{EvalContext, PointerStream, UnionContext};
use crate::engine::{Computed, Environment, compute, compute_value};
use crate::error::XPathError;
use crate::pointer::NodePointer;
use crate::value::{pointer_to_number, pointer_to_string, value_to_number};
use objpath_model::{PropertyIdentifier, Value};
use std::rc::Rc;

/// Calls `function` after checking its argument count.
pub(crate) fn call<'a>(
    function: CoreFunction,
    args: &'a [Expression],
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Computed<'a>, XPathError> {
    check_arity(function, args.len())?;
    let mut call = Call { function, args, context, env };
    use CoreFunction::*;
    match function {
        Last => call.last(),
        Position => Ok(Computed::Number(call.context.current_position() as f64)),
        Count => call.count(),
        Id => call.id(),
        Key => call.key(),
        LocalName => call.name(|name| name.local_name().to_string()),
        Name => call.name(|name| name.qualified_name()),
        NamespaceUri => call.name(|name| name.namespace_uri().unwrap_or_default().to_string()),
        String => call.string(),
        Concat => {
            let mut buffer = std::string::String::new();
            for i in 0..args.len() {
                buffer.push_str(&call.string_arg(i)?);
            }
            Ok(Computed::String(buffer))
        }
        StartsWith => {
            let (s, prefix) = (call.string_arg(0)?, call.string_arg(1)?);
            Ok(Computed::Boolean(s.starts_with(&prefix)))
        }
        Contains => {
            let (s, part) = (call.string_arg(0)?, call.string_arg(1)?);
            Ok(Computed::Boolean(s.contains(&part)))
        }
        SubstringBefore => {
            let (s, sep) = (call.string_arg(0)?, call.string_arg(1)?);
            let before = s.find(&sep).map(|i| s[..i].to_string()).unwrap_or_default();
            Ok(Computed::String(before))
        }
        SubstringAfter => {
            let (s, sep) = (call.string_arg(0)?, call.string_arg(1)?);
            let after = s.find(&sep).map(|i| s[i + sep.len()..].to_string()).unwrap_or_default();
            Ok(Computed::String(after))
        }
        Substring => call.substring(),
        StringLength => {
            let s = call.string_or_context()?;
            Ok(Computed::Number(s.chars().count() as f64))
        }
        NormalizeSpace => Ok(Computed::String(normalize_space(&call.string_arg(0)?))),
        Translate => {
            let (s, from, to) = (call.string_arg(0)?, call.string_arg(1)?, call.string_arg(2)?);
            Ok(Computed::String(translate(&s, &from, &to)))
        }
        Boolean => Ok(Computed::Boolean(call.bool_arg(0)?)),
        Not => Ok(Computed::Boolean(!call.bool_arg(0)?)),
        True => Ok(Computed::Boolean(true)),
        False => Ok(Computed::Boolean(false)),
        Lang => call.lang(),
        Number => call.number(),
        Sum => call.sum(),
        Floor => Ok(Computed::Number(call.number_arg(0)?.floor())),
        Ceiling => Ok(Computed::Number(call.number_arg(0)?.ceil())),
        Round => Ok(Computed::Number(round_half_up(call.number_arg(0)?))),
        Null => Ok(Computed::Pointer(call.env.null_pointer())),
    }
}

fn check_arity(function: CoreFunction, actual: usize) -> Result<(), XPathError> {
    let (min, max) = function.arity();
    if actual >= min && max.is_none_or(|max| actual <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    };
    Err(XPathError::ArgumentCount {
        function: function.name().to_string(),
        expected,
        actual,
    })
}

struct Call<'a, 'c> {
    function: CoreFunction,
    args: &'a [Expression],
    context: &'c mut dyn EvalContext,
    env: &'c Rc<Environment>,
}

impl<'a> Call<'a, '_> {
    fn arg(&self, i: usize) -> &'a Expression {
        &self.args[i]
    }

    fn value_arg(&mut self, i: usize) -> Result<Computed<'a>, XPathError> {
        compute_value(self.arg(i), self.context, self.env)
    }

    fn string_arg(&mut self, i: usize) -> Result<String, XPathError> {
        self.value_arg(i)?.into_string()
    }

    fn number_arg(&mut self, i: usize) -> Result<f64, XPathError> {
        self.value_arg(i)?.into_number()
    }

    fn bool_arg(&mut self, i: usize) -> Result<bool, XPathError> {
        self.value_arg(i)?.into_bool()
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::FunctionError {
            function: self.function.name().to_string(),
            message: message.into(),
        }
    }

    /// Counts the nodes of the context, then puts it back where it was.
    fn last(&mut self) -> Result<Computed<'a>, XPathError> {
        let old = self.context.current_position();
        self.context.reset();
        let mut count = 0usize;
        while self.context.next_node()? {
            count += 1;
        }
        if old != 0 {
            self.context.set_position(old)?;
        }
        Ok(Computed::Number(count as f64))
    }

    fn count(&mut self) -> Result<Computed<'a>, XPathError> {
        let count = match compute(self.arg(0), self.context, self.env)? {
            Computed::Nodes(nodes) => {
                let mut count = 0usize;
                for pointer in PointerStream::new(nodes) {
                    pointer?;
                    count += 1;
                }
                count
            }
            Computed::Pointer(pointer) => match pointer.value()? {
                Value::Null => 0,
                Value::List(items) => items.borrow().len(),
                _ => 1,
            },
            _ => 1,
        };
        Ok(Computed::Number(count as f64))
    }

    /// Registered identifiers first, then DOM elements by `id` attribute.
    fn id(&mut self) -> Result<Computed<'a>, XPathError> {
        let id = self.string_arg(0)?;
        if let Some(value) = self.env.ids.get(&id) {
            return Ok(Computed::Pointer(self.env.constant(value.clone())));
        }
        for start in [&self.env.context_pointer, &self.env.root] {
            if let Value::Node(node) = start.node()? {
                if let Some(found) = node.root().find_by_id(&id) {
                    return Ok(Computed::Pointer(NodePointer::dom_by_id(
                        found,
                        &id,
                        self.env.pointer_env.clone(),
                    )));
                }
            }
        }
        log::debug!("No node with id '{}'", id);
        Ok(Computed::Pointer(self.env.null_pointer()))
    }

    /// Nodes registered under key `name` for each value of the second
    /// argument.
    fn key(&mut self) -> Result<Computed<'a>, XPathError> {
        let name = self.string_arg(0)?;
        let values: Vec<String> = match compute(self.arg(1), self.context, self.env)? {
            Computed::Nodes(nodes) => PointerStream::new(nodes)
                .map(|p| p.and_then(|p| pointer_to_string(&p)))
                .collect::<Result<_, _>>()?,
            other => vec![other.into_string()?],
        };
        let mut pointers = Vec::new();
        if let Some(index) = self.env.keys.get(&name) {
            for value in &values {
                for target in index.get(value).into_iter().flatten() {
                    pointers.push(self.env.constant(target.clone()));
                }
            }
        }
        Ok(Computed::Nodes(Box::new(UnionContext::of_pointers(pointers))))
    }

    /// `local-name`, `name` and `namespace-uri`: a part of the name of the
    /// context node, or of the first node of the argument.
    fn name(&mut self, part: fn(&PropertyIdentifier) -> String) -> Result<Computed<'a>, XPathError> {
        let pointer = if self.args.is_empty() {
            self.context.current_node_pointer()?
        } else {
            match compute(self.arg(0), self.context, self.env)? {
                Computed::Nodes(nodes) => PointerStream::new(nodes).next().transpose()?,
                Computed::Pointer(pointer) => Some(pointer),
                _ => None,
            }
        };
        let name = pointer.and_then(|p| p.name()).map(|n| part(&n)).unwrap_or_default();
        Ok(Computed::String(name))
    }

    fn string_or_context(&mut self) -> Result<String, XPathError> {
        if !self.args.is_empty() {
            return self.string_arg(0);
        }
        match self.context.current_node_pointer()? {
            Some(pointer) => pointer_to_string(&pointer),
            None => Ok(String::new()),
        }
    }

    fn string(&mut self) -> Result<Computed<'a>, XPathError> {
        Ok(Computed::String(self.string_or_context()?))
    }

    fn number(&mut self) -> Result<Computed<'a>, XPathError> {
        if !self.args.is_empty() {
            return Ok(Computed::Number(self.number_arg(0)?));
        }
        let n = match self.context.current_node_pointer()? {
            Some(pointer) => pointer_to_number(&pointer)?,
            None => f64::NAN,
        };
        Ok(Computed::Number(n))
    }

    fn substring(&mut self) -> Result<Computed<'a>, XPathError> {
        let s = self.string_arg(0)?;
        let from = self.number_arg(1)?;
        let length = if self.args.len() == 3 { Some(self.number_arg(2)?) } else { None };
        Ok(Computed::String(substring(&s, from, length)))
    }

    fn lang(&mut self) -> Result<Computed<'a>, XPathError> {
        let lang = self.string_arg(0)?;
        let matches = match self.context.current_node_pointer()? {
            Some(pointer) => pointer.is_language(&lang),
            None => false,
        };
        Ok(Computed::Boolean(matches))
    }

    fn sum(&mut self) -> Result<Computed<'a>, XPathError> {
        match compute(self.arg(0), self.context, self.env)? {
            Computed::Nodes(nodes) => {
                let mut sum = 0.0;
                for pointer in PointerStream::new(nodes) {
                    sum += value_to_number(&pointer?.value()?);
                }
                Ok(Computed::Number(sum))
            }
            _ => Err(self.error("the argument is not a node set")),
        }
    }
}

/// `Math.round`-style rounding: halves go up, NaN rounds to 0 when used as
/// a length.
fn round_half_up(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    let floor = n.floor();
    if n - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn substring(s: &str, from: f64, length: Option<f64>) -> String {
    if from.is_nan() {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    let size = chars.len() as f64;
    let from = round_half_up(from);
    if from > size + 1.0 {
        return String::new();
    }
    let tail = |from: f64| -> String {
        let start = from.max(1.0) as usize - 1;
        chars[start..].iter().collect()
    };
    let Some(length) = length else {
        return tail(from);
    };
    let length = if length.is_nan() { 0.0 } else { round_half_up(length) };
    if length < 0.0 {
        return String::new();
    }
    let to = from + length;
    // -inf + inf is NaN
    if to.is_nan() || to < 1.0 {
        return String::new();
    }
    if to > size + 1.0 {
        return tail(from);
    }
    let start = from.max(1.0) as usize - 1;
    let end = (to as usize - 1).max(start);
    chars[start..end].iter().collect()
}

fn normalize_space(s: &str) -> String {
    s.split([' ', '\t', '\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replaces each character found in `from` by the character at the same
/// position in `to`, or drops it when `to` is shorter.
fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_rounds_and_clamps() {
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", -1.0, Some(-1.0)), "");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 1.0, Some(f64::NAN)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(substring("12345", 7.0, None), "");
        assert_eq!(substring("héllo", 2.0, Some(3.0)), "éll");
        assert_eq!(substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)), "");
        assert_eq!(substring("12345", f64::NEG_INFINITY, None), "12345");
    }

    #[test]
    fn test_normalize_space_and_translate() {
        assert_eq!(normalize_space("  a   b  "), "a b");
        assert_eq!(normalize_space("\tx\n"), "x");
        assert_eq!(translate("bar", "abc", "ABC"), "BAr");
        assert_eq!(translate("--aaa--", "abc-", "ABC"), "AAA");
    }

    #[test]
    fn test_arity_errors_name_the_function() {
        assert!(check_arity(CoreFunction::Concat, 5).is_ok());
        assert!(check_arity(CoreFunction::Substring, 3).is_ok());
        let err = check_arity(CoreFunction::Substring, 1).unwrap_err();
        assert_eq!(
            err,
            XPathError::ArgumentCount {
                function: "substring".into(),
                expected: "2 to 3".into(),
                actual: 1,
            }
        );
        assert!(check_arity(CoreFunction::Concat, 1).is_err());
        assert!(check_arity(CoreFunction::True, 1).is_err());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert!(round_half_up(f64::NAN).is_nan());
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(f64::INFINITY), f64::INFINITY);
    }
}
