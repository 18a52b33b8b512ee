//! Logical, comparison and arithmetic operators.

use crate::ast::{BinaryOperator, Expression};
use crate::contexts::{EvalContext, PointerStream};
use crate::engine::{Computed, Environment, compute, compute_value};
use crate::error::XPathError;
use crate::value::{value_to_bool, value_to_number, value_to_string};
use objpath_model::Value;
use std::rc::Rc;

pub(crate) fn binary<'a>(
    left: &'a Expression,
    op: BinaryOperator,
    right: &'a Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<Computed<'a>, XPathError> {
    use BinaryOperator::*;
    let result = match op {
        Or => Computed::Boolean(
            compute_value(left, context, env)?.into_bool()? || compute_value(right, context, env)?.into_bool()?,
        ),
        And => Computed::Boolean(
            compute_value(left, context, env)?.into_bool()? && compute_value(right, context, env)?.into_bool()?,
        ),
        Equals => Computed::Boolean(equals(left, right, false, context, env)?),
        NotEquals => Computed::Boolean(equals(left, right, true, context, env)?),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            Computed::Boolean(relational(left, op, right, context, env)?)
        }
        Plus | Minus | Multiply | Divide | Modulo => {
            let l = compute_value(left, context, env)?.into_number()?;
            let r = compute_value(right, context, env)?.into_number()?;
            Computed::Number(arithmetic(op, l, r))
        }
        Union => {
            return Err(XPathError::TypeError("union is evaluated as a node set".to_string()));
        }
    };
    Ok(result)
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> f64 {
    match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        // Truncating remainder, sign of the dividend.
        BinaryOperator::Modulo => l % r,
        _ => f64::NAN,
    }
}

/// `=`, or `!=` when `invert` is set. Node sets compare existentially: the
/// result is true if some pair of values satisfies the comparison.
pub(crate) fn equals(
    left: &Expression,
    right: &Expression,
    invert: bool,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<bool, XPathError> {
    let l = compute(left, context, env)?;
    let r = compute(right, context, env)?;
    if let (Computed::Pointer(a), Computed::Pointer(b)) = (&l, &r) {
        if a == b {
            return Ok(!invert);
        }
    }
    if matches!(l, Computed::Boolean(_)) || matches!(r, Computed::Boolean(_)) {
        return Ok((l.into_bool()? == r.into_bool()?) ^ invert);
    }
    let l = atoms(l)?;
    let r = atoms(r)?;
    Ok(l.iter().any(|a| r.iter().any(|b| atoms_equal(a, b) ^ invert)))
}

/// Equality of two single values: booleans win over numbers, numbers over
/// strings. NaN equals nothing.
fn atoms_equal(a: &Value, b: &Value) -> bool {
    if matches!(a, Value::Boolean(_)) || matches!(b, Value::Boolean(_)) {
        return value_to_bool(a) == value_to_bool(b);
    }
    if matches!(a, Value::Number(_)) || matches!(b, Value::Number(_)) {
        let (x, y) = (value_to_number(a), value_to_number(b));
        return !x.is_nan() && !y.is_nan() && x == y;
    }
    if matches!(a, Value::String(_)) || matches!(b, Value::String(_)) {
        return value_to_string(a) == value_to_string(b);
    }
    a == b
}

fn relational(
    left: &Expression,
    op: BinaryOperator,
    right: &Expression,
    context: &mut dyn EvalContext,
    env: &Rc<Environment>,
) -> Result<bool, XPathError> {
    let l = compute(left, context, env)?;
    let r = compute(right, context, env)?;
    if matches!(l, Computed::Boolean(_)) || matches!(r, Computed::Boolean(_)) {
        let as_number = |b: bool| if b { 1.0 } else { 0.0 };
        return Ok(compare(op, as_number(l.into_bool()?), as_number(r.into_bool()?)));
    }
    let l: Vec<f64> = atoms(l)?.iter().map(value_to_number).collect();
    let r: Vec<f64> = atoms(r)?.iter().map(value_to_number).collect();
    Ok(l.iter().any(|a| r.iter().any(|b| compare(op, *a, *b))))
}

fn compare(op: BinaryOperator, a: f64, b: f64) -> bool {
    match op {
        BinaryOperator::LessThan => a < b,
        BinaryOperator::LessThanOrEqual => a <= b,
        BinaryOperator::GreaterThan => a > b,
        BinaryOperator::GreaterThanOrEqual => a >= b,
        _ => false,
    }
}

/// The values a result contributes to a comparison: one per node of a node
/// set, or the single value.
fn atoms(computed: Computed<'_>) -> Result<Vec<Value>, XPathError> {
    match computed {
        Computed::Nodes(nodes) => PointerStream::new(nodes).map(|p| p?.value()).collect(),
        Computed::Pointer(pointer) => Ok(vec![pointer.value()?]),
        Computed::String(s) => Ok(vec![Value::String(s)]),
        Computed::Number(n) => Ok(vec![Value::Number(n)]),
        Computed::Boolean(b) => Ok(vec![Value::Boolean(b)]),
    }
}
