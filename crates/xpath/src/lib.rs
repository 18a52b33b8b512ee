//! Path expressions over object graphs: beans, dynamic bags, collections
//! and DOM documents, read and written through node pointers.

pub mod ast;
pub mod context;
pub mod contexts;
pub mod engine;
pub mod error;
mod functions;
pub mod iter;
mod operators;
pub mod parser;
pub mod pointer;
mod simple_path;
pub mod value;

pub use ast::{Axis, BinaryOperator, CoreFunction, Expression, LocationPath, NodeTest, Step};
pub use context::{CompiledExpression, PathContext};
pub use contexts::{EvalContext, PointerStream};
pub use engine::{Computed, Environment, compute, compute_value, iterate};
pub use error::XPathError;
pub use parser::parse_expression;
pub use pointer::{ElementIndex, NodePointer, PointerEnv, VariableScope};
pub use value::XPathValue;
