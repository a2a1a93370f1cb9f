//! The cell expression language.
//!
//! A small Python-flavoured grammar: literals, lists, arithmetic,
//! comparisons, boolean logic, conditional expressions, subscripts and a
//! fixed set of builtins. Evaluation never touches storage directly; every
//! name and grid read goes through an `Environment`.

pub mod builtins;
pub mod eval;
pub mod parser;
pub mod value;

pub use eval::{eval_expr, evaluate, Environment};
pub use parser::{parse, Expr};
pub use value::{ErrorKind, EvalError, Value};
