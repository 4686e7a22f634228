//! A small Lisp interpreter with dynamically scoped lambdas.
//!
//! Text is tokenized, parsed into a single [`Value`], and evaluated against a chained
//! [`Environment`] whose global frame holds the built-in primitives.

// Declare modules publicly so they are part of the library interface
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

pub use environment::{Environment, Output};
pub use evaluator::{EvalError, EvalResult, evaluate};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, classify, parse_str};
pub use source::Span;
pub use types::{Closure, Primitive, Value};

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Any failure from reading or evaluating one form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Parses the first form in `text`.
pub fn parse(text: &str) -> Result<Value, ParseError> {
    parse_str(text)
}

/// The textual form of a value.
pub fn render(value: &Value) -> String {
    value.to_string()
}

/// Parses the first form in `text` and evaluates it in `env`.
pub fn eval_str(text: &str, env: &Rc<RefCell<Environment>>) -> Result<Value, Error> {
    let node = parse(text)?;
    Ok(evaluate(&node, env)?)
}
