use crate::environment::Environment;
use crate::evaluator::{self, EvalResult};
use std::cell::RefCell;
use std::fmt; // For custom display formatting
use std::rc::Rc;

/// A runtime value of the language. Parsed code and data share this representation.
///
/// The variant set is closed: the parser, evaluator, renderer, the equality primitives and
/// the type predicates all match on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,                  // The empty list '() and the only false value
    Integer(i64),         // Fixed-width, wrapping arithmetic
    Symbol(String),       // Case-sensitive identifier
    List(Rc<Vec<Value>>), // Shared, never mutated in place once built
    Closure(Rc<Closure>),
    Primitive(Primitive),
}

/// A user-defined callable. It captures no environment: free symbols in `body` are
/// resolved in the caller's scope chain when it is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Value,
}

/// A built-in operation. It receives the whole unevaluated call form (operator at index 0)
/// and the calling environment, and decides itself which arguments to evaluate.
pub type PrimitiveFunc = fn(&[Value], &Rc<RefCell<Environment>>) -> EvalResult;

#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub func: PrimitiveFunc,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.name)
    }
}

// Function pointers don't compare meaningfully, primitives are unique by name.
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Value {
    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(elements))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn closure(params: Vec<String>, body: Value) -> Self {
        Value::Closure(Rc::new(Closure { params, body }))
    }

    pub fn primitive(name: &'static str, func: PrimitiveFunc) -> Self {
        Value::Primitive(Primitive { name, func })
    }

    /// Nil is false, every other value is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil)
    }

    /// Inverted encoding used by `and`, `or` and the comparisons:
    /// Nil when the condition holds, Integer(1) when it fails.
    pub fn condition(holds: bool) -> Self {
        if holds { Value::Nil } else { Value::Integer(1) }
    }

    /// Normal encoding used by the type predicates, `eq?` and `equal?`:
    /// Integer(1) when true, Nil when false.
    pub fn predicate(matches: bool) -> Self {
        if matches { Value::Integer(1) } else { Value::Nil }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Integer(_) => "integer",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Closure(_) => "lambda",
            Value::Primitive(_) => "intrinsic",
        }
    }

    pub fn evaluate(&self, env: &Rc<RefCell<Environment>>) -> EvalResult {
        evaluator::evaluate(self, env)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

/// Deep structural equality over Nil, Integer, Symbol and List.
/// Closures and primitives are never equal, not even to themselves.
pub fn structurally_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| structurally_equal(x, y))
        }
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(elements) => {
                // Every element is followed by a space: (1 2 3 )
                write!(f, "(")?;
                for element in elements.iter() {
                    write!(f, "{} ", element)?;
                }
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "#<lambda>"),
            Value::Primitive(primitive) => write!(f, "#<intrinsic:{}>", primitive.name),
        }
    }
}
