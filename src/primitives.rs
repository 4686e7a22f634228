//! The built-in operations bound in the global environment.
//!
//! Every primitive receives the whole call form, operator included at position 0, and
//! the calling environment. Argument positions are therefore 1-based. Each primitive
//! evaluates exactly the arguments it needs, which is how `quote`, `if`, `lambda`, `def`
//! and `let` get their special-form behaviour through the same mechanism as `+`.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tracing::debug;

use crate::environment::Environment;
use crate::evaluator::{EvalError, EvalResult, evaluate};
use crate::types::{Value, structurally_equal};

// Matches a value against a pattern or returns a TypeMismatch error
macro_rules! expect {
    ($value:expr, $pattern:pat => $out:expr, $expected:expr, $name:expr, $arg_pos:expr) => {
        match $value {
            $pattern => $out,
            other => {
                return Err(EvalError::TypeMismatch {
                    operator: $name.to_string(),
                    position: $arg_pos,
                    expected: $expected,
                    found: other.clone(),
                });
            }
        }
    };
}

// Evaluates argument 1 and reports whether it matches the pattern, normal encoding
macro_rules! is_type {
    ($args:expr, $env:expr, $type:pat, $name:expr) => {
        Ok(Value::predicate(matches!(
            eval_arg($args, 1, $name, $env)?,
            $type
        )))
    };
}

type Env = Rc<RefCell<Environment>>;

fn arg<'a>(args: &'a [Value], position: usize, name: &str) -> EvalResult<&'a Value> {
    args.get(position).ok_or_else(|| EvalError::MissingArgument {
        operator: name.to_string(),
        position,
    })
}

fn eval_arg(args: &[Value], position: usize, name: &str, env: &Env) -> EvalResult {
    evaluate(arg(args, position, name)?, env)
}

fn integer_arg(args: &[Value], position: usize, name: &str, env: &Env) -> EvalResult<i64> {
    Ok(expect!(
        eval_arg(args, position, name, env)?,
        Value::Integer(n) => n,
        "an integer",
        name,
        position
    ))
}

fn list_arg(
    args: &[Value],
    position: usize,
    name: &str,
    env: &Env,
) -> EvalResult<Rc<Vec<Value>>> {
    Ok(expect!(
        eval_arg(args, position, name, env)?,
        Value::List(elements) => elements,
        "a list",
        name,
        position
    ))
}

// Like `list_arg`, but the argument is taken as written
fn raw_list_arg<'a>(args: &'a [Value], position: usize, name: &str) -> EvalResult<&'a [Value]> {
    Ok(expect!(
        arg(args, position, name)?,
        Value::List(elements) => elements.as_slice(),
        "a list",
        name,
        position
    ))
}

fn symbol_arg<'a>(args: &'a [Value], position: usize, name: &str) -> EvalResult<&'a str> {
    Ok(expect!(
        arg(args, position, name)?,
        Value::Symbol(symbol) => symbol.as_str(),
        "a symbol",
        name,
        position
    ))
}

// --- Arithmetic ---

fn fold_integers(
    args: &[Value],
    env: &Env,
    func: fn(i64, i64) -> EvalResult<i64>,
    operator: &str,
) -> EvalResult {
    // Left fold starting from the first operand
    let mut acc = integer_arg(args, 1, operator, env)?;
    for position in 2..args.len() {
        acc = func(acc, integer_arg(args, position, operator, env)?)?;
    }
    Ok(Value::Integer(acc))
}

pub fn prim_add(args: &[Value], env: &Env) -> EvalResult {
    // (+ 1 2 3) -> 6
    fold_integers(args, env, |acc, val| Ok(acc.wrapping_add(val)), "+")
}

pub fn prim_sub(args: &[Value], env: &Env) -> EvalResult {
    // (- 10 3 2) -> 5, (- 5) -> 5
    fold_integers(args, env, |acc, val| Ok(acc.wrapping_sub(val)), "-")
}

pub fn prim_mul(args: &[Value], env: &Env) -> EvalResult {
    fold_integers(args, env, |acc, val| Ok(acc.wrapping_mul(val)), "*")
}

pub fn prim_div(args: &[Value], env: &Env) -> EvalResult {
    // Truncates toward zero
    fold_integers(
        args,
        env,
        |acc, val| {
            if val == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(acc.wrapping_div(val))
            }
        },
        "/",
    )
}

// --- List access ---

pub fn prim_car(args: &[Value], _env: &Env) -> EvalResult {
    // (car (1 2)) -> 1, the list is not evaluated
    let list = raw_list_arg(args, 1, "car")?;
    list.first().cloned().ok_or_else(|| EvalError::EmptyList {
        operator: "car".to_string(),
    })
}

pub fn prim_cdr(args: &[Value], _env: &Env) -> EvalResult {
    // (cdr (1 2)) -> (2), (cdr (1)) -> an empty list
    match raw_list_arg(args, 1, "cdr")?.split_first() {
        Some((_, rest)) => Ok(Value::list(rest.to_vec())),
        None => Err(EvalError::EmptyList {
            operator: "cdr".to_string(),
        }),
    }
}

// --- Special forms ---

fn build_closure(params: &Value, body: &Value, name: &str, position: usize) -> EvalResult {
    // `()` reads as Nil, so it is accepted as an empty parameter list
    let names = match params {
        Value::Nil => Vec::new(),
        Value::List(elements) => {
            let mut names = Vec::with_capacity(elements.len());
            for element in elements.iter() {
                names.push(expect!(
                    element,
                    Value::Symbol(param) => param.clone(),
                    "a list of parameter symbols",
                    name,
                    position
                ));
            }
            names
        }
        other => {
            return Err(EvalError::TypeMismatch {
                operator: name.to_string(),
                position,
                expected: "a parameter list",
                found: other.clone(),
            });
        }
    };
    Ok(Value::closure(names, body.clone()))
}

pub fn prim_lambda(args: &[Value], _env: &Env) -> EvalResult {
    // (lambda (x y) body)
    build_closure(arg(args, 1, "lambda")?, arg(args, 2, "lambda")?, "lambda", 1)
}

pub fn prim_def(args: &[Value], env: &Env) -> EvalResult {
    // (def name (x y) body)
    let name = symbol_arg(args, 1, "def")?;
    let closure = build_closure(arg(args, 2, "def")?, arg(args, 3, "def")?, "def", 2)?;
    debug!(symbol = name, "def");
    env.borrow_mut().define(name, closure.clone());
    Ok(closure)
}

pub fn prim_if(args: &[Value], env: &Env) -> EvalResult {
    // The condition is tested as written, without evaluating it
    if arg(args, 1, "if")?.is_truthy() {
        eval_arg(args, 2, "if", env)
    } else {
        match args.get(3) {
            Some(alternate) => evaluate(alternate, env),
            None => Ok(Value::Nil),
        }
    }
}

pub fn prim_set(args: &[Value], env: &Env) -> EvalResult {
    // (set! name expr) binds in the current scope only
    let name = symbol_arg(args, 1, "set!")?;
    let value = eval_arg(args, 2, "set!", env)?;
    debug!(symbol = name, value = %value, "set!");
    env.borrow_mut().define(name, value);
    Ok(Value::Nil)
}

pub fn prim_quote(args: &[Value], _env: &Env) -> EvalResult {
    Ok(arg(args, 1, "quote")?.clone())
}

pub fn prim_let(args: &[Value], env: &Env) -> EvalResult {
    // (let ((a 1) (b 2)) body)
    let bindings: &[Value] = match arg(args, 1, "let")? {
        Value::Nil => &[],
        Value::List(bindings) => bindings.as_slice(),
        other => {
            return Err(EvalError::TypeMismatch {
                operator: "let".to_string(),
                position: 1,
                expected: "a list of bindings",
                found: other.clone(),
            });
        }
    };

    let mut names = Vec::with_capacity(bindings.len());
    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let (name, expr) = match binding {
            Value::List(pair) if pair.len() >= 2 => (&pair[0], &pair[1]),
            other => {
                return Err(EvalError::TypeMismatch {
                    operator: "let".to_string(),
                    position: 1,
                    expected: "a (name expr) binding",
                    found: other.clone(),
                });
            }
        };
        names.push(expect!(
            name,
            Value::Symbol(name) => name.clone(),
            "a binding name symbol",
            "let",
            1
        ));
        // Every expression sees the outer scope, not earlier bindings
        values.push(evaluate(expr, env)?);
    }

    let body = arg(args, 2, "let")?;
    let scope = Environment::child_from(env, &names, &values)?;
    evaluate(body, &scope)
}

// --- Logic and comparison, inverted encoding ---

fn combine_truthiness(
    args: &[Value],
    env: &Env,
    func: fn(bool, bool) -> bool,
    name: &str,
) -> EvalResult {
    // Both sides are always evaluated
    let a = eval_arg(args, 1, name, env)?.is_truthy();
    let b = eval_arg(args, 2, name, env)?.is_truthy();
    Ok(Value::condition(func(a, b)))
}

pub fn prim_and(args: &[Value], env: &Env) -> EvalResult {
    combine_truthiness(args, env, |a, b| a && b, "and")
}

pub fn prim_or(args: &[Value], env: &Env) -> EvalResult {
    combine_truthiness(args, env, |a, b| a || b, "or")
}

fn compare_integers(
    args: &[Value],
    env: &Env,
    compare: fn(i64, i64) -> bool,
    name: &str,
) -> EvalResult {
    let left = integer_arg(args, 1, name, env)?;
    let right = integer_arg(args, 2, name, env)?;
    Ok(Value::condition(compare(left, right)))
}

pub fn prim_greater_than(args: &[Value], env: &Env) -> EvalResult {
    compare_integers(args, env, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: &[Value], env: &Env) -> EvalResult {
    compare_integers(args, env, |left, right| left >= right, ">=")
}

pub fn prim_less_than(args: &[Value], env: &Env) -> EvalResult {
    compare_integers(args, env, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: &[Value], env: &Env) -> EvalResult {
    compare_integers(args, env, |left, right| left <= right, "<=")
}

// --- Lists ---

pub fn prim_list(args: &[Value], _env: &Env) -> EvalResult {
    // Elements are taken as written
    Ok(Value::list(args.iter().skip(1).cloned().collect()))
}

pub fn prim_append(args: &[Value], env: &Env) -> EvalResult {
    // (append xs item) copies xs, the argument list itself is never modified
    let list = list_arg(args, 1, "append", env)?;
    let item = arg(args, 2, "append")?;
    let mut elements = Vec::with_capacity(list.len() + 1);
    elements.extend(list.iter().cloned());
    elements.push(item.clone());
    Ok(Value::list(elements))
}

pub fn prim_length(args: &[Value], env: &Env) -> EvalResult {
    let length = match eval_arg(args, 1, "length", env)? {
        Value::List(elements) => elements.len() as i64,
        Value::Nil => 0,
        _ => 1,
    };
    Ok(Value::Integer(length))
}

pub fn prim_print(args: &[Value], env: &Env) -> EvalResult {
    // Writes the whole form as written, operator included, with no separators
    let output = env.borrow().output();
    let mut sink = output.borrow_mut();
    for value in args {
        write!(sink, "{}", value).map_err(|e| EvalError::Output(e.to_string()))?;
    }
    sink.flush().map_err(|e| EvalError::Output(e.to_string()))?;
    Ok(Value::Nil)
}

// --- Equality and type predicates, normal encoding ---

pub fn prim_is_eq(args: &[Value], env: &Env) -> EvalResult {
    let a = eval_arg(args, 1, "eq?", env)?;
    let b = eval_arg(args, 2, "eq?", env)?;
    let same = match (&a, &b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        // Lists are only eq? to the very same list object
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        _ => false,
    };
    Ok(Value::predicate(same))
}

pub fn prim_is_equal(args: &[Value], env: &Env) -> EvalResult {
    let a = eval_arg(args, 1, "equal?", env)?;
    let b = eval_arg(args, 2, "equal?", env)?;
    Ok(Value::predicate(structurally_equal(&a, &b)))
}

pub fn prim_is_nil(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::Nil, "nil?")
}

pub fn prim_is_symbol(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::Symbol(_), "symbol?")
}

pub fn prim_is_num(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::Integer(_), "num?")
}

pub fn prim_is_list(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::List(_), "list?")
}

pub fn prim_is_lambda(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::Closure(_), "lambda?")
}

pub fn prim_is_intrinsic(args: &[Value], env: &Env) -> EvalResult {
    is_type!(args, env, Value::Primitive(_), "intrinsic?")
}
