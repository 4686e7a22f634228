use crate::environment::Environment;
use crate::types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

// --- Evaluation Error ---
// Every variant ends the current top-level evaluation; nothing inside the language recovers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Evaluation Error: Expected a lambda or intrinsic, but got: {0}")]
    NotApplicable(Value),
    #[error("Evaluation Error: Cannot apply an empty list")]
    EmptyApplication,
    #[error(
        "Evaluation Error: '{operator}' expects {expected} for argument {position}, got {}",
        .found.type_name()
    )]
    TypeMismatch {
        operator: String,
        position: usize,
        expected: &'static str,
        found: Value,
    },
    #[error("Evaluation Error: '{operator}' is missing argument {position}")]
    MissingArgument { operator: String, position: usize },
    #[error("Evaluation Error: Lambda expects {expected} arguments, got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("Evaluation Error: '{operator}' of an empty list")]
    EmptyList { operator: String },
    #[error("Evaluation Error: Division by zero")]
    DivisionByZero,
    #[error("Output Error: {0}")]
    Output(String),
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

// --- Evaluate Function ---

/// Evaluates a value within the specified environment.
pub fn evaluate(node: &Value, env: &Rc<RefCell<Environment>>) -> EvalResult {
    match node {
        // Self-evaluating
        Value::Nil | Value::Integer(_) | Value::Closure(_) | Value::Primitive(_) => {
            Ok(node.clone())
        }

        // Unbound symbols resolve to Nil
        Value::Symbol(name) => Ok(env.borrow().get(name)),

        // Lists are always applications
        Value::List(elements) => apply(elements, env),
    }
}

fn apply(elements: &[Value], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let Some((operator, operands)) = elements.split_first() else {
        return Err(EvalError::EmptyApplication);
    };

    match evaluate(operator, env)? {
        Value::Closure(closure) => {
            trace!(params = ?closure.params, "applying lambda");
            // Operands are bound unevaluated, in a child of the *calling* scope:
            // free symbols in the body resolve dynamically.
            let scope = Environment::child_from(env, &closure.params, operands)?;
            evaluate(&closure.body, &scope)
        }
        Value::Primitive(primitive) => {
            trace!(intrinsic = primitive.name, "applying intrinsic");
            (primitive.func)(elements, env)
        }
        other => Err(EvalError::NotApplicable(other)),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str; // Use parser to create values easily

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    // Helper to evaluate input string and check the result
    fn assert_eval(input: &str, expected: Value, env: Option<Rc<RefCell<Environment>>>) {
        let env = env.unwrap_or_else(Environment::new_global_populated);
        match parse_str(input) {
            Ok(node) => match evaluate(&node, &env) {
                Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
                Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
            },
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper to assert evaluation errors
    fn assert_eval_error(
        input: &str,
        expected_error_variant: &EvalError,
        env: Option<Rc<RefCell<Environment>>>,
    ) {
        let env = env.unwrap_or_else(Environment::new_global_populated);
        match parse_str(input) {
            Ok(node) => match evaluate(&node, &env) {
                Ok(result) => panic!(
                    "Expected evaluation to fail for input '{}', but got: {:?}",
                    input, result
                ),
                Err(e) => {
                    assert_eq!(
                        std::mem::discriminant(&e),
                        std::mem::discriminant(expected_error_variant),
                        "Input: '{}', Expected error variant like {:?}, got: {:?}",
                        input,
                        expected_error_variant,
                        e
                    );
                }
            },
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    #[test]
    fn test_eval_self_evaluating() {
        let env = Environment::new();
        assert_eq!(evaluate(&Value::Nil, &env), Ok(Value::Nil));
        assert_eq!(evaluate(&int(10), &env), Ok(int(10)));
        assert_eq!(evaluate(&int(-3), &env), Ok(int(-3)));

        let identity = Value::closure(vec!["x".into()], sym("x"));
        assert_eq!(evaluate(&identity, &env), Ok(identity.clone()));

        let plus = Environment::new_global_populated().borrow().get("+");
        assert_eq!(evaluate(&plus, &env), Ok(plus.clone()));
    }

    #[test]
    fn test_eval_symbol_lookup() {
        let env = Environment::new();
        let x = vec!["x".to_string()];
        let scope = Environment::child_from(&env, &x, &[int(123)]).unwrap();
        assert_eq!(evaluate(&sym("x"), &scope), Ok(int(123)));
    }

    #[test]
    fn test_eval_symbol_unbound_is_nil() {
        assert_eval("y", Value::Nil, Some(Environment::new()));
        assert_eval("(nil? undefined-thing)", int(1), None);
    }

    #[test]
    fn test_eval_lambda_application() {
        let identity = Value::closure(vec!["x".into()], sym("x"));
        let form = Value::list(vec![identity, int(5)]);
        assert_eq!(
            evaluate(&form, &Environment::new_global_populated()),
            Ok(int(5))
        );
        assert_eval("((lambda (x) x) 5)", int(5), None);
        assert_eval("((lambda (a b) (+ a b)) 2 3)", int(5), None);
        assert_eval("((lambda () 7))", int(7), None);
    }

    #[test]
    fn test_eval_lambda_binds_unevaluated_operands() {
        // The parameter is bound to the raw form, not its value
        assert_eval(
            "((lambda (x) x) (+ 1 2))",
            Value::list(vec![sym("+"), int(1), int(2)]),
            None,
        );
        assert_eval("((lambda (x) x) y)", sym("y"), None);
    }

    #[test]
    fn test_eval_dynamic_scoping() {
        let env = Environment::new_global_populated();
        assert_eval(
            "(def show () y)",
            Value::closure(vec![], sym("y")),
            Some(env.clone()),
        );

        // The free `y` is resolved at each call site
        assert_eval("(let ((y 1)) (show))", int(1), Some(env.clone()));
        assert_eval("(let ((y 2)) (show))", int(2), Some(env.clone()));
        assert_eval("(let ((y 1)) (let ((y 2)) (show)))", int(2), Some(env.clone()));

        // Outside any binding it is unbound, hence Nil
        assert_eval("(show)", Value::Nil, Some(env.clone()));

        // A global binding is seen only where nothing shadows it
        assert_eval("(set! y 100)", Value::Nil, Some(env.clone()));
        assert_eval("(show)", int(100), Some(env.clone()));
        assert_eval("(let ((y 3)) (show))", int(3), Some(env));
    }

    #[test]
    fn test_eval_lambda_sees_callers_locals() {
        let env = Environment::new_global_populated();
        assert_eval(
            "(def add-n (x) (+ x n))",
            Value::closure(
                vec!["x".into()],
                Value::list(vec![sym("+"), sym("x"), sym("n")]),
            ),
            Some(env.clone()),
        );
        assert_eval(
            "(def caller (n) (add-n 1))",
            Value::closure(vec!["n".into()], Value::list(vec![sym("add-n"), int(1)])),
            Some(env.clone()),
        );
        assert_eval("(caller 41)", int(42), Some(env));
    }

    #[test]
    fn test_eval_call_scope_is_discarded() {
        let env = Environment::new_global_populated();
        assert_eval("((lambda (z) z) 9)", int(9), Some(env.clone()));
        assert_eval("z", Value::Nil, Some(env));
    }

    #[test]
    fn test_eval_not_applicable() {
        let not_applicable = &EvalError::NotApplicable(Value::Nil); // Dummy
        assert_eval_error("(1 2 3)", not_applicable, None);
        assert_eval_error("(undefined 1)", not_applicable, None);
        assert_eval_error("(() 1)", not_applicable, None);
        assert_eval_error("((list 1 2) 3)", not_applicable, None);
    }

    #[test]
    fn test_eval_empty_application() {
        let env = Environment::new();
        assert_eq!(
            evaluate(&Value::list(vec![]), &env),
            Err(EvalError::EmptyApplication)
        );
    }

    #[test]
    fn test_eval_arity_mismatch() {
        let arity = &EvalError::ArityMismatch {
            expected: 0,
            found: 0,
        }; // Dummy
        assert_eval_error("((lambda (x) x))", arity, None);
        assert_eval_error("((lambda (x) x) 1 2)", arity, None);
    }

    #[test]
    fn test_value_evaluate_method() {
        let env = Environment::new_global_populated();
        let form = parse_str("(* 6 7)").unwrap();
        assert_eq!(form.evaluate(&env), Ok(int(42)));
    }
}
