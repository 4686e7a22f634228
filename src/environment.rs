use crate::evaluator::{EvalError, EvalResult};
use crate::primitives;
use crate::types::{PrimitiveFunc, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// Shared sink written to by `print`.
pub type Output = Rc<RefCell<dyn Write>>;

// --- Environment Definition ---

pub struct Environment {
    // A child scope only lives for the call or `let` that created it.
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
    output: Output,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("outer", &self.outer)
            .finish()
    }
}

impl Environment {
    /// Creates a new, empty top-level environment that prints to stdout.
    pub fn new() -> Rc<RefCell<Self>> {
        Self::with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    /// Creates a new, empty top-level environment that prints to `output`.
    pub fn with_output(output: Output) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings: HashMap::new(),
            output,
        }))
    }

    /// The global environment with every primitive bound, printing to stdout.
    pub fn new_global_populated() -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::new();
        env_ptr.borrow_mut().add_primitives();
        env_ptr
    }

    /// The global environment with every primitive bound, printing to `output`.
    pub fn new_global_with_output(output: Output) -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::with_output(output);
        env_ptr.borrow_mut().add_primitives();
        env_ptr
    }

    fn add_primitives(&mut self) {
        // Arithmetic
        self.add_primitive("+", primitives::prim_add);
        self.add_primitive("-", primitives::prim_sub);
        self.add_primitive("*", primitives::prim_mul);
        self.add_primitive("/", primitives::prim_div);

        // List access
        self.add_primitive("car", primitives::prim_car);
        self.add_primitive("cdr", primitives::prim_cdr);

        // Special forms
        self.add_primitive("lambda", primitives::prim_lambda);
        self.add_primitive("def", primitives::prim_def);
        self.add_primitive("if", primitives::prim_if);
        self.add_primitive("set!", primitives::prim_set);
        self.add_primitive("quote", primitives::prim_quote);
        self.add_primitive("let", primitives::prim_let);

        // Logic and comparison (inverted encoding)
        self.add_primitive("and", primitives::prim_and);
        self.add_primitive("or", primitives::prim_or);
        self.add_primitive(">", primitives::prim_greater_than);
        self.add_primitive(">=", primitives::prim_greater_than_or_equals);
        self.add_primitive("<", primitives::prim_less_than);
        self.add_primitive("<=", primitives::prim_less_than_or_equals);

        // Lists
        self.add_primitive("list", primitives::prim_list);
        self.add_primitive("append", primitives::prim_append);
        self.add_primitive("length", primitives::prim_length);

        self.add_primitive("print", primitives::prim_print);

        // Equality and type predicates
        self.add_primitive("eq?", primitives::prim_is_eq);
        self.add_primitive("equal?", primitives::prim_is_equal);
        self.add_primitive("nil?", primitives::prim_is_nil);
        self.add_primitive("symbol?", primitives::prim_is_symbol);
        self.add_primitive("num?", primitives::prim_is_num);
        self.add_primitive("list?", primitives::prim_is_list);
        self.add_primitive("lambda?", primitives::prim_is_lambda);
        self.add_primitive("intrinsic?", primitives::prim_is_intrinsic);
    }

    /// Builds a child scope of `outer` binding `params` positionally to `args`.
    pub fn child_from(
        outer: &Rc<RefCell<Environment>>,
        params: &[String],
        args: &[Value],
    ) -> EvalResult<Rc<RefCell<Environment>>> {
        if params.len() != args.len() {
            return Err(EvalError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }
        let output = outer.borrow().output.clone();
        let bindings = params.iter().cloned().zip(args.iter().cloned()).collect();
        Ok(Rc::new(RefCell::new(Environment {
            outer: Some(outer.clone()),
            bindings,
            output,
        })))
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Looks up a variable's value, walking outward through the chain.
    /// An unresolved symbol is Nil, not an error.
    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = self.bindings.get(name) {
            value.clone()
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name),
                None => Value::Nil,
            }
        }
    }

    pub fn output(&self) -> Output {
        self.output.clone()
    }

    /// Helper to add a primitive procedure to the environment.
    fn add_primitive(&mut self, name: &'static str, func: PrimitiveFunc) {
        self.define(name, Value::primitive(name, func));
    }

    /// Gets every identifier visible from this environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env_ptr) = &self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn test_define_and_get_global() {
        let env = Environment::new();
        env.borrow_mut().define("x", int(10));
        assert_eq!(env.borrow().get("x"), int(10));
    }

    #[test]
    fn test_get_unbound_is_nil() {
        let env = Environment::new();
        assert_eq!(env.borrow().get("y"), Value::Nil);

        let child = Environment::child_from(&env, &[], &[]).unwrap();
        assert_eq!(child.borrow().get("z"), Value::Nil);
    }

    #[test]
    fn test_child_from_binds_positionally() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x", int(10));

        let params = vec!["y".to_string(), "z".to_string()];
        let local_env =
            Environment::child_from(&global_env, &params, &[int(20), Value::symbol("w")])
                .unwrap();

        assert_eq!(local_env.borrow().get("y"), int(20));
        assert_eq!(local_env.borrow().get("z"), Value::symbol("w"));
        // Parent bindings stay visible
        assert_eq!(local_env.borrow().get("x"), int(10));
        // Child bindings don't leak upward
        assert_eq!(global_env.borrow().get("y"), Value::Nil);
    }

    #[test]
    fn test_child_from_arity_mismatch() {
        let env = Environment::new();
        let params = vec!["a".to_string()];
        let result = Environment::child_from(&env, &params, &[int(1), int(2)]);
        assert_eq!(
            result.unwrap_err(),
            EvalError::ArityMismatch {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_shadowing() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x", int(10));

        let x = vec!["x".to_string()];
        let local_env = Environment::child_from(&global_env, &x, &[int(50)]).unwrap();
        let inner_local_env = Environment::child_from(&local_env, &[], &[]).unwrap();

        assert_eq!(inner_local_env.borrow().get("x"), int(50));
        assert_eq!(local_env.borrow().get("x"), int(50));
        assert_eq!(global_env.borrow().get("x"), int(10));
    }

    #[test]
    fn test_define_only_touches_current_frame() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x", int(1));

        let local_env = Environment::child_from(&global_env, &[], &[]).unwrap();
        local_env.borrow_mut().define("x", int(2));

        assert_eq!(local_env.borrow().get("x"), int(2));
        assert_eq!(global_env.borrow().get("x"), int(1));
    }

    #[test]
    fn test_global_populated_identifiers() {
        let env = Environment::new_global_populated();
        let identifiers = env.borrow().get_identifiers();
        for name in ["+", "car", "def", "let", "eq?", "intrinsic?", "print"] {
            assert!(identifiers.contains(name), "missing {}", name);
        }
        assert!(matches!(env.borrow().get("+"), Value::Primitive(p) if p.name == "+"));
    }
}
