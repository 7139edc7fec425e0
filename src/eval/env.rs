//! Evaluation environment and closure context
//!
//! The worker owns exactly one [`Environment`]. Builtin functions are
//! pre-bound; a request's closure payload is layered on top for the duration
//! of that request and removed unconditionally afterwards. Installation is
//! all-or-nothing: one colliding name rejects the whole payload and installs
//! nothing.

use std::collections::HashMap;

use serde_json::Value;

use super::errors::{EvalError, EvalResult};

/// Reserved name the record under evaluation is bound to
pub const RECORD_BINDING: &str = "item";

/// Builtin functions available to every logic fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `len(x)`: chars of a string, elements of an array, keys of an object
    Len,
    /// `contains(haystack, needle)`: substring or array membership
    Contains,
    /// `lower(s)`
    Lower,
    /// `upper(s)`
    Upper,
    /// `abs(n)`
    Abs,
}

impl Builtin {
    /// All builtins with their binding names
    pub fn all() -> &'static [(&'static str, Builtin)] {
        &[
            ("len", Builtin::Len),
            ("contains", Builtin::Contains),
            ("lower", Builtin::Lower),
            ("upper", Builtin::Upper),
            ("abs", Builtin::Abs),
        ]
    }
}

/// A name binding in the evaluation environment
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A plain value (closure entries)
    Value(Value),
    /// A builtin function
    Builtin(Builtin),
}

/// The worker's evaluation environment
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create an environment holding only the builtins
    pub fn new() -> Self {
        let mut bindings = HashMap::new();
        for (name, builtin) in Builtin::all() {
            bindings.insert((*name).to_string(), Binding::Builtin(*builtin));
        }
        Self { bindings }
    }

    /// Look up a bound name
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Number of live bindings (builtins included)
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no names are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Install a closure payload, all-or-nothing.
    ///
    /// The payload must be a JSON object; `max_names` bounds its width
    /// (0 = unbounded). Any name already bound — builtins included — or equal
    /// to the reserved record binding rejects the whole payload with nothing
    /// installed. On success returns the installed names for teardown.
    pub fn install_closure(
        &mut self,
        closure: &Value,
        max_names: usize,
    ) -> EvalResult<Vec<String>> {
        let entries = match closure {
            Value::Object(map) => map,
            other => {
                return Err(EvalError::InvalidClosure {
                    message: format!("closure payload must be an object, got {}", kind_of(other)),
                })
            }
        };

        if max_names > 0 && entries.len() > max_names {
            return Err(EvalError::InvalidClosure {
                message: format!(
                    "closure payload has {} names, limit is {}",
                    entries.len(),
                    max_names
                ),
            });
        }

        // Full conflict pass before the first insert
        for name in entries.keys() {
            if name == RECORD_BINDING || self.bindings.contains_key(name) {
                return Err(EvalError::ClosureConflict { name: name.clone() });
            }
        }

        let mut installed = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            self.bindings
                .insert(name.clone(), Binding::Value(value.clone()));
            installed.push(name.clone());
        }
        Ok(installed)
    }

    /// Remove previously installed closure names.
    ///
    /// Teardown is unconditional: callers invoke this on success and on every
    /// error path so no binding survives its request.
    pub fn remove_names(&mut self, names: &[String]) {
        for name in names {
            self.bindings.remove(name);
        }
    }
}

/// Human-readable JSON type name for error messages
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_environment_has_builtins() {
        let env = Environment::new();
        assert_eq!(env.lookup("len"), Some(&Binding::Builtin(Builtin::Len)));
        assert_eq!(env.lookup("abs"), Some(&Binding::Builtin(Builtin::Abs)));
        assert_eq!(env.lookup("minAge"), None);
    }

    #[test]
    fn test_install_and_teardown_restores_environment() {
        let mut env = Environment::new();
        let before = env.len();

        let installed = env
            .install_closure(&json!({"minAge": 18, "tag": "adult"}), 0)
            .unwrap();
        assert_eq!(installed.len(), 2);
        assert_eq!(env.lookup("minAge"), Some(&Binding::Value(json!(18))));

        env.remove_names(&installed);
        assert_eq!(env.len(), before);
        assert_eq!(env.lookup("minAge"), None);
        assert_eq!(env.lookup("tag"), None);
    }

    #[test]
    fn test_conflict_installs_nothing() {
        let mut env = Environment::new();
        let installed = env.install_closure(&json!({"fresh": 1}), 0).unwrap();

        // "fresh" collides; "other" must not be installed either
        let result = env.install_closure(&json!({"other": 2, "fresh": 3}), 0);
        match result {
            Err(EvalError::ClosureConflict { name }) => assert_eq!(name, "fresh"),
            other => panic!("Expected ClosureConflict, got {:?}", other),
        }
        assert_eq!(env.lookup("other"), None);
        assert_eq!(env.lookup("fresh"), Some(&Binding::Value(json!(1))));

        env.remove_names(&installed);
    }

    #[test]
    fn test_builtin_name_conflicts() {
        let mut env = Environment::new();
        match env.install_closure(&json!({"len": 5}), 0) {
            Err(EvalError::ClosureConflict { name }) => assert_eq!(name, "len"),
            other => panic!("Expected ClosureConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_record_binding_is_reserved() {
        let mut env = Environment::new();
        match env.install_closure(&json!({"item": 1}), 0) {
            Err(EvalError::ClosureConflict { name }) => assert_eq!(name, "item"),
            other => panic!("Expected ClosureConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_closure_rejected() {
        let mut env = Environment::new();
        match env.install_closure(&json!([1, 2, 3]), 0) {
            Err(EvalError::InvalidClosure { message }) => {
                assert!(message.contains("array"));
            }
            other => panic!("Expected InvalidClosure, got {:?}", other),
        }
    }

    #[test]
    fn test_closure_width_limit() {
        let mut env = Environment::new();
        match env.install_closure(&json!({"a": 1, "b": 2, "c": 3}), 2) {
            Err(EvalError::InvalidClosure { message }) => {
                assert!(message.contains("limit is 2"));
            }
            other => panic!("Expected InvalidClosure, got {:?}", other),
        }
        assert_eq!(env.lookup("a"), None);
    }
}
