//! The ambient environment table.
//!
//! One name -> value mapping per runtime. Writes overwrite, nothing is ever removed.
//! The table is only reached through the `GetItem` / `SetItem` capabilities of the
//! namespace value wrapping it; see `Runtime::get_value` / `Runtime::set_value`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::value::Value;

/// Shared handle to the table.
///
/// Bindings may refer back to the table (the namespace value itself, or a method
/// bound to it). Such a binding is an `Rc` cycle and the table then lives until
/// process exit. Runtimes are process-lifetime objects, so the leak is accepted.
#[derive(Clone, Default)]
pub struct Environment {
    bindings: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<Value> {
        self.bindings
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::new(ErrorKind::Unbound, format!("unbound name: {name:?}")))
    }

    pub(crate) fn store(&self, name: &str, value: Value) -> Value {
        self.bindings
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        value
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Snapshot used to diff bindings around an evaluation.
    pub(crate) fn snapshot(&self) -> BTreeMap<String, Value> {
        self.bindings.borrow().clone()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}

// Bindings may hold the namespace itself; print names only.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bindings.borrow().keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_overwrite() {
        let env = Environment::new();
        env.store("x", Value::Int(1));
        env.store("x", Value::Int(2));
        assert_eq!(env.lookup("x").unwrap(), Value::Int(2));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn missing_names_are_unbound() {
        let env = Environment::new();
        let err = env.lookup("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unbound);
    }

    #[test]
    fn table_can_hold_its_own_namespace() {
        let env = Environment::new();
        env.store("self", Value::Namespace(env.clone()));
        match env.lookup("self").unwrap() {
            Value::Namespace(inner) => {
                assert_eq!(inner, env);
                inner.store("z", Value::Int(3));
            }
            other => panic!("expected namespace, got {other:?}"),
        }
        assert_eq!(env.lookup("z").unwrap(), Value::Int(3));
        assert!(format!("{env:?}").contains("self"));
    }

    #[test]
    fn clones_share_one_table() {
        let env = Environment::new();
        let alias = env.clone();
        alias.store("y", Value::str("shared"));
        assert!(env.contains("y"));
        assert_eq!(env, alias);
        assert_ne!(env, Environment::new());
    }
}
