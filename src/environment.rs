/*!
Lexically chained variable storage.

Each `Environment` is one scope: a name→value map plus an optional link to
the enclosing scope.  Scopes are shared (`Rc<RefCell<..>>`) because closures
keep their defining environment alive after the block that created it has
finished executing.

Resolved locals are read with [`Environment::get_at`] /
[`Environment::assign_at`], which hop a pre‑computed number of `enclosing`
links instead of searching by name.  Unresolved names (globals) fall back to
the searching [`Environment::get`] / [`Environment::assign`].
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{BuntError, Result};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A root scope with no enclosing environment (the globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A child scope whose lookups fall through to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, shadowing or overwriting any prior binding
    /// here.  Redefinition is deliberately allowed at the global scope; the
    /// resolver rejects it for locals before execution starts.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up through the scope chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(BuntError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Overwrite an existing binding of `name`, searching outward.  Unlike
    /// [`Environment::define`] this never creates a binding.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(BuntError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read `name` from the scope exactly `distance` links out.
    ///
    /// The resolver guarantees the binding exists at that distance, so a
    /// miss here is an interpreter bug, not a user error.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Environment::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolved variable missing at predicted distance")
    }

    /// Write `name` in the scope exactly `distance` links out.
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
        let ancestor = Environment::ancestor(env, distance);
        let mut ancestor = ancestor.borrow_mut();
        debug_assert!(
            ancestor.values.contains_key(name),
            "resolved variable missing at predicted distance"
        );
        ancestor.values.insert(name.to_string(), value);
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .as_ref()
                .map(Rc::clone)
                .expect("scope chain shorter than resolved distance");
            current = next;
        }

        current
    }
}
