use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

use crate::interpreter::value::Object;

/// A chain of name→value scopes with an explicit global scope.
///
/// Lookup walks from the current scope outward; insertion always targets
/// the current scope and refuses to rebind a name already present there.
/// Cloning an `Environment` is cheap and yields a handle to the same scope.
///
/// Function invocation does not chain onto the caller: a call's scope is a
/// child of the *global* scope, so functions see globals but not the
/// caller's locals.
///
/// # Examples
/// ```
/// use well::interpreter::{env::Environment, value::Object};
///
/// let global = Environment::new();
/// global.set("x", Object::Integer(1)).unwrap();
///
/// let inner = global.new_scope();
/// assert_eq!(inner.get("x"), Some(Object::Integer(1)));
///
/// // Shadowing is allowed in a child scope, never within one scope.
/// inner.set("x", Object::Integer(2)).unwrap();
/// assert!(global.set("x", Object::Integer(3)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    scope: Rc<Scope>,
}

#[derive(Debug)]
struct Scope {
    bindings: RefCell<HashMap<String, Object>>,
    parent:   Option<Rc<Scope>>,
}

/// The error returned when a name is bound twice in the same scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// The rebound name.
    pub name: String,
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate env key {:?}", self.name)
    }
}

impl std::error::Error for DuplicateKey {}

impl Environment {
    /// Creates a fresh global scope with the `true` and `false` bindings
    /// predefined.
    #[must_use]
    pub fn new() -> Self {
        let env = Self { scope: Rc::new(Scope { bindings: RefCell::new(HashMap::new()),
                                                parent:   None, }), };
        // Cannot collide in an empty scope.
        let _ = env.set("true", Object::Boolean(true));
        let _ = env.set("false", Object::Boolean(false));
        env
    }

    /// Looks up a name, walking the scope chain from the current scope
    /// outward.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut scope = Some(&self.scope);
        while let Some(s) = scope {
            if let Some(obj) = s.bindings.borrow().get(name) {
                return Some(obj.clone());
            }
            scope = s.parent.as_ref();
        }
        None
    }

    /// Binds a name in the current scope.
    ///
    /// # Errors
    /// Fails if the current scope already binds the name. Bindings in
    /// outer scopes are shadowed, not touched.
    pub fn set(&self, name: &str, obj: Object) -> Result<(), DuplicateKey> {
        trace!("set {name:?}");
        let mut bindings = self.scope.bindings.borrow_mut();
        if bindings.contains_key(name) {
            return Err(DuplicateKey { name: name.to_string() });
        }
        bindings.insert(name.to_string(), obj);
        Ok(())
    }

    /// Creates a child scope whose parent is this one.
    #[must_use]
    pub fn new_scope(&self) -> Self {
        Self { scope: Rc::new(Scope { bindings: RefCell::new(HashMap::new()),
                                      parent:   Some(Rc::clone(&self.scope)), }), }
    }

    /// The outermost scope of the chain.
    #[must_use]
    pub fn global(&self) -> Self {
        let mut scope = Rc::clone(&self.scope);
        while let Some(parent) = scope.parent.clone() {
            scope = parent;
        }
        Self { scope }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;
    use crate::interpreter::value::Object;

    #[test]
    fn get_walks_outward() {
        let global = Environment::new();
        global.set("x", Object::Integer(1)).unwrap();
        let inner = global.new_scope().new_scope();
        assert_eq!(inner.get("x"), Some(Object::Integer(1)));
        assert_eq!(inner.get("missing"), None);
    }

    #[test]
    fn set_fails_on_duplicate_in_current_scope() {
        let env = Environment::new();
        env.set("x", Object::Integer(1)).unwrap();
        let err = env.set("x", Object::Integer(2)).unwrap_err();
        assert_eq!(err.to_string(), "duplicate env key \"x\"");
        // Shadowing in a child scope is allowed.
        let child = env.new_scope();
        child.set("x", Object::Integer(3)).unwrap();
        assert_eq!(child.get("x"), Some(Object::Integer(3)));
        assert_eq!(env.get("x"), Some(Object::Integer(1)));
    }

    #[test]
    fn global_returns_the_outermost_scope() {
        let global = Environment::new();
        global.set("g", Object::Integer(7)).unwrap();
        let inner = global.new_scope();
        inner.set("local", Object::Integer(1)).unwrap();
        let fresh = inner.global().new_scope();
        assert_eq!(fresh.get("g"), Some(Object::Integer(7)));
        assert_eq!(fresh.get("local"), None);
    }

    #[test]
    fn booleans_are_predefined() {
        let env = Environment::new();
        assert_eq!(env.get("true"), Some(Object::Boolean(true)));
        assert_eq!(env.get("false"), Some(Object::Boolean(false)));
    }
}
