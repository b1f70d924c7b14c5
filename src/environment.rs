use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

/// A handle to one frame in the scope chain. Cloning the handle shares the
/// frame, which is what closure capture requires: later mutations of a
/// captured variable are visible through every handle.
#[derive(Debug, Clone)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

#[derive(Debug)]
struct Frame {
    values: BTreeMap<String, Value>,
    enclosing: Option<Rc<RefCell<Frame>>>,
}

impl Environment {
    /// The root (global) frame.
    pub fn new() -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                values: BTreeMap::new(),
                enclosing: None,
            })),
        }
    }

    /// A fresh frame enclosing this one.
    pub fn child(&self) -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                values: BTreeMap::new(),
                enclosing: Some(Rc::clone(&self.frame)),
            })),
        }
    }

    pub fn define(&self, name: &str, value: Value) {
        self.frame.borrow_mut().values.insert(name.to_string(), value);
    }

    /// Reads from this frame only; the resolver decides which frame to ask.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.frame.borrow().values.get(name).cloned()
    }

    /// Writes to this frame only, and only to an existing binding.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        match self.frame.borrow_mut().values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance)?.get(name)
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: Value) -> bool {
        match self.ancestor(distance) {
            Some(environment) => environment.assign(name, value),
            None => false,
        }
    }

    fn ancestor(&self, distance: usize) -> Option<Environment> {
        let mut frame = Rc::clone(&self.frame);
        for _ in 0..distance {
            let enclosing = frame.borrow().enclosing.as_ref().map(Rc::clone);
            frame = enclosing?;
        }
        Some(Environment { frame })
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn define_get_assign() {
        let env = Environment::new();
        assert_eq!(env.get("a"), None);
        env.define("a", Value::Number(1.0));
        assert_eq!(env.get("a"), Some(Value::Number(1.0)));
        assert!(env.assign("a", Value::Number(2.0)));
        assert_eq!(env.get("a"), Some(Value::Number(2.0)));
        assert!(!env.assign("b", Value::Nil));
    }

    #[test]
    fn child_frames_shadow_without_clobbering() {
        let globals = Environment::new();
        globals.define("a", Value::Number(1.0));
        let inner = globals.child();
        inner.define("a", Value::Number(2.0));
        assert_eq!(inner.get("a"), Some(Value::Number(2.0)));
        assert_eq!(globals.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn ancestor_walk() {
        let globals = Environment::new();
        globals.define("a", Value::Number(1.0));
        let middle = globals.child();
        middle.define("b", Value::Number(2.0));
        let inner = middle.child();

        assert_eq!(inner.get_at(1, "b"), Some(Value::Number(2.0)));
        assert_eq!(inner.get_at(2, "a"), Some(Value::Number(1.0)));
        assert_eq!(inner.get_at(0, "a"), None);
        assert_eq!(inner.get_at(9, "a"), None);

        assert!(inner.assign_at(2, "a", Value::Number(7.0)));
        assert_eq!(globals.get("a"), Some(Value::Number(7.0)));
    }

    #[test]
    fn clones_share_the_frame() {
        let env = Environment::new();
        let alias = env.clone();
        env.define("a", Value::Number(1.0));
        assert_eq!(alias.get("a"), Some(Value::Number(1.0)));
        alias.assign("a", Value::Number(2.0));
        assert_eq!(env.get("a"), Some(Value::Number(2.0)));
    }
}
