use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::LoxFunction;

/// A class value. Immutable once constructed; instances hold a handle back
/// to it for method lookup.
#[derive(Debug, Clone)]
pub struct Class {
    data: Rc<ClassData>,
}

#[derive(Debug)]
struct ClassData {
    name: String,
    superclass: Option<Class>,
    methods: BTreeMap<String, LoxFunction>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Class>,
        methods: BTreeMap<String, LoxFunction>,
    ) -> Class {
        Class {
            data: Rc::new(ClassData {
                name,
                superclass,
                methods,
            }),
        }
    }

    /// Looks up a method here, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.data.methods.get(name) {
            return Some(method.clone());
        }
        self.data.superclass.as_ref()?.find_method(name)
    }

    /// Constructor arity is the initializer's, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.name)
    }
}
