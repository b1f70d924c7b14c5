use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::value::Value;

/// An instance of a class: mutable fields over an immutable class handle.
#[derive(Debug, Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceData>>,
}

#[derive(Debug)]
struct InstanceData {
    class: Class,
    fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: Class) -> Instance {
        Instance {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: BTreeMap::new(),
            })),
        }
    }

    /// Property read: fields shadow methods; a method hit is bound to this
    /// instance before it is returned.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.data.borrow().fields.get(name) {
            return Some(value.clone());
        }
        let class = self.data.borrow().class.clone();
        class
            .find_method(name)
            .map(|method| Value::Function(method.bind(self.clone())))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.data.borrow().class)
    }
}
