use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::instance::Instance;
use crate::interpreter::{Interpreter, Unwind};
use crate::value::Value;

/// A user-declared function or method: the shared declaration plus the
/// frame it closed over. Binding `this` produces a new `LoxFunction` around
/// the same declaration.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    data: Rc<FunctionData>,
}

#[derive(Debug)]
struct FunctionData {
    declaration: Rc<FunctionDecl>,
    closure: Environment,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Environment,
        is_initializer: bool,
    ) -> LoxFunction {
        LoxFunction {
            data: Rc::new(FunctionData {
                declaration,
                closure,
                is_initializer,
            }),
        }
    }

    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[Value],
    ) -> Result<Value, Unwind> {
        let environment = self.data.closure.child();
        for (param, argument) in self.data.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument.clone());
        }

        let result = interpreter.execute_block(&self.data.declaration.body, environment);
        match result {
            Err(Unwind::Return(value)) => {
                if self.data.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }
            Err(unwind) => Err(unwind),
            Ok(()) => {
                if self.data.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }

    /// A copy of this function whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Instance) -> LoxFunction {
        let environment = self.data.closure.child();
        environment.define("this", Value::Instance(instance));
        LoxFunction {
            data: Rc::new(FunctionData {
                declaration: Rc::clone(&self.data.declaration),
                closure: environment,
                is_initializer: self.data.is_initializer,
            }),
        }
    }

    // An initializer is always invoked bound, so `this` sits in its closure.
    fn bound_this(&self) -> Value {
        self.data.closure.get("this").unwrap_or(Value::Nil)
    }

    pub fn arity(&self) -> usize {
        self.data.declaration.params.len()
    }

    pub fn name(&self) -> &str {
        &self.data.declaration.name.lexeme
    }

    pub fn ptr_eq(&self, other: &LoxFunction) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A built-in exposed to programs through the global frame.
#[derive(Debug, Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub function: fn(&[Value]) -> Result<Value, String>,
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &NativeFunction) -> bool {
        self.name == other.name && self.function == other.function
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}
