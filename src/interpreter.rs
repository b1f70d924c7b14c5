//! Tree-walking evaluator. Executes resolved statements against a chain of
//! environment frames, writing `print` output to the writer it owns.

use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{ExprId, Expression, FunctionDecl, LiteralValue, Statement};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::Class;
use crate::environment::Environment;
use crate::error::{Reporter, RuntimeError};
use crate::instance::Instance;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Why statement execution stopped early. `Return` is ordinary control flow
/// riding the same channel as errors; call boundaries peel it off.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

fn error(message: impl Into<String>, token: &Token) -> Unwind {
    Unwind::Error(RuntimeError::new(message, Some(token)))
}

pub struct Interpreter<W: Write> {
    globals: Environment,
    environment: Environment,
    locals: Locals,
    output: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W) -> Interpreter<W> {
        let globals = Environment::new();
        globals.define(
            "clock",
            Value::NativeFunction(NativeFunction {
                name: "clock",
                arity: 0,
                function: clock,
            }),
        );
        Interpreter {
            environment: globals.clone(),
            globals,
            locals: Locals::new(),
            output,
        }
    }

    /// Absorbs a resolver side-table. Bindings accumulate because closures
    /// from earlier REPL lines keep their expression ids alive.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Runs the statements, reporting at most one runtime error.
    pub fn interpret(&mut self, statements: &[Statement], reporter: &mut Reporter) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Error(runtime_error)) => {
                    reporter.runtime_error(&runtime_error);
                    return;
                }
                // The resolver rejects top-level `return`.
                Err(Unwind::Return(_)) => return,
            }
        }
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), Unwind> {
        match statement {
            Statement::Nop => Ok(()),
            Statement::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Statement::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)
                    .map_err(|e| Unwind::Error(RuntimeError::new(e.to_string(), None)))
            }
            Statement::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(())
            }
            Statement::Block(statements) => {
                self.execute_block(statements, self.environment.child())
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Statement::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }
                Ok(())
            }
            Statement::Function(declaration) => {
                let function =
                    LoxFunction::new(Rc::clone(declaration), self.environment.clone(), false);
                self.environment
                    .define(&declaration.name.lexeme, Value::Function(function));
                Ok(())
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Runs `statements` with `environment` as the current frame, restoring
    /// the previous frame on every exit path.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Environment,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expression::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(error("Superclass must be a class.", token));
                }
            },
            None => None,
        };

        // Defined first so methods can refer to the class by name.
        self.environment.define(&name.lexeme, Value::Nil);

        let method_closure = match &superclass_value {
            Some(class) => {
                let environment = self.environment.child();
                environment.define("super", Value::Class(class.clone()));
                environment
            }
            None => self.environment.clone(),
        };

        let mut method_map = BTreeMap::new();
        for method in methods {
            let function = LoxFunction::new(
                Rc::clone(method),
                method_closure.clone(),
                method.name.lexeme == "init",
            );
            method_map.insert(method.name.lexeme.clone(), function);
        }

        let class = Class::new(name.lexeme.clone(), superclass_value, method_map);
        self.environment
            .assign(&name.lexeme, Value::Class(class));
        Ok(())
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value, Unwind> {
        match expression {
            Expression::Literal(value) => Ok(match value {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Boolean(b) => Value::Boolean(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(s.clone()),
            }),
            Expression::Grouping(inner) => self.evaluate(inner),
            Expression::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.kind {
                    TokenType::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(error("operand must be a number", operator)),
                    },
                    TokenType::Bang => Ok(Value::Boolean(!is_truthy(&right))),
                    _ => Err(error("unexpected token", operator)),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(operator, left, right)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let take_left = match operator.kind {
                    TokenType::Or => is_truthy(&left),
                    _ => !is_truthy(&left),
                };
                if take_left {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expression::Variable { name, id } => self.look_up_variable(name, *id),
            Expression::Assign { name, value, id } => {
                let value = self.evaluate(value)?;
                let assigned = match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .assign_at(distance, &name.lexeme, value.clone())
                    }
                    None => self.globals.assign(&name.lexeme, value.clone()),
                };
                if assigned {
                    Ok(value)
                } else {
                    Err(error(
                        format!("Undefined variable '{}'", name.lexeme),
                        name,
                    ))
                }
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                self.call_value(callee, &args, paren)
            }
            Expression::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(&name.lexeme).ok_or_else(|| {
                    error(format!("Undefined property '{}'", name.lexeme), name)
                }),
                _ => Err(error("Only instances have properties.", name)),
            },
            Expression::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(&name.lexeme, value.clone());
                    Ok(value)
                }
                _ => Err(error("Only instances have fields.", name)),
            },
            Expression::This { keyword, id } => self.look_up_variable(keyword, *id),
            Expression::Super {
                keyword,
                method,
                id,
            } => self.evaluate_super(keyword, method, *id),
        }
    }

    fn evaluate_binary(
        &mut self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<Value, Unwind> {
        match operator.kind {
            TokenType::EqualEqual => Ok(Value::Boolean(left == right)),
            TokenType::BangEqual => Ok(Value::Boolean(left != right)),
            TokenType::Plus => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                _ => Err(error("operands should be numbers or strings", operator)),
            },
            TokenType::Minus => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Number(l - r))
            }
            TokenType::Star => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Number(l * r))
            }
            // No zero check: division follows the doubles.
            TokenType::Slash => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Number(l / r))
            }
            // Both operands truncate toward zero before the remainder.
            TokenType::Percent => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Number(l.trunc() % r.trunc()))
            }
            TokenType::Greater => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Boolean(l > r))
            }
            TokenType::GreaterEqual => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Boolean(l >= r))
            }
            TokenType::Less => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Boolean(l < r))
            }
            TokenType::LessEqual => {
                let (l, r) = number_operands(operator, left, right)?;
                Ok(Value::Boolean(l <= r))
            }
            _ => Err(error("unexpected token", operator)),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        arguments: &[Value],
        paren: &Token,
    ) -> Result<Value, Unwind> {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;
                function.call(self, arguments)
            }
            Value::NativeFunction(native) => {
                check_arity(native.arity, arguments.len(), paren)?;
                (native.function)(arguments).map_err(|message| error(message, paren))
            }
            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;
                let instance = Instance::new(class.clone());
                if let Some(initializer) = class.find_method("init") {
                    initializer.bind(instance.clone()).call(self, arguments)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(error("Can only call functions and classes", paren)),
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        id: ExprId,
    ) -> Result<Value, Unwind> {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,
            None => return Err(error("Undefined variable 'super'", keyword)),
        };
        let superclass = match self.environment.get_at(distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(error("Undefined variable 'super'", keyword)),
        };
        // `this` sits one frame inside the one that holds `super`.
        let object = match distance
            .checked_sub(1)
            .and_then(|d| self.environment.get_at(d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(error("Undefined variable 'this'", keyword)),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(object))),
            None => Err(error(
                format!("Undefined property '{}'", method.lexeme),
                method,
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, Unwind> {
        let value = match self.locals.get(&id) {
            Some(&distance) => self.environment.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        value.ok_or_else(|| error(format!("Undefined variable '{}'", name.lexeme), name))
    }
}

/// nil and false are false; everything else, zero and "" included, is true.
fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}

fn check_arity(arity: usize, got: usize, paren: &Token) -> Result<(), Unwind> {
    if got == arity {
        Ok(())
    } else {
        Err(error(
            format!("Expected {} arguments but got {}", arity, got),
            paren,
        ))
    }
}

fn number_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64), Unwind> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(error("operands must be numbers", operator)),
    }
}

fn clock(_arguments: &[Value]) -> Result<Value, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod interpreter_tests {
    use super::*;
    use crate::ast::ExprIds;
    use crate::parser;
    use crate::resolver;
    use crate::scanner;

    fn run(source: &str) -> Result<String, String> {
        let mut reporter = Reporter::new();
        let tokens = scanner::scan_tokens(source, &mut reporter);
        let mut ids = ExprIds::default();
        let statements = parser::parse(&tokens, &mut ids, &mut reporter);
        assert!(!reporter.had_error(), "{:?}", reporter.diagnostics());
        let locals = resolver::resolve(&statements, &mut reporter);
        assert!(!reporter.had_error(), "{:?}", reporter.diagnostics());

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);
        interpreter.add_locals(locals);
        interpreter.interpret(&statements, &mut reporter);
        let printed = String::from_utf8(output).expect("output is utf-8");
        if reporter.had_runtime_error() {
            Err(reporter.diagnostics().last().cloned().unwrap_or_default())
        } else {
            Ok(printed)
        }
    }

    fn expect_output(source: &str, expected: &str) {
        assert_eq!(run(source).expect(source), expected);
    }

    fn expect_runtime_error(source: &str, expected: &str) {
        let report = run(source).expect_err(source);
        assert!(
            report.contains(expected),
            "expected {:?} in {:?}",
            expected,
            report
        );
    }

    #[test]
    fn arithmetic() {
        expect_output("print 1 + 2 * 3;", "7\n");
        expect_output("print (1 + 2) * 3;", "9\n");
        expect_output("print 7 / 2;", "3.5\n");
        expect_output("print 7 % 3;", "1\n");
        expect_output("print 7.9 % 3.9;", "1\n");
        expect_output("print -3 + 1;", "-2\n");
    }

    #[test]
    fn number_formatting() {
        expect_output("print 3;", "3\n");
        expect_output("print 3.25;", "3.25\n");
        expect_output("print 0.1 + 0.2;", "0.30000000000000004\n");
    }

    #[test]
    fn string_concatenation() {
        expect_output("print \"foo\" + \"bar\";", "foobar\n");
    }

    #[test]
    fn comparison_and_equality() {
        expect_output("print 1 < 2;", "true\n");
        expect_output("print 2 <= 2;", "true\n");
        expect_output("print 1 > 2;", "false\n");
        expect_output("print 1 == 1;", "true\n");
        expect_output("print 1 == \"1\";", "false\n");
        expect_output("print nil == nil;", "true\n");
        expect_output("print nil == false;", "false\n");
        expect_output("print 0/0 == 0/0;", "false\n");
    }

    #[test]
    fn truthiness() {
        expect_output("print !nil;", "true\n");
        expect_output("print !false;", "true\n");
        expect_output("print !0;", "false\n");
        expect_output("print !\"\";", "false\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        expect_output("print \"a\" or \"b\";", "a\n");
        expect_output("print nil or \"b\";", "b\n");
        expect_output("print nil and \"b\";", "nil\n");
        expect_output("print \"a\" and \"b\";", "b\n");
    }

    #[test]
    fn short_circuit_skips_right_side() {
        expect_output(
            "fun boom() { print \"boom\"; return true; } \
             print false and boom(); print true or boom();",
            "false\ntrue\n",
        );
    }

    #[test]
    fn variables_and_blocks() {
        expect_output("var a = 1; { var a = 2; print a; } print a;", "2\n1\n");
        expect_output("var a = 1; { a = 2; } print a;", "2\n");
        expect_output("var a; print a;", "nil\n");
    }

    #[test]
    fn if_and_while() {
        expect_output("if (1 < 2) print \"yes\"; else print \"no\";", "yes\n");
        expect_output(
            "var i = 0; while (i < 3) { print i; i = i + 1; }",
            "0\n1\n2\n",
        );
    }

    #[test]
    fn functions_and_returns() {
        expect_output(
            "fun max(x, y) { if (x > y) { return x; } return y; } print max(3, 7);",
            "7\n",
        );
        expect_output("fun f() {} print f();", "nil\n");
        expect_output("fun f() { return; print \"skipped\"; } print f();", "nil\n");
        expect_output("fun f() { return 1; } print f;", "<fn f>\n");
        expect_output("print clock;", "<native fn>\n");
    }

    #[test]
    fn recursion() {
        expect_output(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);",
            "55\n",
        );
    }

    #[test]
    fn closures_capture_frames_not_snapshots() {
        expect_output(
            "var a = 1; fun show() { print a; } show(); a = 2; show();",
            "1\n2\n",
        );
        expect_output(
            "fun counter() { var n = 0; fun bump() { n = n + 1; return n; } return bump; } \
             var c = counter(); print c(); print c();",
            "1\n2\n",
        );
    }

    #[test]
    fn closure_sees_binding_from_declaration_scope() {
        expect_output(
            "var a = \"global\"; { fun show() { print a; } show(); var a = \"block\"; show(); }",
            "global\nglobal\n",
        );
    }

    #[test]
    fn classes_and_fields() {
        expect_output("class A {} print A;", "A\n");
        expect_output("class A {} print A();", "A instance\n");
        expect_output(
            "class A {} var a = A(); a.field = 3; print a.field;",
            "3\n",
        );
    }

    #[test]
    fn methods_bind_this() {
        expect_output(
            "class A { greet() { print \"hello \" + this.name; } } \
             var a = A(); a.name = \"world\"; a.greet();",
            "hello world\n",
        );
        expect_output(
            "class A { m() { return this; } } var a = A(); print a.m() == a;",
            "true\n",
        );
    }

    #[test]
    fn detached_method_keeps_its_receiver() {
        expect_output(
            "class A { init(n) { this.n = n; } get() { return this.n; } } \
             var m = A(7).get; print m();",
            "7\n",
        );
    }

    #[test]
    fn fields_shadow_methods() {
        expect_output(
            "class A { m() { return \"method\"; } } var a = A(); \
             a.m = \"field\"; print a.m;",
            "field\n",
        );
    }

    #[test]
    fn initializers() {
        expect_output(
            "class Counter { init(n) { this.n = n; } bump() { this.n = this.n + 1; return this.n; } } \
             var k = Counter(0); print k.bump(); print k.bump();",
            "1\n2\n",
        );
        // A direct init call returns the instance.
        expect_output(
            "class A { init() { this.x = 1; } } var a = A(); print a.init() == a;",
            "true\n",
        );
        expect_output(
            "class A { init() { if (true) return; this.x = 1; } } print A() == nil;",
            "false\n",
        );
    }

    #[test]
    fn inheritance_and_super() {
        expect_output(
            "class A { m() { return \"A\"; } } class B < A {} print B().m();",
            "A\n",
        );
        expect_output(
            "class A { m() { return \"A\"; } } \
             class B < A { m() { return \"B+\" + super.m(); } } print B().m();",
            "B+A\n",
        );
        expect_output(
            "class A { init() { this.tag = \"A\"; } } \
             class B < A { init() { super.init(); } } print B().tag;",
            "A\n",
        );
    }

    #[test]
    fn super_binds_the_original_receiver() {
        expect_output(
            "class A { who() { return this.name; } } \
             class B < A { who() { return super.who(); } } \
             var b = B(); b.name = \"b\"; print b.who();",
            "b\n",
        );
    }

    #[test]
    fn runtime_errors() {
        expect_runtime_error("print \"x\" + 1;", "operands should be numbers or strings");
        expect_runtime_error("print 1 < \"2\";", "operands must be numbers");
        expect_runtime_error("print -\"x\";", "operand must be a number");
        expect_runtime_error("print missing;", "Undefined variable 'missing'");
        expect_runtime_error("missing = 1;", "Undefined variable 'missing'");
        expect_runtime_error("var x = 1; x(1);", "Can only call functions and classes");
        expect_runtime_error(
            "fun f(a) {} f(1, 2);",
            "Expected 1 arguments but got 2",
        );
        expect_runtime_error(
            "class A {} A().missing;",
            "Undefined property 'missing'",
        );
        expect_runtime_error("var x = 1; x.field;", "Only instances have properties.");
        expect_runtime_error("var x = 1; x.field = 2;", "Only instances have fields.");
        expect_runtime_error("var X = 1; class B < X {}", "Superclass must be a class.");
    }

    #[test]
    fn runtime_error_reports_line() {
        expect_runtime_error("var a = 1;\nprint a + \"x\";", "[line 2]");
    }

    #[test]
    fn division_follows_doubles() {
        expect_output("print 1 / 0 > 0;", "true\n");
        expect_output("print 0 % 0 == 0 % 0;", "false\n");
    }

    #[test]
    fn evaluation_order_is_left_to_right() {
        expect_output(
            "fun t(tag, v) { print tag; return v; } print t(\"l\", 1) + t(\"r\", 2);",
            "l\nr\n3\n",
        );
    }

    #[test]
    fn clock_returns_seconds() {
        let Ok(Value::Number(now)) = clock(&[]) else {
            panic!("clock failed");
        };
        // Some time after 2020, in seconds, not milliseconds.
        assert!(now > 1_577_836_800.0);
        assert!(now < 100_000_000_000.0);
    }
}
