//! Static resolution pass. Walks the statements once, tracking lexical
//! scopes, and records for every non-global variable reference how many
//! frames separate the use from its binding. Also the home of the static
//! checks: self-referential initializers, duplicate locals, stray `return`,
//! and misplaced `this`/`super`.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;

use crate::ast::{ExprId, Expression, FunctionDecl, Statement};
use crate::error::Reporter;
use crate::token::Token;

/// Side-table from expression identity to binding depth. An absent entry
/// means the name resolves in the global frame at runtime.
pub type Locals = HashMap<ExprId, usize>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolves `statements`, reporting static errors through `reporter`.
/// Resolution keeps going after an error; the result is only meaningful if
/// the reporter's error flag stays clear.
pub fn resolve(statements: &[Statement], reporter: &mut Reporter) -> Locals {
    let mut resolver = Resolver {
        reporter,
        scopes: Vec::new(),
        locals: HashMap::new(),
        current_function: FunctionType::None,
        current_class: ClassType::None,
    };
    resolver.resolve_statements(statements);
    debug!("resolved {} local binding(s)", resolver.locals.len());
    resolver.locals
}

struct Resolver<'r> {
    reporter: &'r mut Reporter,
    // false = declared, true = defined.
    scopes: Vec<BTreeMap<String, bool>>,
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Resolver<'_> {
    fn resolve_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.resolve_statement(statement);
        }
    }

    fn resolve_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Nop => {}
            Statement::Expression(expr) | Statement::Print(expr) => self.resolve_expression(expr),
            Statement::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expression(initializer);
                }
                self.define(name);
            }
            Statement::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expression(condition);
                self.resolve_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch);
                }
            }
            Statement::While { condition, body } => {
                self.resolve_expression(condition);
                self.resolve_statement(body);
            }
            Statement::Function(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }
            Statement::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.reporter
                        .error_at(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.reporter
                            .error_at(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expression(value);
                }
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expression::Variable {
                name: superclass_name,
                ..
            } = superclass
            {
                if superclass_name.lexeme == name.lexeme {
                    self.reporter
                        .error_at(superclass_name, "A class can't inherit from itself.");
                }
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expression(superclass);

            self.begin_scope();
            self.insert("super");
        }

        self.begin_scope();
        self.insert("this");
        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }
        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&declaration.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(_) => {}
            Expression::Grouping(inner) => self.resolve_expression(inner),
            Expression::Unary { right, .. } => self.resolve_expression(right),
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                self.resolve_expression(left);
                self.resolve_expression(right);
            }
            Expression::Variable { name, id } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.reporter.error_at(
                            name,
                            "Can't read local variable in its own initializer",
                        );
                    }
                }
                self.resolve_local(*id, name);
            }
            Expression::Assign { name, value, id } => {
                self.resolve_expression(value);
                self.resolve_local(*id, name);
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                self.resolve_expression(callee);
                for argument in arguments {
                    self.resolve_expression(argument);
                }
            }
            Expression::Get { object, .. } => self.resolve_expression(object),
            Expression::Set { object, value, .. } => {
                self.resolve_expression(object);
                self.resolve_expression(value);
            }
            Expression::This { keyword, id } => {
                if self.current_class == ClassType::None {
                    self.reporter
                        .error_at(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }
            Expression::Super { keyword, id, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.reporter
                            .error_at(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.reporter
                            .error_at(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
        }
    }

    /// Walks scopes innermost-out; a hit records the hop count in the
    /// side-table. No hit means the name is (or will be) a global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, self.scopes.len() - 1 - index);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.insert(name.lexeme.clone(), false).is_some() {
                self.reporter
                    .error_at(name, "Already a variable with this name in this scope.");
            }
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Defines a synthetic name (`this`, `super`) in the innermost scope.
    fn insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }
}
