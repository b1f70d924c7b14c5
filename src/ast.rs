use std::rc::Rc;

use crate::token::Token;

/// Identity of a variable-referencing expression. Assigned by the parser,
/// unique for the lifetime of a session; the resolver keys its binding
/// side-table by it.
pub type ExprId = usize;

/// Source of fresh expression ids. One per session, threaded through every
/// parse so ids stay unique across REPL lines.
#[derive(Debug, Default)]
pub struct ExprIds(usize);

impl ExprIds {
    pub fn next(&mut self) -> ExprId {
        let id = self.0;
        self.0 += 1;
        id
    }
}

#[derive(Debug, Clone)]
pub enum LiteralValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(LiteralValue),
    Grouping(Box<Expression>),
    Unary {
        operator: Token,
        right: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    // Kept apart from Binary so evaluation can short-circuit.
    Logical {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    Variable {
        name: Token,
        id: ExprId,
    },
    Assign {
        name: Token,
        value: Box<Expression>,
        id: ExprId,
    },
    Call {
        callee: Box<Expression>,
        paren: Token,
        arguments: Vec<Expression>,
    },
    Get {
        object: Box<Expression>,
        name: Token,
    },
    Set {
        object: Box<Expression>,
        name: Token,
        value: Box<Expression>,
    },
    This {
        keyword: Token,
        id: ExprId,
    },
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
}

/// A function or method declaration. `Rc`-shared so runtime function values
/// can hold the declaration after the surrounding statement list is gone.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// Sentinel left behind by panic-mode recovery. Never executes: the
    /// error flag that produced it also gates evaluation.
    Nop,
    Expression(Expression),
    Print(Expression),
    Var {
        name: Token,
        initializer: Option<Expression>,
    },
    Block(Vec<Statement>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    Function(Rc<FunctionDecl>),
    Return {
        keyword: Token,
        value: Option<Expression>,
    },
    Class {
        name: Token,
        superclass: Option<Expression>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

/// S-expression rendering used by parser tests to compare tree shapes.
/// Expression ids are deliberately omitted.
#[cfg(test)]
pub(crate) fn print_stmt(stmt: &Statement) -> String {
    match stmt {
        Statement::Nop => "(nop)".to_string(),
        Statement::Expression(e) => format!("(expr {})", print_expr(e)),
        Statement::Print(e) => format!("(print {})", print_expr(e)),
        Statement::Var { name, initializer } => match initializer {
            Some(init) => format!("(var {} {})", name.lexeme, print_expr(init)),
            None => format!("(var {})", name.lexeme),
        },
        Statement::Block(statements) => {
            let inner: Vec<String> = statements.iter().map(print_stmt).collect();
            format!("(block {})", inner.join(" "))
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => match else_branch {
            Some(e) => format!(
                "(if {} {} {})",
                print_expr(condition),
                print_stmt(then_branch),
                print_stmt(e)
            ),
            None => format!("(if {} {})", print_expr(condition), print_stmt(then_branch)),
        },
        Statement::While { condition, body } => {
            format!("(while {} {})", print_expr(condition), print_stmt(body))
        }
        Statement::Function(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
            let body: Vec<String> = decl.body.iter().map(print_stmt).collect();
            format!(
                "(fun {} ({}) {})",
                decl.name.lexeme,
                params.join(" "),
                body.join(" ")
            )
        }
        Statement::Return { value, .. } => match value {
            Some(v) => format!("(return {})", print_expr(v)),
            None => "(return)".to_string(),
        },
        Statement::Class {
            name,
            superclass,
            methods,
        } => {
            let methods: Vec<String> = methods
                .iter()
                .map(|m| print_stmt(&Statement::Function(Rc::clone(m))))
                .collect();
            match superclass {
                Some(sc) => format!(
                    "(class {} < {} {})",
                    name.lexeme,
                    print_expr(sc),
                    methods.join(" ")
                ),
                None => format!("(class {} {})", name.lexeme, methods.join(" ")),
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn print_expr(expr: &Expression) -> String {
    match expr {
        Expression::Literal(value) => match value {
            LiteralValue::Nil => "nil".to_string(),
            LiteralValue::Boolean(b) => b.to_string(),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::String(s) => format!("\"{}\"", s),
        },
        Expression::Grouping(inner) => format!("(group {})", print_expr(inner)),
        Expression::Unary { operator, right } => {
            format!("({} {})", operator.lexeme, print_expr(right))
        }
        Expression::Binary {
            left,
            operator,
            right,
        }
        | Expression::Logical {
            left,
            operator,
            right,
        } => format!(
            "({} {} {})",
            operator.lexeme,
            print_expr(left),
            print_expr(right)
        ),
        Expression::Variable { name, .. } => name.lexeme.clone(),
        Expression::Assign { name, value, .. } => {
            format!("(= {} {})", name.lexeme, print_expr(value))
        }
        Expression::Call {
            callee, arguments, ..
        } => {
            let args: Vec<String> = arguments.iter().map(print_expr).collect();
            format!("(call {} {})", print_expr(callee), args.join(" "))
        }
        Expression::Get { object, name } => format!("(. {} {})", print_expr(object), name.lexeme),
        Expression::Set {
            object,
            name,
            value,
        } => format!(
            "(.= {} {} {})",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),
        Expression::This { .. } => "this".to_string(),
        Expression::Super { method, .. } => format!("(super {})", method.lexeme),
    }
}
