//! Recursive-descent parser with panic-mode recovery: a parse error is
//! reported, tokens are discarded to a statement boundary, and parsing picks
//! back up with the next declaration so one run reports everything it can.

use std::rc::Rc;

use log::debug;

use crate::ast::{ExprIds, Expression, FunctionDecl, LiteralValue, Statement};
use crate::error::Reporter;
use crate::token::{Literal, Token, TokenType};

const MAX_ARITY: usize = 255;

#[derive(Debug)]
struct ParseError {
    token: Token,
    message: String,
}

impl ParseError {
    fn new(token: &Token, message: impl Into<String>) -> ParseError {
        ParseError {
            token: token.clone(),
            message: message.into(),
        }
    }
}

/// Parses a scanned token list into statements. Errors go through the
/// reporter; a declaration that failed to parse is replaced by
/// `Statement::Nop` and the caller must not execute the result if the
/// reporter's error flag is set.
pub fn parse(tokens: &[Token], ids: &mut ExprIds, reporter: &mut Reporter) -> Vec<Statement> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut parser = Parser {
        tokens,
        current: 0,
        ids,
        reporter,
    };
    let mut statements = Vec::new();
    while !parser.is_at_end() {
        statements.push(parser.declaration());
    }
    debug!("parsed {} statement(s)", statements.len());
    statements
}

struct Parser<'p> {
    tokens: &'p [Token],
    current: usize,
    ids: &'p mut ExprIds,
    reporter: &'p mut Reporter,
}

impl Parser<'_> {
    fn declaration(&mut self) -> Statement {
        let result = if self.match_kind(TokenType::Class) {
            self.class_declaration()
        } else if self.match_kind(TokenType::Fun) {
            self.function("function").map(Statement::Function)
        } else if self.match_kind(TokenType::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };
        match result {
            Ok(statement) => statement,
            Err(error) => {
                self.reporter.error_at(&error.token, &error.message);
                self.synchronize();
                Statement::Nop
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_kind(TokenType::Less) {
            let superclass_name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(Expression::Variable {
                name: superclass_name,
                id: self.ids.next(),
            })
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Statement::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>, ParseError> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {} name.", kind))?;
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block_statements()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.match_kind(TokenType::If) {
            self.if_statement()
        } else if self.match_kind(TokenType::Print) {
            self.print_statement()
        } else if self.match_kind(TokenType::While) {
            self.while_statement()
        } else if self.match_kind(TokenType::For) {
            self.for_statement()
        } else if self.match_kind(TokenType::Return) {
            self.return_statement()
        } else if self.match_kind(TokenType::LeftBrace) {
            Ok(Statement::Block(self.block_statements()?))
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after while condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Statement::While { condition, body })
    }

    /// Desugars `for (I; C; U) B` into `{ I; while (C) { B; U; } }`,
    /// producing the same tree the handwritten form would.
    fn for_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenType::Semicolon) {
            None
        } else if self.match_kind(TokenType::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Statement::Block(vec![body, Statement::Expression(increment)]);
        }
        body = Statement::While {
            condition: condition.unwrap_or(Expression::Literal(LiteralValue::Boolean(true))),
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Statement::Block(vec![initializer, body]);
        }
        Ok(body)
    }

    fn return_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }

    fn print_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }

    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }

    fn block_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration());
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expression, ParseError> {
        let expr = self.or()?;

        if self.match_kind(TokenType::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            // The left side is already parsed; rewrite it into an
            // assignment target if it is one.
            return match expr {
                Expression::Variable { name, .. } => Ok(Expression::Assign {
                    name,
                    value,
                    id: self.ids.next(),
                }),
                Expression::Get { object, name } => Ok(Expression::Set {
                    object,
                    name,
                    value,
                }),
                other => {
                    self.reporter.error_at(&equals, "Invalid assignment target.");
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.and()?;
        while self.match_kind(TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.comparison()?;
        while self.match_kinds(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.term()?;
        while self.match_kinds(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.factor()?;
        while self.match_kinds(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.unary()?;
        while self.match_kinds(&[TokenType::Slash, TokenType::Star, TokenType::Percent]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        if self.match_kinds(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expression::Unary {
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenType::Dot) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expression::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expression) -> Result<Expression, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_kind(TokenType::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        if self.match_kind(TokenType::False) {
            return Ok(Expression::Literal(LiteralValue::Boolean(false)));
        }
        if self.match_kind(TokenType::True) {
            return Ok(Expression::Literal(LiteralValue::Boolean(true)));
        }
        if self.match_kind(TokenType::Nil) {
            return Ok(Expression::Literal(LiteralValue::Nil));
        }
        if self.match_kinds(&[TokenType::Number, TokenType::String]) {
            return Ok(Expression::Literal(match &self.previous().literal {
                Literal::Number(n) => LiteralValue::Number(*n),
                Literal::String(s) => LiteralValue::String(s.clone()),
                Literal::None => LiteralValue::Nil,
            }));
        }
        if self.match_kind(TokenType::This) {
            return Ok(Expression::This {
                keyword: self.previous().clone(),
                id: self.ids.next(),
            });
        }
        if self.match_kind(TokenType::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
            return Ok(Expression::Super {
                keyword,
                method,
                id: self.ids.next(),
            });
        }
        if self.match_kind(TokenType::Identifier) {
            return Ok(Expression::Variable {
                name: self.previous().clone(),
                id: self.ids.next(),
            });
        }
        if self.match_kind(TokenType::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expression::Grouping(Box::new(expr)));
        }
        Err(ParseError::new(self.peek(), "Expect expression."))
    }

    /// Discards tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenType::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(ParseError::new(self.peek(), message))
        }
    }

    fn match_kind(&mut self, kind: TokenType) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_kinds(&mut self, kinds: &[TokenType]) -> bool {
        kinds.iter().any(|&kind| self.match_kind(kind))
    }

    fn check(&self, kind: TokenType) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}
