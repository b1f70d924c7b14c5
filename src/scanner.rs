use std::iter::Peekable;
use std::str::CharIndices;

use log::debug;
use phf::phf_map;

use crate::error::Reporter;
use crate::token::{Literal, Token, TokenType};

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

/// Scans `source` into a token list terminated by an `Eof` token. Malformed
/// input is reported to `reporter` and scanning continues, so the result is
/// always a complete (if partial) token stream.
pub fn scan_tokens(source: &str, reporter: &mut Reporter) -> Vec<Token> {
    let mut scanner = Scanner {
        source,
        tokens: Vec::new(),
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
        token_line: 1,
        reporter,
    };
    while let Some(&(idx, _)) = scanner.iter.peek() {
        scanner.start = idx;
        scanner.token_line = scanner.line;
        scanner.scan_token();
    }
    scanner
        .tokens
        .push(Token::new(TokenType::Eof, "", Literal::None, scanner.line));
    debug!("scanned {} token(s)", scanner.tokens.len());
    scanner.tokens
}

struct Scanner<'s, 'r> {
    source: &'s str,
    tokens: Vec<Token>,
    iter: Peekable<CharIndices<'s>>,
    start: usize,
    line: usize,
    // Line of the token's first character; `line` may move past it inside
    // multi-line strings.
    token_line: usize,
    reporter: &'r mut Reporter,
}

impl Scanner<'_, '_> {
    fn scan_token(&mut self) {
        let Some((_, c)) = self.iter.next() else {
            return;
        };
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '%' => self.add_token(TokenType::Percent),
            '!' => {
                let token = if self.next_if('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token)
            }
            '=' => {
                let token = if self.next_if('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token)
            }
            '<' => {
                let token = if self.next_if('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token)
            }
            '>' => {
                let token = if self.next_if('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token)
            }
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => (),
            '\n' => {
                self.line += 1;
            }
            '"' => self.string(),
            '0'..='9' => self.number(),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
            _ => {
                self.reporter.error(self.line, "Unexpected character.");
            }
        }
    }

    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some(&(idx, _)) => idx,
        }
    }

    fn add_token(&mut self, kind: TokenType) {
        self.add_literal_token(kind, Literal::None);
    }

    fn add_literal_token(&mut self, kind: TokenType, literal: Literal) {
        let current = self.current();
        self.tokens.push(Token::new(
            kind,
            &self.source[self.start..current],
            literal,
            self.token_line,
        ));
    }

    fn next_if(&mut self, expected: char) -> bool {
        match self.iter.peek() {
            Some(&(_, c)) if c == expected => {
                self.iter.next();
                true
            }
            _ => false,
        }
    }

    fn string(&mut self) {
        loop {
            match self.iter.peek() {
                None => {
                    self.reporter.error(self.line, "Unterminated string.");
                    return;
                }
                Some(&(_, '"')) => break,
                Some(&(_, c)) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.iter.next();
                }
            }
        }

        // The closing quote.
        self.iter.next();

        let current = self.current();
        let value = self.source[self.start + 1..current - 1].to_string();
        self.add_literal_token(TokenType::String, Literal::String(value));
    }

    fn number(&mut self) {
        self.consume_digits();

        // A fractional part needs a digit after the dot, otherwise the dot
        // belongs to the following token.
        if let Some(&(_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some(&(_, '0'..='9'))) {
                self.iter.next();
                self.consume_digits();
            }
        }

        let current = self.current();
        match self.source[self.start..current].parse::<f64>() {
            Ok(n) => self.add_literal_token(TokenType::Number, Literal::Number(n)),
            Err(_) => self.reporter.error(self.line, "Invalid number literal."),
        }
    }

    fn consume_digits(&mut self) {
        while let Some(&(_, '0'..='9')) = self.iter.peek() {
            self.iter.next();
        }
    }

    fn identifier(&mut self) {
        while let Some(&(_, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_')) = self.iter.peek() {
            self.iter.next();
        }
        let current = self.current();
        let text = &self.source[self.start..current];
        match KEYWORDS.get(text) {
            Some(&kind) => self.add_token(kind),
            None => self.add_token(TokenType::Identifier),
        }
    }
}
