//! Error types and the diagnostic sink shared by every pass.
//!
//! The scanner, parser and resolver report through [`Reporter`] and keep
//! going, so a single run surfaces every static error it can find. The
//! reporter latches the two flags the driver consults between passes: a
//! syntax-error flag that gates evaluation, and a runtime-error flag that
//! decides the process exit code in file mode.

use thiserror::Error;

use crate::token::{Token, TokenType};

/// What a whole run of the interpreter can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoxError {
    /// One or more scan, parse or resolve errors; evaluation was skipped.
    #[error("source had syntax errors")]
    Syntax,
    /// Evaluation started and was aborted by a runtime error.
    #[error("runtime error")]
    Runtime,
}

/// Evaluation failure, carrying the line of the token it was raised at.
#[derive(Debug, Clone, Error)]
#[error("{}", render(.message, .line))]
pub struct RuntimeError {
    pub message: String,
    pub line: Option<usize>,
}

fn render(message: &str, line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("{}\n[line {}]", message, line),
        None => message.to_string(),
    }
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, token: Option<&Token>) -> RuntimeError {
        RuntimeError {
            message: message.into(),
            line: token.map(|t| t.line),
        }
    }
}

/// Diagnostic sink. Prints reports to stderr as they arrive and keeps them
/// for inspection; the REPL resets the flags between lines.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<String>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    /// Scan error at a bare line number.
    pub fn error(&mut self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Parse or resolve error at a token.
    pub fn error_at(&mut self, token: &Token, message: &str) {
        let location = if token.kind == TokenType::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.report(token.line, &location, message);
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        let text = error.to_string();
        eprintln!("{}", text);
        self.diagnostics.push(text);
        self.had_runtime_error = true;
    }

    fn report(&mut self, line: usize, location: &str, message: &str) {
        let text = format!("[line {}] Error{}: {}", line, location, message);
        eprintln!("{}", text);
        self.diagnostics.push(text);
        self.had_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Clears flags and kept reports, as the REPL does between lines.
    pub fn reset(&mut self) {
        self.diagnostics.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

#[cfg(test)]
mod reporter_tests {
    use super::*;
    use crate::token::Literal;

    #[test]
    fn scan_report_format() {
        let mut reporter = Reporter::new();
        reporter.error(3, "Unexpected character.");
        assert_eq!(reporter.diagnostics(), ["[line 3] Error: Unexpected character."]);
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn token_report_format() {
        let mut reporter = Reporter::new();
        let semicolon = Token::new(TokenType::Semicolon, ";", Literal::None, 7);
        reporter.error_at(&semicolon, "Expect expression.");
        let eof = Token::new(TokenType::Eof, "", Literal::None, 8);
        reporter.error_at(&eof, "Expect ')' after expression.");
        assert_eq!(
            reporter.diagnostics(),
            [
                "[line 7] Error at ';': Expect expression.",
                "[line 8] Error at end: Expect ')' after expression.",
            ]
        );
    }

    #[test]
    fn runtime_report_format() {
        let token = Token::new(TokenType::Plus, "+", Literal::None, 2);
        let error = RuntimeError::new("operands should be numbers or strings", Some(&token));
        assert_eq!(error.to_string(), "operands should be numbers or strings\n[line 2]");

        let mut reporter = Reporter::new();
        reporter.runtime_error(&error);
        assert!(reporter.had_runtime_error());
        assert!(!reporter.had_error());

        reporter.reset();
        assert!(!reporter.had_runtime_error());
        assert!(reporter.diagnostics().is_empty());
    }
}
