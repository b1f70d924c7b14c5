//! Ties the passes together: scan, parse, resolve, interpret. A session
//! keeps its interpreter (and so its globals) alive across runs, which is
//! what lets a REPL build up state line by line.

use std::io::Write;

use log::{debug, trace};

use crate::ast::ExprIds;
use crate::error::{LoxError, Reporter};
use crate::interpreter::Interpreter;
use crate::{parser, resolver, scanner};

pub struct Lox<W: Write> {
    reporter: Reporter,
    interpreter: Interpreter<W>,
    ids: ExprIds,
}

impl<W: Write> Lox<W> {
    pub fn new(output: W) -> Lox<W> {
        Lox {
            reporter: Reporter::new(),
            interpreter: Interpreter::new(output),
            ids: ExprIds::default(),
        }
    }

    /// Runs one source unit (a file, or one REPL line). Evaluation is
    /// skipped entirely if any scan, parse or resolve error was reported.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        debug!("running {} byte(s) of source", source.len());
        let tokens = scanner::scan_tokens(source, &mut self.reporter);
        if log::log_enabled!(log::Level::Trace) {
            for token in &tokens {
                trace!("{}", token);
            }
        }

        let statements = parser::parse(&tokens, &mut self.ids, &mut self.reporter);
        if !self.reporter.had_error() {
            let locals = resolver::resolve(&statements, &mut self.reporter);
            if !self.reporter.had_error() {
                self.interpreter.add_locals(locals);
                self.interpreter.interpret(&statements, &mut self.reporter);
            }
        }

        if self.reporter.had_error() {
            Err(LoxError::Syntax)
        } else if self.reporter.had_runtime_error() {
            Err(LoxError::Runtime)
        } else {
            Ok(())
        }
    }

    /// Clears the error flags, as the prompt does between lines.
    pub fn reset(&mut self) {
        self.reporter.reset();
    }

    pub fn diagnostics(&self) -> &[String] {
        self.reporter.diagnostics()
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn state_persists_across_runs() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        lox.run("fun double(n) { return 2 * n; }").expect("declare");
        lox.run("print double(21);").expect("call");
        assert_eq!(output, b"42\n");
    }

    #[test]
    fn syntax_errors_gate_evaluation() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        // The first statement is fine but the line must not run at all.
        assert_eq!(lox.run("print 1; print ;"), Err(LoxError::Syntax));
        assert!(output.is_empty());
    }

    #[test]
    fn reset_recovers_like_the_prompt() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        assert_eq!(lox.run("var 1;"), Err(LoxError::Syntax));
        lox.reset();
        assert_eq!(lox.run("var a = 1; print a;"), Ok(()));
        assert_eq!(output, b"1\n");
    }

    #[test]
    fn runtime_error_aborts_current_run_only() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        assert_eq!(
            lox.run("var a = 1; print \"x\" + 1; print a;"),
            Err(LoxError::Runtime)
        );
        lox.reset();
        // The frame cursor is back at the globals and `a` survived.
        assert_eq!(lox.run("print a;"), Ok(()));
        assert_eq!(output, b"1\n");
    }

    #[test]
    fn cursor_restored_after_error_inside_nested_blocks() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        assert_eq!(
            lox.run("{ var inner = 1; { print missing; } }"),
            Err(LoxError::Runtime)
        );
        lox.reset();
        assert_eq!(lox.run("var x = 2; print x;"), Ok(()));
        assert_eq!(lox.run("print inner;"), Err(LoxError::Runtime));
    }

    #[test]
    fn closures_from_earlier_lines_stay_resolved() {
        let mut output = Vec::new();
        let mut lox = Lox::new(&mut output);
        lox.run("fun counter() { var n = 0; fun bump() { n = n + 1; return n; } return bump; }")
            .expect("declare");
        lox.run("var c = counter();").expect("make");
        lox.run("print c();").expect("first");
        lox.run("print c();").expect("second");
        assert_eq!(output, b"1\n2\n");
    }
}
