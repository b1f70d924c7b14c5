use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::Context;

use treelox::error::LoxError;
use treelox::session::Lox;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_prompt(),
        2 => run_file(&args[1]),
        _ => {
            println!("Usage: treelox [script]");
            process::exit(64);
        }
    }
}

fn run_file(path: &str) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let mut lox = Lox::new(io::stdout());
    match lox.run(&source) {
        Err(LoxError::Syntax) => process::exit(65),
        Err(LoxError::Runtime) => process::exit(70),
        Ok(()) => Ok(()),
    }
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lox = Lox::new(io::stdout());
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        // Errors were already reported; the next line starts clean.
        let _ = lox.run(&line);
        lox.reset();
    }
    Ok(())
}
