pub mod ast;
pub mod ast_printer;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;

pub use interpreter::Interpreter;

use std::io::Write;

use ast::ExprId;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Scan, parse or resolve errors; nothing was executed.
    StaticError,
    /// At least one top-level statement failed at runtime.
    RuntimeError,
}

/// An interpreter plus the parser's node-id counter, threaded across inputs
/// so a resolver entry recorded for one REPL line can never collide with a
/// node from a later one.
pub struct Session {
    interpreter: Interpreter,
    next_id: ExprId,
}

impl Session {
    pub fn new() -> Session {
        Session::with_interpreter(Interpreter::new())
    }

    pub fn with_output(output: Box<dyn Write>) -> Session {
        Session::with_interpreter(Interpreter::with_output(output))
    }

    fn with_interpreter(interpreter: Interpreter) -> Session {
        Session {
            interpreter,
            next_id: 0,
        }
    }

    /// Scan → parse → resolve → interpret. Diagnostics go to the front end;
    /// the status is what the CLI turns into an exit code.
    pub fn run(&mut self, source: &str) -> RunStatus {
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();

        let mut parser = Parser::starting_at(&tokens, self.next_id);
        let statements = parser.parse();
        self.next_id = parser.next_id();

        if scanner.get_num_of_scan_errors() + parser.get_num_of_parser_errors() > 0 {
            return RunStatus::StaticError;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);
        if resolver.get_num_of_resolve_errors() > 0 {
            return RunStatus::StaticError;
        }

        let runtime_errors = self.interpreter.interpret(&statements);
        for err in &runtime_errors {
            error::runtime_error(err);
        }
        if runtime_errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::RuntimeError
        }
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}
