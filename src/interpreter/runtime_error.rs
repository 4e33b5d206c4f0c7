use thiserror::Error;

use crate::token::Token;

/// Runtime failure taxonomy. Every variant carries the line of the offending
/// token; the front end formats and emits these. `return`/`break` are not
/// errors and live in [`super::Control`] instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] {message}")]
    Type { line: usize, message: String },

    #[error("[line {line}] Expected {expected} arguments but got {actual}.")]
    ArityMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("[line {line}] Division by 0 not computable.")]
    DivisionByZero { line: usize },

    #[error("[line {line}] Undefined variable '{name}'.")]
    UndefinedVariable { line: usize, name: String },

    #[error("[line {line}] Undefined property '{name}'.")]
    UndefinedProperty { line: usize, name: String },

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn type_error(token: &Token, message: &str) -> RuntimeError {
        RuntimeError::Type {
            line: token.line,
            message: String::from(message),
        }
    }

    pub fn arity_mismatch(token: &Token, expected: usize, actual: usize) -> RuntimeError {
        RuntimeError::ArityMismatch {
            line: token.line,
            expected,
            actual,
        }
    }

    pub fn division_by_zero(token: &Token) -> RuntimeError {
        RuntimeError::DivisionByZero { line: token.line }
    }

    pub fn undefined_variable(name: &Token) -> RuntimeError {
        RuntimeError::UndefinedVariable {
            line: name.line,
            name: name.lexeme.clone(),
        }
    }

    pub fn undefined_property(name: &Token) -> RuntimeError {
        RuntimeError::UndefinedProperty {
            line: name.line,
            name: name.lexeme.clone(),
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
