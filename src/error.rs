use crate::interpreter::runtime_error::RuntimeError;
use crate::parser::ParserError;
use crate::token::{Token, TokenType};

pub fn error(line: usize, message: &str) {
    report(line, "", message)
}

pub fn error_at_token(token: &Token, message: &str) {
    if token.token_type == TokenType::Eof {
        report(token.line, " at end", message)
    } else {
        report(token.line, &format!(" at '{}'", token.lexeme), message)
    }
}

pub fn error_in_parser(err: &ParserError) {
    eprintln!("{}", err)
}

pub fn runtime_error(err: &RuntimeError) {
    eprintln!("{}", err)
}

pub fn report(line: usize, where_in: &str, message: &str) {
    eprintln!("[line {}] Error{}: {}", line, where_in, message)
}
