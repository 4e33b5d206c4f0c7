use crate::{
    error::error,
    token::{Literal, Token, TokenType},
};
use unicode_segmentation::UnicodeSegmentation;

struct ScanPosition {
    start: usize,
    current: usize,
    line: usize,
}

pub struct Scanner {
    source_graphemes: Vec<String>,
    pos: ScanPosition,
    tokens: Vec<Token>,
    num_of_scan_errs: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Scanner {
        let source_graphemes: Vec<String> = source
            .graphemes(true)
            .map(|grapheme| String::from(grapheme))
            .collect();
        Scanner {
            source_graphemes,
            pos: ScanPosition {
                start: 0,
                current: 0,
                line: 1,
            },
            tokens: Vec::new(),
            num_of_scan_errs: 0,
        }
    }

    pub fn get_num_of_scan_errors(&self) -> usize {
        self.num_of_scan_errs
    }

    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.pos.start = self.pos.current;
            self.scan_token()
        }
        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            None,
            self.pos.line,
        ));
        std::mem::take(&mut self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.pos.current >= self.source_graphemes.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance().to_string();
        match c.as_str() {
            "(" => self.add_token(TokenType::LeftParen),
            ")" => self.add_token(TokenType::RightParen),
            "{" => self.add_token(TokenType::LeftBrace),
            "}" => self.add_token(TokenType::RightBrace),
            "," => self.add_token(TokenType::Comma),
            "." => self.add_token(TokenType::Dot),
            "-" => self.add_token(TokenType::Minus),
            "+" => self.add_token(TokenType::Plus),
            ";" => self.add_token(TokenType::Semicolon),
            "*" => self.add_token(TokenType::Star),
            "!" => {
                let token = if self.advance_if_matched("=") {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token)
            }
            "=" => {
                let token = if self.advance_if_matched("=") {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token)
            }
            "<" => {
                let token = if self.advance_if_matched("=") {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token)
            }
            ">" => {
                let token = if self.advance_if_matched("=") {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token)
            }
            "/" => {
                if self.advance_if_matched("/") {
                    while self.peek() != "\n" && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            " " | "\r" | "\t" => {}
            "\n" => self.pos.line += 1,
            "\"" => self.string_literal(),
            c if is_digit(c) => self.number_literal(),
            c if is_alpha(c) => self.identifier(),
            c => {
                self.num_of_scan_errs += 1;
                error(self.pos.line, &format!("Unexpected character '{}'", c))
            }
        }
    }

    fn advance(&mut self) -> &str {
        let s = &self.source_graphemes[self.pos.current];
        self.pos.current += 1;
        s
    }

    fn advance_if_matched(&mut self, expected: &str) -> bool {
        if self.is_at_end() || self.source_graphemes[self.pos.current] != expected {
            false
        } else {
            self.pos.current += 1;
            true
        }
    }

    fn peek(&self) -> &str {
        if self.is_at_end() {
            "\0"
        } else {
            &self.source_graphemes[self.pos.current]
        }
    }

    fn peek_next(&self) -> &str {
        if self.pos.current + 1 >= self.source_graphemes.len() {
            "\0"
        } else {
            &self.source_graphemes[self.pos.current + 1]
        }
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None)
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let text = self.source_graphemes[self.pos.start..self.pos.current].join("");
        self.tokens
            .push(Token::new(token_type, text, literal, self.pos.line))
    }

    fn string_literal(&mut self) {
        while self.peek() != "\"" && !self.is_at_end() {
            if self.peek() == "\n" {
                self.pos.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.num_of_scan_errs += 1;
            error(self.pos.line, "Unterminated string.");
            return;
        }
        self.advance(); // The closing ".

        let value = self.source_graphemes[self.pos.start + 1..self.pos.current - 1].join("");
        self.add_token_with_literal(TokenType::String, Some(Literal::String(value)))
    }

    fn number_literal(&mut self) {
        while is_digit(self.peek()) {
            self.advance();
        }
        if self.peek() == "." && is_digit(self.peek_next()) {
            self.advance(); // The '.'.
            while is_digit(self.peek()) {
                self.advance();
            }
        }

        let text = self.source_graphemes[self.pos.start..self.pos.current].join("");
        match text.parse::<f64>() {
            Ok(value) => self.add_token_with_literal(TokenType::Number, Some(Literal::Number(value))),
            Err(_) => {
                self.num_of_scan_errs += 1;
                error(self.pos.line, &format!("Invalid number literal {}", text))
            }
        }
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_graphemes[self.pos.start..self.pos.current].join("");
        self.add_token(keyword_type(&text).unwrap_or(TokenType::Identifier))
    }
}

fn keyword_type(text: &str) -> Option<TokenType> {
    use TokenType::*;
    let token_type = match text {
        "and" => And,
        "break" => Break,
        "class" => Class,
        "else" => Else,
        "false" => False,
        "fun" => Fun,
        "for" => For,
        "if" => If,
        "nil" => Nil,
        "or" => Or,
        "print" => Print,
        "return" => Return,
        "super" => Super,
        "this" => This,
        "true" => True,
        "var" => Var,
        "while" => While,
        _ => return None,
    };
    Some(token_type)
}

fn is_digit(grapheme: &str) -> bool {
    matches!(grapheme.as_bytes(), [b'0'..=b'9'])
}

fn is_alpha(grapheme: &str) -> bool {
    matches!(grapheme.as_bytes(), [b'a'..=b'z'] | [b'A'..=b'Z'] | [b'_'])
}

fn is_alpha_numeric(grapheme: &str) -> bool {
    is_digit(grapheme) || is_alpha(grapheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token_types(source: &str) -> Vec<TokenType> {
        Scanner::new(source)
            .scan_tokens()
            .iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn scans_operators_and_keywords() {
        use TokenType::*;
        assert_eq!(
            token_types("var x = 1 <= 2; // trailing comment"),
            vec![Var, Identifier, Equal, Number, LessEqual, Number, Semicolon, Eof]
        );
    }

    #[test]
    fn scans_number_and_string_literals() {
        let tokens = Scanner::new("23.133 \"hi\"").scan_tokens();
        assert_eq!(tokens[0].literal, Some(Literal::Number(23.133)));
        assert_eq!(tokens[1].literal, Some(Literal::String(String::from("hi"))));
    }

    #[test]
    fn break_is_a_keyword() {
        assert_eq!(token_types("break;")[0], TokenType::Break);
    }

    #[test]
    fn reports_unterminated_string() {
        let mut scanner = Scanner::new("\"open");
        let tokens = scanner.scan_tokens();
        assert_eq!(scanner.get_num_of_scan_errors(), 1);
        assert_eq!(tokens.last().unwrap().token_type, TokenType::Eof);
    }
}
