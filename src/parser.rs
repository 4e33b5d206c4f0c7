use std::rc::Rc;

use crate::{
    ast::{Expr, ExprId, FunctionDecl, FunctionLiteral, LiteralValue, Stmt},
    error::error_in_parser,
    token::{Literal, Token, TokenType},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("[line {line}] at '{lexeme}': {message}")]
    Syntax {
        line: usize,
        lexeme: String,
        message: String,
    },
    #[error("[line {line}] Invalid assignment target.")]
    InvalidAssignmentTarget { line: usize },
    #[error("[line {line}] 'break' statement must be used inside a loop.")]
    BreakOutsideLoop { line: usize },
}

impl ParserError {
    fn syntax(token: &Token, message: &str) -> ParserError {
        ParserError::Syntax {
            line: token.line,
            lexeme: token.lexeme.clone(),
            message: String::from(message),
        }
    }
}

pub type ParserResult<T> = Result<T, ParserError>;

#[derive(Debug, Clone, Copy)]
enum FunctionKind {
    Function,
    Method,
}

impl FunctionKind {
    fn label(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
        }
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    next_id: ExprId,
    loop_depth: usize,
    num_of_parser_errs: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &[Token]) -> Parser {
        Parser::starting_at(tokens, 0)
    }

    /// A parser whose first node id is `first_id`. The REPL threads the id
    /// counter across lines so resolver entries from earlier inputs can
    /// never collide with fresh nodes.
    pub fn starting_at(tokens: &[Token], first_id: ExprId) -> Parser {
        Parser {
            tokens,
            current: 0,
            next_id: first_id,
            loop_depth: 0,
            num_of_parser_errs: 0,
        }
    }

    pub fn get_num_of_parser_errors(&self) -> usize {
        self.num_of_parser_errs
    }

    pub fn next_id(&self) -> ExprId {
        self.next_id
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements: Vec<Stmt> = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        assert!(self.current > 0);
        &self.tokens[self.current - 1]
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    fn check_next(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        match self.tokens.get(self.current + 1) {
            Some(token) if token.token_type != TokenType::Eof => token.token_type == token_type,
            _ => false,
        }
    }

    fn matches(&mut self, token_types: &[TokenType]) -> bool {
        for token_type in token_types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> ParserResult<&Token> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(ParserError::syntax(self.peek(), message))
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let stmt = if self.matches(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.check(TokenType::Fun) && self.check_next(TokenType::Identifier) {
            self.advance(); // the 'fun' keyword
            self.function(FunctionKind::Function).map(Stmt::Function)
        } else if self.matches(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match stmt {
            Ok(stmt) => Some(stmt),
            Err(parse_err) => {
                self.num_of_parser_errs += 1;
                error_in_parser(&parse_err);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> ParserResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?.clone();

        let mut superclass = None;
        if self.matches(&[TokenType::Less]) {
            self.consume(TokenType::Identifier, "Expect superclass name.")?;
            let superclass_name = self.previous().clone();
            superclass = Some(Expr::Variable {
                name: superclass_name,
                id: self.fresh_id(),
            });
        }

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function(FunctionKind::Method)?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: FunctionKind) -> ParserResult<FunctionDecl> {
        let name = self
            .consume(
                TokenType::Identifier,
                &format!("Expect {} name.", kind.label()),
            )?
            .clone();
        let function = self.function_body(kind)?;
        Ok(FunctionDecl { name, function })
    }

    /// Shared body routine for named functions, methods and bare
    /// `fun (...) { ... }` expressions. The caller has already dealt with
    /// the optional name.
    fn function_body(&mut self, kind: FunctionKind) -> ParserResult<Rc<FunctionLiteral>> {
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind.label()),
        )?;
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= 255 {
                    // Non-fatal: report and keep parsing.
                    self.num_of_parser_errs += 1;
                    error_in_parser(&ParserError::syntax(
                        self.peek(),
                        "Can't have more than 255 parameters.",
                    ));
                }
                let param = self.consume(TokenType::Identifier, "Expect parameter name.")?;
                params.push(param.clone());
                if !self.matches(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind.label()),
        )?;
        // A function body starts a fresh loop context: 'break' cannot cross
        // a call boundary to reach an enclosing loop.
        let enclosing_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = enclosing_loop_depth;
        Ok(Rc::new(FunctionLiteral {
            params,
            body: body?,
        }))
    }

    fn var_declaration(&mut self) -> ParserResult<Stmt> {
        self.consume(TokenType::Identifier, "Expect variable name.")?;
        let name = self.previous().clone();

        let mut initializer = None;
        if self.matches(&[TokenType::Equal]) {
            initializer = Some(self.expression()?);
        }
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParserResult<Stmt> {
        if self.matches(&[TokenType::Break]) {
            self.break_statement()
        } else if self.matches(&[TokenType::Print]) {
            self.print_statement()
        } else if self.matches(&[TokenType::If]) {
            self.if_statement()
        } else if self.matches(&[TokenType::While]) {
            self.while_statement()
        } else if self.matches(&[TokenType::For]) {
            self.for_statement()
        } else if self.matches(&[TokenType::Return]) {
            self.return_statement()
        } else if self.matches(&[TokenType::LeftBrace]) {
            let statements = self.block()?;
            Ok(Stmt::Block { statements })
        } else {
            self.expression_statement()
        }
    }

    fn break_statement(&mut self) -> ParserResult<Stmt> {
        if self.loop_depth == 0 {
            return Err(ParserError::BreakOutsideLoop {
                line: self.previous().line,
            });
        }
        self.consume(TokenType::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Stmt::Break)
    }

    fn if_statement(&mut self) -> ParserResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = self.statement()?;

        let mut else_branch = None;
        if self.matches(&[TokenType::Else]) {
            else_branch = Some(Box::new(self.statement()?));
        }
        Ok(Stmt::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParserResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Stmt::While {
            condition,
            body: Box::new(body?),
        })
    }

    fn for_statement(&mut self) -> ParserResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer = if self.matches(&[TokenType::Semicolon]) {
            None
        } else if self.matches(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let mut condition = None;
        if !self.check(TokenType::Semicolon) {
            condition = Some(self.expression()?);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let mut increment = None;
        if !self.check(TokenType::RightParen) {
            increment = Some(self.expression()?);
        }
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let mut body = body?;

        // Desugar: for(init; cond; incr) body => { init; while(cond) { body; incr; } }
        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![
                    body,
                    Stmt::Expression {
                        expression: increment,
                    },
                ],
            };
        }
        body = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::Boolean(true))),
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn return_statement(&mut self) -> ParserResult<Stmt> {
        let keyword = self.previous().clone();
        let mut value = None;
        if !self.check(TokenType::Semicolon) {
            value = Some(self.expression()?);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> ParserResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn print_statement(&mut self) -> ParserResult<Stmt> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expression })
    }

    fn expression_statement(&mut self) -> ParserResult<Stmt> {
        let expression = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expression })
    }

    fn expression(&mut self) -> ParserResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParserResult<Expr> {
        let expr = self.or()?;

        if self.matches(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, id } => Ok(Expr::Assign { name, id, value }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                _ => Err(ParserError::InvalidAssignmentTarget { line: equals.line }),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParserResult<Expr> {
        let mut expr = self.and()?;

        while self.matches(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParserResult<Expr> {
        let mut expr = self.equality()?;

        while self.matches(&[TokenType::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    /// One left-associative binary precedence level: parse an operand, then
    /// keep folding while the next token is in `operators`.
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> ParserResult<Expr>,
        operators: &[TokenType],
    ) -> ParserResult<Expr> {
        let mut expr = operand(self)?;

        while self.matches(operators) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParserResult<Expr> {
        self.binary_level(
            Self::comparison,
            &[TokenType::BangEqual, TokenType::EqualEqual],
        )
    }

    fn comparison(&mut self) -> ParserResult<Expr> {
        use TokenType::*;
        self.binary_level(Self::term, &[Greater, GreaterEqual, Less, LessEqual])
    }

    fn term(&mut self) -> ParserResult<Expr> {
        self.binary_level(Self::factor, &[TokenType::Minus, TokenType::Plus])
    }

    fn factor(&mut self) -> ParserResult<Expr> {
        self.binary_level(Self::unary, &[TokenType::Star, TokenType::Slash])
    }

    fn unary(&mut self) -> ParserResult<Expr> {
        if self.matches(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ParserResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenType::Dot]) {
                let name = self
                    .consume(TokenType::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParserResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    // Non-fatal: report and keep parsing.
                    self.num_of_parser_errs += 1;
                    error_in_parser(&ParserError::syntax(
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    ));
                }
                arguments.push(self.expression()?);
                if !self.matches(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ParserResult<Expr> {
        if self.matches(&[TokenType::False]) {
            return Ok(Expr::Literal(LiteralValue::Boolean(false)));
        }
        if self.matches(&[TokenType::True]) {
            return Ok(Expr::Literal(LiteralValue::Boolean(true)));
        }
        if self.matches(&[TokenType::Nil]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }
        if self.matches(&[TokenType::Number, TokenType::String]) {
            let literal = match self.previous().literal.clone() {
                Some(Literal::Number(value)) => LiteralValue::Number(value),
                Some(Literal::String(value)) => LiteralValue::String(value),
                None => {
                    return Err(ParserError::syntax(
                        self.previous(),
                        "Literal token without a literal value.",
                    ))
                }
            };
            return Ok(Expr::Literal(literal));
        }
        if self.matches(&[TokenType::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(TokenType::Identifier, "Expect superclass method name.")?
                .clone();
            let id = self.fresh_id();
            return Ok(Expr::Super {
                keyword,
                method,
                id,
            });
        }
        if self.matches(&[TokenType::This]) {
            let keyword = self.previous().clone();
            let id = self.fresh_id();
            return Ok(Expr::This { keyword, id });
        }
        if self.matches(&[TokenType::Identifier]) {
            let name = self.previous().clone();
            let id = self.fresh_id();
            return Ok(Expr::Variable { name, id });
        }
        if self.matches(&[TokenType::Fun]) {
            // Anonymous function expression; the named declaration form was
            // already claimed by declaration() via lookahead.
            let function = self.function_body(FunctionKind::Function)?;
            return Ok(Expr::Function(function));
        }
        if self.matches(&[TokenType::LeftParen]) {
            let expression = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                expression: Box::new(expression),
            });
        }

        Err(ParserError::syntax(self.peek(), "Expect expression."))
    }

    fn synchronize(&mut self) {
        use TokenType::*;
        debug!(line = self.peek().line, "synchronizing after parse error");
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == Semicolon {
                return;
            }
            match self.peek().token_type {
                Class | Fun | Var | For | If | While | Print | Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Vec<Stmt>, usize) {
        let tokens = Scanner::new(source).scan_tokens();
        let mut parser = Parser::new(&tokens);
        let statements = parser.parse();
        (statements, parser.get_num_of_parser_errors())
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (statements, errs) = parse("1 + 2 * 3;");
        assert_eq!(errs, 0);
        let Stmt::Expression { expression } = &statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary { operator, right, .. } = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(operator.token_type, TokenType::Plus);
        assert!(matches!(**right, Expr::Binary { .. }));
    }

    #[test]
    fn for_desugars_to_while_in_blocks() {
        let (statements, errs) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(errs, 0);
        let Stmt::Block { statements } = &statements[0] else {
            panic!("expected initializer block");
        };
        assert!(matches!(statements[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &statements[1] else {
            panic!("expected while loop");
        };
        assert!(matches!(**body, Stmt::Block { .. }));
    }

    #[test]
    fn for_without_condition_loops_on_true() {
        let (statements, _) = parse("for (;;) break;");
        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("expected while loop");
        };
        assert!(matches!(
            condition,
            Expr::Literal(LiteralValue::Boolean(true))
        ));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let (statements, errs) = parse("break;");
        assert_eq!(errs, 1);
        assert!(statements.is_empty());
    }

    #[test]
    fn break_inside_loop_parses() {
        let (statements, errs) = parse("while (true) { break; }");
        assert_eq!(errs, 0);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn break_cannot_cross_a_function_boundary() {
        let (_, errs) = parse("while (true) { fun f() { break; } }");
        assert_eq!(errs, 1);
    }

    #[test]
    fn fun_with_name_is_a_declaration() {
        let (statements, errs) = parse("fun add(a, b) { return a + b; }");
        assert_eq!(errs, 0);
        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(decl.name.lexeme, "add");
        assert_eq!(decl.function.params.len(), 2);
    }

    #[test]
    fn bare_fun_is_an_expression() {
        let (statements, errs) = parse("var f = fun (x) { return x; };");
        assert_eq!(errs, 0);
        let Stmt::Var { initializer, .. } = &statements[0] else {
            panic!("expected var declaration");
        };
        assert!(matches!(initializer, Some(Expr::Function(_))));
    }

    #[test]
    fn property_get_is_a_legal_assignment_target() {
        let (statements, errs) = parse("obj.field = 1;");
        assert_eq!(errs, 0);
        let Stmt::Expression { expression } = &statements[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(expression, Expr::Set { .. }));
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let (statements, errs) = parse("1 + 2 = 3;");
        assert_eq!(errs, 1);
        assert!(statements.is_empty());
    }

    #[test]
    fn parsing_continues_after_a_bad_statement() {
        let (statements, errs) = parse("var = 1; print 2;");
        assert_eq!(errs, 1);
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print { .. }));
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let (statements, errs) = parse("class B < A { init() {} greet() {} }");
        assert_eq!(errs, 0);
        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class declaration");
        };
        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { .. })));
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn variable_nodes_get_distinct_ids() {
        let (statements, _) = parse("a + a;");
        let Stmt::Expression {
            expression: Expr::Binary { left, right, .. },
        } = &statements[0]
        else {
            panic!("expected binary expression");
        };
        let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
            (&**left, &**right)
        else {
            panic!("expected variable operands");
        };
        assert_ne!(left_id, right_id);
    }
}
