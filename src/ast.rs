use std::rc::Rc;

use crate::token::Token;

/// Stable node index assigned by the parser to every expression that the
/// resolver may record a binding distance for. The interpreter's side table
/// is keyed by this id rather than by node identity.
pub type ExprId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// An anonymous function: parameter list plus body. Used both as a bare
/// `fun (...) { ... }` expression and as the payload of named function and
/// method declarations. Shared via `Rc` so closures keep the declaration
/// alive without cloning it.
#[derive(Debug, Clone)]
pub struct FunctionLiteral {
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,
    pub function: Rc<FunctionLiteral>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralValue),
    Grouping {
        expression: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
        id: ExprId,
    },
    Assign {
        name: Token,
        id: ExprId,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This {
        keyword: Token,
        id: ExprId,
    },
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
    Function(Rc<FunctionLiteral>),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression {
        expression: Expr,
    },
    Print {
        expression: Expr,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Block {
        statements: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Break,
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Function(FunctionDecl),
    Class {
        name: Token,
        // Always an Expr::Variable; resolved like any other read so the
        // superclass name participates in scoping.
        superclass: Option<Expr>,
        methods: Vec<FunctionDecl>,
    },
}
