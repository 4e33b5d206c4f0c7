use rustc_hash::FxHashMap;
use tracing::trace;

use crate::{
    ast::{Expr, ExprId, FunctionDecl, FunctionLiteral, Stmt},
    error::error_at_token,
    interpreter::Interpreter,
    token::Token,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Static pass that computes, for every variable-like expression, how many
/// scopes separate the reference from its declaration. Scopes here mirror the
/// environment frames the interpreter will create at runtime, including the
/// synthetic `this`/`super` frames around method bodies; a disagreement makes
/// lookups land in the wrong frame.
pub struct Resolver<'a> {
    scopes: Vec<FxHashMap<String, bool>>,
    interpreter: &'a mut Interpreter,
    current_function: FunctionKind,
    current_class: ClassKind,
    num_of_resolve_errs: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Resolver<'a> {
        Resolver {
            scopes: Vec::new(),
            interpreter,
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            num_of_resolve_errs: 0,
        }
    }

    pub fn get_num_of_resolve_errors(&self) -> usize {
        self.num_of_resolve_errs
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        self.resolve_stmts(statements)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        statements
            .iter()
            .for_each(|statement| self.resolve_stmt(statement))
    }

    fn resolve_stmt(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(&decl.function, FunctionKind::Function);
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
            Stmt::Expression { expression } => self.resolve_expr(expression),
            Stmt::Print { expression } => self.resolve_expr(expression),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Break => {}
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[FunctionDecl]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            self.current_class = ClassKind::Subclass;
            if let Expr::Variable {
                name: superclass_name,
                ..
            } = superclass
            {
                if superclass_name.lexeme == name.lexeme {
                    self.error(superclass_name, "A class can't inherit from itself.");
                }
            }
            self.resolve_expr(superclass);

            // Frame holding 'super', mirroring the environment the
            // interpreter wraps around method closures.
            self.begin_scope();
            self.scope_define("super");
        }

        // Frame holding 'this', mirroring the frame created by method binding.
        self.begin_scope();
        self.scope_define("this");

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(&method.function, kind);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expression: &Expr) {
        match expression {
            Expr::Variable { name, id } => {
                let declared_not_defined = self
                    .scopes
                    .last()
                    .map_or(false, |scope| scope.get(&name.lexeme) == Some(&false));
                if declared_not_defined {
                    self.error(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { name, id, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::This { keyword, id } => {
                if self.current_class == ClassKind::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Super { keyword, id, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Function(function) => self.resolve_function(function, FunctionKind::Function),
            Expr::Literal(_) => {}
            Expr::Grouping { expression } => self.resolve_expr(expression),
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                arguments
                    .iter()
                    .for_each(|argument| self.resolve_expr(argument));
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
        }
    }

    fn resolve_function(&mut self, function: &FunctionLiteral, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        function.params.iter().for_each(|param| {
            self.declare(param);
            self.define(param);
        });
        self.resolve_stmts(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                trace!(name = %name.lexeme, depth, "resolved local");
                self.interpreter.resolve(id, depth);
                return;
            }
        }
        // Not found locally: assumed global, left unrecorded.
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }
        if self.scopes.last().unwrap().contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }
        self.scopes
            .last_mut()
            .unwrap()
            .insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn scope_define(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope begun just above")
            .insert(String::from(name), true);
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.num_of_resolve_errs += 1;
        error_at_token(token, message);
    }
}
