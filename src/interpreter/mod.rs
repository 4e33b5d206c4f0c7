use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    ast::{Expr, ExprId, Stmt},
    token::{Token, TokenType},
};

pub mod class;
pub mod environment;
pub mod function;
pub mod native;
pub mod runtime_error;
pub mod value;

use self::{
    class::Class,
    environment::Environment,
    function::Function,
    native::NativeClock,
    runtime_error::{RuntimeError, RuntimeResult},
    value::Value,
};

/// Outcome of executing one statement. `Return` and `Break` are ordinary
/// control transfers, not errors: each caller propagates them until the
/// matching boundary (function call, loop) absorbs them.
#[derive(Debug, PartialEq)]
pub enum Control {
    Normal,
    Break,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: FxHashMap<ExprId, usize>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let globals = Interpreter::define_globals();
        let environment = Rc::clone(&globals);
        Interpreter {
            globals,
            environment,
            locals: FxHashMap::default(),
            output,
        }
    }

    fn define_globals() -> Rc<RefCell<Environment>> {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals
            .borrow_mut()
            .define("clock", Value::Native(Rc::new(NativeClock)));
        globals
    }

    /// Records a binding distance for an expression node; called by the
    /// resolver. Once recorded, a distance never changes.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    #[cfg(test)]
    pub fn resolved_locals(&self) -> usize {
        self.locals.len()
    }

    /// Runs a program. A runtime error aborts only the statement it occurred
    /// in; subsequent top-level statements still execute. All errors are
    /// returned for the front end to report.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Vec<RuntimeError> {
        let mut errors = Vec::new();
        for statement in statements {
            // Bare expressions at the top level render their value, like a
            // REPL line.
            let result = match statement {
                Stmt::Expression { expression } => self
                    .evaluate(expression)
                    .and_then(|value| self.render(&value)),
                _ => self.execute(statement).map(|_| ()),
            };
            if let Err(err) = result {
                debug!(%err, "statement aborted; continuing");
                errors.push(err);
            }
        }
        errors
    }

    fn render(&mut self, value: &Value) -> RuntimeResult<()> {
        writeln!(self.output, "{}", value)?;
        self.output.flush()?;
        Ok(())
    }

    fn execute(&mut self, statement: &Stmt) -> RuntimeResult<Control> {
        match statement {
            Stmt::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(Control::Normal)
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(expression)?;
                self.render(&value)?;
                Ok(Control::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Control::Normal)
            }
            Stmt::Block { statements } => {
                let frame = Environment::new_with(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(frame)))
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Control::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Control::Normal => {}
                        // The loop is the boundary for break; it goes no further.
                        Control::Break => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                }
                Ok(Control::Normal)
            }
            Stmt::Break => Ok(Control::Break),
            Stmt::Return { keyword: _, value } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Control::Return(value))
            }
            Stmt::Function(decl) => {
                let function = Function::new(
                    Some(decl.name.lexeme.clone()),
                    Rc::clone(&decl.function),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Control::Normal)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class_decl(name, superclass.as_ref(), methods),
        }
    }

    /// Runs `statements` in `frame`, restoring the previous current frame on
    /// every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        frame: Rc<RefCell<Environment>>,
    ) -> RuntimeResult<Control> {
        let previous = std::mem::replace(&mut self.environment, frame);

        let mut result = Ok(Control::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Control::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    fn execute_class_decl(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[crate::ast::FunctionDecl],
    ) -> RuntimeResult<Control> {
        let superclass = match superclass {
            Some(superclass_expr) => match self.evaluate(superclass_expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match superclass_expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(RuntimeError::type_error(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // The name is defined (as nil) before methods are created so they
        // can refer to the class recursively, then rebound to the class.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Method closures capture one extra frame holding 'super' when there
        // is a superclass; the resolver mirrors this frame.
        let method_closure = match &superclass {
            Some(superclass) => {
                let mut frame = Environment::new_with(Rc::clone(&self.environment));
                frame.define("super", Value::Class(superclass.clone()));
                Rc::new(RefCell::new(frame))
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_table = FxHashMap::default();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = Function::new(
                Some(method.name.lexeme.clone()),
                Rc::clone(&method.function),
                Rc::clone(&method_closure),
                is_initializer,
            );
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Class::new(&name.lexeme, superclass, method_table);
        self.environment
            .borrow_mut()
            .assign(name, Value::Class(class))?;
        Ok(Control::Normal)
    }

    fn evaluate(&mut self, expression: &Expr) -> RuntimeResult<Value> {
        match expression {
            Expr::Literal(literal) => Ok(literal.into()),
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::Minus => {
                        let value = number_operand(operator, &right)?;
                        Ok(Value::Number(-value))
                    }
                    TokenType::Bang => Ok(Value::Boolean(!right.is_truthy())),
                    _ => Err(RuntimeError::type_error(
                        operator,
                        "Only '-' and '!' are unary operators.",
                    )),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(operator, left, right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = match operator.token_type {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Variable { name, id } => self.look_up_variable(name, *id),
            Expr::Assign { name, id, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(distance) => {
                        environment::assign_at(&self.environment, *distance, name, value.clone())
                            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Some(callable) = callee.as_callable() else {
                    return Err(RuntimeError::type_error(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };
                if args.len() != callable.arity() {
                    return Err(RuntimeError::arity_mismatch(
                        paren,
                        callable.arity(),
                        args.len(),
                    ));
                }
                callable.call(self, args)
            }
            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance
                    .get(name)
                    .ok_or_else(|| RuntimeError::undefined_property(name)),
                _ => Err(RuntimeError::type_error(
                    name,
                    "Only instances have properties.",
                )),
            },
            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(name, "Only instances have fields."));
                };
                let value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }
            Expr::This { keyword, id } => self.look_up_variable(keyword, *id),
            Expr::Super {
                keyword: _,
                method,
                id,
            } => self.evaluate_super(method, *id),
            Expr::Function(function) => {
                let closure = Rc::clone(&self.environment);
                Ok(Value::Function(Rc::new(Function::new(
                    None,
                    Rc::clone(function),
                    closure,
                    false,
                ))))
            }
        }
    }

    fn evaluate_binary(
        &mut self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> RuntimeResult<Value> {
        match operator.token_type {
            TokenType::Minus => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(left - right))
            }
            TokenType::Star => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(left * right))
            }
            TokenType::Slash => {
                // Zero check comes before the numeric-type check.
                if matches!(right, Value::Number(n) if n == 0.0) {
                    return Err(RuntimeError::division_by_zero(operator));
                }
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(left / right))
            }
            TokenType::Plus => match (&left, &right) {
                (Value::Number(left), Value::Number(right)) => Ok(Value::Number(left + right)),
                (left, right)
                    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) =>
                {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                _ => Err(RuntimeError::type_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenType::Greater => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Boolean(left > right))
            }
            TokenType::GreaterEqual => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Boolean(left >= right))
            }
            TokenType::Less => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Boolean(left < right))
            }
            TokenType::LessEqual => {
                let (left, right) = number_operands(operator, &left, &right)?;
                Ok(Value::Boolean(left <= right))
            }
            TokenType::BangEqual => Ok(Value::Boolean(left != right)),
            TokenType::EqualEqual => Ok(Value::Boolean(left == right)),
            _ => Err(RuntimeError::type_error(operator, "Unsupported operator.")),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> RuntimeResult<Value> {
        match self.locals.get(&id) {
            Some(distance) => environment::get_at(&self.environment, *distance, &name.lexeme)
                .ok_or_else(|| RuntimeError::undefined_variable(name)),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_super(&mut self, method: &Token, id: ExprId) -> RuntimeResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .expect("'super' is always resolved to its synthetic frame");
        let superclass = match environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => unreachable!("'super' binding always holds a class"),
        };
        // The 'this' frame sits directly inside the 'super' frame.
        let instance = match environment::get_at(&self.environment, distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => unreachable!("'this' binding always holds an instance"),
        };

        let method_fn = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| RuntimeError::undefined_property(method))?;
        Ok(Value::Function(Rc::new(method_fn.bind(&instance))))
    }
}

fn number_operand(operator: &Token, value: &Value) -> RuntimeResult<f64> {
    match value {
        Value::Number(value) => Ok(*value),
        _ => Err(RuntimeError::type_error(operator, "Operand must be a number.")),
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> RuntimeResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => Ok((*left, *right)),
        _ => Err(RuntimeError::type_error(operator, "Operands must be numbers.")),
    }
}
