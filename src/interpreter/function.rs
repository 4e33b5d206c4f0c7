use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionLiteral;

use super::{
    class::Instance,
    environment::{self, Environment},
    runtime_error::RuntimeResult,
    value::{Callable, Value},
    Control, Interpreter,
};

/// A user function: shared declaration plus the environment captured at the
/// point the `fun` was evaluated. Binding a method wraps the closure in one
/// more frame holding `this`.
pub struct Function {
    name: Option<String>,
    declaration: Rc<FunctionLiteral>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        name: Option<String>,
        declaration: Rc<FunctionLiteral>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Function {
        Function {
            name,
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn bind(&self, instance: &Instance) -> Function {
        let mut bound = Environment::new_with(Rc::clone(&self.closure));
        bound.define("this", Value::Instance(instance.clone()));
        Function::new(
            self.name.clone(),
            Rc::clone(&self.declaration),
            Rc::new(RefCell::new(bound)),
            self.is_initializer,
        )
    }

    fn this(&self) -> Value {
        environment::get_at(&self.closure, 0, "this").expect("bound method carries 'this'")
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> RuntimeResult<Value> {
        let mut call_frame = Environment::new_with(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            call_frame.define(&param.lexeme, argument);
        }

        let control =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(call_frame)))?;

        // An initializer always yields the instance, even on a bare
        // `return;`. The resolver rejects `return <value>` inside init.
        if self.is_initializer {
            return Ok(self.this());
        }
        match control {
            Control::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}
