use std::fmt;
use std::rc::Rc;

use crate::ast::LiteralValue;

use super::{
    class::{Class, Instance},
    function::Function,
    runtime_error::RuntimeResult,
    Interpreter,
};

/// Anything the `Call` expression accepts: native functions, user
/// functions/closures, and classes acting as constructors.
pub trait Callable: fmt::Display {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> RuntimeResult<Value>;
}

/// The closed set of runtime values. Functions, classes and instances are
/// cheap-clone `Rc` handles; cloning a `Value` never deep-copies.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Native(Rc<dyn Callable>),
    Function(Rc<Function>),
    Class(Class),
    Instance(Instance),
}

impl Value {
    /// `nil` and `false` are falsy, everything else (including 0 and "") is
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Native(native) => Some(native.as_ref()),
            Value::Function(function) => Some(function.as_ref()),
            Value::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Nil => Value::Nil,
            LiteralValue::Boolean(value) => Value::Boolean(*value),
            LiteralValue::Number(value) => Value::Number(*value),
            LiteralValue::String(value) => Value::String(value.clone()),
        }
    }
}

/// Equality per the language: `nil` equals only `nil`, primitives compare by
/// value, functions/classes/instances by identity. Never fails.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(lhs), Value::Boolean(rhs)) => lhs == rhs,
            (Value::Number(lhs), Value::Number(rhs)) => lhs == rhs,
            (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
            (Value::Native(lhs), Value::Native(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Function(lhs), Value::Function(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Class(lhs), Value::Class(rhs)) => lhs.ptr_eq(rhs),
            (Value::Instance(lhs), Value::Instance(rhs)) => lhs.ptr_eq(rhs),
            _ => false,
        }
    }
}

/// Rendering used by `print`, string coercion and the REPL. Rust's `f64`
/// display already drops the trailing ".0" from whole numbers.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{}", value),
            Value::Native(native) => write!(f, "{}", native),
            Value::Function(function) => write!(f, "{}", function),
            Value::Class(class) => write!(f, "{}", class),
            Value::Instance(instance) => write!(f, "{}", instance),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
    }

    #[test]
    fn nil_equals_only_nil() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Boolean(false));
        assert_ne!(Value::Nil, Value::Number(0.0));
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Number(-1156.65).to_string(), "-1156.65");
    }
}
