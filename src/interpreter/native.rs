use std::fmt;
use std::time::SystemTime;

use super::{
    runtime_error::RuntimeResult,
    value::{Callable, Value},
    Interpreter,
};

/// `clock()`: seconds since the Unix epoch as a fractional number.
#[derive(Debug)]
pub struct NativeClock;

impl Callable for NativeClock {
    fn arity(&self) -> usize {
        0
    }

    fn call(&self, _interpreter: &mut Interpreter, _arguments: Vec<Value>) -> RuntimeResult<Value> {
        let elapsed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Ok(Value::Number(elapsed.as_secs_f64()))
    }
}

impl fmt::Display for NativeClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn clock>")
    }
}
