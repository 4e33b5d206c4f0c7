use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::token::Token;

use super::{
    runtime_error::{RuntimeError, RuntimeResult},
    value::Value,
};

/// One frame of the scope chain. Frames are shared (`Rc`) because every
/// closure created inside a frame keeps it alive, and mutations through one
/// holder must be visible to all of them.
pub struct Environment {
    values: FxHashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: FxHashMap::default(),
            enclosing: None,
        }
    }

    /// A fresh frame whose parent is `enclosing`. The parent link never
    /// changes after construction.
    pub fn new_with(enclosing: Rc<RefCell<Environment>>) -> Environment {
        Environment {
            values: FxHashMap::default(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(String::from(name), value);
    }

    pub fn get(&self, name: &Token) -> RuntimeResult<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(RuntimeError::undefined_variable(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> RuntimeResult<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError::undefined_variable(name))
        }
    }
}

/// Walks exactly `distance` parent links. The resolver guarantees the frame
/// exists; a short chain is a resolver/interpreter disagreement, not a user
/// error.
fn ancestor(environment: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
    let mut frame = Rc::clone(environment);
    for _ in 0..distance {
        let parent = frame
            .borrow()
            .enclosing
            .as_ref()
            .map(Rc::clone)
            .expect("resolver distance exceeds environment chain");
        frame = parent;
    }
    frame
}

pub fn get_at(
    environment: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &str,
) -> Option<Value> {
    ancestor(environment, distance).borrow().values.get(name).cloned()
}

pub fn assign_at(
    environment: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &Token,
    value: Value,
) -> Option<()> {
    let frame = ancestor(environment, distance);
    let mut frame = frame.borrow_mut();
    if frame.values.contains_key(&name.lexeme) {
        frame.values.insert(name.lexeme.clone(), value);
        Some(())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};
    use pretty_assertions::assert_eq;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenType::Identifier, String::from(lexeme), None, 1)
    }

    fn frame() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::new()))
    }

    #[test]
    fn define_then_get() {
        let env = frame();
        env.borrow_mut().define("a", Value::Number(1.0));
        assert_eq!(env.borrow().get(&name("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_searches_enclosing_frames() {
        let outer = frame();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Rc::new(RefCell::new(Environment::new_with(Rc::clone(&outer))));
        assert_eq!(inner.borrow().get(&name("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_to_undefined_fails() {
        let env = frame();
        let err = env.borrow_mut().assign(&name("a"), Value::Nil).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn get_at_walks_exactly_the_given_distance() {
        let global = frame();
        global.borrow_mut().define("a", Value::Number(1.0));
        let middle = Rc::new(RefCell::new(Environment::new_with(Rc::clone(&global))));
        middle.borrow_mut().define("a", Value::Number(2.0));
        let inner = Rc::new(RefCell::new(Environment::new_with(Rc::clone(&middle))));

        assert_eq!(get_at(&inner, 1, "a"), Some(Value::Number(2.0)));
        assert_eq!(get_at(&inner, 2, "a"), Some(Value::Number(1.0)));
        assert_eq!(get_at(&inner, 0, "a"), None);
    }

    #[test]
    fn assign_at_targets_one_frame_only() {
        let outer = frame();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Rc::new(RefCell::new(Environment::new_with(Rc::clone(&outer))));

        assert_eq!(
            assign_at(&inner, 1, &name("a"), Value::Number(5.0)),
            Some(())
        );
        assert_eq!(outer.borrow().get(&name("a")).unwrap(), Value::Number(5.0));
        assert_eq!(assign_at(&inner, 0, &name("a"), Value::Nil), None);
    }
}
