use std::{cell::RefCell, fmt, rc::Rc};

use rustc_hash::FxHashMap;

use crate::token::Token;

use super::{
    function::Function,
    runtime_error::RuntimeResult,
    value::{Callable, Value},
    Interpreter,
};

/// Shared class definition: method table plus an optional superclass link.
/// Immutable once the class declaration has been evaluated.
struct ClassData {
    name: String,
    superclass: Option<Class>,
    methods: FxHashMap<String, Rc<Function>>,
}

#[derive(Clone)]
pub struct Class(Rc<ClassData>);

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Class>,
        methods: FxHashMap<String, Rc<Function>>,
    ) -> Class {
        Class(Rc::new(ClassData {
            name: String::from(name),
            superclass,
            methods,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Looks the method up on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.0.methods.get(name).map(Rc::clone).or_else(|| {
            self.0
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Callable for Class {
    fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    /// Calling a class constructs an instance; an inherited or local `init`
    /// runs bound to it, and the instance is returned regardless of what
    /// `init` returns.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> RuntimeResult<Value> {
        let instance = Instance::new(self);
        if let Some(initializer) = self.find_method("init") {
            initializer.bind(&instance).call(interpreter, arguments)?;
        }
        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.0.name)
    }
}

struct InstanceData {
    class: Class,
    fields: FxHashMap<String, Value>,
}

/// A class instance: mutable field table plus a non-owning back-reference to
/// its class. Cheap-clone handle, shared by everything that holds it.
#[derive(Clone)]
pub struct Instance(Rc<RefCell<InstanceData>>);

impl Instance {
    pub fn new(class: &Class) -> Instance {
        Instance(Rc::new(RefCell::new(InstanceData {
            class: class.clone(),
            fields: FxHashMap::default(),
        })))
    }

    /// Property lookup: own fields first, then the class's methods (bound to
    /// this instance, walking the superclass chain).
    pub fn get(&self, name: &Token) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(field) = data.fields.get(&name.lexeme) {
            return Some(field.clone());
        }
        data.class
            .find_method(&name.lexeme)
            .map(|method| Value::Function(Rc::new(method.bind(self))))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.0.borrow_mut().fields.insert(name.lexeme.clone(), value);
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<instance of {}>", self.0.borrow().class.name())
    }
}
