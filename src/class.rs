/*!
Classes and their instances.

A `Class` is a named method table with an optional superclass; calling it
constructs an [`Instance`] and runs `init` when one is defined.  Method
lookup walks the superclass chain, so a subclass method shadows its
superclass's version.  Instance state lives in a per‑instance field map
that is created empty and written only by `set`.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{BuntError, Result};
use crate::function::Function;
use crate::interpreter::{IResult, Interpreter};
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Class {
            name,
            superclass,
            methods,
        }
    }

    /// Find `name` on this class or, failing that, up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's call arity is its initializer's; no `init` means zero.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    /// Construct an instance, running `init` bound to it when present.
    /// The constructed instance is always the result, whatever `init` does.
    pub fn call(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(Instance::new(Rc::clone(class)));

        if let Some(init) = class.find_method("init") {
            init.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Property access: fields shadow methods; a method hit is bound to the
    /// receiver before being returned.
    pub fn get(instance: &Rc<Instance>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(BuntError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Assignment to a property creates the field when it does not exist.
    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}
