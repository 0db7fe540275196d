/*!
User‑defined functions as runtime values.

A `Function` pairs a shared declaration (parsed once, shared by every
closure made from it) with the environment that was live at declaration
time.  Methods additionally get a `this` binding via [`Function::bind`].
*/

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::Instance;
use crate::environment::Environment;
use crate::interpreter::{IResult, Interpreter, Signal};
use crate::value::Value;

#[derive(Debug)]
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose closure has `this` bound to
    /// `instance`.  Method access (`obj.m`) goes through here, so a method
    /// value remembers its receiver even when stored and called later.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// Execute the body in a fresh environment chained to the closure.
    ///
    /// A `return` statement surfaces as [`Signal::Return`] and is converted
    /// back into a plain value here.  Initializers always yield `this`, even
    /// after a bare `return;`.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> IResult<Value> {
        debug!("Calling {}", self);

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let environment = Rc::new(RefCell::new(environment));

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Signal::Return(value)) => {
                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }

            Err(signal) => Err(signal),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration.name {
            Some(name) => write!(f, "<fn {}>", name.lexeme),
            None => write!(f, "<fn>"),
        }
    }
}
