/*!
Runtime values.

Everything a bunt expression can evaluate to is one `Value` variant.  The
primitives (nil, booleans, numbers, strings) are compared by value; every
compound value (function, class, instance, list) is reference‑counted and
compared by identity, so two structurally equal lists are still `!=` unless
they are the same list.
*/

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{Class, Instance};
use crate::function::Function;

/// The operations a list exposes as bound methods (`xs.append(1)`).
///
/// A closed enum rather than a name string: the interpreter dispatches on
/// it directly and unknown names never construct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    Append,
    Pop,
    Get,
    Insert,
    Remove,
    Len,
}

impl ListOp {
    pub fn from_name(name: &str) -> Option<ListOp> {
        match name {
            "append" => Some(ListOp::Append),
            "pop" => Some(ListOp::Pop),
            "get" => Some(ListOp::Get),
            "insert" => Some(ListOp::Insert),
            "remove" => Some(ListOp::Remove),
            "len" => Some(ListOp::Len),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListOp::Append => "append",
            ListOp::Pop => "pop",
            ListOp::Get => "get",
            ListOp::Insert => "insert",
            ListOp::Remove => "remove",
            ListOp::Len => "len",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            ListOp::Append | ListOp::Get | ListOp::Remove => 1,
            ListOp::Insert => 2,
            ListOp::Pop | ListOp::Len => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),

    /// Host‑provided function, installed into the globals at startup.
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    },

    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    List(Rc<RefCell<Vec<Value>>>),

    /// A list operation bound to its receiver, ready to be called.
    ListMethod {
        op: ListOp,
        list: Rc<RefCell<Vec<Value>>>,
    },
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,

            (
                Value::NativeFunction {
                    name: a, func: fa, ..
                },
                Value::NativeFunction {
                    name: b, func: fb, ..
                },
            ) => a == b && *fa as usize == *fb as usize,

            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),

            (
                Value::ListMethod { op: a, list: la },
                Value::ListMethod { op: b, list: lb },
            ) => a == b && Rc::ptr_eq(la, lb),

            _ => false,
        }
    }
}

/// Render a number the way `print` shows it: integral doubles lose the
/// trailing `.0`, everything else keeps `f64`'s default formatting.
pub fn format_number(n: f64) -> String {
    let text = n.to_string();

    match text.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => text,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::NativeFunction { .. } => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "{}", function),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),

            Value::List(list) => {
                write!(f, "[")?;
                for (i, element) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }

            Value::ListMethod { op, .. } => write!(f, "<native fn {}>", op.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nil_native(_args: &[Value]) -> Result<Value, String> {
        Ok(Value::Nil)
    }

    fn zero_native(_args: &[Value]) -> Result<Value, String> {
        Ok(Value::Number(0.0))
    }

    fn native(name: &'static str, func: fn(&[Value]) -> Result<Value, String>) -> Value {
        Value::NativeFunction {
            name,
            arity: 0,
            func,
        }
    }

    #[test]
    fn native_functions_compare_by_identity_not_name() {
        assert_eq!(native("clock", nil_native), native("clock", nil_native));
        assert_ne!(native("clock", nil_native), native("clock", zero_native));
        assert_ne!(native("clock", nil_native), native("tick", nil_native));
    }
}
