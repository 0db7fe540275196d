/*!
Tree‑walking evaluator.

Executes resolved statements directly against the AST.  Three pieces of
state drive it: the global environment, the current environment (swapped
around blocks and calls), and the resolver's side table mapping expression
ids to scope distances.

Non‑local control flow rides the `Err` channel as a [`Signal`]: `return`,
`break`, and `continue` unwind through `?` exactly like runtime errors but
are intercepted by the construct they belong to (function call, loop).  A
real runtime error propagates all the way out of [`Interpreter::interpret`]
and aborts the current statement list; side effects already performed
remain visible.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{BuntError, Result};
use crate::function::Function;
use crate::token::{Token, TokenType};
use crate::value::{ListOp, Value};

/// Why evaluation stopped early.
///
/// Only `Error` is a failure; the other variants are control flow and are
/// consumed before they reach the top level.
#[derive(Debug)]
pub enum Signal {
    Error(BuntError),
    Return(Value),
    Break,
    Continue,
}

impl From<BuntError> for Signal {
    fn from(err: BuntError) -> Self {
        Signal::Error(err)
    }
}

/// Result alias for evaluation paths that may unwind with a [`Signal`].
pub type IResult<T> = std::result::Result<T, Signal>;

fn native_clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?;

    Ok(Value::Number(now.as_secs_f64()))
}

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// An interpreter printing to stdout, with the native functions
    /// installed in its globals.
    pub fn new() -> Self {
        Interpreter::with_output(Box::new(std::io::stdout()))
    }

    /// An interpreter printing to `out`; tests inject a capture buffer.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: native_clock,
            },
        );

        info!("Interpreter created");

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record that expression `id` refers to a binding `depth` scopes out.
    /// Called by the resolver; ids without an entry are globals.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved statement list.
    ///
    /// A runtime error aborts the remainder of the list.  A stray `break`
    /// or `continue` reaching the top level is absorbed; the resolver
    /// normally rejects those before execution.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Signal::Error(err)) => return Err(err),
                Err(_) => {}
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(BuntError::from)?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };

                debug!("var {} = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
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
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        // `continue` just moves on to the next condition
                        // check; `break` leaves the loop entirely.
                        Err(Signal::Continue) => {}
                        Err(Signal::Break) => break,
                        Err(signal) => return Err(signal),
                    }
                }

                Ok(())
            }

            Stmt::Break { .. } => Err(Signal::Break),

            Stmt::Continue { .. } => Err(Signal::Continue),

            Stmt::Function(declaration) => {
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                // `name` is always present on statement-level functions.
                if let Some(name) = &declaration.name {
                    self.environment
                        .borrow_mut()
                        .define(&name.lexeme, Value::Function(Rc::new(function)));
                }

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };

                Err(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };
                    return Err(BuntError::runtime(line, "Superclass must be a class.").into());
                }
            },
            None => None,
        };

        // Two-step definition lets methods close over the class's own name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra scope holding `super`.
        let previous = if let Some(class) = &superclass_value {
            let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super", Value::Class(Rc::clone(class)));

            let previous = Rc::clone(&self.environment);
            self.environment = Rc::new(RefCell::new(environment));
            Some(previous)
        } else {
            None
        };

        let mut method_table: HashMap<String, Rc<Function>> = HashMap::new();
        for declaration in methods {
            let method_name = declaration
                .name
                .as_ref()
                .map(|token| token.lexeme.clone())
                .unwrap_or_default();
            let is_initializer = method_name == "init";

            let function = Function::new(
                Rc::clone(declaration),
                Rc::clone(&self.environment),
                is_initializer,
            );

            method_table.insert(method_name, Rc::new(function));
        }

        if let Some(previous) = previous {
            self.environment = previous;
        }

        let class = Class::new(name.lexeme.clone(), superclass_value, method_table);
        debug!("class {} defined", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)), name.line)?;

        Ok(())
    }

    /// Run `statements` with `environment` as the current scope, restoring
    /// the previous scope on every exit path, signal unwinds included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(BuntError::runtime(
                            operator.line,
                            "Operand must be a number.",
                        )
                        .into()),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only builds '!' and '-' unaries"),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(left, operator, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Short-circuit yields the deciding operand itself, not a
                // canonical boolean.
                if operator.token_type == TokenType::OR {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }

                self.evaluate(right)
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }
                    None => {
                        self.globals.borrow_mut().assign(
                            &name.lexeme,
                            value.clone(),
                            name.line,
                        )?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee, args, paren)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => Ok(Instance::get(&instance, name)?),

                    // Lists answer a fixed method set; anything else is not
                    // a property container.
                    Value::List(list) => match ListOp::from_name(&name.lexeme) {
                        Some(op) => Ok(Value::ListMethod { op, list }),
                        None => Err(BuntError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        )
                        .into()),
                    },

                    _ => Err(
                        BuntError::runtime(name.line, "Only instances have properties.").into(),
                    ),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance.set(name, value.clone());
                        Ok(value)
                    }
                    _ => Err(BuntError::runtime(name.line, "Only instances have fields.").into()),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super { id, keyword, method } => {
                let distance = *self
                    .locals
                    .get(id)
                    .expect("'super' use site always resolves");

                let superclass = match Environment::get_at(&self.environment, distance, "super") {
                    Value::Class(class) => class,
                    _ => unreachable!("'super' binding always holds a class"),
                };

                // `this` lives one scope inside the one holding `super`.
                let object = match Environment::get_at(&self.environment, distance - 1, "this") {
                    Value::Instance(instance) => instance,
                    _ => unreachable!("'this' binding always holds an instance"),
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
                    None => Err(BuntError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    )
                    .into()),
                }
            }

            Expr::Lambda(declaration) => {
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                Ok(Value::Function(Rc::new(function)))
            }

            Expr::List { elements, .. } => {
                let mut values: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }

                Ok(Value::List(Rc::new(RefCell::new(values))))
            }

            Expr::Subscript {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;

                let Value::List(list) = object else {
                    return Err(
                        BuntError::runtime(bracket.line, "Can only subscript lists.").into()
                    );
                };

                let index = self.evaluate(index)?;

                match value {
                    Some(value) => {
                        // The value expression may shrink the list through
                        // an alias, so the index is validated only after it
                        // has run, immediately before the write.
                        let value = self.evaluate(value)?;
                        let index = self.list_index(&list, index, bracket)?;
                        list.borrow_mut()[index] = value.clone();
                        Ok(value)
                    }
                    None => {
                        let index = self.list_index(&list, index, bracket)?;
                        let element = list.borrow()[index].clone();
                        Ok(element)
                    }
                }
            }
        }
    }

    fn binary(&mut self, left: Value, operator: &Token, right: Value) -> IResult<Value> {
        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),

                // One string side coerces the other textually.
                (Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, b))),
                (a, Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),

                _ => Err(BuntError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = self.number_operands(operator, left, right)?;

                if b == 0.0 {
                    return Err(
                        BuntError::runtime(operator.line, "Cannot divide by zero.").into()
                    );
                }

                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            // Equality never type-errors; mixed types are simply unequal.
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => unreachable!("parser only builds arithmetic and comparison binaries"),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> IResult<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            _ => Err(BuntError::runtime(operator.line, "Operands must be numbers.").into()),
        }
    }

    fn invoke_callable(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> IResult<Value> {
        let arity = match &callee {
            Value::NativeFunction { arity, .. } => *arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            Value::ListMethod { op, .. } => op.arity(),
            _ => {
                return Err(BuntError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                )
                .into());
            }
        };

        if args.len() != arity {
            return Err(BuntError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            )
            .into());
        }

        match callee {
            Value::NativeFunction { name, func, .. } => {
                debug!("Calling native '{}'", name);
                func(&args).map_err(|msg| BuntError::runtime(paren.line, msg).into())
            }

            Value::Function(function) => function.call(self, args),

            Value::Class(class) => Class::call(&class, self, args),

            Value::ListMethod { op, list } => self.call_list_method(op, &list, args, paren),

            _ => unreachable!("arity check already rejected non-callables"),
        }
    }

    fn call_list_method(
        &mut self,
        op: ListOp,
        list: &Rc<RefCell<Vec<Value>>>,
        args: Vec<Value>,
        paren: &Token,
    ) -> IResult<Value> {
        match op {
            ListOp::Append => {
                list.borrow_mut().push(args.into_iter().next().expect("arity checked"));
                Ok(Value::Nil)
            }

            ListOp::Pop => match list.borrow_mut().pop() {
                Some(value) => Ok(value),
                None => Err(BuntError::runtime(paren.line, "Cannot pop from an empty list.").into()),
            },

            ListOp::Len => Ok(Value::Number(list.borrow().len() as f64)),

            ListOp::Get => {
                let index = args.into_iter().next().expect("arity checked");
                let index = self.list_index(list, index, paren)?;
                let element = list.borrow()[index].clone();
                Ok(element)
            }

            ListOp::Insert => {
                let mut args = args.into_iter();
                let index = args.next().expect("arity checked");
                let value = args.next().expect("arity checked");

                let Value::Number(n) = index else {
                    return Err(
                        BuntError::runtime(paren.line, "List index must be a number.").into()
                    );
                };

                // Inserting at len() appends.
                let len = list.borrow().len();
                if n < 0.0 || n.fract() != 0.0 || (n as usize) > len {
                    return Err(BuntError::runtime(paren.line, "Index out of range.").into());
                }

                list.borrow_mut().insert(n as usize, value);
                Ok(Value::Nil)
            }

            ListOp::Remove => {
                let index = args.into_iter().next().expect("arity checked");
                let index = self.list_index(list, index, paren)?;
                let removed = list.borrow_mut().remove(index);
                Ok(removed)
            }
        }
    }

    /// Validate a subscript/element index: a non-negative integral number
    /// strictly below the list length.
    fn list_index(
        &self,
        list: &Rc<RefCell<Vec<Value>>>,
        index: Value,
        token: &Token,
    ) -> IResult<usize> {
        let Value::Number(n) = index else {
            return Err(BuntError::runtime(token.line, "List index must be a number.").into());
        };

        let len = list.borrow().len();
        if n < 0.0 || n.fract() != 0.0 || (n as usize) >= len {
            return Err(BuntError::runtime(token.line, "Index out of range.").into());
        }

        Ok(n as usize)
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),
            None => Ok(self.globals.borrow().get(&name.lexeme, name.line)?),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
