/*!
Static variable resolution.

A pre‑execution pass over the parsed program that computes, for every
variable use in a local scope, how many environments out its declaration
lives.  The distances go into the interpreter's side table keyed by
[`ExprId`]; names with no entry are globals and stay late‑bound.

The same walk performs the semantic checks that must reject a program
before it runs:

- reading a local variable in its own initializer
- redeclaring a name within one local scope
- `return` outside a function, or returning a value from `init`
- `this` / `super` outside a class, `super` without a superclass
- a class inheriting from itself
- `break` / `continue` outside a loop

Diagnostics accumulate; any diagnostic prevents execution.
*/

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::BuntError;
use crate::interpreter::Interpreter;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopType {
    None,
    Loop,
}

pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,

    /// Innermost scope last.  The bool tracks whether the name's
    /// initializer has finished resolving (declared vs. defined).
    scopes: Vec<HashMap<String, bool>>,

    current_function: FunctionType,
    current_class: ClassType,
    current_loop: LoopType,
    errors: Vec<BuntError>,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            current_loop: LoopType::None,
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program, feeding distances into the interpreter.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<(), Vec<BuntError>> {
        self.resolve_stmts(statements);

        if self.errors.is_empty() {
            info!("Resolved {} top-level statement(s)", statements.len());
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                let enclosing = self.current_loop;
                self.current_loop = LoopType::Loop;

                self.resolve_expr(condition);
                self.resolve_stmt(body);

                self.current_loop = enclosing;
            }

            Stmt::Break { keyword } => {
                if self.current_loop == LoopType::None {
                    self.error(keyword, "Can't break from outside a loop.");
                }
            }

            Stmt::Continue { keyword } => {
                if self.current_loop == LoopType::None {
                    self.error(keyword, "Can't continue from outside a loop.");
                }
            }

            Stmt::Function(declaration) => {
                // The name binds in the surrounding scope and is defined
                // eagerly, so the body may refer to it recursively.
                if let Some(name) = &declaration.name {
                    self.declare(name);
                    self.define(name);
                }

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if let Expr::Variable {
                        name: super_name, ..
                    } = superclass
                    {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass);

                    self.begin_scope();
                    self.scope_insert("super");
                }

                self.begin_scope();
                self.scope_insert("this");

                for method in methods {
                    let declaration = match &method.name {
                        Some(name) if name.lexeme == "init" => FunctionType::Initializer,
                        _ => FunctionType::Method,
                    };
                    self.resolve_function(method, declaration);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing;
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Catches `var a = a;` inside a block: the name exists in
                // the innermost scope but its initializer is not done yet.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            // Properties are looked up dynamically; only the receiver
            // resolves.
            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }

            // A lambda body resolves exactly like a named function's; there
            // is just no name to bind first.
            Expr::Lambda(declaration) => {
                self.resolve_function(declaration, FunctionType::Function);
            }

            Expr::List { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            Expr::Subscript {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    /// Walk parameters and body in a fresh scope, tracking the function
    /// kind so `return` checks see through nesting.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        // A function body is a fresh control context: an enclosing loop
        // does not license `break`/`continue` inside it.
        let enclosing_loop = self.current_loop;
        self.current_loop = LoopType::None;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_loop = enclosing_loop;
        self.current_function = enclosing;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Add `name` to the innermost scope, not yet usable.  Global-scope
    /// declarations are not tracked and may repeat freely.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.errors.push(BuntError::resolve(
                name.line,
                "Already a variable with this name in this scope.",
            ));
            return;
        }

        scope.insert(name.lexeme.clone(), false);
    }

    /// Mark `name` fully initialized and readable.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    /// Record the hop count from the use site to the declaring scope.  A
    /// miss means the name is global (or undefined, caught at runtime).
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at distance {}", name.lexeme, distance);
                self.interpreter.resolve(id, distance);
                return;
            }
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(BuntError::resolve(token.line, message));
    }
}
