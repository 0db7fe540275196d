//! Expression and statement trees produced by the parser.
//!
//! The variant sets are closed: the interpreter and resolver dispatch over
//! them exhaustively.  Nodes that name a binding (`Variable`, `Assign`,
//! `This`, `Super`) carry an [`ExprId`] so the resolver can record a scope
//! distance for *that occurrence* without relying on pointer identity — two
//! syntactically identical expressions at different source positions get
//! distinct ids.

use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Stable identity of a binding‑referencing expression node, allocated by the
/// parser as a monotonically increasing counter.  Keys the interpreter's
/// side table of resolved scope distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub u32);

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree.  The
/// parser copies (or converts) the value at parse‑time so the AST can outlive
/// the lexer's token buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// A function declaration shape shared by named functions, class methods and
/// anonymous function (lambda) expressions.  `name` is `None` only for
/// lambdas.  Wrapped in `Rc` wherever it appears so runtime function values
/// can share the declaration without cloning bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// **Abstract‑syntax‑tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression, e.g. `!isReady` or `-42`.
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        /// Operand to which the operator is applied.
        right: Box<Expr>,
    },

    /// Infix binary operator expression, e.g. `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        /// Operator token such as `+`, `*`, `==`, …
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Variable access ‑ resolves to the identifier's current value at
    /// runtime, at the distance recorded for `id` (global on a side‑table
    /// miss).
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Function‑, method‑ or class‑call expression.
    Call {
        /// Expression that evaluates to a callable (variable, property, etc.).
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// Property read: `object.name`.
    Get { object: Box<Expr>, name: Token },

    /// Property write: `object.name = value`.
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// Anonymous function expression: `fun (params) { body }`.
    Lambda(Rc<FunctionDecl>),

    /// List literal: `[a, b, c]`.
    List {
        /// The opening `[` token ‑ retained for error reporting.
        bracket: Token,
        elements: Vec<Expr>,
    },

    /// Subscript read or write: `object[index]` / `object[index] = value`.
    /// The value slot is filled by the parser only when the subscript is an
    /// assignment target.
    Subscript {
        object: Box<Expr>,
        /// The opening `[` token ‑ retained for error reporting.
        bracket: Token,
        index: Box<Expr>,
        value: Option<Box<Expr>>,
    },
}

/// **Abstract‑syntax‑tree node** for *statements*.  A program is a sequence
/// of these nodes returned by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops are desugared into this by the parser.
    While { condition: Expr, body: Box<Stmt> },

    /// Named function declaration.  `decl.name` is always `Some`.
    Function(Rc<FunctionDecl>),

    /// `return` with an optional value.  The keyword token is retained for
    /// diagnostics.
    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    /// Class declaration with an optional superclass variable expression and
    /// a list of method declarations.
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// `break;` — terminates the nearest enclosing loop.
    Break { keyword: Token },

    /// `continue;` — skips to the next condition check of the nearest
    /// enclosing loop.
    Continue { keyword: Token },
}
