/*!
Recursive‑descent parser for the bunt language.

Grammar (EBNF — condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | whileStmt | forStmt | ifStmt
               | block | returnStmt | breakStmt | continueStmt ;
breakStmt      → "break" ";" ;
continueStmt   → "continue" ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment
               | call "[" logic_or "]" "=" assignment
               | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → subscript ( "(" arguments? ")" | "." IDENT )* ;
subscript      → primary ( "[" logic_or "]" )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "(" expression ")" | "[" list "]" | IDENT
               | "super" "." IDENT | "fun" "(" parameters? ")" block ;
```

`for` is pure syntax sugar: it is desugared here into an equivalent `while`
plus an initializer block and a body wrapping the increment, so the
interpreter has no separate `for` handling.

Errors are accumulated: a parse error synchronizes to the next statement
boundary and parsing continues, so one bad statement does not hide later
diagnostics.  Any accumulated error prevents execution.
*/

use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::{BuntError, Result};
use crate::token::{Token, TokenType};

/// A single‑token‑lookahead recursive‑descent parser over a scanned token
/// buffer (the final token is always `EOF`).
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_expr_id: u32,
    errors: Vec<BuntError>,
}

impl Parser {
    /// Create a parser over `tokens`, allocating [`ExprId`]s from zero.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser::resuming_from(tokens, 0)
    }

    /// Create a parser whose [`ExprId`] counter starts at `first_expr_id`.
    ///
    /// A REPL parses one line at a time against a long‑lived interpreter;
    /// resuming the counter keeps resolution side‑table keys unique across
    /// lines.
    pub fn resuming_from(tokens: Vec<Token>, first_expr_id: u32) -> Self {
        info!(
            "Parser created over {} token(s), expr ids from {}",
            tokens.len(),
            first_expr_id
        );

        Parser {
            tokens,
            current: 0,
            next_expr_id: first_expr_id,
            errors: Vec::new(),
        }
    }

    /// The next unused [`ExprId`] value; feed into [`Parser::resuming_from`]
    /// for the following REPL line.
    pub fn next_expr_id(&self) -> u32 {
        self.next_expr_id
    }

    /// Parse the whole token buffer into a statement list.
    ///
    /// On failure every collected diagnostic is returned; the statement list
    /// of a failed parse must not be executed.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<BuntError>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());
            Ok(statements)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_type(&TokenType::CLASS) {
            return self.class_declaration();
        }

        // `fun` starts a declaration only when followed by a name; otherwise
        // it is a lambda expression and falls through to `statement`.
        if self.check(&TokenType::FUN) && self.check_next(&TokenType::IDENTIFIER) {
            self.advance(); // consume `fun`
            let decl = self.function("function")?;
            return Ok(Stmt::Function(decl));
        }

        if self.match_type(&TokenType::VAR) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expect class name.")?.clone();

        let superclass = if self.match_type(&TokenType::LESS) {
            let super_name = self
                .consume(&TokenType::IDENTIFIER, "Expect superclass name.")?
                .clone();
            let id = self.fresh_id();
            Some(Expr::Variable {
                id,
                name: super_name,
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!(
            "Parsed class '{}' with {} method(s)",
            name.lexeme,
            methods.len()
        );

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// Parse a named function or method: `IDENT "(" parameters? ")" block`.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name = self
            .consume(&TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?
            .clone();
        self.consume(
            &TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let params = self.parameters()?;

        self.consume(
            &TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name: Some(name),
            params,
            body,
        }))
    }

    /// Parse a parameter list, consuming the closing `)`.
    fn parameters(&mut self) -> Result<Vec<Token>> {
        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let line = self.peek().line;
                    self.errors.push(BuntError::parse(
                        line,
                        "Can't have more than 255 parameters.",
                    ));
                }

                params.push(
                    self.consume(&TokenType::IDENTIFIER, "Expect parameter name.")?
                        .clone(),
                );

                if !self.match_type(&TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self
            .consume(&TokenType::IDENTIFIER, "Expect variable name.")?
            .clone();

        let initializer = if self.match_type(&TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_type(&TokenType::BREAK) {
            return self.break_statement();
        }
        if self.match_type(&TokenType::CONTINUE) {
            return self.continue_statement();
        }
        if self.match_type(&TokenType::FOR) {
            return self.for_statement();
        }
        if self.match_type(&TokenType::IF) {
            return self.if_statement();
        }
        if self.match_type(&TokenType::PRINT) {
            return self.print_statement();
        }
        if self.match_type(&TokenType::RETURN) {
            return self.return_statement();
        }
        if self.match_type(&TokenType::WHILE) {
            return self.while_statement();
        }
        if self.match_type(&TokenType::LEFT_BRACE) {
            return Ok(Stmt::Block(self.block()?));
        }

        self.expression_statement()
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        self.consume(&TokenType::SEMICOLON, "Expect ';' after 'break'.")?;
        Ok(Stmt::Break { keyword })
    }

    fn continue_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        self.consume(&TokenType::SEMICOLON, "Expect ';' after 'continue'.")?;
        Ok(Stmt::Continue { keyword })
    }

    /// Desugar `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_type(&TokenType::SEMICOLON) {
            None
        } else if self.match_type(&TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        // A missing condition makes an infinite loop.
        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::True));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body = self.statement()?;

        Ok(Stmt::While {
            condition,
            body: Box::new(body),
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_type(&TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        // A semicolon cannot begin an expression, so its absence means a
        // return value is present.
        let value = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    /// Assignment is right‑associative; the left side must be a valid
    /// assignment target (variable, property, or subscript).
    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or()?;

        if self.match_type(&TokenType::EQUAL) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    let id = self.fresh_id();
                    return Ok(Expr::Assign {
                        id,
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Get { object, name } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Subscript {
                    object,
                    bracket,
                    index,
                    value: None,
                } => {
                    return Ok(Expr::Subscript {
                        object,
                        bracket,
                        index,
                        value: Some(Box::new(value)),
                    });
                }

                _ => {
                    // Report without aborting; the surrounding expression is
                    // still well formed enough to continue parsing.
                    self.errors
                        .push(BuntError::parse(equals.line, "Invalid assignment target."));
                    return Ok(expr);
                }
            }
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;

        while self.match_type(&TokenType::OR) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.match_type(&TokenType::AND) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.match_types(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.match_types(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.match_types(&[TokenType::SLASH, TokenType::STAR]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_types(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.subscript()?;

        loop {
            if self.match_type(&TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.match_type(&TokenType::DOT) {
                let name = self
                    .consume(&TokenType::IDENTIFIER, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn subscript(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        while self.match_type(&TokenType::LEFT_BRACKET) {
            let bracket = self.previous().clone();
            let index = self.or()?;
            self.consume(&TokenType::RIGHT_BRACKET, "Expect ']' after index.")?;

            expr = Expr::Subscript {
                object: Box::new(expr),
                bracket,
                index: Box::new(index),
                value: None,
            };
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let line = self.peek().line;
                    self.errors.push(BuntError::parse(
                        line,
                        "Can't have more than 255 arguments.",
                    ));
                }

                arguments.push(self.expression()?);

                if !self.match_type(&TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren = self
            .consume(&TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_type(&TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.match_type(&TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.match_type(&TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.match_type(&TokenType::NUMBER(0.0)) {
            if let TokenType::NUMBER(n) = self.previous().token_type {
                return Ok(Expr::Literal(LiteralValue::Number(n)));
            }
            unreachable!("NUMBER token without a numeric payload");
        }

        if self.match_type(&TokenType::STRING(String::new())) {
            if let TokenType::STRING(s) = &self.previous().token_type {
                return Ok(Expr::Literal(LiteralValue::Str(s.clone())));
            }
            unreachable!("STRING token without a string payload");
        }

        if self.match_type(&TokenType::SUPER) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::DOT, "Expect '.' after 'super'.")?;
            let method = self
                .consume(&TokenType::IDENTIFIER, "Expect superclass method name.")?
                .clone();
            let id = self.fresh_id();
            return Ok(Expr::Super {
                id,
                keyword,
                method,
            });
        }

        if self.match_type(&TokenType::THIS) {
            let keyword = self.previous().clone();
            let id = self.fresh_id();
            return Ok(Expr::This { id, keyword });
        }

        if self.match_type(&TokenType::IDENTIFIER) {
            let name = self.previous().clone();
            let id = self.fresh_id();
            return Ok(Expr::Variable { id, name });
        }

        // Anonymous function expression: `fun (params) { body }`.
        if self.match_type(&TokenType::FUN) {
            self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'fun'.")?;
            let params = self.parameters()?;
            self.consume(&TokenType::LEFT_BRACE, "Expect '{' before function body.")?;
            let body = self.block()?;

            return Ok(Expr::Lambda(Rc::new(FunctionDecl {
                name: None,
                params,
                body,
            })));
        }

        if self.match_type(&TokenType::LEFT_PAREN) {
            let expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.match_type(&TokenType::LEFT_BRACKET) {
            let bracket = self.previous().clone();
            let mut elements: Vec<Expr> = Vec::new();

            if !self.check(&TokenType::RIGHT_BRACKET) {
                loop {
                    elements.push(self.expression()?);

                    if !self.match_type(&TokenType::COMMA) {
                        break;
                    }
                }
            }

            self.consume(&TokenType::RIGHT_BRACKET, "Expect ']' after elements.")?;
            return Ok(Expr::List { bracket, elements });
        }

        let peeked = self.peek();
        Err(BuntError::parse(peeked.line, "Expect expression."))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helper methods
    // ─────────────────────────────────────────────────────────────────────

    fn consume(&mut self, tt: &TokenType, message: &str) -> Result<&Token> {
        if self.check(tt) {
            return Ok(self.advance());
        }

        let peeked = self.peek();
        debug!(
            "consume failed at '{}' (line {}): {}",
            peeked.lexeme, peeked.line, message
        );
        Err(BuntError::parse(peeked.line, message))
    }

    /// Discard tokens until the next likely statement boundary so one syntax
    /// error does not cascade into dozens of spurious ones.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FOR
                | TokenType::FUN
                | TokenType::IF
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::VAR
                | TokenType::WHILE => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn match_type(&mut self, tt: &TokenType) -> bool {
        if self.check(tt) {
            self.advance();
            return true;
        }
        false
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(tt) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, tt: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().token_type == *tt
    }

    fn check_next(&self, tt: &TokenType) -> bool {
        if self.is_at_end() || self.current + 1 >= self.tokens.len() {
            return false;
        }
        self.tokens[self.current + 1].token_type == *tt
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}
