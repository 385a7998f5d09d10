//! Abstract syntax tree: two disjoint node families, expressions and
//! statements. Every node keeps at least one token so diagnostics can point
//! back into the source.

use std::rc::Rc;

use crate::token::Token;

/// An expression node.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    /// Integer literal (no dot in the lexeme).
    Int { value: i64, tok: Token },
    /// Fractional literal (dot in the lexeme).
    Float { value: f64, tok: Token },
    /// String literal; the decoded contents live in the token's lexeme.
    Str { tok: Token },
    Bool { value: bool, tok: Token },
    NoneLit { tok: Token },
    /// Variable reference; the name is the token's lexeme.
    Var { tok: Token },
    /// Prefix `-` or `not`.
    Unary { op: Token, operand: Box<Expr> },
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    /// Call expression; `lparen` is the opening paren, used as the call site
    /// for diagnostics and stack traces.
    Call {
        callee: Box<Expr>,
        lparen: Token,
        args: Vec<Expr>,
    },
    List { lbracket: Token, items: Vec<Expr> },
    Index {
        target: Box<Expr>,
        lbracket: Token,
        index: Box<Expr>,
    },
}

/// A brace-delimited statement list.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub lbrace: Token,
    pub statements: Vec<Stmt>,
}

/// A statement node.
#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    Expr(Expr),
    /// `IDENT = EXPR ;` — updates the nearest binding or defines locally.
    Assign { name: Token, value: Expr },
    /// `import "path" ;` — the path literal is the token's lexeme.
    Import { path_tok: Token },
    If {
        if_tok: Token,
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While {
        while_tok: Token,
        cond: Expr,
        body: Block,
    },
    Return {
        return_tok: Token,
        value: Option<Expr>,
    },
    Def {
        def_tok: Token,
        name: Token,
        params: Vec<Token>,
        /// Shared so a `def` executed repeatedly (e.g. in a loop) hands the
        /// same body to every function value it creates.
        body: Rc<Block>,
    },
}
