//! Parsing: recursive descent for statements, Pratt-style precedence
//! climbing for expressions.

use std::rc::Rc;

use crate::{
    ast::{Block, Expr, Stmt},
    error::{RafError, RafResult},
    token::{Token, TokenKind},
};

/// Parses a token stream into a program (a list of statements).
pub(crate) fn parse(tokens: Vec<Token>, src: &str) -> RafResult<Vec<Stmt>> {
    Parser::new(tokens, src).parse_program()
}

/// Highest precedence level: prefix `-` and `not` bind tighter than any
/// binary operator.
const UNARY_PRECEDENCE: u8 = 7;

struct Parser<'a> {
    toks: Vec<Token>,
    src: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    fn new(toks: Vec<Token>, src: &'a str) -> Self {
        Self { toks, src, i: 0 }
    }

    fn parse_program(mut self) -> RafResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at_end() {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    // -------------------------
    // token helpers
    // -------------------------

    fn peek(&self) -> &Token {
        &self.toks[self.i]
    }

    fn prev(&self) -> &Token {
        &self.toks[self.i - 1]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        if !self.at_end() {
            self.i += 1;
        }
        self.prev().clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> RafResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_peek(msg))
    }

    fn error_at_peek(&self, msg: &str) -> RafError {
        let t = self.peek();
        RafError::parse(self.src, t.line, t.col, msg)
    }

    // -------------------------
    // statements
    // -------------------------

    fn statement(&mut self) -> RafResult<Stmt> {
        if self.eat(TokenKind::If) {
            let if_tok = self.prev().clone();
            return self.if_stmt(if_tok);
        }
        if self.eat(TokenKind::While) {
            let while_tok = self.prev().clone();
            return self.while_stmt(while_tok);
        }
        if self.eat(TokenKind::Def) {
            let def_tok = self.prev().clone();
            return self.def_stmt(def_tok);
        }
        if self.eat(TokenKind::Return) {
            let return_tok = self.prev().clone();
            return self.return_stmt(return_tok);
        }
        if self.eat(TokenKind::Import) {
            let path_tok = self.expect(TokenKind::String, "Expected string path after import")?;
            self.expect(TokenKind::Semi, "Expected ';' after import")?;
            return Ok(Stmt::Import { path_tok });
        }

        // assignment, recognized by lookahead: IDENT '=' expr ';'
        if self.check(TokenKind::Ident) && self.toks.get(self.i + 1).is_some_and(|t| t.kind == TokenKind::Eq) {
            let name = self.advance();
            self.advance(); // '='
            let value = self.expression()?;
            self.expect(TokenKind::Semi, "Expected ';' after assignment")?;
            return Ok(Stmt::Assign { name, value });
        }

        let expr = self.expression()?;
        self.expect(TokenKind::Semi, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> RafResult<Block> {
        let lbrace = self.expect(TokenKind::Lbrace, "Expected '{' to start block")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::Rbrace) {
            if self.at_end() {
                return Err(RafError::parse(
                    self.src,
                    lbrace.line,
                    lbrace.col,
                    "Unterminated block (missing '}')",
                ));
            }
            statements.push(self.statement()?);
        }
        self.expect(TokenKind::Rbrace, "Expected '}' after block")?;
        Ok(Block { lbrace, statements })
    }

    fn if_stmt(&mut self, if_tok: Token) -> RafResult<Stmt> {
        self.expect(TokenKind::Lparen, "Expected '(' after if")?;
        let cond = self.expression()?;
        self.expect(TokenKind::Rparen, "Expected ')' after if condition")?;
        let then_branch = self.block()?;
        let else_branch = if self.eat(TokenKind::Else) {
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            if_tok,
            cond,
            then_branch,
            else_branch,
        })
    }

    fn while_stmt(&mut self, while_tok: Token) -> RafResult<Stmt> {
        self.expect(TokenKind::Lparen, "Expected '(' after while")?;
        let cond = self.expression()?;
        self.expect(TokenKind::Rparen, "Expected ')' after while condition")?;
        let body = self.block()?;
        Ok(Stmt::While { while_tok, cond, body })
    }

    fn def_stmt(&mut self, def_tok: Token) -> RafResult<Stmt> {
        let name = self.expect(TokenKind::Ident, "Expected function name after def")?;
        self.expect(TokenKind::Lparen, "Expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::Rparen) {
            params.push(self.expect(TokenKind::Ident, "Expected parameter name")?);
            while self.eat(TokenKind::Comma) {
                params.push(self.expect(TokenKind::Ident, "Expected parameter name")?);
            }
        }
        self.expect(TokenKind::Rparen, "Expected ')' after parameters")?;
        let body = Rc::new(self.block()?);
        Ok(Stmt::Def {
            def_tok,
            name,
            params,
            body,
        })
    }

    fn return_stmt(&mut self, return_tok: Token) -> RafResult<Stmt> {
        if self.eat(TokenKind::Semi) {
            return Ok(Stmt::Return { return_tok, value: None });
        }
        let value = self.expression()?;
        self.expect(TokenKind::Semi, "Expected ';' after return value")?;
        Ok(Stmt::Return {
            return_tok,
            value: Some(value),
        })
    }

    // -------------------------
    // expressions (Pratt)
    // -------------------------

    fn expression(&mut self) -> RafResult<Expr> {
        self.parse_precedence(0)
    }

    fn parse_precedence(&mut self, min_prec: u8) -> RafResult<Expr> {
        let mut expr = self.prefix()?;

        loop {
            // call suffix: expr '(' args ')'
            if self.check(TokenKind::Lparen) {
                let lparen = self.advance();
                let mut args = Vec::new();
                if !self.check(TokenKind::Rparen) {
                    args.push(self.expression()?);
                    while self.eat(TokenKind::Comma) {
                        args.push(self.expression()?);
                    }
                }
                self.expect(TokenKind::Rparen, "Expected ')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    lparen,
                    args,
                };
                continue;
            }

            // index suffix: expr '[' expr ']'
            if self.check(TokenKind::Lbracket) {
                let lbracket = self.advance();
                let index = self.expression()?;
                self.expect(TokenKind::Rbracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    lbracket,
                    index: Box::new(index),
                };
                continue;
            }

            let Some(prec) = binary_precedence(self.peek().kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let op = self.advance();
            // +1 makes every binary level left-associative
            let right = self.parse_precedence(prec + 1)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn prefix(&mut self) -> RafResult<Expr> {
        if self.eat(TokenKind::Number) {
            let tok = self.prev().clone();
            if tok.lexeme.contains('.') {
                let value: f64 = tok
                    .lexeme
                    .parse()
                    .map_err(|_| RafError::parse(self.src, tok.line, tok.col, "Invalid number literal"))?;
                return Ok(Expr::Float { value, tok });
            }
            let value: i64 = tok
                .lexeme
                .parse()
                .map_err(|_| RafError::parse(self.src, tok.line, tok.col, "Number literal out of range"))?;
            return Ok(Expr::Int { value, tok });
        }

        if self.eat(TokenKind::String) {
            return Ok(Expr::Str { tok: self.prev().clone() });
        }
        if self.eat(TokenKind::True) {
            return Ok(Expr::Bool {
                value: true,
                tok: self.prev().clone(),
            });
        }
        if self.eat(TokenKind::False) {
            return Ok(Expr::Bool {
                value: false,
                tok: self.prev().clone(),
            });
        }
        if self.eat(TokenKind::None) {
            return Ok(Expr::NoneLit { tok: self.prev().clone() });
        }
        if self.eat(TokenKind::Ident) {
            return Ok(Expr::Var { tok: self.prev().clone() });
        }

        // list literal: [a, b, c]
        if self.eat(TokenKind::Lbracket) {
            let lbracket = self.prev().clone();
            let mut items = Vec::new();
            if !self.check(TokenKind::Rbracket) {
                items.push(self.expression()?);
                while self.eat(TokenKind::Comma) {
                    items.push(self.expression()?);
                }
            }
            self.expect(TokenKind::Rbracket, "Expected ']' after list literal")?;
            return Ok(Expr::List { lbracket, items });
        }

        if self.eat(TokenKind::Lparen) {
            let expr = self.expression()?;
            self.expect(TokenKind::Rparen, "Expected ')' after expression")?;
            return Ok(expr);
        }

        if self.eat(TokenKind::Minus) || self.eat(TokenKind::Not) {
            let op = self.prev().clone();
            let operand = self.parse_precedence(UNARY_PRECEDENCE)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        Err(self.error_at_peek(&format!("Expected expression, got {}", self.peek().kind)))
    }
}

/// Binary operator precedence, low to high. All levels are left-associative.
fn binary_precedence(kind: TokenKind) -> Option<u8> {
    Some(match kind {
        TokenKind::Or => 1,
        TokenKind::And => 2,
        TokenKind::Eqeq | TokenKind::Neq => 3,
        TokenKind::Lt | TokenKind::Lte | TokenKind::Gt | TokenKind::Gte => 4,
        TokenKind::Plus | TokenKind::Minus => 5,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 6,
        _ => return None,
    })
}
