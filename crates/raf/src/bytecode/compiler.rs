//! Compiler: lowers a parsed program to a chunk.
//!
//! Nested `def`s recursively compile into their own chunks, installed in
//! the enclosing pool as function prototypes. Jumps are emitted with a
//! placeholder displacement and patched once the target is known; the
//! encoding is relative, `delta = target_ip - (jump_ip + 1)`.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    ast::{Block, Expr, Stmt},
    bytecode::{
        chunk::{Chunk, Const, Proto},
        op::Opcode,
    },
    token::{Token, TokenKind},
    value::Value,
};

pub(crate) struct Compiler {
    chunk: Chunk,
}

impl Compiler {
    /// Compiles a program into a module-level chunk ending with an implicit
    /// `none` return.
    pub(crate) fn compile(program: &[Stmt], name: &str, src: &Rc<str>, base_dir: Option<&Path>) -> Rc<Chunk> {
        let mut compiler = Self::new(name, Rc::clone(src), base_dir.map(Path::to_path_buf));
        for stmt in program {
            compiler.stmt(stmt);
        }
        compiler.emit_implicit_return();
        Rc::new(compiler.chunk)
    }

    fn new(name: impl Into<String>, src: Rc<str>, base_dir: Option<PathBuf>) -> Self {
        Self {
            chunk: Chunk::new(name, src, base_dir),
        }
    }

    fn emit_implicit_return(&mut self) {
        let k = self.konst(Value::None);
        self.chunk.emit(Opcode::Const, Some(k), None, 0, 0);
        self.chunk.emit(Opcode::Ret, None, None, 0, 0);
    }

    // ---------- helpers ----------

    fn konst(&mut self, value: Value) -> i32 {
        self.chunk.add_const(Const::Value(value)) as i32
    }

    fn name(&mut self, name: &str) -> i32 {
        self.chunk.add_const(Const::Name(name.into())) as i32
    }

    fn emit(&mut self, op: Opcode, tok: &Token) {
        self.chunk.emit(op, None, None, tok.line, tok.col);
    }

    /// Emits a synthetic instruction with no source position.
    fn emit_plain(&mut self, op: Opcode) {
        self.chunk.emit(op, None, None, 0, 0);
    }

    fn emit_a(&mut self, op: Opcode, a: i32, tok: &Token) {
        self.chunk.emit(op, Some(a), None, tok.line, tok.col);
    }

    /// Emits a jump with a placeholder displacement; patch later.
    fn emit_jump(&mut self, op: Opcode, tok: &Token) -> usize {
        self.chunk.emit(op, Some(0), None, tok.line, tok.col)
    }

    fn patch_jump_to_here(&mut self, jump_ip: usize) {
        let target = self.chunk.code.len() as i32;
        self.chunk.patch_a(jump_ip, target - (jump_ip as i32 + 1));
    }

    fn emit_loop(&mut self, loop_start: usize, tok: &Token) {
        let current = self.chunk.code.len() as i32;
        self.chunk
            .emit(Opcode::Jump, Some(loop_start as i32 - (current + 1)), None, tok.line, tok.col);
    }

    /// Compiles a block bracketed by scope opcodes, so the VM mirrors the
    /// tree-walker's fresh child environment per block.
    fn block(&mut self, block: &Block) {
        self.emit(Opcode::EnterScope, &block.lbrace);
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.emit(Opcode::ExitScope, &block.lbrace);
    }

    // ---------- statements ----------

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(expr);
                self.emit_plain(Opcode::Pop);
            }
            Stmt::Assign { name, value } => {
                self.expr(value);
                let name_idx = self.name(&name.lexeme);
                self.emit_a(Opcode::Store, name_idx, name);
                // STORE peeks; discard the stored value in statement position
                self.emit_plain(Opcode::Pop);
            }
            Stmt::Import { path_tok } => {
                let k = self.konst(Value::Str(path_tok.lexeme.as_str().into()));
                self.emit_a(Opcode::Import, k, path_tok);
                // discard the imported module's implicit none
                self.emit_plain(Opcode::Pop);
            }
            Stmt::If {
                if_tok,
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                let jump_if_false = self.emit_jump(Opcode::JumpIfFalse, if_tok);

                // true path pops the condition
                self.emit_plain(Opcode::Pop);
                self.block(then_branch);
                let jump_end = self.emit_jump(Opcode::Jump, if_tok);

                // false path pops the condition
                self.patch_jump_to_here(jump_if_false);
                self.emit_plain(Opcode::Pop);
                if let Some(else_branch) = else_branch {
                    self.block(else_branch);
                }
                self.patch_jump_to_here(jump_end);
            }
            Stmt::While { while_tok, cond, body } => {
                let loop_start = self.chunk.code.len();
                self.expr(cond);
                let jump_if_false = self.emit_jump(Opcode::JumpIfFalse, while_tok);

                self.emit_plain(Opcode::Pop);
                self.block(body);
                self.emit_loop(loop_start, while_tok);

                self.patch_jump_to_here(jump_if_false);
                self.emit_plain(Opcode::Pop);
            }
            Stmt::Return { return_tok, value } => {
                match value {
                    Some(expr) => self.expr(expr),
                    None => {
                        let k = self.konst(Value::None);
                        self.emit_a(Opcode::Const, k, return_tok);
                    }
                }
                self.emit(Opcode::Ret, return_tok);
            }
            Stmt::Def {
                def_tok,
                name,
                params,
                body,
            } => {
                // function bodies compile into their own chunk; CALL creates
                // the parameter environment, so no scope opcodes here
                let mut func_compiler = Self::new(
                    format!("<fn {}>", name.lexeme),
                    Rc::clone(&self.chunk.src),
                    self.chunk.base_dir.clone(),
                );
                for stmt in &body.statements {
                    func_compiler.stmt(stmt);
                }
                func_compiler.emit_implicit_return();

                let proto = Proto {
                    name: name.lexeme.clone(),
                    params: params.iter().map(|p| p.lexeme.clone()).collect(),
                    chunk: Rc::new(func_compiler.chunk),
                };
                let proto_idx = self.chunk.add_const(Const::Proto(Rc::new(proto))) as i32;
                self.emit_a(Opcode::MakeFunc, proto_idx, def_tok);
                // def binds in the current frame (DEFINE), unlike assignment,
                // which writes through to enclosing scopes (STORE)
                let name_idx = self.name(&name.lexeme);
                self.emit_a(Opcode::Define, name_idx, name);
                self.emit_plain(Opcode::Pop);
            }
        }
    }

    // ---------- expressions ----------

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int { value, tok } => {
                let k = self.konst(Value::Int(*value));
                self.emit_a(Opcode::Const, k, tok);
            }
            Expr::Float { value, tok } => {
                let k = self.konst(Value::Float(*value));
                self.emit_a(Opcode::Const, k, tok);
            }
            Expr::Str { tok } => {
                let k = self.konst(Value::Str(tok.lexeme.as_str().into()));
                self.emit_a(Opcode::Const, k, tok);
            }
            Expr::Bool { value, tok } => {
                let k = self.konst(Value::Bool(*value));
                self.emit_a(Opcode::Const, k, tok);
            }
            Expr::NoneLit { tok } => {
                let k = self.konst(Value::None);
                self.emit_a(Opcode::Const, k, tok);
            }
            Expr::Var { tok } => {
                let name_idx = self.name(&tok.lexeme);
                self.emit_a(Opcode::Load, name_idx, tok);
            }
            Expr::List { lbracket, items } => {
                for item in items {
                    self.expr(item);
                }
                self.emit_a(Opcode::BuildList, items.len() as i32, lbracket);
            }
            Expr::Index { target, lbracket, index } => {
                self.expr(target);
                self.expr(index);
                self.emit(Opcode::Index, lbracket);
            }
            Expr::Unary { op, operand } => {
                self.expr(operand);
                match op.kind {
                    TokenKind::Not => self.emit(Opcode::Not, op),
                    _ => self.emit(Opcode::Neg, op),
                }
            }
            Expr::Binary { left, op, right } => {
                // short-circuit forms peek-jump over the right operand so
                // the left value itself survives as the result
                if op.kind == TokenKind::And {
                    self.expr(left);
                    let jump = self.emit_jump(Opcode::JumpIfFalse, op);
                    self.emit_plain(Opcode::Pop);
                    self.expr(right);
                    self.patch_jump_to_here(jump);
                    return;
                }
                if op.kind == TokenKind::Or {
                    self.expr(left);
                    let jump = self.emit_jump(Opcode::JumpIfTrue, op);
                    self.emit_plain(Opcode::Pop);
                    self.expr(right);
                    self.patch_jump_to_here(jump);
                    return;
                }

                self.expr(left);
                self.expr(right);
                let opcode = match op.kind {
                    TokenKind::Plus => Opcode::Add,
                    TokenKind::Minus => Opcode::Sub,
                    TokenKind::Star => Opcode::Mul,
                    TokenKind::Slash => Opcode::Div,
                    TokenKind::Percent => Opcode::Mod,
                    TokenKind::Eqeq => Opcode::Eq,
                    TokenKind::Neq => Opcode::Neq,
                    TokenKind::Lt => Opcode::Lt,
                    TokenKind::Lte => Opcode::Lte,
                    TokenKind::Gt => Opcode::Gt,
                    _ => Opcode::Gte,
                };
                self.emit(opcode, op);
            }
            Expr::Call { callee, lparen, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
                self.emit_a(Opcode::Call, args.len() as i32, lparen);
            }
        }
    }
}
