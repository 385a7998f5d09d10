//! Tree-walking evaluator: executes a parsed program over the runtime
//! model, with lexical scoping, closures, a call-stack trace, and the
//! module import mechanism.

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use ahash::AHashSet;

use crate::{
    ast::{Block, Expr, Stmt},
    builtins::Builtin,
    env::{Env, EnvRef},
    error::{RafError, RafResult, TraceFrame},
    function::{Function, FunctionBody},
    imports::resolve_import_path,
    io::PrintWriter,
    lexer::lex,
    parse::parse,
    token::{Token, TokenKind},
    value::{self, CmpOp, Value},
};

/// Statement outcome: either fall through or unwind a `return` toward the
/// nearest function-call boundary.
///
/// The return signal is not observable from language-level code; it is
/// intercepted exactly at the call boundary in [`Interpreter::call_value`].
enum Exec {
    Normal,
    Return(Value),
}

/// The tree-walking back end.
///
/// Holds the root environment (pre-populated with builtins), the current
/// source text and base directory for diagnostics and import resolution,
/// the call-stack trace, and the set of already-imported absolute paths.
pub(crate) struct Interpreter {
    src: Rc<str>,
    base_dir: Option<PathBuf>,
    globals: EnvRef,
    frames: Vec<TraceFrame>,
    imported: AHashSet<PathBuf>,
}

impl Interpreter {
    pub(crate) fn new(src: Rc<str>, base_dir: Option<PathBuf>) -> Self {
        let globals = Env::root();
        Builtin::install(&globals);
        Self {
            src,
            base_dir,
            globals,
            frames: Vec::new(),
            imported: AHashSet::new(),
        }
    }

    /// Replaces the source used for diagnostics. The REPL calls this before
    /// each submitted snippet.
    pub(crate) fn set_source(&mut self, src: Rc<str>) {
        self.src = src;
    }

    pub(crate) fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Executes a program in the root environment.
    pub(crate) fn run(&mut self, program: &[Stmt], print: &mut impl PrintWriter) -> RafResult<()> {
        let globals = Rc::clone(&self.globals);
        self.run_in_env(program, &globals, print)
    }

    /// Executes a program in a caller-supplied environment (REPL sessions,
    /// imported modules).
    ///
    /// A `return` at the top level ends the module early; its value is the
    /// module result and is not observable from language-level code.
    pub(crate) fn run_in_env(
        &mut self,
        program: &[Stmt],
        env: &EnvRef,
        print: &mut impl PrintWriter,
    ) -> RafResult<()> {
        for stmt in program {
            match self.exec_stmt(stmt, env, print)? {
                Exec::Normal => {}
                Exec::Return(_) => break,
            }
        }
        Ok(())
    }

    // -------------------------
    // statements
    // -------------------------

    fn exec_block(&mut self, block: &Block, env: &EnvRef, print: &mut impl PrintWriter) -> RafResult<Exec> {
        for stmt in &block.statements {
            match self.exec_stmt(stmt, env, print)? {
                Exec::Normal => {}
                ret @ Exec::Return(_) => return Ok(ret),
            }
        }
        Ok(Exec::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef, print: &mut impl PrintWriter) -> RafResult<Exec> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval_expr(expr, env, print)?;
                Ok(Exec::Normal)
            }
            Stmt::Assign { name, value } => {
                let value = self.eval_expr(value, env, print)?;
                // update an existing binding in any enclosing scope,
                // otherwise define locally
                if !env.borrow_mut().set(&name.lexeme, value.clone()) {
                    env.borrow_mut().define(name.lexeme.clone(), value);
                }
                Ok(Exec::Normal)
            }
            Stmt::Import { path_tok } => {
                self.exec_import(path_tok, env, print)
                    .map_err(|e| self.locate(e, path_tok))?;
                Ok(Exec::Normal)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(cond, env, print)?.truthy() {
                    self.exec_block(then_branch, &Env::child(env), print)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch, &Env::child(env), print)
                } else {
                    Ok(Exec::Normal)
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval_expr(cond, env, print)?.truthy() {
                    match self.exec_block(body, &Env::child(env), print)? {
                        Exec::Normal => {}
                        ret @ Exec::Return(_) => return Ok(ret),
                    }
                }
                Ok(Exec::Normal)
            }
            Stmt::Def { name, params, body, .. } => {
                let func = Function {
                    name: name.lexeme.clone(),
                    params: params.iter().map(|p| p.lexeme.clone()).collect(),
                    body: FunctionBody::Block(Rc::clone(body)),
                    closure: Rc::clone(env),
                };
                env.borrow_mut().define(name.lexeme.clone(), Value::Func(Rc::new(func)));
                Ok(Exec::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env, print)?,
                    None => Value::None,
                };
                Ok(Exec::Return(value))
            }
        }
    }

    /// Resolves, caches, and executes an imported module in the current
    /// environment.
    ///
    /// Resolution is relative to the importing module's base directory;
    /// absolute paths are used verbatim. A path already in the imported set
    /// is a no-op, which also breaks import cycles. While the module runs,
    /// the interpreter's source and base directory are swapped so its
    /// diagnostics and nested imports resolve against the right module.
    fn exec_import(&mut self, path_tok: &Token, env: &EnvRef, print: &mut impl PrintWriter) -> RafResult<()> {
        let full_path = resolve_import_path(self.base_dir.as_deref(), Path::new(&path_tok.lexeme))?;
        if self.imported.contains(&full_path) {
            return Ok(());
        }
        if !full_path.exists() {
            return Err(RafError::runtime(format!("Import not found: {}", path_tok.lexeme)));
        }
        let module_src = fs::read_to_string(&full_path)
            .map_err(|err| RafError::runtime(format!("Failed to read import {}: {err}", path_tok.lexeme)))?;
        self.imported.insert(full_path.clone());

        let module_src: Rc<str> = module_src.into();
        let tokens = lex(&module_src)?;
        let program = parse(tokens, &module_src)?;

        let prev_src = std::mem::replace(&mut self.src, module_src);
        let prev_base = std::mem::replace(&mut self.base_dir, full_path.parent().map(Path::to_path_buf));

        let mut result = Ok(());
        for stmt in &program {
            match self.exec_stmt(stmt, env, print) {
                // a top-level return ends the imported module early
                Ok(Exec::Normal) => {}
                Ok(Exec::Return(_)) => break,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.src = prev_src;
        self.base_dir = prev_base;
        result
    }

    // -------------------------
    // expressions
    // -------------------------

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef, print: &mut impl PrintWriter) -> RafResult<Value> {
        match expr {
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::Str { tok } => Ok(Value::Str(tok.lexeme.as_str().into())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::NoneLit { .. } => Ok(Value::None),
            Expr::Var { tok } => env
                .borrow()
                .get(&tok.lexeme)
                .ok_or_else(|| self.locate(RafError::runtime(format!("Undefined variable '{}'", tok.lexeme)), tok)),
            Expr::List { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env, print)?);
                }
                Ok(Value::List(Rc::new(values)))
            }
            Expr::Index { target, lbracket, index } => {
                let target = self.eval_expr(target, env, print)?;
                let index = self.eval_expr(index, env, print)?;
                value::index(&target, &index).map_err(|e| self.locate(e, lbracket))
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand, env, print)?;
                let result = match op.kind {
                    TokenKind::Minus => value::negate(&operand),
                    TokenKind::Not => Ok(Value::Bool(!operand.truthy())),
                    _ => Err(RafError::runtime(format!("Unknown unary operator {}", op.lexeme))),
                };
                result.map_err(|e| self.locate(e, op))
            }
            Expr::Binary { left, op, right } => {
                // short-circuit and/or keep the operand value itself, not a
                // coerced boolean
                if op.kind == TokenKind::And {
                    let left = self.eval_expr(left, env, print)?;
                    return if left.truthy() {
                        self.eval_expr(right, env, print)
                    } else {
                        Ok(left)
                    };
                }
                if op.kind == TokenKind::Or {
                    let left = self.eval_expr(left, env, print)?;
                    return if left.truthy() {
                        Ok(left)
                    } else {
                        self.eval_expr(right, env, print)
                    };
                }

                let left = self.eval_expr(left, env, print)?;
                let right = self.eval_expr(right, env, print)?;
                let result = match op.kind {
                    TokenKind::Plus => value::add(&left, &right),
                    TokenKind::Minus => value::sub(&left, &right),
                    TokenKind::Star => value::mul(&left, &right),
                    TokenKind::Slash => value::div(&left, &right),
                    TokenKind::Percent => value::modulo(&left, &right),
                    TokenKind::Eqeq => Ok(Value::Bool(left == right)),
                    TokenKind::Neq => Ok(Value::Bool(left != right)),
                    TokenKind::Lt => value::compare(CmpOp::Lt, &left, &right),
                    TokenKind::Lte => value::compare(CmpOp::Lte, &left, &right),
                    TokenKind::Gt => value::compare(CmpOp::Gt, &left, &right),
                    TokenKind::Gte => value::compare(CmpOp::Gte, &left, &right),
                    _ => Err(RafError::runtime(format!("Unknown operator {}", op.lexeme))),
                };
                result.map_err(|e| self.locate(e, op))
            }
            Expr::Call { callee, lparen, args } => {
                let callee = self.eval_expr(callee, env, print)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, env, print)?);
                }
                self.call_value(&callee, values, lparen, print)
            }
        }
    }

    /// Dispatches a call after callee and arguments are evaluated.
    ///
    /// User-function calls push a trace frame recording the callee name and
    /// call site; the frame is popped whether the body succeeds or fails,
    /// but errors raised inside the body capture the trace while it is
    /// still intact.
    fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        lparen: &Token,
        print: &mut impl PrintWriter,
    ) -> RafResult<Value> {
        match callee {
            Value::Builtin(builtin) => builtin.call(&args, print).map_err(|e| self.locate(e, lparen)),
            Value::Func(func) => {
                let FunctionBody::Block(body) = &func.body else {
                    return Err(self.locate(RafError::runtime("function body is not evaluable"), lparen));
                };
                if args.len() != func.params.len() {
                    return Err(self.locate(
                        RafError::runtime(format!(
                            "{}() expected {} args, got {}",
                            func.name,
                            func.params.len(),
                            args.len()
                        )),
                        lparen,
                    ));
                }
                let local = Env::child(&func.closure);
                for (param, arg) in func.params.iter().zip(args) {
                    local.borrow_mut().define(param.clone(), arg);
                }

                self.frames.push(TraceFrame {
                    name: func.name.clone(),
                    line: lparen.line,
                    col: lparen.col,
                });
                let result = self.exec_block(body, &local, print);
                self.frames.pop();

                match result? {
                    Exec::Return(value) => Ok(value),
                    Exec::Normal => Ok(Value::None),
                }
            }
            _ => Err(self.locate(RafError::runtime("Can only call functions"), lparen)),
        }
    }

    fn locate(&self, err: RafError, tok: &Token) -> RafError {
        err.locate(&self.src, tok.line, tok.col, &self.frames)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::io::CollectStringPrint;

    fn run_source(src: &str) -> RafResult<String> {
        let src: Rc<str> = src.into();
        let tokens = lex(&src)?;
        let program = parse(tokens, &src)?;
        let mut interp = Interpreter::new(Rc::clone(&src), None);
        let mut print = CollectStringPrint::new();
        interp.run(&program, &mut print)?;
        Ok(print.into_output())
    }

    #[test]
    fn top_level_return_ends_the_module() {
        let out = run_source("print(1); return; print(2);").unwrap();
        assert_eq!(out, "1\n");
    }

    #[test]
    fn block_scope_does_not_leak() {
        let err = run_source("if (true) { y = 1; } print(y);").unwrap_err();
        assert!(err.message().contains("Undefined variable 'y'"));
    }

    #[test]
    fn assignment_updates_enclosing_scope() {
        let out = run_source("x = 1; if (true) { x = 2; } print(x);").unwrap();
        assert_eq!(out, "2\n");
    }

    #[test]
    fn undefined_variable_reports_location() {
        let err = run_source("x = missing;").unwrap_err();
        assert!(err.message().contains("[line 1, col 5] Undefined variable 'missing'"));
    }
}
