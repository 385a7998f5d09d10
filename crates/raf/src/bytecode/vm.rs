//! Virtual machine: executes a chunk with a value stack and a call-frame
//! stack.
//!
//! The top-level chunk runs in a synthetic frame whose environment is a
//! fresh child of the VM's globals. Each dispatch fetches the instruction
//! at the top frame's ip, advances the ip, then executes; a chunk that runs
//! off its end behaves as if it had returned `none`. Invariant violations
//! (stack underflow, malformed operands) surface as located runtime errors
//! rather than panics.

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::{
    builtins::Builtin,
    bytecode::{
        chunk::{Chunk, Const, Instr},
        compiler::Compiler,
        op::Opcode,
    },
    env::{Env, EnvRef},
    error::{RafError, RafResult},
    function::{Function, FunctionBody},
    imports::resolve_import_path,
    io::PrintWriter,
    lexer::lex,
    parse::parse,
    value::{self, CmpOp, Value},
};

/// One execution record: the running chunk, its instruction pointer, and
/// the environment for this invocation.
struct Frame {
    chunk: Rc<Chunk>,
    ip: usize,
    env: EnvRef,
}

/// The bytecode back end.
pub(crate) struct Vm {
    globals: EnvRef,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    imported: AHashSet<PathBuf>,
}

impl Vm {
    pub(crate) fn new() -> Self {
        let globals = Env::root();
        Builtin::install(&globals);
        Self {
            globals,
            stack: Vec::new(),
            frames: Vec::new(),
            imported: AHashSet::new(),
        }
    }

    /// Runs a top-level chunk to completion and returns the module result
    /// (`none` for a normal run).
    pub(crate) fn run(&mut self, chunk: &Rc<Chunk>, print: &mut impl PrintWriter) -> RafResult<Value> {
        self.stack.clear();
        self.frames.push(Frame {
            chunk: Rc::clone(chunk),
            ip: 0,
            env: Env::child(&self.globals),
        });

        loop {
            let (ins, chunk) = {
                let Some(frame) = self.frames.last_mut() else { break };
                if frame.ip >= frame.chunk.code.len() {
                    // no more instructions: behave as a `none` return
                    self.frames.pop();
                    self.stack.push(Value::None);
                    continue;
                }
                let ins = frame.chunk.code[frame.ip];
                frame.ip += 1;
                (ins, Rc::clone(&frame.chunk))
            };

            if let Err(err) = self.step(ins, &chunk, print) {
                self.frames.clear();
                return Err(locate_step_error(err, &chunk, ins));
            }
        }

        self.stack.pop().ok_or_else(|| RafError::runtime("Stack underflow"))
    }

    fn step(&mut self, ins: Instr, chunk: &Rc<Chunk>, print: &mut impl PrintWriter) -> RafResult<()> {
        match ins.op {
            Opcode::Const => {
                let Const::Value(value) = const_at(chunk, ins.a)? else {
                    return Err(RafError::runtime("CONST expects a value constant"));
                };
                self.stack.push(value.clone());
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Load => {
                let name = name_at(chunk, ins.a)?;
                let value = self
                    .env()
                    .borrow()
                    .get(name)
                    .ok_or_else(|| RafError::runtime(format!("Undefined variable '{name}'")))?;
                self.stack.push(value);
            }
            Opcode::Store => {
                let name = name_at(chunk, ins.a)?;
                let value = self.peek()?.clone();
                let env = self.env();
                if !env.borrow_mut().set(name, value.clone()) {
                    env.borrow_mut().define(name.to_owned(), value);
                }
            }
            Opcode::Define => {
                let name = name_at(chunk, ins.a)?;
                let value = self.peek()?.clone();
                self.env().borrow_mut().define(name.to_owned(), value);
            }
            Opcode::Neg => {
                let v = self.pop()?;
                self.stack.push(value::negate(&v)?);
            }
            Opcode::Not => {
                let v = self.pop()?;
                self.stack.push(Value::Bool(!v.truthy()));
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Lt
            | Opcode::Lte
            | Opcode::Gt
            | Opcode::Gte => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match ins.op {
                    Opcode::Add => value::add(&a, &b)?,
                    Opcode::Sub => value::sub(&a, &b)?,
                    Opcode::Mul => value::mul(&a, &b)?,
                    Opcode::Div => value::div(&a, &b)?,
                    Opcode::Mod => value::modulo(&a, &b)?,
                    Opcode::Eq => Value::Bool(a == b),
                    Opcode::Neq => Value::Bool(a != b),
                    Opcode::Lt => value::compare(CmpOp::Lt, &a, &b)?,
                    Opcode::Lte => value::compare(CmpOp::Lte, &a, &b)?,
                    Opcode::Gt => value::compare(CmpOp::Gt, &a, &b)?,
                    _ => value::compare(CmpOp::Gte, &a, &b)?,
                };
                self.stack.push(result);
            }
            Opcode::Jump => {
                self.jump(ins)?;
            }
            Opcode::JumpIfFalse => {
                if !self.peek()?.truthy() {
                    self.jump(ins)?;
                }
            }
            Opcode::JumpIfTrue => {
                if self.peek()?.truthy() {
                    self.jump(ins)?;
                }
            }
            Opcode::BuildList => {
                let n = count_operand(ins)?;
                if self.stack.len() < n {
                    return Err(RafError::runtime("Stack underflow"));
                }
                let items = self.stack.split_off(self.stack.len() - n);
                self.stack.push(Value::List(Rc::new(items)));
            }
            Opcode::Index => {
                let index = self.pop()?;
                let target = self.pop()?;
                self.stack.push(value::index(&target, &index)?);
            }
            Opcode::MakeFunc => {
                let Const::Proto(proto) = const_at(chunk, ins.a)? else {
                    return Err(RafError::runtime("MAKE_FUNC expects a function prototype"));
                };
                let func = Function {
                    name: proto.name.clone(),
                    params: proto.params.clone(),
                    body: FunctionBody::Chunk(Rc::clone(&proto.chunk)),
                    closure: self.env(),
                };
                self.stack.push(Value::Func(Rc::new(func)));
            }
            Opcode::Call => {
                let argc = count_operand(ins)?;
                if self.stack.len() < argc + 1 {
                    return Err(RafError::runtime("Stack underflow"));
                }
                let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(self.pop()?);
                }
                args.reverse();
                let callee = self.pop()?;
                self.call_value(&callee, &args, print)?;
            }
            Opcode::Ret => {
                let result = self.pop()?;
                self.frames.pop();
                self.stack.push(result);
            }
            Opcode::EnterScope => {
                let child = Env::child(&self.env());
                self.frame_mut().env = child;
            }
            Opcode::ExitScope => {
                let parent = self
                    .env()
                    .borrow()
                    .parent
                    .clone()
                    .ok_or_else(|| RafError::runtime("EXIT_SCOPE without an enclosing scope"))?;
                self.frame_mut().env = parent;
            }
            Opcode::Import => {
                self.exec_import(ins, chunk)?;
            }
        }
        Ok(())
    }

    /// Dispatches a call after the arguments and callee have been popped.
    ///
    /// Builtins run synchronously and push their result; user functions get
    /// an arity check, a fresh environment parented at their captured one,
    /// and a new frame starting at ip 0.
    fn call_value(&mut self, callee: &Value, args: &[Value], print: &mut impl PrintWriter) -> RafResult<()> {
        match callee {
            Value::Builtin(builtin) => {
                let result = builtin.call(args, print)?;
                self.stack.push(result);
            }
            Value::Func(func) => {
                let FunctionBody::Chunk(chunk) = &func.body else {
                    return Err(RafError::runtime("function body is not compiled"));
                };
                if args.len() != func.params.len() {
                    return Err(RafError::runtime(format!(
                        "{}() expected {} args, got {}",
                        func.name,
                        func.params.len(),
                        args.len()
                    )));
                }
                let env = Env::child(&func.closure);
                for (param, arg) in func.params.iter().zip(args) {
                    env.borrow_mut().define(param.clone(), arg.clone());
                }
                self.frames.push(Frame {
                    chunk: Rc::clone(chunk),
                    ip: 0,
                    env,
                });
            }
            _ => return Err(RafError::runtime("Can only call functions")),
        }
        Ok(())
    }

    /// Resolves, caches, compiles, and runs an imported module.
    ///
    /// A fresh import pushes a frame executing the module chunk in the
    /// current environment; its implicit `none` return feeds the `POP`
    /// emitted after `IMPORT`. A cached path pushes `none` directly.
    fn exec_import(&mut self, ins: Instr, chunk: &Rc<Chunk>) -> RafResult<()> {
        let Const::Value(Value::Str(path_str)) = const_at(chunk, ins.a)? else {
            return Err(RafError::runtime("IMPORT expects a string path constant"));
        };
        let path_str = Rc::clone(path_str);
        let full_path = resolve_import_path(chunk.base_dir.as_deref(), Path::new(&*path_str))?;
        if self.imported.contains(&full_path) {
            self.stack.push(Value::None);
            return Ok(());
        }
        if !full_path.exists() {
            return Err(RafError::runtime(format!("Import not found: {path_str}")));
        }
        let module_src = fs::read_to_string(&full_path)
            .map_err(|err| RafError::runtime(format!("Failed to read import {path_str}: {err}")))?;
        self.imported.insert(full_path.clone());

        let module_src: Rc<str> = module_src.into();
        let tokens = lex(&module_src)?;
        let program = parse(tokens, &module_src)?;
        let module_chunk = Compiler::compile(&program, "<module>", &module_src, full_path.parent());

        let env = self.env();
        self.frames.push(Frame {
            chunk: module_chunk,
            ip: 0,
            env,
        });
        Ok(())
    }

    fn jump(&mut self, ins: Instr) -> RafResult<()> {
        let delta = operand(ins)?;
        let frame = self.frame_mut();
        // the ip has already advanced past the jump instruction
        let target = frame.ip as i64 + i64::from(delta);
        if target < 0 {
            return Err(RafError::runtime("jump target out of range"));
        }
        frame.ip = target as usize;
        Ok(())
    }

    fn pop(&mut self) -> RafResult<Value> {
        self.stack.pop().ok_or_else(|| RafError::runtime("Stack underflow"))
    }

    fn peek(&self) -> RafResult<&Value> {
        self.stack.last().ok_or_else(|| RafError::runtime("Stack underflow"))
    }

    /// The current frame's environment.
    fn env(&self) -> EnvRef {
        Rc::clone(&self.frames.last().expect("the frame stack is never empty during dispatch").env)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("the frame stack is never empty during dispatch")
    }
}

/// Attaches the failing instruction's source position to an unlocated
/// error. Synthetic instructions (`0:0`) leave the error as-is.
fn locate_step_error(err: RafError, chunk: &Chunk, ins: Instr) -> RafError {
    if ins.line != 0 || ins.col != 0 {
        err.locate(&chunk.src, ins.line, ins.col, &[])
    } else {
        err
    }
}

fn operand(ins: Instr) -> RafResult<i32> {
    ins.a
        .ok_or_else(|| RafError::runtime(format!("{} missing operand", ins.op)))
}

/// An operand that must be a non-negative element count.
fn count_operand(ins: Instr) -> RafResult<usize> {
    usize::try_from(operand(ins)?).map_err(|_| RafError::runtime(format!("{} operand out of range", ins.op)))
}

fn const_at(chunk: &Chunk, a: Option<i32>) -> RafResult<&Const> {
    let idx = a.ok_or_else(|| RafError::runtime("missing constant operand"))?;
    usize::try_from(idx)
        .ok()
        .and_then(|i| chunk.consts.get(i))
        .ok_or_else(|| RafError::runtime("constant index out of range"))
}

fn name_at(chunk: &Chunk, a: Option<i32>) -> RafResult<&str> {
    match const_at(chunk, a)? {
        Const::Name(name) => Ok(name),
        _ => Err(RafError::runtime("expected a name constant")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::io::CollectStringPrint;

    fn run_source(src: &str) -> RafResult<(Value, String)> {
        let src: Rc<str> = src.into();
        let program = parse(lex(&src).unwrap(), &src).unwrap();
        let chunk = Compiler::compile(&program, "<module>", &src, None);
        let mut vm = Vm::new();
        let mut print = CollectStringPrint::new();
        let value = vm.run(&chunk, &mut print)?;
        Ok((value, print.into_output()))
    }

    #[test]
    fn module_returns_none() {
        let (value, out) = run_source("x = 1; print(x);").unwrap();
        assert_eq!(value, Value::None);
        assert_eq!(out, "1\n");
    }

    #[test]
    fn chunk_without_ret_yields_none() {
        let chunk = Rc::new(Chunk::new("<test>", "".into(), None));
        let mut vm = Vm::new();
        let value = vm.run(&chunk, &mut CollectStringPrint::new()).unwrap();
        assert_eq!(value, Value::None);
    }

    #[test]
    fn stack_underflow_is_reported_not_panicked() {
        let mut chunk = Chunk::new("<test>", "".into(), None);
        chunk.emit(Opcode::Pop, None, None, 0, 0);
        let err = Vm::new().run(&Rc::new(chunk), &mut CollectStringPrint::new()).unwrap_err();
        assert!(err.message().contains("Stack underflow"));
    }

    #[test]
    fn constant_index_out_of_range_is_reported() {
        let mut chunk = Chunk::new("<test>", "".into(), None);
        chunk.emit(Opcode::Const, Some(3), None, 0, 0);
        let err = Vm::new().run(&Rc::new(chunk), &mut CollectStringPrint::new()).unwrap_err();
        assert!(err.message().contains("constant index out of range"));
    }

    #[test]
    fn block_scopes_match_the_tree_walker() {
        // a variable defined in a block is gone after the block exits
        let err = run_source("if (true) { y = 1; } print(y);").unwrap_err();
        assert!(err.message().contains("Undefined variable 'y'"));
        // but assignment to an outer binding writes through
        let (_, out) = run_source("x = 1; if (true) { x = 2; } print(x);").unwrap();
        assert_eq!(out, "2\n");
    }

    #[test]
    fn vm_errors_carry_instruction_location() {
        let err = run_source("x = 1;\nprint(missing);").unwrap_err();
        assert!(err.message().contains("[line 2, col 7] Undefined variable 'missing'"));
    }
}
