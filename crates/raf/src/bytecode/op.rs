//! Opcode definitions.

use strum::Display;

/// The closed opcode set.
///
/// `Display` renders the conventional uppercase name (`JUMP_IF_FALSE`,
/// `MAKE_FUNC`, ...) used by the disassembler and in VM diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Opcode {
    /// Push `consts[a]`.
    Const,
    /// Pop the top of the stack.
    Pop,

    /// Push the value bound to the name `consts[a]` in the current
    /// environment chain.
    Load,
    /// Set (or define) the name `consts[a]` to the top of the stack.
    /// Peeks; does not pop — statement contexts emit a following `POP`.
    Store,
    /// Unconditionally bind the name `consts[a]` in the *current* frame to
    /// the top of the stack, shadowing any outer binding. Peeks like
    /// `STORE`. Emitted for `def`, which binds rather than assigns.
    Define,

    /// Negate the numeric top of the stack.
    Neg,
    /// Replace the top of the stack with the complement of its truthiness.
    Not,

    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,

    /// Unconditional relative jump by `a` (may be negative for loops).
    Jump,
    /// Relative jump by `a` when the top of the stack is falsy. Peeks.
    JumpIfFalse,
    /// Relative jump by `a` when the top of the stack is truthy. Peeks.
    JumpIfTrue,

    /// Pop the last `a` values and push them as a list.
    BuildList,
    /// Pop index then target, push `target[index]`.
    Index,

    /// Push a function built from the prototype `consts[a]`, capturing the
    /// current environment.
    MakeFunc,
    /// Call with `a` arguments: pops the arguments and the callee below
    /// them, then either pushes the result (builtin) or a new frame (user
    /// function).
    Call,
    /// Pop the return value, pop the current frame, push the value for the
    /// caller.
    Ret,

    /// Replace the current frame's environment with a fresh child.
    EnterScope,
    /// Restore the current frame's parent environment.
    ExitScope,

    /// Run the module named by the path constant `consts[a]` in the current
    /// environment (at most once per VM). Leaves the module's `none` on the
    /// stack for the following `POP`.
    Import,
}
