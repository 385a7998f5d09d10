//! User-defined functions.
//!
//! Both back ends share one function type; only the body representation
//! differs. A function holds the environment that was active at its `def`,
//! so captured bindings stay live (and stay shared) after the defining
//! scope exits.

use std::{fmt, rc::Rc};

use crate::{ast::Block, bytecode::Chunk, env::EnvRef};

/// A user-defined function value.
pub(crate) struct Function {
    pub name: String,
    /// Parameter names, order-significant; arity is `params.len()`.
    pub params: Vec<String>,
    pub body: FunctionBody,
    /// The environment captured at `def` time. This is a reference, not a
    /// copy: later mutation of captured bindings is visible inside the
    /// function.
    pub closure: EnvRef,
}

/// The executable body of a function, per back end.
pub(crate) enum FunctionBody {
    /// AST body, executed by the tree-walking evaluator.
    Block(Rc<Block>),
    /// Compiled chunk, executed by the VM.
    Chunk(Rc<Chunk>),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the closure chain can be cyclic through this function's own
        // binding, so never derive Debug into it
        write!(f, "<fn {}>", self.name)
    }
}
