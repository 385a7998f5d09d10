//! Built-in functions, pre-populated in the root environment before the
//! first user statement runs. Each builtin has its own submodule.
//!
//! Both back ends dispatch through the same [`Builtin::call`], which keeps
//! the equivalence property between them meaningful.

mod len;
mod print;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    env::EnvRef,
    error::RafResult,
    io::PrintWriter,
    value::Value,
};

/// Enumerates every built-in function.
///
/// Variants serialize to their language-level names (`Print` -> "print").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Builtin {
    Print,
    Len,
}

impl Builtin {
    const ALL: [Self; 2] = [Self::Print, Self::Len];

    /// Calls this builtin with already-evaluated arguments.
    pub(crate) fn call(self, args: &[Value], print: &mut impl PrintWriter) -> RafResult<Value> {
        match self {
            Self::Print => print::builtin_print(args, print),
            Self::Len => len::builtin_len(args),
        }
    }

    /// Defines every builtin in the given (root) environment.
    pub(crate) fn install(env: &EnvRef) {
        for builtin in Self::ALL {
            env.borrow_mut().define(builtin.to_string(), Value::Builtin(builtin));
        }
    }
}
