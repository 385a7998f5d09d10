#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "operand narrowing is bounded by chunk sizes")]
#![expect(clippy::cast_possible_wrap, reason = "pool and code indices stay far below i32::MAX")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are range-checked first")]

mod ast;
mod builtins;
mod bytecode;
mod env;
mod error;
mod function;
mod imports;
mod interp;
mod io;
mod lexer;
mod parse;
mod repl;
mod run;
mod token;
mod value;

pub use crate::{
    error::{ErrorKind, RafError, RafResult, format_error},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    repl::ReplSession,
    run::{Backend, Runner},
};
