//! Persistent REPL session support.
//!
//! `ReplSession` keeps interpreter state across `execute()` calls so
//! interactive snippets share variables and functions. The session
//! environment is a child of the interpreter's globals, matching how the
//! driver's `run` command behaves while letting builtins stay in the root
//! frame.

use std::rc::Rc;

use crate::{
    env::{Env, EnvRef},
    error::RafResult,
    interp::Interpreter,
    io::PrintWriter,
    lexer::lex,
    parse::parse,
};

/// A persistent interactive session over the tree-walking back end.
pub struct ReplSession {
    interp: Interpreter,
    env: EnvRef,
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        let interp = Interpreter::new("".into(), None);
        let env = Env::child(interp.globals());
        Self { interp, env }
    }

    /// Lexes, parses, and executes one submitted snippet in the session
    /// environment.
    ///
    /// On error the session stays usable; bindings made by statements that
    /// ran before the failure are kept, as in the reference line protocol.
    ///
    /// # Errors
    /// Returns lex, parse, or runtime errors from the snippet.
    pub fn execute(&mut self, source: &str, print: &mut impl PrintWriter) -> RafResult<()> {
        let src: Rc<str> = source.into();
        let tokens = lex(&src)?;
        let program = parse(tokens, &src)?;
        self.interp.set_source(src);
        self.interp.run_in_env(&program, &self.env, print)
    }
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::io::CollectStringPrint;

    #[test]
    fn bindings_persist_across_snippets() {
        let mut session = ReplSession::new();
        let mut out = CollectStringPrint::new();
        session.execute("x = 41;", &mut out).unwrap();
        session.execute("def next(n) { return n + 1; }", &mut out).unwrap();
        session.execute("print(next(x));", &mut out).unwrap();
        assert_eq!(out.output(), "42\n");
    }

    #[test]
    fn errors_leave_the_session_usable() {
        let mut session = ReplSession::new();
        let mut out = CollectStringPrint::new();
        session.execute("x = 1;", &mut out).unwrap();
        assert!(session.execute("print(missing);", &mut out).is_err());
        session.execute("print(x);", &mut out).unwrap();
        assert_eq!(out.output(), "1\n");
    }
}
