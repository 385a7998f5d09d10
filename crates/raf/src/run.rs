//! Public interface for running raf code.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    ast::Stmt,
    bytecode::{Compiler, Vm, disassemble},
    error::RafResult,
    interp::Interpreter,
    io::PrintWriter,
    lexer::lex,
    parse::parse,
};

/// Which back end executes the program. Both must produce identical
/// observable output for every valid program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Tree-walking evaluator over the AST.
    #[default]
    Tree,
    /// Bytecode compiler plus stack-based virtual machine.
    Vm,
}

/// Primary interface for running raf code.
///
/// Construction lexes and parses the source once; `run` executes through
/// either back end and `disassemble` renders the compiled bytecode. Import
/// paths inside the program resolve relative to the script's directory.
///
/// # Example
/// ```
/// use raf::{Backend, CollectStringPrint, Runner};
///
/// let runner = Runner::new("print(2 + 5);", "example.raf").unwrap();
/// let mut print = CollectStringPrint::new();
/// runner.run(Backend::Tree, &mut print).unwrap();
/// assert_eq!(print.output(), "7\n");
/// ```
#[derive(Debug)]
pub struct Runner {
    src: Rc<str>,
    base_dir: Option<PathBuf>,
    program: Vec<Stmt>,
}

impl Runner {
    /// Parses the given source. `script_path` is used for diagnostics
    /// context and as the base directory for imports.
    ///
    /// # Errors
    /// Returns a lex or parse error if the source is malformed.
    pub fn new(source: &str, script_path: &str) -> RafResult<Self> {
        let src: Rc<str> = source.into();
        let tokens = lex(&src)?;
        let program = parse(tokens, &src)?;
        let base_dir = Path::new(script_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        Ok(Self { src, base_dir, program })
    }

    /// Executes the program via the chosen back end, writing `print` output
    /// through the given writer.
    ///
    /// # Errors
    /// Returns a runtime error (located, with a stack trace from the tree
    /// back end) if execution fails.
    pub fn run(&self, backend: Backend, print: &mut impl PrintWriter) -> RafResult<()> {
        match backend {
            Backend::Tree => {
                let mut interp = Interpreter::new(Rc::clone(&self.src), self.base_dir.clone());
                interp.run(&self.program, print)
            }
            Backend::Vm => {
                let chunk = Compiler::compile(&self.program, "<module>", &self.src, self.base_dir.as_deref());
                let mut vm = Vm::new();
                vm.run(&chunk, print).map(|_| ())
            }
        }
    }

    /// Compiles the program and renders the bytecode listing, including
    /// nested function chunks.
    #[must_use]
    pub fn disassemble(&self) -> String {
        let chunk = Compiler::compile(&self.program, "<module>", &self.src, self.base_dir.as_deref());
        disassemble(&chunk)
    }
}
