//! Diagnostics: error kinds, source-located messages, and stack traces.
//!
//! Errors are *located once*. Lex and parse errors are formatted against the
//! source at the point of creation. Runtime errors start out as a bare
//! message; the first enclosing AST node (tree-walker) or instruction (VM)
//! with a source position rewrites the message through [`format_error`] and
//! marks the error located, after which outer layers pass it through
//! untouched.

use std::fmt;

use strum::{Display, IntoStaticStr};

/// Result type alias for operations that can produce a language error.
pub type RafResult<T> = Result<T, RafError>;

/// The three failure classes of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ErrorKind {
    /// Malformed token: unterminated string, unexpected character.
    Lex,
    /// Unexpected token: missing separators, unmatched braces/brackets/parens.
    Parse,
    /// Any failure while executing: undefined variable, type mismatch,
    /// arity mismatch, bad index, import failure, VM invariant violation.
    Runtime,
}

/// One call-stack entry recorded by the tree-walking evaluator.
///
/// `line`/`col` are the call site (the opening paren of the call), not the
/// callee's definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub name: String,
    pub line: u32,
    pub col: u32,
}

/// An error from any stage of the pipeline.
///
/// `Display` renders the full human-readable diagnostic, including the caret
/// snippet and stack trace once the error has been located.
#[derive(Debug, Clone)]
pub struct RafError {
    kind: ErrorKind,
    message: String,
    located: bool,
}

impl RafError {
    /// Creates a lex error, formatted against the source immediately.
    pub(crate) fn lex(src: &str, line: u32, col: u32, message: impl AsRef<str>) -> Self {
        Self {
            kind: ErrorKind::Lex,
            message: format_error(src, line, col, message.as_ref()),
            located: true,
        }
    }

    /// Creates a parse error, formatted against the source immediately.
    pub(crate) fn parse(src: &str, line: u32, col: u32, message: impl AsRef<str>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: format_error(src, line, col, message.as_ref()),
            located: true,
        }
    }

    /// Creates a bare runtime error with no source location attached yet.
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            message: message.into(),
            located: false,
        }
    }

    /// Attaches a source location (and optionally a stack trace) to an
    /// unlocated error. Already-located errors are returned unchanged.
    #[must_use]
    pub(crate) fn locate(self, src: &str, line: u32, col: u32, frames: &[TraceFrame]) -> Self {
        if self.located {
            return self;
        }
        let mut message = format_error(src, line, col, &self.message);
        if !frames.is_empty() {
            message.push('\n');
            message.push_str(&format_trace(frames));
        }
        Self {
            kind: self.kind,
            message,
            located: true,
        }
    }

    /// Which failure class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The rendered diagnostic text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RafError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RafError {}

/// Formats a diagnostic with a caret pointing at the offending column:
///
/// ```text
/// [line 2, col 5] Undefined variable 'y'
/// x = y + 1;
///     ^
/// ```
///
/// If `line` is out of range for the source, the snippet and caret are
/// omitted and only the bracketed message is returned.
#[must_use]
pub fn format_error(src: &str, line: u32, col: u32, msg: &str) -> String {
    let header = format!("[line {line}, col {col}] {msg}");
    if line == 0 {
        return header;
    }
    let Some(snippet) = src.lines().nth(line as usize - 1) else {
        return header;
    };
    let caret_pad = " ".repeat(col.max(1) as usize - 1);
    format!("{header}\n{snippet}\n{caret_pad}^")
}

/// Renders the evaluator's call stack, most recent call first.
#[must_use]
pub(crate) fn format_trace(frames: &[TraceFrame]) -> String {
    let mut lines = vec!["Stack trace (most recent call last):".to_owned()];
    for frame in frames.iter().rev() {
        lines.push(format!("  at {} (line {}, col {})", frame.name, frame.line, frame.col));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn caret_lands_under_column() {
        let src = "x = y + 1;";
        let rendered = format_error(src, 1, 5, "Undefined variable 'y'");
        assert_eq!(rendered, "[line 1, col 5] Undefined variable 'y'\nx = y + 1;\n    ^");
    }

    #[test]
    fn out_of_range_line_omits_snippet() {
        let rendered = format_error("x = 1;", 9, 1, "boom");
        assert_eq!(rendered, "[line 9, col 1] boom");
    }

    #[test]
    fn locate_is_applied_once() {
        let src = "f();";
        let err = RafError::runtime("Can only call functions").locate(src, 1, 2, &[]);
        let again = err.clone().locate("other source", 3, 3, &[]);
        assert_eq!(err.message(), again.message());
    }

    #[test]
    fn trace_lists_most_recent_first() {
        let frames = vec![
            TraceFrame {
                name: "f".to_owned(),
                line: 1,
                col: 22,
            },
            TraceFrame {
                name: "g".to_owned(),
                line: 1,
                col: 31,
            },
        ];
        assert_eq!(
            format_trace(&frames),
            "Stack trace (most recent call last):\n  at g (line 1, col 31)\n  at f (line 1, col 22)"
        );
    }
}
