//! Token kinds and the token type produced by the lexer.

use strum::Display;

/// The closed set of token kinds.
///
/// `Display` renders the conventional uppercase name (`LPAREN`, `EQEQ`, ...)
/// used in parse-error messages and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TokenKind {
    // Grouping
    Lparen,
    Rparen,
    Lbrace,
    Rbrace,
    Lbracket,
    Rbracket,

    // Separators
    Comma,
    Semi,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Assignment / comparison
    Eq,
    Eqeq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,

    // Literals / identifiers
    Ident,
    Number,
    String,

    // Keywords
    If,
    Else,
    While,
    Def,
    Return,
    True,
    False,
    None,
    And,
    Or,
    Not,
    Import,

    Eof,
}

/// A single token with the position of its first character.
///
/// For `String` tokens the lexeme holds the *decoded* contents (escape
/// sequences already resolved), not the raw source slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            col,
        }
    }
}
