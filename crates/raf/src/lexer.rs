//! Lexical analysis: source text to a finite token stream.

use crate::{
    error::{RafError, RafResult},
    token::{Token, TokenKind},
};

/// Scans `src` into tokens, always terminated by a single `EOF` token.
pub(crate) fn lex(src: &str) -> RafResult<Vec<Token>> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    /// Original source, kept for diagnostics.
    src: &'a str,
    chars: Vec<char>,
    i: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            i: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> RafResult<Vec<Token>> {
        while self.i < self.chars.len() {
            let ch = self.chars[self.i];

            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.bump();
                continue;
            }
            if ch == '\n' {
                self.i += 1;
                self.line += 1;
                self.col = 1;
                continue;
            }

            // line comment: // to end of line
            if ch == '/' && self.peek_next() == Some('/') {
                while self.i < self.chars.len() && self.chars[self.i] != '\n' {
                    self.bump();
                }
                continue;
            }

            if ch == '"' {
                self.string()?;
                continue;
            }
            if ch.is_ascii_digit() {
                self.number();
                continue;
            }
            if ch.is_alphabetic() || ch == '_' {
                self.ident();
                continue;
            }

            // two-character operators take priority over =, <, >
            if let Some(next) = self.peek_next() {
                let kind = match (ch, next) {
                    ('=', '=') => Some(TokenKind::Eqeq),
                    ('!', '=') => Some(TokenKind::Neq),
                    ('<', '=') => Some(TokenKind::Lte),
                    ('>', '=') => Some(TokenKind::Gte),
                    _ => None,
                };
                if let Some(kind) = kind {
                    let (line, col) = (self.line, self.col);
                    self.bump();
                    self.bump();
                    self.add(kind, format!("{ch}{next}"), line, col);
                    continue;
                }
            }

            let kind = match ch {
                '=' => Some(TokenKind::Eq),
                '<' => Some(TokenKind::Lt),
                '>' => Some(TokenKind::Gt),
                _ => single_char_kind(ch),
            };
            if let Some(kind) = kind {
                let (line, col) = (self.line, self.col);
                self.bump();
                self.add(kind, ch.to_string(), line, col);
                continue;
            }

            return Err(RafError::lex(
                self.src,
                self.line,
                self.col,
                format!("Unexpected character: {ch:?}"),
            ));
        }

        self.tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
        Ok(self.tokens)
    }

    /// Scans a double-quoted string literal, decoding escape sequences.
    ///
    /// Newlines inside the literal are allowed and retained. An unknown
    /// escape `\x` yields the literal character `x`.
    fn string(&mut self) -> RafResult<()> {
        let (start_line, start_col) = (self.line, self.col);
        self.bump(); // opening quote
        let mut value = String::new();
        while self.i < self.chars.len() && self.chars[self.i] != '"' {
            let ch = self.chars[self.i];
            if ch == '\\' && self.i + 1 < self.chars.len() {
                let esc = self.chars[self.i + 1];
                value.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    '"' => '"',
                    '\\' => '\\',
                    other => other,
                });
                self.bump();
                self.bump();
            } else if ch == '\n' {
                value.push('\n');
                self.i += 1;
                self.line += 1;
                self.col = 1;
            } else {
                value.push(ch);
                self.bump();
            }
        }
        if self.i >= self.chars.len() {
            return Err(RafError::lex(
                self.src,
                start_line,
                start_col,
                "Unterminated string literal",
            ));
        }
        self.bump(); // closing quote
        self.add(TokenKind::String, value, start_line, start_col);
        Ok(())
    }

    /// Scans a number: digits with at most one embedded `.`.
    ///
    /// Integer/fractional classification happens in the parser from the
    /// presence of the dot.
    fn number(&mut self) {
        let (start_line, start_col) = (self.line, self.col);
        let start = self.i;
        let mut has_dot = false;
        while self.i < self.chars.len() {
            let ch = self.chars[self.i];
            if ch.is_ascii_digit() {
                self.bump();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.bump();
            } else {
                break;
            }
        }
        let lexeme: String = self.chars[start..self.i].iter().collect();
        self.add(TokenKind::Number, lexeme, start_line, start_col);
    }

    fn ident(&mut self) {
        let (start_line, start_col) = (self.line, self.col);
        let start = self.i;
        while self.i < self.chars.len() {
            let ch = self.chars[self.i];
            if ch.is_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.i].iter().collect();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Ident);
        self.add(kind, text, start_line, start_col);
    }

    /// Advances one character on the current line.
    fn bump(&mut self) {
        self.i += 1;
        self.col += 1;
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.i + 1).copied()
    }

    fn add(&mut self, kind: TokenKind, lexeme: impl Into<String>, line: u32, col: u32) {
        self.tokens.push(Token::new(kind, lexeme, line, col));
    }
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    Some(match text {
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "def" => TokenKind::Def,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "none" => TokenKind::None,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "import" => TokenKind::Import,
        _ => return None,
    })
}

fn single_char_kind(ch: char) -> Option<TokenKind> {
    Some(match ch {
        '(' => TokenKind::Lparen,
        ')' => TokenKind::Rparen,
        '{' => TokenKind::Lbrace,
        '}' => TokenKind::Rbrace,
        '[' => TokenKind::Lbracket,
        ']' => TokenKind::Rbracket,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semi,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        _ => return None,
    })
}
