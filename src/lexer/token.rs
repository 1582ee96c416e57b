use std::fmt::{self, Display};

/// The coarse category a [`Token`] belongs to.
///
/// Cesium keeps this set closed and flat (`spec.md` §3): specific keywords,
/// operators and delimiters are distinguished by `lexeme`, not by a
/// per-variant token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    NumericLiteral,
    StringLiteral,
    BooleanLiteral,
    Operator,
    Delimiter,
    Unknown,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::NumericLiteral => "numeric literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::BooleanLiteral => "boolean literal",
            TokenKind::Operator => "operator",
            TokenKind::Delimiter => "delimiter",
            TokenKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single lexical token: its category, its exact source text, and the
/// 1-based source line it started on. Whitespace and comments never reach
/// here (`spec.md` §4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }

    /// Whether this is a [`TokenKind::NumericLiteral`] whose lexeme contains
    /// a `.`, i.e. a float literal rather than an int literal (`spec.md` §4.2's
    /// "Numbers with a `.` are classified as float ... by textual presence
    /// of `.`").
    pub fn is_float_literal(&self) -> bool {
        self.kind == TokenKind::NumericLiteral && self.lexeme.contains('.')
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lexeme == word
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == op
    }

    pub fn is_delimiter(&self, delim: &str) -> bool {
        self.kind == TokenKind::Delimiter && self.lexeme == delim
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.lexeme)
    }
}
