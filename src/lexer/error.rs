use std::error::Error;
use std::fmt::{self, Display};

/// A fatal, non-recoverable lexing failure (`spec.md` §7). Carries the line
/// the offending character/literal started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    pub message: String,
    pub line: usize,
}

impl LexicalError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lexical error at line {}: {}", self.line, self.message)
    }
}

impl Error for LexicalError {}
