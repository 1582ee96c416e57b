use std::error::Error;
use std::fmt::{self, Display};

/// `spec.md` §4.4 / §7: undeclared variables, calls to undefined functions,
/// unsupported types, type-mismatched arithmetic/comparison/logical
/// operands. Carries only a message — the AST has no source-line tracking
/// beyond what survives inside a `Literal`'s token, so positional context
/// is folded into the message itself where it matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    pub fn new(message: impl Into<String>) -> Self {
        CodegenError { message: message.into() }
    }
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codegen error: {}", self.message)
    }
}

impl Error for CodegenError {}

pub type CodegenResult<T> = Result<T, CodegenError>;
