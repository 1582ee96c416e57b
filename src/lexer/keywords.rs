use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::token::TokenKind;

/// The closed keyword set from `spec.md` §3, mapped to the [`TokenKind`]
/// it should lex as. `true`/`false` map to `BooleanLiteral` rather than
/// `Keyword`, per §4.1's identifier/keyword FSM. `reactive` (lowercase) is
/// reserved but never produced by the grammar (`spec.md` §9).
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("Stream", TokenKind::Keyword);
    m.insert("Reactive", TokenKind::Keyword);
    m.insert("reactive", TokenKind::Keyword);
    m.insert("if", TokenKind::Keyword);
    m.insert("else", TokenKind::Keyword);
    m.insert("for", TokenKind::Keyword);
    m.insert("while", TokenKind::Keyword);
    m.insert("return", TokenKind::Keyword);
    m.insert("print", TokenKind::Keyword);
    m.insert("function", TokenKind::Keyword);
    m.insert("int", TokenKind::Keyword);
    m.insert("float", TokenKind::Keyword);
    m.insert("string", TokenKind::Keyword);
    m.insert("true", TokenKind::BooleanLiteral);
    m.insert("false", TokenKind::BooleanLiteral);
    m
});

pub fn lookup(word: &str) -> Option<TokenKind> {
    KEYWORDS.get(word).copied()
}
