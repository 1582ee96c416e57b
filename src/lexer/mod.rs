//! Deterministic finite-state tokenizer for Cesium (`spec.md` §4.1).
//!
//! Modeled on `y-lang`'s hand-rolled char lexer: a `Peekable<Chars>` plus a
//! running line counter, one `lex_*` method per character class.
mod error;
mod keywords;
mod token;

pub use error::LexicalError;
pub use token::{Token, TokenKind};

use log::debug;
use std::iter::Peekable;
use std::str::Chars;

pub type LexResult<T> = Result<T, LexicalError>;

/// Single-character operators; multi-character operators are recognized
/// only as the exact pairs below (`spec.md` §4.1).
const OPERATOR_CHARS: &str = "-+*=/<>|&!";
const MULTI_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||"];
const DELIMITER_CHARS: &str = "()[]{};,.";

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    tokens: Vec<Token>,
    iterator: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: vec![],
            iterator: input.chars().peekable(),
            line: 1,
        }
    }

    /// Lex the entire input, returning the full token stream or the first
    /// lexical error encountered. There is no error recovery (`spec.md` §4.1).
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.skip_whitespace_and_comments()?;

            let Some(&next) = self.peek() else {
                break;
            };

            match next {
                c if c.is_ascii_alphabetic() => self.lex_identifier_or_keyword(),
                c if c.is_ascii_digit() => self.lex_number()?,
                '"' => self.lex_string()?,
                '.' => self.lex_dot_delimiter()?,
                c if DELIMITER_CHARS.contains(c) => self.lex_delimiter(),
                c if OPERATOR_CHARS.contains(c) => self.lex_operator(),
                c => {
                    return Err(LexicalError::new(
                        format!("unrecognized character '{c}'"),
                        self.line,
                    ))
                }
            }
        }

        debug!("lexer produced {} tokens", self.tokens.len());
        Ok(self.tokens)
    }

    fn peek(&mut self) -> Option<&char> {
        self.iterator.peek()
    }

    fn peek_second(&self) -> Option<char> {
        let mut clone = self.iterator.clone();
        clone.next();
        clone.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.iterator.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(&c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break, // unterminated block comment: treat as terminated at EOF
                            Some('*') => {
                                self.advance();
                                if self.peek() == Some(&'/') {
                                    self.advance();
                                    break;
                                }
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_identifier_or_keyword(&mut self) {
        let line = self.line;
        let mut lexeme = String::new();

        while let Some(&c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = keywords::lookup(&lexeme).unwrap_or(TokenKind::Identifier);
        self.tokens.push(Token::new(kind, lexeme, line));
    }

    fn lex_number(&mut self) -> LexResult<()> {
        let line = self.line;
        let mut lexeme = String::new();
        let mut seen_dot = false;

        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else if c == '.' {
                if seen_dot {
                    return Err(LexicalError::new(
                        "numeric literal with multiple dots",
                        line,
                    ));
                }
                seen_dot = true;
                lexeme.push(c);
                self.advance();

                match self.peek() {
                    Some(d) if d.is_ascii_digit() => {}
                    _ => {
                        return Err(LexicalError::new(
                            "numeric literal ending with a dot",
                            line,
                        ))
                    }
                }
            } else {
                break;
            }
        }

        self.tokens
            .push(Token::new(TokenKind::NumericLiteral, lexeme, line));
        Ok(())
    }

    /// A `.` delimiter that immediately precedes a digit is rejected, since
    /// Cesium numeric literals must start with a digit (`spec.md` §4.1).
    fn lex_dot_delimiter(&mut self) -> LexResult<()> {
        let line = self.line;
        if matches!(self.peek_second(), Some(d) if d.is_ascii_digit()) {
            return Err(LexicalError::new(
                "invalid numeric literal ending with a dot",
                line,
            ));
        }
        self.advance();
        self.tokens
            .push(Token::new(TokenKind::Delimiter, ".", line));
        Ok(())
    }

    fn lex_string(&mut self) -> LexResult<()> {
        let line = self.line;
        self.advance(); // opening quote
        let mut lexeme = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) => lexeme.push(c),
                None => {
                    return Err(LexicalError::new("unterminated string literal", line));
                }
            }
        }

        self.tokens
            .push(Token::new(TokenKind::StringLiteral, lexeme, line));
        Ok(())
    }

    fn lex_delimiter(&mut self) {
        let line = self.line;
        let c = self.advance().expect("peeked delimiter char vanished");
        self.tokens
            .push(Token::new(TokenKind::Delimiter, c.to_string(), line));
    }

    fn lex_operator(&mut self) {
        let line = self.line;
        let first = self.advance().expect("peeked operator char vanished");

        if let Some(&second) = self.peek() {
            let pair: String = [first, second].iter().collect();
            if MULTI_CHAR_OPERATORS.contains(&pair.as_str()) {
                self.advance();
                self.tokens.push(Token::new(TokenKind::Operator, pair, line));
                return;
            }
        }

        self.tokens
            .push(Token::new(TokenKind::Operator, first.to_string(), line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).lex().expect("expected lexing to succeed")
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        let tokens = lex("int x Stream reactive");
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Keyword);
        assert_eq!(tokens[3].kind, TokenKind::Keyword);
    }

    #[test]
    fn lexes_true_false_as_boolean_literal() {
        let tokens = lex("true false");
        assert_eq!(tokens[0].kind, TokenKind::BooleanLiteral);
        assert_eq!(tokens[1].kind, TokenKind::BooleanLiteral);
    }

    #[test]
    fn lexes_numbers() {
        let tokens = lex("42 3.14");
        assert_eq!(tokens[0].lexeme, "42");
        assert!(!tokens[0].is_float_literal());
        assert_eq!(tokens[1].lexeme, "3.14");
        assert!(tokens[1].is_float_literal());
    }

    #[test]
    fn trailing_dot_is_lexical_error() {
        let err = Lexer::new("1.").lex().unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn multiple_dots_is_lexical_error() {
        assert!(Lexer::new("1.2.3").lex().is_err());
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        assert!(Lexer::new("\"abc").lex().is_err());
    }

    #[test]
    fn multi_char_operators() {
        let tokens = lex("== != <= >= && ||");
        for t in &tokens {
            assert_eq!(t.kind, TokenKind::Operator);
        }
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn unpaired_operator_chars_lex_separately() {
        let tokens = lex("=-");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "=");
        assert_eq!(tokens[1].lexeme, "-");
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex("int x; // a comment\n/* block\ncomment */ int y;");
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn unterminated_block_comment_is_treated_as_terminated() {
        let tokens = lex("int x; /* dangling");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn newlines_increment_line_counter() {
        let tokens = lex("int x;\nint y;");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 2);
    }

    #[test]
    fn leading_dot_before_digit_is_rejected() {
        assert!(Lexer::new(".5").lex().is_err());
    }

    #[test]
    fn leading_dot_not_before_digit_is_a_delimiter() {
        let tokens = lex(". x");
        assert_eq!(tokens[0].kind, TokenKind::Delimiter);
        assert_eq!(tokens[0].lexeme, ".");
    }
}
