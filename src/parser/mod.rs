//! LL(1) recursive-descent parser for Cesium (`spec.md` §4.2).
mod cursor;
mod error;

pub use error::ParseError;

use cursor::Tokens;
use log::debug;

use crate::ast::{
    Assignment, BinaryOp, Block, Declaration, Expression, For, FuncDecl, If, Param, Program,
    Statement, Type, UnaryOp, VarDecl, While,
};
use crate::lexer::{Token, TokenKind};

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a full token stream into a [`Program`]. No error recovery: the
/// first rule violation aborts the pipeline (`spec.md` §4.2).
pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    debug!("parser produced {} top-level statements", program.statements.len());
    Ok(program)
}

struct Parser {
    tokens: Tokens,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: Tokens::new(tokens),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.peek()
    }

    fn line(&self) -> usize {
        self.peek().map(|t| t.line).unwrap_or_else(|| self.tokens.last_line())
    }

    fn advance(&mut self) -> Option<Token> {
        self.tokens.advance()
    }

    fn expect_delimiter(&mut self, expected: &str) -> ParseResult<Token> {
        match self.advance() {
            Some(t) if t.is_delimiter(expected) => Ok(t),
            Some(t) => Err(ParseError::unexpected(&format!("'{expected}'"), &t.lexeme, t.line)),
            None => Err(ParseError::eof(&format!("'{expected}'"))),
        }
    }

    fn expect_operator(&mut self, expected: &str) -> ParseResult<Token> {
        match self.advance() {
            Some(t) if t.is_operator(expected) => Ok(t),
            Some(t) => Err(ParseError::unexpected(&format!("'{expected}'"), &t.lexeme, t.line)),
            None => Err(ParseError::eof(&format!("'{expected}'"))),
        }
    }

    fn expect_keyword(&mut self, expected: &str) -> ParseResult<Token> {
        match self.advance() {
            Some(t) if t.is_keyword(expected) => Ok(t),
            Some(t) => Err(ParseError::unexpected(&format!("'{expected}'"), &t.lexeme, t.line)),
            None => Err(ParseError::eof(&format!("'{expected}'"))),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(t.lexeme),
            Some(t) => Err(ParseError::unexpected("an identifier", &t.lexeme, t.line)),
            None => Err(ParseError::eof("an identifier")),
        }
    }

    fn parse_type(&mut self) -> ParseResult<Type> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Keyword => Type::from_keyword(&t.lexeme)
                .ok_or_else(|| ParseError::new(format!("'{}' is not a type", t.lexeme), t.line)),
            Some(t) => Err(ParseError::unexpected("a type", &t.lexeme, t.line)),
            None => Err(ParseError::eof("a type")),
        }
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(t) if t.kind == TokenKind::Keyword
                && matches!(t.lexeme.as_str(), "int" | "float" | "string" | "Stream" | "Reactive")
        )
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = vec![];
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements))
    }

    /// One-token lookahead dispatch (`spec.md` §4.2 "Statement disambiguation").
    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let Some(current) = self.peek().cloned() else {
            return Err(ParseError::eof("a statement"));
        };

        if current.is_delimiter("{") {
            return Ok(Statement::Block(self.parse_block()?));
        }

        if current.kind == TokenKind::Keyword {
            return match current.lexeme.as_str() {
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => self.parse_while(),
                "function" => self.parse_function(),
                "return" => self.parse_return(),
                "print" => self.parse_print(),
                "int" | "float" | "string" | "Stream" | "Reactive" => self.parse_var_decl_stmt(),
                other => Err(ParseError::new(format!("unexpected keyword '{other}'"), current.line)),
            };
        }

        if current.kind == TokenKind::Identifier {
            if matches!(self.tokens.peek_at(1), Some(t) if t.is_operator("=")) {
                return self.parse_assignment_stmt();
            }
            let expr = self.parse_expr()?;
            self.expect_operator_semicolon()?;
            return Ok(Statement::ExpressionStmt(expr));
        }

        let expr = self.parse_expr()?;
        self.expect_operator_semicolon()?;
        Ok(Statement::ExpressionStmt(expr))
    }

    fn expect_operator_semicolon(&mut self) -> ParseResult<()> {
        self.expect_delimiter(";").map(|_| ())
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect_delimiter("{")?;
        let mut statements = vec![];
        loop {
            if matches!(self.peek(), Some(t) if t.is_delimiter("}")) {
                break;
            }
            if self.peek().is_none() {
                return Err(ParseError::eof("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_delimiter("}")?;
        Ok(Block::new(statements))
    }

    fn parse_var_decl(&mut self) -> ParseResult<VarDecl> {
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        let initializer = if matches!(self.peek(), Some(t) if t.is_operator("=")) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(VarDecl { ty, name, initializer })
    }

    fn parse_var_decl_stmt(&mut self) -> ParseResult<Statement> {
        let decl = self.parse_var_decl()?;
        self.expect_operator_semicolon()?;
        Ok(Statement::Declaration(Declaration::VarDecl(decl)))
    }

    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        let name = self.expect_identifier()?;
        self.expect_operator("=")?;
        let value = self.parse_expr()?;
        Ok(Assignment { name, value })
    }

    fn parse_assignment_stmt(&mut self) -> ParseResult<Statement> {
        let assignment = self.parse_assignment()?;
        self.expect_operator_semicolon()?;
        Ok(Statement::Assignment(assignment))
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("if")?;
        self.expect_delimiter("(")?;
        let condition = self.parse_expr()?;
        self.expect_delimiter(")")?;
        let then_block = self.parse_block()?;
        let else_block = if matches!(self.peek(), Some(t) if t.is_keyword("else")) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Statement::If(If {
            condition,
            then_block,
            else_block,
        }))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("while")?;
        self.expect_delimiter("(")?;
        let condition = self.parse_expr()?;
        self.expect_delimiter(")")?;
        let body = self.parse_block()?;
        Ok(Statement::While(While { condition, body }))
    }

    /// `ForInit := VarDecl | Assignment | ε`; `ForUpdate := Assignment | ε`
    /// (`spec.md` §4.2). Neither consumes its own trailing `;` — the `for`
    /// header's `;` separators serve that role.
    fn parse_for(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("for")?;
        self.expect_delimiter("(")?;

        let init = if matches!(self.peek(), Some(t) if t.is_delimiter(";")) {
            None
        } else if self.is_type_start() {
            Some(Box::new(Statement::Declaration(Declaration::VarDecl(
                self.parse_var_decl()?,
            ))))
        } else {
            Some(Box::new(Statement::Assignment(self.parse_assignment()?)))
        };
        self.expect_delimiter(";")?;

        let cond = if matches!(self.peek(), Some(t) if t.is_delimiter(";")) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_delimiter(";")?;

        let update = if matches!(self.peek(), Some(t) if t.is_delimiter(")")) {
            None
        } else {
            Some(Box::new(Statement::Assignment(self.parse_assignment()?)))
        };
        self.expect_delimiter(")")?;

        let body = self.parse_block()?;

        Ok(Statement::For(For {
            init,
            cond,
            update,
            body,
        }))
    }

    fn parse_function(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("function")?;
        let name = self.expect_identifier()?;
        self.expect_delimiter("(")?;

        let mut params = vec![];
        if !matches!(self.peek(), Some(t) if t.is_delimiter(")")) {
            loop {
                let ty = self.parse_type()?;
                let name = self.expect_identifier()?;
                params.push(Param { ty, name });
                if matches!(self.peek(), Some(t) if t.is_delimiter(",")) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_delimiter(")")?;
        let body = self.parse_block()?;

        Ok(Statement::Declaration(Declaration::FuncDecl(FuncDecl {
            name,
            params,
            body,
        })))
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("return")?;
        let expr = self.parse_expr()?;
        self.expect_operator_semicolon()?;
        Ok(Statement::Return(expr))
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("print")?;
        self.expect_delimiter("(")?;
        let expr = self.parse_expr()?;
        self.expect_delimiter(")")?;
        self.expect_operator_semicolon()?;
        Ok(Statement::Print(expr))
    }

    // --- Expression precedence ladder, lowest to highest (`spec.md` §4.2) ---

    fn parse_expr(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_and, &["||"])
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_equality, &["&&"])
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_relational, &["==", "!="])
    }

    fn parse_relational(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_additive, &["<", ">", "<=", ">="])
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_multiplicative, &["+", "-"])
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        self.parse_left_assoc(Self::parse_unary, &["*", "/"])
    }

    fn parse_left_assoc(
        &mut self,
        mut next: impl FnMut(&mut Self) -> ParseResult<Expression>,
        ops: &[&str],
    ) -> ParseResult<Expression> {
        let mut left = next(self)?;
        loop {
            let Some(t) = self.peek() else { break };
            if t.kind != TokenKind::Operator || !ops.contains(&t.lexeme.as_str()) {
                break;
            }
            let op_lexeme = self.advance().unwrap().lexeme;
            let op = BinaryOp::from_lexeme(&op_lexeme).expect("operator already matched above");
            let right = next(self)?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if let Some(t) = self.peek() {
            if t.kind == TokenKind::Operator && (t.lexeme == "!" || t.lexeme == "-") {
                let op_token = self.advance().unwrap();
                let op = UnaryOp::from_lexeme(&op_token.lexeme).expect("checked above");
                let operand = self.parse_unary()?;
                return Ok(Expression::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.advance() else {
            return Err(ParseError::eof("an expression"));
        };

        match token.kind {
            TokenKind::NumericLiteral | TokenKind::StringLiteral | TokenKind::BooleanLiteral => {
                Ok(Expression::Literal(token))
            }
            TokenKind::Identifier => {
                if matches!(self.peek(), Some(t) if t.is_delimiter("(")) {
                    self.parse_call(token.lexeme)
                } else {
                    Ok(Expression::Variable(token.lexeme))
                }
            }
            TokenKind::Delimiter if token.lexeme == "(" => {
                let inner = self.parse_expr()?;
                self.expect_delimiter(")")?;
                Ok(inner)
            }
            _ => Err(ParseError::unexpected("an expression", &token.lexeme, token.line)),
        }
    }

    fn parse_call(&mut self, name: String) -> ParseResult<Expression> {
        self.expect_delimiter("(")?;
        let mut args = vec![];
        if !matches!(self.peek(), Some(t) if t.is_delimiter(")")) {
            loop {
                args.push(self.parse_expr()?);
                if matches!(self.peek(), Some(t) if t.is_delimiter(",")) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_delimiter(")")?;
        Ok(Expression::Call { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> ParseResult<Program> {
        let tokens = Lexer::new(src).lex().expect("lexing should succeed");
        parse(tokens)
    }

    #[test]
    fn parses_var_decl_with_initializer() {
        let program = parse_src("int a = 2 + 3 * 4;").unwrap();
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(
            program.statements[0],
            Statement::Declaration(Declaration::VarDecl(_))
        ));
    }

    #[test]
    fn binary_precedence_nests_multiplication_under_addition() {
        let program = parse_src("int a = 2 + 3 * 4;").unwrap();
        let Statement::Declaration(Declaration::VarDecl(VarDecl {
            initializer: Some(Expression::Binary { op, right, .. }),
            ..
        })) = &program.statements[0]
        else {
            panic!("expected a var decl with a binary initializer");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**right, Expression::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_if_else_without_trailing_semicolon() {
        let program = parse_src("if (1 < 2) { print(1); } else { print(0); }").unwrap();
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::If(_)));
    }

    #[test]
    fn parses_for_loop() {
        let program = parse_src("for (int i = 0; i < 3; i = i + 1) { print(i); }").unwrap();
        assert!(matches!(program.statements[0], Statement::For(_)));
    }

    #[test]
    fn parses_function_with_empty_body() {
        let program = parse_src("function f() {}").unwrap();
        let Statement::Declaration(Declaration::FuncDecl(f)) = &program.statements[0] else {
            panic!("expected a function declaration");
        };
        assert_eq!(f.name, "f");
        assert!(f.body.statements.is_empty());
    }

    #[test]
    fn assignment_vs_expression_statement_disambiguation() {
        let program = parse_src("x = 1; f();").unwrap();
        assert!(matches!(program.statements[0], Statement::Assignment(_)));
        assert!(matches!(program.statements[1], Statement::ExpressionStmt(_)));
    }

    #[test]
    fn missing_semicolon_is_parse_error() {
        assert!(parse_src("int a = 1").is_err());
    }

    #[test]
    fn missing_rvalue_is_parse_error() {
        assert!(parse_src("a = ;").is_err());
    }

    #[test]
    fn unclosed_paren_is_parse_error() {
        assert!(parse_src("int a = (1 + 2;").is_err());
    }

    #[test]
    fn reactive_lowercase_keyword_never_parses() {
        assert!(parse_src("reactive x;").is_err());
    }
}
