use super::OptimizerPass;
use crate::ast::{
    Assignment, BinaryOp, Block, Declaration, Expression, For, FuncDecl, If, Program, Statement,
    UnaryOp, VarDecl, While,
};
use crate::lexer::{Token, TokenKind};

/// Rules 1–3 of `spec.md` §4.3: constant-fold binary arithmetic,
/// comparisons/logicals, and unary operators over `NumericLiteral`
/// operands. Rule 6 (recursive descent over composite nodes) is the
/// traversal shape below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFolding;

impl OptimizerPass for ConstantFolding {
    fn run(&self, program: Program) -> Program {
        Program::new(program.statements.into_iter().map(fold_statement).collect())
    }
}

fn fold_statement(stmt: Statement) -> Statement {
    match stmt {
        Statement::Declaration(Declaration::VarDecl(VarDecl { ty, name, initializer })) => {
            Statement::Declaration(Declaration::VarDecl(VarDecl {
                ty,
                name,
                initializer: initializer.map(fold_expr),
            }))
        }
        Statement::Declaration(Declaration::FuncDecl(FuncDecl { name, params, body })) => {
            Statement::Declaration(Declaration::FuncDecl(FuncDecl {
                name,
                params,
                body: fold_block(body),
            }))
        }
        Statement::Assignment(Assignment { name, value }) => {
            Statement::Assignment(Assignment { name, value: fold_expr(value) })
        }
        Statement::ExpressionStmt(expr) => Statement::ExpressionStmt(fold_expr(expr)),
        Statement::Print(expr) => Statement::Print(fold_expr(expr)),
        Statement::Return(expr) => Statement::Return(fold_expr(expr)),
        Statement::Block(block) => Statement::Block(fold_block(block)),
        Statement::If(If { condition, then_block, else_block }) => Statement::If(If {
            condition: fold_expr(condition),
            then_block: fold_block(then_block),
            else_block: else_block.map(fold_block),
        }),
        Statement::While(While { condition, body }) => Statement::While(While {
            condition: fold_expr(condition),
            body: fold_block(body),
        }),
        Statement::For(For { init, cond, update, body }) => Statement::For(For {
            init: init.map(|s| Box::new(fold_statement(*s))),
            cond: cond.map(fold_expr),
            update: update.map(|s| Box::new(fold_statement(*s))),
            body: fold_block(body),
        }),
    }
}

fn fold_block(block: Block) -> Block {
    Block::new(block.statements.into_iter().map(fold_statement).collect())
}

fn fold_expr(expr: Expression) -> Expression {
    match expr {
        Expression::Literal(_) | Expression::Variable(_) => expr,
        Expression::Call { name, args } => Expression::Call {
            name,
            args: args.into_iter().map(fold_expr).collect(),
        },
        Expression::Unary { op, operand } => {
            let operand = fold_expr(*operand);
            if let Expression::Literal(token) = &operand {
                if token.kind == TokenKind::NumericLiteral {
                    return Expression::Literal(fold_unary(op, token));
                }
            }
            Expression::Unary { op, operand: Box::new(operand) }
        }
        Expression::Binary { left, op, right } => {
            let left = fold_expr(*left);
            let right = fold_expr(*right);
            if let (Expression::Literal(lt), Expression::Literal(rt)) = (&left, &right) {
                if lt.kind == TokenKind::NumericLiteral && rt.kind == TokenKind::NumericLiteral {
                    if op.is_arithmetic() {
                        if let Some(folded) = fold_arithmetic(lt, op, rt) {
                            return Expression::Literal(folded);
                        }
                    } else if op.is_comparison() || op.is_logical() {
                        let result = fold_bool(lt, op, rt);
                        return Expression::Literal(bool_token(result, lt.line));
                    }
                }
            }
            Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            }
        }
    }
}

fn fold_unary(op: UnaryOp, token: &Token) -> Token {
    match op {
        UnaryOp::Negate => {
            let lexeme = match token.lexeme.strip_prefix('-') {
                Some(rest) => rest.to_string(),
                None => format!("-{}", token.lexeme),
            };
            Token::new(TokenKind::NumericLiteral, lexeme, token.line)
        }
        UnaryOp::Not => bool_token(!truthy(token), token.line),
    }
}

/// Compute in floating point; emit an integer literal iff both source
/// lexemes lacked `.` and the result is exactly representable as an
/// integer (`spec.md` §4.3 rule 1). Division by zero leaves the
/// expression intact (returns `None`).
fn fold_arithmetic(lt: &Token, op: BinaryOp, rt: &Token) -> Option<Token> {
    let l: f64 = lt.lexeme.parse().ok()?;
    let r: f64 = rt.lexeme.parse().ok()?;

    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => {
            if r == 0.0 {
                return None;
            }
            l / r
        }
        _ => unreachable!("fold_arithmetic called with non-arithmetic op"),
    };

    let both_int = !lt.lexeme.contains('.') && !rt.lexeme.contains('.');
    let lexeme = if both_int && result.fract() == 0.0 {
        format!("{}", result as i64)
    } else if result.fract() == 0.0 {
        format!("{result:.1}")
    } else {
        format!("{result}")
    };

    Some(Token::new(TokenKind::NumericLiteral, lexeme, lt.line))
}

fn fold_bool(lt: &Token, op: BinaryOp, rt: &Token) -> bool {
    let l: f64 = lt.lexeme.parse().unwrap_or(0.0);
    let r: f64 = rt.lexeme.parse().unwrap_or(0.0);

    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Gt => l > r,
        BinaryOp::Le => l <= r,
        BinaryOp::Ge => l >= r,
        BinaryOp::And => truthy(lt) && truthy(rt),
        BinaryOp::Or => truthy(lt) || truthy(rt),
        _ => unreachable!("fold_bool called with a non comparison/logical op"),
    }
}

/// `spec.md` §4.3's truth-evaluation rule.
fn truthy(token: &Token) -> bool {
    token.lexeme.parse::<f64>().map(|v| v != 0.0).unwrap_or(false)
}

/// Resolved Open Question (`SPEC_FULL.md` §4.3): fold to the canonical
/// `"0"`/`"1"` integer literal, never the textual `"true"`/`"false"`.
fn bool_token(value: bool, line: usize) -> Token {
    Token::new(
        TokenKind::NumericLiteral,
        if value { "1" } else { "0" },
        line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn fold(src: &str) -> Program {
        let tokens = Lexer::new(src).lex().unwrap();
        let program = parse(tokens).unwrap();
        ConstantFolding.run(program)
    }

    fn first_initializer(program: &Program) -> &Expression {
        let Statement::Declaration(Declaration::VarDecl(VarDecl { initializer, .. })) =
            &program.statements[0]
        else {
            panic!("expected a var decl");
        };
        initializer.as_ref().unwrap()
    }

    #[test]
    fn folds_integer_arithmetic() {
        let program = fold("int a = 2 + 3 * 4;");
        assert_eq!(
            first_initializer(&program),
            &Expression::Literal(Token::new(TokenKind::NumericLiteral, "14", 1))
        );
    }

    #[test]
    fn folds_float_arithmetic_when_either_operand_is_float() {
        let program = fold("float a = 1 + 2.5;");
        assert_eq!(
            first_initializer(&program),
            &Expression::Literal(Token::new(TokenKind::NumericLiteral, "3.5", 1))
        );
    }

    #[test]
    fn division_by_zero_is_left_intact() {
        let program = fold("int a = 1 / 0;");
        assert!(matches!(first_initializer(&program), Expression::Binary { .. }));
    }

    #[test]
    fn folds_comparison_to_canonical_zero_one() {
        let program = fold("int a = 1 < 2;");
        assert_eq!(
            first_initializer(&program),
            &Expression::Literal(Token::new(TokenKind::NumericLiteral, "1", 1))
        );
    }

    #[test]
    fn folds_unary_negate_and_not() {
        let program = fold("int a = -5;");
        assert_eq!(
            first_initializer(&program),
            &Expression::Literal(Token::new(TokenKind::NumericLiteral, "-5", 1))
        );
    }

    #[test]
    fn is_idempotent() {
        let tokens = Lexer::new("int a = 2 + 3 * 4;").lex().unwrap();
        let program = parse(tokens).unwrap();
        let once = ConstantFolding.run(program);
        let twice = ConstantFolding.run(once.clone());
        assert_eq!(once, twice);
    }
}
