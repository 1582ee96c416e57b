use super::OptimizerPass;
use crate::ast::{Block, Declaration, Expression, For, FuncDecl, If, Program, Statement, While};
use crate::lexer::TokenKind;

/// Rules 4–5 of `spec.md` §4.3: drop the untaken branch of a
/// statically-decidable `if`, drop `while(false)` entirely, and reduce
/// `for(init; false; update)` to a block containing only `init`. Expects
/// to run after [`super::constant_folding::ConstantFolding`] so conditions
/// have already folded to `NumericLiteral`s where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadCodeElimination;

impl OptimizerPass for DeadCodeElimination {
    fn run(&self, program: Program) -> Program {
        Program::new(
            program
                .statements
                .into_iter()
                .filter_map(simplify_statement)
                .collect(),
        )
    }
}

/// `spec.md` §4.3's truth-evaluation rule: only literal `NumericLiteral`
/// and `BooleanLiteral` expressions are evaluated; non-literal conditions
/// are left alone. Constant folding never rewrites a standalone boolean
/// literal to a numeric one, so both token kinds have to be recognized
/// here directly.
fn literal_truth(expr: &Expression) -> Option<bool> {
    match expr {
        Expression::Literal(token) if token.kind == TokenKind::NumericLiteral => {
            Some(token.lexeme.parse::<f64>().unwrap_or(0.0) != 0.0)
        }
        Expression::Literal(token) if token.kind == TokenKind::BooleanLiteral => {
            Some(token.lexeme == "true")
        }
        _ => None,
    }
}

fn simplify_block(block: Block) -> Block {
    Block::new(
        block
            .statements
            .into_iter()
            .filter_map(simplify_statement)
            .collect(),
    )
}

fn simplify_required(stmt: Statement) -> Statement {
    simplify_statement(stmt).expect("a declaration/assignment statement is never eliminated")
}

fn simplify_statement(stmt: Statement) -> Option<Statement> {
    match stmt {
        Statement::If(If { condition, then_block, else_block }) => {
            match literal_truth(&condition) {
                Some(true) => Some(Statement::Block(simplify_block(then_block))),
                Some(false) => else_block.map(|b| Statement::Block(simplify_block(b))),
                None => Some(Statement::If(If {
                    condition,
                    then_block: simplify_block(then_block),
                    else_block: else_block.map(simplify_block),
                })),
            }
        }
        Statement::While(While { condition, body }) => match literal_truth(&condition) {
            Some(false) => None,
            _ => Some(Statement::While(While {
                condition,
                body: simplify_block(body),
            })),
        },
        Statement::For(For { init, cond, update, body }) => {
            let dead = cond.as_ref().map(literal_truth).unwrap_or(None) == Some(false);
            if dead {
                let statements = match init {
                    Some(init) => vec![simplify_required(*init)],
                    None => vec![],
                };
                return Some(Statement::Block(Block::new(statements)));
            }
            Some(Statement::For(For {
                init: init.map(|s| Box::new(simplify_required(*s))),
                cond,
                update: update.map(|s| Box::new(simplify_required(*s))),
                body: simplify_block(body),
            }))
        }
        Statement::Block(block) => Some(Statement::Block(simplify_block(block))),
        Statement::Declaration(Declaration::FuncDecl(FuncDecl { name, params, body })) => {
            Some(Statement::Declaration(Declaration::FuncDecl(FuncDecl {
                name,
                params,
                body: simplify_block(body),
            })))
        }
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::optimizer::ConstantFolding;
    use crate::parser::parse;

    fn simplify(src: &str) -> Program {
        let tokens = Lexer::new(src).lex().unwrap();
        let program = parse(tokens).unwrap();
        let program = ConstantFolding.run(program);
        DeadCodeElimination.run(program)
    }

    #[test]
    fn drops_else_branch_when_condition_is_statically_true() {
        let program = simplify("if (1 < 2) { print(1); } else { print(0); }");
        assert_eq!(program.statements.len(), 1);
        let Statement::Block(block) = &program.statements[0] else {
            panic!("expected the then-block to survive as a Block");
        };
        assert_eq!(block.statements.len(), 1);
        assert!(matches!(block.statements[0], Statement::Print(_)));
    }

    #[test]
    fn drops_entire_if_when_false_with_no_else() {
        let program = simplify("if (falseBranchCondition()) { print(1); }\nwhile (0) { print(9); }\nint a = 1;");
        // the call-guarded `if` cannot fold (non-literal condition) so it survives,
        // but the dead `while` vanishes entirely.
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn drops_while_false_entirely() {
        let program = simplify("while (false) { print(99); } print(1);");
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Print(_)));
    }

    #[test]
    fn reduces_dead_for_loop_to_its_init() {
        let program = simplify("for (int i = 0; false; i = i + 1) { print(i); }");
        assert_eq!(program.statements.len(), 1);
        let Statement::Block(block) = &program.statements[0] else {
            panic!("expected a block wrapping just the init");
        };
        assert_eq!(block.statements.len(), 1);
        assert!(matches!(
            block.statements[0],
            Statement::Declaration(Declaration::VarDecl(_))
        ));
    }

    #[test]
    fn is_idempotent() {
        let tokens = Lexer::new("if (1 < 2) { print(1); } else { print(0); }")
            .lex()
            .unwrap();
        let program = ConstantFolding.run(parse(tokens).unwrap());
        let once = DeadCodeElimination.run(program);
        let twice = DeadCodeElimination.run(once.clone());
        assert_eq!(once, twice);
    }
}
