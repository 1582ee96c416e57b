//! AST-to-AST optimizer: constant folding and dead-branch elimination
//! (`spec.md` §4.3). Pure, total, never fails.
mod constant_folding;
mod dead_code;

pub use constant_folding::ConstantFolding;
pub use dead_code::DeadCodeElimination;

use crate::ast::Program;

pub trait OptimizerPass {
    fn run(&self, program: Program) -> Program;
}

/// Run the default optimizer pipeline: fold constants first so that dead
/// branches (which depend on folded literal conditions) can then be
/// recognized and dropped.
pub fn optimize(program: Program) -> Program {
    let passes: Vec<Box<dyn OptimizerPass>> =
        vec![Box::new(ConstantFolding), Box::new(DeadCodeElimination)];

    let mut program = program;
    for pass in &passes {
        program = pass.run(program);
    }
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    #[test]
    fn optimize_is_idempotent_end_to_end() {
        let src = "while (false) { print(99); } if (2 > 1) { print(1); } else { print(0); }";
        let tokens = Lexer::new(src).lex().unwrap();
        let program = parse(tokens).unwrap();
        let once = optimize(program);
        let twice = optimize(once.clone());
        assert_eq!(once, twice);
    }
}
