//! The Cesium AST data model (`spec.md` §3).
//!
//! One module per node family, in the shape of `y-lang`'s `src/ast/`
//! directory. Every node is immutable after construction; the optimizer
//! rebuilds rather than mutates (`spec.md` §3 invariants).
mod declaration;
mod expression;
mod program;
mod statement;
mod types;

pub use declaration::{Declaration, FuncDecl, Param, VarDecl};
pub use expression::{BinaryOp, Expression, UnaryOp};
pub use program::Program;
pub use statement::{Assignment, Block, For, If, Statement, While};
pub use types::Type;
