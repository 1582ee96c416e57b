//! AST-directed code generator (`spec.md` §4.4 / `SPEC_FULL.md` §4.4): scope
//! and slot allocation, post-order type inference, stack-machine lowering
//! of control flow, arithmetic widening, and reactive-library dispatch.
//! Mirrors the shape of `y-lang`'s `src/compiler/mod.rs` and
//! `src/compiler/scope.rs`, generalized from x86 registers to a JVM-style
//! operand stack and local slots.
mod error;
mod scope;

pub use error::{CodegenError, CodegenResult};
use scope::Scope;

use std::collections::HashMap;

use crate::ast::{
    Assignment, BinaryOp, Block, Declaration, Expression, For, FuncDecl, If, Program, Statement,
    Type, UnaryOp, VarDecl, While,
};
use crate::classfile::{opcode as op, ClassWriter, CodeBuilder, ConstantPool, Label, MethodSpec};
use crate::lexer::{Token, TokenKind};

const ACC_PUBLIC: u16 = crate::classfile::ACC_PUBLIC;
const ACC_STATIC: u16 = crate::classfile::ACC_STATIC;

/// Maps a Cesium parameter type to its VM descriptor fragment
/// (`spec.md` §4.4: `I`, `F`, `string`→`Ljava/lang/String;`,
/// `Stream|Reactive`→`Ljava/lang/Object;`).
fn param_descriptor(ty: Type) -> &'static str {
    match ty {
        Type::Int => "I",
        Type::Float => "F",
        Type::String => "Ljava/lang/String;",
        Type::Stream | Type::Reactive => "Ljava/lang/Object;",
    }
}

/// Every user function returns `int` by fiat (`spec.md` §4.4).
fn function_descriptor(params: &[Type]) -> String {
    let mut descriptor = String::from("(");
    for ty in params {
        descriptor.push_str(param_descriptor(*ty));
    }
    descriptor.push_str(")I");
    descriptor
}

/// The shared validation/result-type rule for `+ - * /`
/// (`spec.md` §4.4's "Binary ... Arithmetic" + "Reactive arithmetic"
/// clauses): both `infer` and the lowering routines below call this same
/// function so the decision is made in exactly one place.
fn arithmetic_result_type(op: BinaryOp, lt: Type, rt: Type) -> CodegenResult<Type> {
    if lt.is_reactive_ish() {
        if rt == Type::Int {
            Ok(Type::Reactive)
        } else {
            Err(CodegenError::new(format!(
                "reactive arithmetic requires an int right operand, found {rt}"
            )))
        }
    } else if rt.is_reactive_ish() {
        Err(CodegenError::new(
            "the reactive operand of an arithmetic expression must be the left operand",
        ))
    } else if lt.is_numeric() && rt.is_numeric() {
        Ok(if lt == Type::Float || rt == Type::Float { Type::Float } else { Type::Int })
    } else {
        Err(CodegenError::new(format!(
            "arithmetic requires numeric or reactive operands, found {lt} and {rt}"
        )))
    }
}

fn icmp_opcode(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq => crate::classfile::opcode::IF_ICMPEQ,
        BinaryOp::Ne => crate::classfile::opcode::IF_ICMPNE,
        BinaryOp::Lt => crate::classfile::opcode::IF_ICMPLT,
        BinaryOp::Gt => crate::classfile::opcode::IF_ICMPGT,
        BinaryOp::Le => crate::classfile::opcode::IF_ICMPLE,
        BinaryOp::Ge => crate::classfile::opcode::IF_ICMPGE,
        _ => unreachable!("icmp_opcode called with a non-comparison op"),
    }
}

/// Branch-on-condition-against-zero opcode used after `fcmpg`
/// (`spec.md` §4.4: "for any float participant emit the float compare
/// followed by the relevant branch-on-condition").
fn fcmp_branch_opcode(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq => op::IFEQ,
        BinaryOp::Ne => op::IFNE,
        BinaryOp::Lt => op::IFLT,
        BinaryOp::Gt => op::IFGT,
        BinaryOp::Le => op::IFLE,
        BinaryOp::Ge => op::IFGE,
        _ => unreachable!("fcmp_branch_opcode called with a non-comparison op"),
    }
}

fn reactive_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "subtract",
        BinaryOp::Mul => "multiply",
        BinaryOp::Div => "divide",
        _ => unreachable!("reactive_op_name called with a non-arithmetic op"),
    }
}

/// Per-method lowering context: one per `main` and one per `FuncDecl`
/// (`spec.md` §4.4's "State machine for methods").
struct FunctionEmitter<'a> {
    pool: &'a mut ConstantPool,
    code: CodeBuilder,
    scope: Scope,
    functions: &'a HashMap<String, Vec<Type>>,
    class_name: &'a str,
    is_void: bool,
}

impl<'a> FunctionEmitter<'a> {
    fn new(
        pool: &'a mut ConstantPool,
        functions: &'a HashMap<String, Vec<Type>>,
        class_name: &'a str,
        first_free_slot: u8,
        is_void: bool,
    ) -> Self {
        FunctionEmitter {
            pool,
            code: CodeBuilder::new(),
            scope: Scope::starting_at(first_free_slot),
            functions,
            class_name,
            is_void,
        }
    }

    // ---------------------------------------------------------------
    // type inference (pure, no emission — `spec.md` §4.4 "Type inference")
    // ---------------------------------------------------------------

    fn infer(&self, expr: &Expression) -> CodegenResult<Type> {
        match expr {
            Expression::Literal(token) => Self::infer_literal(token),
            Expression::Variable(name) => self
                .scope
                .lookup(name)
                .map(|(_, ty)| ty)
                .ok_or_else(|| CodegenError::new(format!("undeclared variable '{name}'"))),
            Expression::Unary { op, operand } => match op {
                UnaryOp::Not => Ok(Type::Int),
                UnaryOp::Negate => self.infer(operand),
            },
            Expression::Binary { left, op, right } => {
                let lt = self.infer(left)?;
                let rt = self.infer(right)?;
                if op.is_comparison() {
                    if lt.is_numeric() && rt.is_numeric() {
                        Ok(Type::Int)
                    } else {
                        Err(CodegenError::new(format!(
                            "comparison requires numeric operands, found {lt} and {rt}"
                        )))
                    }
                } else if op.is_logical() {
                    if lt == Type::Int && rt == Type::Int {
                        Ok(Type::Int)
                    } else {
                        Err(CodegenError::new(format!(
                            "logical operator requires int operands, found {lt} and {rt}"
                        )))
                    }
                } else {
                    arithmetic_result_type(*op, lt, rt)
                }
            }
            Expression::Call { name, .. } => {
                if name == "setValue" {
                    Err(CodegenError::new("'setValue' does not produce a value"))
                } else if self.functions.contains_key(name) {
                    Ok(Type::Int)
                } else {
                    Err(CodegenError::new(format!("call to undefined function '{name}'")))
                }
            }
        }
    }

    fn infer_literal(token: &Token) -> CodegenResult<Type> {
        match token.kind {
            TokenKind::NumericLiteral => {
                Ok(if token.lexeme.contains('.') { Type::Float } else { Type::Int })
            }
            TokenKind::BooleanLiteral => Ok(Type::Int),
            TokenKind::StringLiteral => Ok(Type::String),
            other => Err(CodegenError::new(format!("unsupported literal token kind {other}"))),
        }
    }

    // ---------------------------------------------------------------
    // expressions
    // ---------------------------------------------------------------

    fn lower_expr(&mut self, expr: &Expression) -> CodegenResult<Type> {
        match expr {
            Expression::Literal(token) => self.lower_literal(token),
            Expression::Variable(name) => {
                let (slot, ty) = self
                    .scope
                    .lookup(name)
                    .ok_or_else(|| CodegenError::new(format!("undeclared variable '{name}'")))?;
                match ty {
                    Type::Int => self.code.iload(slot),
                    Type::Float => self.code.fload(slot),
                    Type::String | Type::Stream | Type::Reactive => self.code.aload(slot),
                }
                Ok(ty)
            }
            Expression::Unary { op, operand } => self.lower_unary(*op, operand),
            Expression::Binary { left, op, right } => self.lower_binary(*op, left, right),
            Expression::Call { name, args } => self.lower_call_value(name, args),
        }
    }

    fn lower_literal(&mut self, token: &Token) -> CodegenResult<Type> {
        match token.kind {
            TokenKind::NumericLiteral if token.lexeme.contains('.') => {
                let value: f32 = token
                    .lexeme
                    .parse()
                    .map_err(|_| CodegenError::new(format!("invalid float literal '{}'", token.lexeme)))?;
                let idx = self.pool.float(value);
                self.code.push_float_const(idx);
                Ok(Type::Float)
            }
            TokenKind::NumericLiteral => {
                let value: i32 = token
                    .lexeme
                    .parse()
                    .map_err(|_| CodegenError::new(format!("invalid int literal '{}'", token.lexeme)))?;
                let idx = self.pool.integer(value);
                self.code.push_int_const(idx);
                Ok(Type::Int)
            }
            TokenKind::BooleanLiteral => {
                let idx = self.pool.integer(if token.lexeme == "true" { 1 } else { 0 });
                self.code.push_int_const(idx);
                Ok(Type::Int)
            }
            TokenKind::StringLiteral => {
                let idx = self.pool.string(&token.lexeme);
                self.code.push_string_const(idx);
                Ok(Type::String)
            }
            other => Err(CodegenError::new(format!("unsupported literal token kind {other}"))),
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expression) -> CodegenResult<Type> {
        match op {
            UnaryOp::Negate => {
                let ty = self.lower_expr(operand)?;
                match ty {
                    Type::Int => self.code.ineg(),
                    Type::Float => self.code.fneg(),
                    other => {
                        return Err(CodegenError::new(format!("cannot negate a value of type {other}")))
                    }
                }
                Ok(ty)
            }
            UnaryOp::Not => {
                let ty = self.lower_expr(operand)?;
                if ty != Type::Int {
                    return Err(CodegenError::new(format!(
                        "'!' requires an int operand, found {ty}"
                    )));
                }
                self.select_bool(|cb, label| cb.if_eq_zero(label));
                Ok(Type::Int)
            }
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> CodegenResult<Type> {
        if op.is_comparison() {
            self.lower_comparison(op, left, right)
        } else if op.is_logical() {
            self.lower_logical(op, left, right)
        } else {
            let lt = self.infer(left)?;
            let rt = self.infer(right)?;
            let result_ty = arithmetic_result_type(op, lt, rt)?;
            if result_ty == Type::Reactive {
                self.lower_reactive_arith(op, left, right)
            } else {
                self.lower_plain_arithmetic(op, left, right, lt, rt, result_ty)
            }
        }
    }

    fn lower_plain_arithmetic(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        lt: Type,
        rt: Type,
        result_ty: Type,
    ) -> CodegenResult<Type> {
        let want_float = result_ty == Type::Float;
        self.lower_expr(left)?;
        if want_float && lt == Type::Int {
            self.code.i2f();
        }
        self.lower_expr(right)?;
        if want_float && rt == Type::Int {
            self.code.i2f();
        }
        let opcode = match (op, want_float) {
            (BinaryOp::Add, false) => op::IADD,
            (BinaryOp::Add, true) => op::FADD,
            (BinaryOp::Sub, false) => op::ISUB,
            (BinaryOp::Sub, true) => op::FSUB,
            (BinaryOp::Mul, false) => op::IMUL,
            (BinaryOp::Mul, true) => op::FMUL,
            (BinaryOp::Div, false) => op::IDIV,
            (BinaryOp::Div, true) => op::FDIV,
            _ => unreachable!("non-arithmetic op reached lower_plain_arithmetic"),
        };
        if want_float {
            self.code.farith(opcode);
        } else {
            self.code.iarith(opcode);
        }
        Ok(result_ty)
    }

    /// `spec.md` §4.4 "Reactive arithmetic": the reactive operand (always
    /// the left one, by this compiler's reading — see `SPEC_FULL.md`
    /// §4.4) is pushed first, then the int operand, then a static call
    /// into `ReactiveOps` selected by the reactive operand's own type.
    fn lower_reactive_arith(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> CodegenResult<Type> {
        let reactive_ty = self.infer(left)?;
        self.lower_expr(left)?;
        self.lower_expr(right)?;
        let class_name = if reactive_ty == Type::Stream { "Stream" } else { "Reactive" };
        let descriptor = format!("(L{class_name};I)LReactive;");
        let methodref = self.pool.methodref("ReactiveOps", reactive_op_name(op), &descriptor);
        self.code.invokestatic(methodref, 2, true);
        Ok(Type::Reactive)
    }

    fn lower_comparison(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> CodegenResult<Type> {
        let lt = self.infer(left)?;
        let rt = self.infer(right)?;
        if !lt.is_numeric() || !rt.is_numeric() {
            return Err(CodegenError::new(format!(
                "comparison requires numeric operands, found {lt} and {rt}"
            )));
        }
        let use_float = lt == Type::Float || rt == Type::Float;
        self.lower_expr(left)?;
        if use_float && lt == Type::Int {
            self.code.i2f();
        }
        self.lower_expr(right)?;
        if use_float && rt == Type::Int {
            self.code.i2f();
        }
        if use_float {
            self.code.fcmpg();
            let branch_opcode = fcmp_branch_opcode(op);
            self.select_bool(|cb, label| cb.if_cmp0(branch_opcode, label));
        } else {
            let branch_opcode = icmp_opcode(op);
            self.select_bool(|cb, label| cb.if_icmp(branch_opcode, label));
        }
        Ok(Type::Int)
    }

    fn lower_logical(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> CodegenResult<Type> {
        let lt = self.infer(left)?;
        let rt = self.infer(right)?;
        if lt != Type::Int || rt != Type::Int {
            return Err(CodegenError::new(format!(
                "logical operator requires int operands, found {lt} and {rt}"
            )));
        }
        let short_circuit_label = self.code.new_label();
        let end_label = self.code.new_label();
        self.lower_expr(left)?;
        match op {
            BinaryOp::Or => self.code.if_ne_zero(short_circuit_label),
            BinaryOp::And => self.code.if_eq_zero(short_circuit_label),
            _ => unreachable!("lower_logical called with a non-logical op"),
        }
        self.lower_expr(right)?;
        match op {
            BinaryOp::Or => self.code.if_ne_zero(short_circuit_label),
            BinaryOp::And => self.code.if_eq_zero(short_circuit_label),
            _ => unreachable!(),
        }
        let fall_through = self.pool.integer(if op == BinaryOp::Or { 0 } else { 1 });
        self.code.push_int_const(fall_through);
        self.code.goto(end_label);
        self.code.bind_label(short_circuit_label);
        let shortcut = self.pool.integer(if op == BinaryOp::Or { 1 } else { 0 });
        self.code.push_int_const(shortcut);
        self.code.bind_label(end_label);
        Ok(Type::Int)
    }

    /// `push 0; goto end; true: push 1; end:`, where `branch` emits
    /// whatever conditional jump to `true_label` decides the result is 1.
    fn select_bool(&mut self, branch: impl FnOnce(&mut CodeBuilder, Label)) {
        let true_label = self.code.new_label();
        let end_label = self.code.new_label();
        branch(&mut self.code, true_label);
        let zero = self.pool.integer(0);
        self.code.push_int_const(zero);
        self.code.goto(end_label);
        self.code.bind_label(true_label);
        let one = self.pool.integer(1);
        self.code.push_int_const(one);
        self.code.bind_label(end_label);
    }

    fn lower_call_value(&mut self, name: &str, args: &[Expression]) -> CodegenResult<Type> {
        if name == "setValue" {
            return Err(CodegenError::new("'setValue' does not produce a value"));
        }
        let params = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| CodegenError::new(format!("call to undefined function '{name}'")))?;
        if params.len() != args.len() {
            return Err(CodegenError::new(format!(
                "function '{name}' expects {} argument(s), found {}",
                params.len(),
                args.len()
            )));
        }
        for (param_ty, arg) in params.iter().zip(args) {
            let arg_ty = self.infer(arg)?;
            let widens = *param_ty == Type::Float && arg_ty == Type::Int;
            if !widens && arg_ty != *param_ty {
                return Err(CodegenError::new(format!(
                    "argument to function '{name}' has type {arg_ty}, expected {param_ty}"
                )));
            }
        }
        for (param_ty, arg) in params.iter().zip(args) {
            let arg_ty = self.lower_expr(arg)?;
            if *param_ty == Type::Float && arg_ty == Type::Int {
                self.code.i2f();
            }
        }
        let descriptor = function_descriptor(&params);
        let methodref = self.pool.methodref(self.class_name, name, &descriptor);
        self.code.invokestatic(methodref, args.len() as i32, true);
        Ok(Type::Int)
    }

    fn lower_setvalue_builtin(&mut self, args: &[Expression]) -> CodegenResult<()> {
        if args.len() != 2 {
            return Err(CodegenError::new("'setValue' expects exactly 2 arguments (Stream, int)"));
        }
        let stream_ty = self.infer(&args[0])?;
        if stream_ty != Type::Stream {
            return Err(CodegenError::new(format!(
                "'setValue' expects a Stream as its first argument, found {stream_ty}"
            )));
        }
        let int_ty = self.infer(&args[1])?;
        if int_ty != Type::Int {
            return Err(CodegenError::new(format!(
                "'setValue' expects an int as its second argument, found {int_ty}"
            )));
        }
        self.lower_expr(&args[0])?;
        self.lower_expr(&args[1])?;
        let methodref = self.pool.methodref("Util", "setValue", "(LStream;I)V");
        self.code.invokestatic(methodref, 2, false);
        Ok(())
    }

    // ---------------------------------------------------------------
    // statements
    // ---------------------------------------------------------------

    fn lower_block(&mut self, block: &Block) -> CodegenResult<()> {
        for stmt in &block.statements {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> CodegenResult<()> {
        match stmt {
            Statement::Declaration(Declaration::VarDecl(decl)) => self.lower_var_decl(decl),
            Statement::Declaration(Declaration::FuncDecl(_)) => Err(CodegenError::new(
                "function declarations are only allowed at the top level",
            )),
            Statement::Assignment(assign) => self.lower_assignment(assign),
            Statement::ExpressionStmt(Expression::Call { name, args }) if name == "setValue" => {
                self.lower_setvalue_builtin(args)
            }
            Statement::ExpressionStmt(expr) => {
                self.lower_expr(expr)?;
                self.code.pop();
                Ok(())
            }
            Statement::Print(expr) => self.lower_print(expr),
            Statement::If(if_stmt) => self.lower_if(if_stmt),
            Statement::While(while_stmt) => self.lower_while(while_stmt),
            Statement::For(for_stmt) => self.lower_for(for_stmt),
            Statement::Return(expr) => self.lower_return(expr),
            Statement::Block(block) => self.lower_block(block),
        }
    }

    fn lower_var_decl(&mut self, decl: &VarDecl) -> CodegenResult<()> {
        match decl.ty {
            Type::Int => {
                match &decl.initializer {
                    Some(expr) => {
                        let ty = self.infer(expr)?;
                        if ty != Type::Int {
                            return Err(CodegenError::new(format!(
                                "'{}' is declared int but initialized with {ty}",
                                decl.name
                            )));
                        }
                        self.lower_expr(expr)?;
                    }
                    None => {
                        let zero = self.pool.integer(0);
                        self.code.push_int_const(zero);
                    }
                }
                let slot = self.scope.declare(&decl.name, Type::Int);
                self.code.istore(slot);
            }
            Type::Float => {
                match &decl.initializer {
                    Some(expr) => {
                        let ty = self.infer(expr)?;
                        self.lower_expr(expr)?;
                        if ty == Type::Int {
                            self.code.i2f();
                        } else if ty != Type::Float {
                            return Err(CodegenError::new(format!(
                                "'{}' is declared float but initialized with {ty}",
                                decl.name
                            )));
                        }
                    }
                    None => {
                        let zero = self.pool.float(0.0);
                        self.code.push_float_const(zero);
                    }
                }
                let slot = self.scope.declare(&decl.name, Type::Float);
                self.code.fstore(slot);
            }
            Type::String => {
                match &decl.initializer {
                    Some(expr) => {
                        let ty = self.infer(expr)?;
                        if ty != Type::String {
                            return Err(CodegenError::new(format!(
                                "'{}' is declared string but initialized with {ty}",
                                decl.name
                            )));
                        }
                        self.lower_expr(expr)?;
                    }
                    None => {
                        let empty = self.pool.string("");
                        self.code.push_string_const(empty);
                    }
                }
                let slot = self.scope.declare(&decl.name, Type::String);
                self.code.astore(slot);
            }
            Type::Stream => {
                let class_idx = self.pool.class("Stream");
                self.code.new_object(class_idx);
                self.code.dup();
                let ctor = self.pool.methodref("Stream", "<init>", "()V");
                self.code.invokespecial(ctor, 0);
                if let Some(expr) = &decl.initializer {
                    let ty = self.infer(expr)?;
                    if ty != Type::Int {
                        return Err(CodegenError::new(format!(
                            "a Stream initializer must be int, found {ty}"
                        )));
                    }
                    self.code.dup();
                    self.lower_expr(expr)?;
                    let box_int = self.pool.methodref(
                        "java/lang/Integer",
                        "valueOf",
                        "(I)Ljava/lang/Integer;",
                    );
                    self.code.invokestatic(box_int, 1, true);
                    let set_value = self.pool.methodref("Stream", "setValue", "(Ljava/lang/Integer;)V");
                    self.code.invokevirtual(set_value, 1, false);
                }
                let slot = self.scope.declare(&decl.name, Type::Stream);
                self.code.astore(slot);
            }
            Type::Reactive => {
                match &decl.initializer {
                    Some(expr) => {
                        let ty = self.infer(expr)?;
                        if ty != Type::Reactive {
                            return Err(CodegenError::new(format!(
                                "'{}' is declared Reactive but initialized with {ty}",
                                decl.name
                            )));
                        }
                        self.lower_expr(expr)?;
                    }
                    None => self.code.aconst_null(),
                }
                let slot = self.scope.declare(&decl.name, Type::Reactive);
                self.code.astore(slot);
            }
        }
        Ok(())
    }

    fn lower_assignment(&mut self, assign: &Assignment) -> CodegenResult<()> {
        let (slot, ty) = self
            .scope
            .lookup(&assign.name)
            .ok_or_else(|| CodegenError::new(format!("undeclared variable '{}'", assign.name)))?;
        let value_ty = self.infer(&assign.value)?;
        match ty {
            Type::Int => {
                if value_ty != Type::Int {
                    return Err(CodegenError::new(format!(
                        "cannot assign {value_ty} to int variable '{}'",
                        assign.name
                    )));
                }
                self.lower_expr(&assign.value)?;
                self.code.istore(slot);
            }
            Type::Float => {
                self.lower_expr(&assign.value)?;
                if value_ty == Type::Int {
                    self.code.i2f();
                } else if value_ty != Type::Float {
                    return Err(CodegenError::new(format!(
                        "cannot assign {value_ty} to float variable '{}'",
                        assign.name
                    )));
                }
                self.code.fstore(slot);
            }
            Type::String | Type::Stream | Type::Reactive => {
                if value_ty != ty {
                    return Err(CodegenError::new(format!(
                        "cannot assign {value_ty} to {ty} variable '{}'",
                        assign.name
                    )));
                }
                self.lower_expr(&assign.value)?;
                self.code.astore(slot);
            }
        }
        Ok(())
    }

    fn lower_print(&mut self, expr: &Expression) -> CodegenResult<()> {
        let ty = self.infer(expr)?;
        if ty == Type::Reactive {
            self.lower_expr(expr)?;
            let get_value = self.pool.methodref("Reactive", "getValue", "()Ljava/lang/Integer;");
            self.code.invokevirtual(get_value, 0, true);
            let print_reactive =
                self.pool.methodref("Util", "printReactiveValue", "(Ljava/lang/Integer;)V");
            self.code.invokestatic(print_reactive, 1, false);
            return Ok(());
        }
        let out_field = self.pool.fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
        self.code.getstatic(out_field);
        self.lower_expr(expr)?;
        let descriptor = match ty {
            Type::Int => "(I)V",
            Type::Float => "(F)V",
            Type::String => "(Ljava/lang/String;)V",
            Type::Stream => "(Ljava/lang/Object;)V",
            Type::Reactive => unreachable!("handled above"),
        };
        let println = self.pool.methodref("java/io/PrintStream", "println", descriptor);
        self.code.invokevirtual(println, 1, false);
        Ok(())
    }

    fn lower_if(&mut self, if_stmt: &If) -> CodegenResult<()> {
        let cond_ty = self.infer(&if_stmt.condition)?;
        if cond_ty != Type::Int {
            return Err(CodegenError::new(format!("if condition must be int, found {cond_ty}")));
        }
        let else_label = self.code.new_label();
        let end_label = self.code.new_label();
        self.lower_expr(&if_stmt.condition)?;
        self.code.if_eq_zero(else_label);
        self.lower_block(&if_stmt.then_block)?;
        self.code.goto(end_label);
        self.code.bind_label(else_label);
        if let Some(else_block) = &if_stmt.else_block {
            self.lower_block(else_block)?;
        }
        self.code.bind_label(end_label);
        Ok(())
    }

    fn lower_while(&mut self, while_stmt: &While) -> CodegenResult<()> {
        let cond_ty = self.infer(&while_stmt.condition)?;
        if cond_ty != Type::Int {
            return Err(CodegenError::new(format!("while condition must be int, found {cond_ty}")));
        }
        let start_label = self.code.new_label();
        let end_label = self.code.new_label();
        self.code.bind_label(start_label);
        self.lower_expr(&while_stmt.condition)?;
        self.code.if_eq_zero(end_label);
        self.lower_block(&while_stmt.body)?;
        self.code.goto(start_label);
        self.code.bind_label(end_label);
        Ok(())
    }

    fn lower_for(&mut self, for_stmt: &For) -> CodegenResult<()> {
        if let Some(init) = &for_stmt.init {
            self.lower_statement(init)?;
        }
        let start_label = self.code.new_label();
        let end_label = self.code.new_label();
        self.code.bind_label(start_label);
        if let Some(cond) = &for_stmt.cond {
            let cond_ty = self.infer(cond)?;
            if cond_ty != Type::Int {
                return Err(CodegenError::new(format!("for condition must be int, found {cond_ty}")));
            }
            self.lower_expr(cond)?;
            self.code.if_eq_zero(end_label);
        }
        self.lower_block(&for_stmt.body)?;
        if let Some(update) = &for_stmt.update {
            self.lower_statement(update)?;
        }
        self.code.goto(start_label);
        self.code.bind_label(end_label);
        Ok(())
    }

    /// `spec.md` §4.4 "Return": inside a function, the expression is
    /// lowered and `ireturn` exits immediately. Inside `main` (the
    /// outermost, void frame), the value is discarded and control falls
    /// through to the method's own `return` rather than exiting early —
    /// `main` has no caller to hand an int back to.
    fn lower_return(&mut self, expr: &Expression) -> CodegenResult<()> {
        if self.is_void {
            self.infer(expr)?;
            self.lower_expr(expr)?;
            self.code.pop();
            return Ok(());
        }
        let ty = self.infer(expr)?;
        if ty != Type::Int {
            return Err(CodegenError::new(format!("a function must return int, found {ty}")));
        }
        self.lower_expr(expr)?;
        self.code.ireturn();
        Ok(())
    }
}

/// Pre-scans the top-level statements for `FuncDecl`s so that forward and
/// mutually recursive calls resolve regardless of textual order
/// (`spec.md` §3: "backward references ... resolved by name lookup at
/// emit time, not by pointer").
fn collect_function_signatures(program: &Program) -> HashMap<String, Vec<Type>> {
    program
        .statements
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::Declaration(Declaration::FuncDecl(FuncDecl { name, params, .. })) => {
                Some((name.clone(), params.iter().map(|p| p.ty).collect()))
            }
            _ => None,
        })
        .collect()
}

/// Emits `program` as a class named `class_name`, returning the raw bytes
/// of a `<class_name>.class` file (`spec.md` §6's output artifact
/// contract).
pub fn emit(program: &Program, class_name: &str) -> CodegenResult<Vec<u8>> {
    let functions = collect_function_signatures(program);
    let mut writer = ClassWriter::new(class_name);

    emit_constructor(&mut writer);
    emit_main(&mut writer, program, &functions, class_name)?;

    for stmt in &program.statements {
        if let Statement::Declaration(Declaration::FuncDecl(func)) = stmt {
            emit_function(&mut writer, func, &functions, class_name)?;
        }
    }

    Ok(writer.to_bytes())
}

fn emit_constructor(writer: &mut ClassWriter) {
    let name = writer.pool.utf8("<init>");
    let descriptor = writer.pool.utf8("()V");
    let mut code = CodeBuilder::new();
    code.aload(0);
    let object_init = writer.pool.methodref("java/lang/Object", "<init>", "()V");
    code.invokespecial(object_init, 0);
    code.vreturn();
    let (code, max_stack) = code.finish();
    writer.add_method(MethodSpec {
        access_flags: ACC_PUBLIC,
        name_index: name,
        descriptor_index: descriptor,
        max_stack,
        max_locals: 1,
        code,
    });
}

fn emit_main(
    writer: &mut ClassWriter,
    program: &Program,
    functions: &HashMap<String, Vec<Type>>,
    class_name: &str,
) -> CodegenResult<()> {
    let mut fe = FunctionEmitter::new(&mut writer.pool, functions, class_name, 1, true);
    for stmt in &program.statements {
        if matches!(stmt, Statement::Declaration(Declaration::FuncDecl(_))) {
            continue;
        }
        fe.lower_statement(stmt)?;
    }
    fe.code.vreturn();
    let max_locals = fe.scope.slot_count().max(1);
    let (code, max_stack) = fe.code.finish();

    let name = writer.pool.utf8("main");
    let descriptor = writer.pool.utf8("([Ljava/lang/String;)V");
    writer.add_method(MethodSpec {
        access_flags: ACC_PUBLIC | ACC_STATIC,
        name_index: name,
        descriptor_index: descriptor,
        max_stack,
        max_locals: max_locals as u16,
        code,
    });
    Ok(())
}

fn emit_function(
    writer: &mut ClassWriter,
    func: &FuncDecl,
    functions: &HashMap<String, Vec<Type>>,
    class_name: &str,
) -> CodegenResult<()> {
    let mut fe = FunctionEmitter::new(&mut writer.pool, functions, class_name, 0, false);
    for param in &func.params {
        fe.scope.declare(&param.name, param.ty);
    }
    fe.lower_block(&func.body)?;

    // `spec.md` §4.4: "A function always ends with an implicit
    // `push int 0; return int` guard after the body to satisfy the
    // verifier." Dead code when every path already returned explicitly.
    let zero = fe.pool.integer(0);
    fe.code.push_int_const(zero);
    fe.code.ireturn();

    let max_locals = fe.scope.slot_count().max(func.params.len() as u8);
    let (code, max_stack) = fe.code.finish();

    let param_types: Vec<Type> = func.params.iter().map(|p| p.ty).collect();
    let descriptor_str = function_descriptor(&param_types);
    let name = writer.pool.utf8(&func.name);
    let descriptor = writer.pool.utf8(&descriptor_str);
    writer.add_method(MethodSpec {
        access_flags: ACC_PUBLIC | ACC_STATIC,
        name_index: name,
        descriptor_index: descriptor,
        max_stack,
        max_locals: max_locals as u16,
        code,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::optimizer::optimize;
    use crate::parser::parse;

    fn compile(src: &str) -> CodegenResult<Vec<u8>> {
        let tokens = Lexer::new(src).lex().unwrap();
        let program = parse(tokens).unwrap();
        let program = optimize(program);
        emit(&program, "Main")
    }

    #[test]
    fn emits_a_well_formed_class_for_constant_folded_arithmetic() {
        let bytes = compile("int a = 2 + 3 * 4; print(a);").unwrap();
        assert_eq!(&bytes[0..4], &0xCAFEBABEu32.to_be_bytes());
    }

    #[test]
    fn rejects_string_concatenation() {
        let result = compile(r#"string a = "x" + "y"; print(a);"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_undeclared_variable() {
        let result = compile("print(missing);");
        assert!(matches!(result, Err(CodegenError { .. })));
    }

    #[test]
    fn rejects_call_to_undefined_function() {
        let result = compile("print(mystery(1));");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_recursive_and_forward_referencing_functions() {
        let src = "function fib(int n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } print(fib(5));";
        assert!(compile(src).is_ok());
    }

    #[test]
    fn accepts_stream_and_reactive_arithmetic() {
        let src = "Stream s = 5; Reactive r = s * 2; print(r); setValue(s, 7); print(r);";
        assert!(compile(src).is_ok());
    }

    #[test]
    fn accepts_for_loop_over_ints() {
        let src = "for (int i = 0; i < 3; i = i + 1) { print(i); }";
        assert!(compile(src).is_ok());
    }

    #[test]
    fn rejects_reactive_operand_on_the_right() {
        let result = compile("Stream s = 5; Reactive r = 2 * s; print(r);");
        assert!(result.is_err());
    }

    #[test]
    fn empty_function_body_is_valid() {
        let src = "function f() {} print(f());";
        assert!(compile(src).is_ok());
    }
}
