use super::opcode as op;

/// An as-yet-unresolved branch target within a single method body. Opaque
/// outside this module; the emitter only ever creates one via
/// [`CodeBuilder::new_label`] and binds it with [`CodeBuilder::bind_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

enum Op {
    Raw(Vec<u8>),
    Label(Label),
    /// A 3-byte instruction: one opcode byte followed by a signed 16-bit
    /// offset computed relative to the branch instruction's own address.
    Branch { opcode: u8, target: Label },
}

impl Op {
    fn len(&self) -> u32 {
        match self {
            Op::Raw(bytes) => bytes.len() as u32,
            Op::Label(_) => 0,
            Op::Branch { .. } => 3,
        }
    }
}

/// Assembles one method's `Code` attribute body: a forward-label-based
/// stack-machine instruction stream (`SPEC_FULL.md` §4.4), emitted in two
/// passes so that branches — which in Cesium source always jump forward,
/// except the `while`/`for` loop-back edge — can target labels bound
/// after the jump itself is appended.
pub struct CodeBuilder {
    ops: Vec<Op>,
    next_label: usize,
    depth: i32,
    max_depth: i32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        CodeBuilder { ops: Vec::new(), next_label: 0, depth: 0, max_depth: 0 }
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn bind_label(&mut self, label: Label) {
        self.ops.push(Op::Label(label));
    }

    fn touch(&mut self, delta: i32) {
        self.depth += delta;
        if self.depth > self.max_depth {
            self.max_depth = self.depth;
        }
    }

    fn raw(&mut self, bytes: Vec<u8>, stack_delta: i32) {
        self.ops.push(Op::Raw(bytes));
        self.touch(stack_delta);
    }

    fn u16_arg(opcode: u8, idx: u16) -> Vec<u8> {
        let mut bytes = vec![opcode];
        bytes.extend_from_slice(&idx.to_be_bytes());
        bytes
    }

    // --- constant pushes -------------------------------------------------

    fn ldc(&mut self, cp_index: u16, stack_delta: i32) {
        if cp_index <= 0xFF {
            self.raw(vec![op::LDC, cp_index as u8], stack_delta);
        } else {
            self.raw(Self::u16_arg(op::LDC_W, cp_index), stack_delta);
        }
    }

    pub fn push_int_const(&mut self, cp_index: u16) {
        self.ldc(cp_index, 1);
    }

    pub fn push_float_const(&mut self, cp_index: u16) {
        self.ldc(cp_index, 1);
    }

    pub fn push_string_const(&mut self, cp_index: u16) {
        self.ldc(cp_index, 1);
    }

    pub fn aconst_null(&mut self) {
        self.raw(vec![op::ACONST_NULL], 1);
    }

    // --- locals ------------------------------------------------------------

    pub fn iload(&mut self, slot: u8) {
        self.raw(vec![op::ILOAD, slot], 1);
    }

    pub fn fload(&mut self, slot: u8) {
        self.raw(vec![op::FLOAD, slot], 1);
    }

    pub fn aload(&mut self, slot: u8) {
        self.raw(vec![op::ALOAD, slot], 1);
    }

    pub fn istore(&mut self, slot: u8) {
        self.raw(vec![op::ISTORE, slot], -1);
    }

    pub fn fstore(&mut self, slot: u8) {
        self.raw(vec![op::FSTORE, slot], -1);
    }

    pub fn astore(&mut self, slot: u8) {
        self.raw(vec![op::ASTORE, slot], -1);
    }

    // --- arithmetic / conversion --------------------------------------

    pub fn i2f(&mut self) {
        self.raw(vec![op::I2F], 0);
    }

    pub fn ineg(&mut self) {
        self.raw(vec![op::INEG], 0);
    }

    pub fn fneg(&mut self) {
        self.raw(vec![op::FNEG], 0);
    }

    pub fn iarith(&mut self, opcode: u8) {
        self.raw(vec![opcode], -1);
    }

    pub fn farith(&mut self, opcode: u8) {
        self.raw(vec![opcode], -1);
    }

    pub fn fcmpg(&mut self) {
        self.raw(vec![op::FCMPG], -1);
    }

    pub fn dup(&mut self) {
        self.raw(vec![op::DUP], 1);
    }

    pub fn pop(&mut self) {
        self.raw(vec![op::POP], -1);
    }

    // --- control flow --------------------------------------------------

    pub fn goto(&mut self, target: Label) {
        self.ops.push(Op::Branch { opcode: op::GOTO, target });
    }

    /// Pops one int and branches if `opcode`'s single-operand relation to
    /// zero holds (`ifeq`/`ifne`/`iflt`/`ifge`/`ifgt`/`ifle`).
    pub fn if_cmp0(&mut self, opcode: u8, target: Label) {
        self.ops.push(Op::Branch { opcode, target });
        self.touch(-1);
    }

    /// Pops an int; branches if it is zero. Used for `if`/`while`/`for`
    /// condition tests (`spec.md` §4.4's branch-on-zero idiom).
    pub fn if_eq_zero(&mut self, target: Label) {
        self.if_cmp0(op::IFEQ, target);
    }

    pub fn if_ne_zero(&mut self, target: Label) {
        self.if_cmp0(op::IFNE, target);
    }

    /// Pops two ints and branches if `icmp_opcode`'s relation holds. Used
    /// by the comparison branch-and-select idiom.
    pub fn if_icmp(&mut self, icmp_opcode: u8, target: Label) {
        self.ops.push(Op::Branch { opcode: icmp_opcode, target });
        self.touch(-2);
    }

    // --- invocation ------------------------------------------------------

    pub fn invokestatic(&mut self, methodref_idx: u16, arg_count: i32, has_return: bool) {
        self.raw(
            Self::u16_arg(op::INVOKESTATIC, methodref_idx),
            -arg_count + if has_return { 1 } else { 0 },
        );
    }

    pub fn invokevirtual(&mut self, methodref_idx: u16, arg_count: i32, has_return: bool) {
        // -1 for the receiver, -arg_count for the arguments, +1 if it returns a value.
        self.raw(
            Self::u16_arg(op::INVOKEVIRTUAL, methodref_idx),
            -1 - arg_count + if has_return { 1 } else { 0 },
        );
    }

    pub fn invokespecial(&mut self, methodref_idx: u16, arg_count: i32) {
        self.raw(Self::u16_arg(op::INVOKESPECIAL, methodref_idx), -1 - arg_count);
    }

    pub fn getstatic(&mut self, fieldref_idx: u16) {
        self.raw(Self::u16_arg(op::GETSTATIC, fieldref_idx), 1);
    }

    pub fn new_object(&mut self, class_idx: u16) {
        self.raw(Self::u16_arg(op::NEW, class_idx), 1);
    }

    pub fn vreturn(&mut self) {
        self.raw(vec![op::RETURN], 0);
    }

    pub fn ireturn(&mut self) {
        self.raw(vec![op::IRETURN], -1);
    }

    /// Current stack depth, usable as a sanity check at statement
    /// boundaries (should always return to 0 between top-level statements).
    pub fn current_depth(&self) -> i32 {
        self.depth
    }

    /// Resolve labels and serialize to the method's raw `code` bytes,
    /// returning `(code_bytes, max_stack)`. `max_locals` is supplied by the
    /// caller, which already knows the frame's slot count.
    pub fn finish(self) -> (Vec<u8>, u16) {
        let mut offsets = std::collections::HashMap::new();
        let mut cursor: u32 = 0;
        for op in &self.ops {
            if let Op::Label(label) = op {
                offsets.insert(*label, cursor);
            }
            cursor += op.len();
        }

        let mut out = Vec::new();
        let mut cursor: u32 = 0;
        for entry in &self.ops {
            match entry {
                Op::Raw(bytes) => out.extend_from_slice(bytes),
                Op::Label(_) => {}
                Op::Branch { opcode, target } => {
                    let target_offset = offsets[target] as i64;
                    let rel = target_offset - cursor as i64;
                    out.push(*opcode);
                    out.extend_from_slice(&(rel as i16).to_be_bytes());
                }
            }
            cursor += entry.len();
        }

        let max_stack = self.max_depth.max(1) as u16;
        (out, max_stack)
    }
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_goto_resolves_to_a_positive_offset() {
        let mut cb = CodeBuilder::new();
        let end = cb.new_label();
        cb.goto(end);
        cb.iload(0); // dead code the jump skips, just to give the target a nonzero offset
        cb.bind_label(end);
        cb.vreturn();
        let (code, _) = cb.finish();
        // goto opcode, then a positive big-endian i16 offset of 3 (skips iload's 2 bytes + itself's 3... wait just assert decodable)
        assert_eq!(code[0], op::GOTO);
        let rel = i16::from_be_bytes([code[1], code[2]]);
        assert!(rel > 0);
    }

    #[test]
    fn backward_goto_resolves_to_a_negative_offset() {
        let mut cb = CodeBuilder::new();
        let top = cb.new_label();
        cb.bind_label(top);
        cb.iload(0);
        cb.pop();
        cb.goto(top);
        cb.vreturn();
        let (code, _) = cb.finish();
        // the goto is the third instruction (after iload(2 bytes)+pop(1 byte))
        let rel = i16::from_be_bytes([code[3], code[4]]);
        assert!(rel < 0);
    }

    #[test]
    fn max_stack_tracks_peak_depth() {
        let mut cb = CodeBuilder::new();
        cb.iload(0);
        cb.iload(1);
        cb.iarith(op::IADD);
        cb.istore(2);
        let (_, max_stack) = cb.finish();
        assert_eq!(max_stack, 2);
    }
}
