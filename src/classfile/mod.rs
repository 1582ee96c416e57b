//! Binary JVM class-file writer: the emitter's backend. Produces bytes for
//! classfile major version 49 (`SPEC_FULL.md` §3 design note) — the last
//! major version the JVM still loads under the legacy type-inferring
//! verifier without a `StackMapTable` attribute, which this compiler never
//! has to compute.
mod code;
mod constant_pool;
pub mod opcode;

pub use code::{CodeBuilder, Label};
pub use constant_pool::ConstantPool;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;

const MAGIC: u32 = 0xCAFE_BABE;
const MAJOR_VERSION: u16 = 49;
const MINOR_VERSION: u16 = 0;

/// One `method_info` entry: name/descriptor already interned into the
/// class's constant pool, plus its assembled `Code` attribute.
pub struct MethodSpec {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
}

/// Assembles one class's full binary representation: one constant pool,
/// no fields, no interfaces, and a flat list of methods (a default
/// constructor, `main`, and one method per user function per
/// `SPEC_FULL.md` §4.4).
pub struct ClassWriter {
    pub pool: ConstantPool,
    this_class: String,
    super_class: String,
    methods: Vec<MethodSpec>,
}

impl ClassWriter {
    pub fn new(this_class: &str) -> Self {
        let mut pool = ConstantPool::new();
        pool.class(this_class);
        pool.class("java/lang/Object");
        ClassWriter {
            pool,
            this_class: this_class.to_string(),
            super_class: "java/lang/Object".to_string(),
            methods: Vec::new(),
        }
    }

    pub fn add_method(&mut self, method: MethodSpec) {
        self.methods.push(method);
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        let code_attr_name = self.pool.utf8("Code");
        let this_idx = self.pool.class(&self.this_class);
        let super_idx = self.pool.class(&self.super_class);

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&MINOR_VERSION.to_be_bytes());
        out.extend_from_slice(&MAJOR_VERSION.to_be_bytes());

        out.extend_from_slice(&self.pool.count().to_be_bytes());
        self.pool.write_to(&mut out);

        out.extend_from_slice(&(ACC_PUBLIC | ACC_SUPER).to_be_bytes());
        out.extend_from_slice(&this_idx.to_be_bytes());
        out.extend_from_slice(&super_idx.to_be_bytes());

        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces_count
        out.extend_from_slice(&0u16.to_be_bytes()); // fields_count

        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            out.extend_from_slice(&method.access_flags.to_be_bytes());
            out.extend_from_slice(&method.name_index.to_be_bytes());
            out.extend_from_slice(&method.descriptor_index.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes()); // attributes_count: just Code

            let mut code_attr = Vec::new();
            code_attr.extend_from_slice(&method.max_stack.to_be_bytes());
            code_attr.extend_from_slice(&method.max_locals.to_be_bytes());
            code_attr.extend_from_slice(&(method.code.len() as u32).to_be_bytes());
            code_attr.extend_from_slice(&method.code);
            code_attr.extend_from_slice(&0u16.to_be_bytes()); // exception_table_length
            code_attr.extend_from_slice(&0u16.to_be_bytes()); // attributes_count

            out.extend_from_slice(&code_attr_name.to_be_bytes());
            out.extend_from_slice(&(code_attr.len() as u32).to_be_bytes());
            out.extend_from_slice(&code_attr);
        }

        out.extend_from_slice(&0u16.to_be_bytes()); // class attributes_count
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_a_well_formed_header() {
        let writer = ClassWriter::new("Main");
        let bytes = writer.to_bytes();
        assert_eq!(&bytes[0..4], &MAGIC.to_be_bytes());
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), MINOR_VERSION);
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), MAJOR_VERSION);
    }

    #[test]
    fn a_method_round_trips_into_the_methods_table() {
        let mut writer = ClassWriter::new("Main");
        let name = writer.pool.utf8("main");
        let desc = writer.pool.utf8("([Ljava/lang/String;)V");
        let mut cb = CodeBuilder::new();
        cb.vreturn();
        let (code, max_stack) = cb.finish();
        writer.add_method(MethodSpec {
            access_flags: ACC_PUBLIC | ACC_STATIC,
            name_index: name,
            descriptor_index: desc,
            max_stack,
            max_locals: 1,
            code,
        });
        let bytes = writer.to_bytes();
        assert!(bytes.len() > 10);
    }
}
