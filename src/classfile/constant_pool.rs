use std::collections::HashMap;

/// Tag bytes for the constant-pool entry kinds this emitter ever writes.
mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const NAME_AND_TYPE: u8 = 12;
}

#[derive(Debug, Clone)]
enum CpEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Class(u16),
    StringRef(u16),
    NameAndType(u16, u16),
    Methodref(u16, u16),
    Fieldref(u16, u16),
}

/// The class file's constant pool (JVM spec §4.4), built incrementally by
/// the emitter. Every `push_*` method deduplicates: asking for the same
/// logical constant twice returns the same index, matching how `javac`
/// itself keeps the pool compact.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<CpEntry>,
    utf8: HashMap<String, u16>,
    class: HashMap<String, u16>,
    string: HashMap<String, u16>,
    integer: HashMap<i32, u16>,
    float: HashMap<u32, u16>,
    name_and_type: HashMap<(u16, u16), u16>,
    methodref: HashMap<(u16, u16), u16>,
    fieldref: HashMap<(u16, u16), u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: CpEntry) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(&idx) = self.utf8.get(s) {
            return idx;
        }
        let idx = self.push(CpEntry::Utf8(s.to_string()));
        self.utf8.insert(s.to_string(), idx);
        idx
    }

    /// `internal_name` uses `/`-separated form, e.g. `java/lang/Object`.
    pub fn class(&mut self, internal_name: &str) -> u16 {
        if let Some(&idx) = self.class.get(internal_name) {
            return idx;
        }
        let name_idx = self.utf8(internal_name);
        let idx = self.push(CpEntry::Class(name_idx));
        self.class.insert(internal_name.to_string(), idx);
        idx
    }

    pub fn string(&mut self, value: &str) -> u16 {
        if let Some(&idx) = self.string.get(value) {
            return idx;
        }
        let utf8_idx = self.utf8(value);
        let idx = self.push(CpEntry::StringRef(utf8_idx));
        self.string.insert(value.to_string(), idx);
        idx
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        if let Some(&idx) = self.integer.get(&value) {
            return idx;
        }
        let idx = self.push(CpEntry::Integer(value));
        self.integer.insert(value, idx);
        idx
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let bits = value.to_bits();
        if let Some(&idx) = self.float.get(&bits) {
            return idx;
        }
        let idx = self.push(CpEntry::Float(value));
        self.float.insert(bits, idx);
        idx
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(descriptor);
        if let Some(&idx) = self.name_and_type.get(&(name_idx, desc_idx)) {
            return idx;
        }
        let idx = self.push(CpEntry::NameAndType(name_idx, desc_idx));
        self.name_and_type.insert((name_idx, desc_idx), idx);
        idx
    }

    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_idx = self.class(class);
        let nat_idx = self.name_and_type(name, descriptor);
        if let Some(&idx) = self.methodref.get(&(class_idx, nat_idx)) {
            return idx;
        }
        let idx = self.push(CpEntry::Methodref(class_idx, nat_idx));
        self.methodref.insert((class_idx, nat_idx), idx);
        idx
    }

    pub fn fieldref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_idx = self.class(class);
        let nat_idx = self.name_and_type(name, descriptor);
        if let Some(&idx) = self.fieldref.get(&(class_idx, nat_idx)) {
            return idx;
        }
        let idx = self.push(CpEntry::Fieldref(class_idx, nat_idx));
        self.fieldref.insert((class_idx, nat_idx), idx);
        idx
    }

    /// `constant_pool_count` is entry count + 1 (index 0 is reserved).
    pub fn count(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        for entry in &self.entries {
            match entry {
                CpEntry::Utf8(s) => {
                    out.push(tag::UTF8);
                    let bytes = s.as_bytes();
                    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                    out.extend_from_slice(bytes);
                }
                CpEntry::Integer(v) => {
                    out.push(tag::INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                CpEntry::Float(v) => {
                    out.push(tag::FLOAT);
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
                CpEntry::Class(name_idx) => {
                    out.push(tag::CLASS);
                    out.extend_from_slice(&name_idx.to_be_bytes());
                }
                CpEntry::StringRef(utf8_idx) => {
                    out.push(tag::STRING);
                    out.extend_from_slice(&utf8_idx.to_be_bytes());
                }
                CpEntry::NameAndType(name_idx, desc_idx) => {
                    out.push(tag::NAME_AND_TYPE);
                    out.extend_from_slice(&name_idx.to_be_bytes());
                    out.extend_from_slice(&desc_idx.to_be_bytes());
                }
                CpEntry::Methodref(class_idx, nat_idx) => {
                    out.push(tag::METHODREF);
                    out.extend_from_slice(&class_idx.to_be_bytes());
                    out.extend_from_slice(&nat_idx.to_be_bytes());
                }
                CpEntry::Fieldref(class_idx, nat_idx) => {
                    out.push(tag::FIELDREF);
                    out.extend_from_slice(&class_idx.to_be_bytes());
                    out.extend_from_slice(&nat_idx.to_be_bytes());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_the_same_index() {
        let mut pool = ConstantPool::new();
        let a = pool.utf8("Stream");
        let b = pool.utf8("Stream");
        assert_eq!(a, b);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn class_entries_intern_their_utf8_name() {
        let mut pool = ConstantPool::new();
        pool.class("java/lang/Object");
        // Class + its Utf8 name, nothing else.
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn methodref_dedups_identical_calls() {
        let mut pool = ConstantPool::new();
        let a = pool.methodref("Stream", "getValue", "()Ljava/lang/Integer;");
        let b = pool.methodref("Stream", "getValue", "()Ljava/lang/Integer;");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_integers_get_distinct_entries() {
        let mut pool = ConstantPool::new();
        let a = pool.integer(1);
        let b = pool.integer(2);
        assert_ne!(a, b);
    }
}
