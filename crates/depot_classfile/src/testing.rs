//! Minimal class-file writer for tests.
//!
//! Available to other crates through the `test-support` feature.

use std::collections::HashMap;

/// A field or method to emit.
pub struct MemberDef {
    flags: u16,
    name: String,
    descriptor: String,
    constant_int: Option<i32>,
    throws: Vec<String>,
    annotation_default_int: Option<i32>,
    parameter_annotations: Vec<String>,
}

impl MemberDef {
    /// A member with raw access flags, name and descriptor.
    pub fn new(flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            constant_int: None,
            throws: Vec::new(),
            annotation_default_int: None,
            parameter_annotations: Vec::new(),
        }
    }

    /// Adds an integer `ConstantValue` attribute.
    pub fn constant_int(mut self, value: i32) -> Self {
        self.constant_int = Some(value);
        self
    }

    /// Adds an entry to the `Exceptions` attribute.
    pub fn throws(mut self, internal_name: &str) -> Self {
        self.throws.push(internal_name.to_string());
        self
    }

    /// Adds an integer `AnnotationDefault` attribute.
    pub fn annotation_default_int(mut self, value: i32) -> Self {
        self.annotation_default_int = Some(value);
        self
    }

    /// Annotates the first (and only) parameter.
    pub fn parameter_annotation_visible(mut self, descriptor: &str) -> Self {
        self.parameter_annotations.push(descriptor.to_string());
        self
    }
}

#[derive(Default)]
struct Pool {
    entries: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, u16>,
}

impl Pool {
    fn add(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(&i) = self.index.get(&entry) {
            return i;
        }
        self.entries.push(entry.clone());
        let i = self.entries.len() as u16;
        self.index.insert(entry, i);
        i
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let mut e = vec![1];
        e.extend_from_slice(&(s.len() as u16).to_be_bytes());
        e.extend_from_slice(s.as_bytes());
        self.add(e)
    }

    fn class(&mut self, name: &str) -> u16 {
        let n = self.utf8(name);
        let mut e = vec![7];
        e.extend_from_slice(&n.to_be_bytes());
        self.add(e)
    }

    fn integer(&mut self, v: i32) -> u16 {
        let mut e = vec![3];
        e.extend_from_slice(&v.to_be_bytes());
        self.add(e)
    }

    fn member_ref(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let n = self.utf8(name);
        let d = self.utf8(descriptor);
        let mut nat = vec![12];
        nat.extend_from_slice(&n.to_be_bytes());
        nat.extend_from_slice(&d.to_be_bytes());
        let nat = self.add(nat);
        let mut e = vec![tag];
        e.extend_from_slice(&class.to_be_bytes());
        e.extend_from_slice(&nat.to_be_bytes());
        self.add(e)
    }
}

/// Builds the bytes of a class file.
pub struct ClassBuilder {
    pool: Pool,
    flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    source_file: Option<String>,
    signature: Option<String>,
    class_annotations: Vec<String>,
    fields: Vec<MemberDef>,
    methods: Vec<MemberDef>,
}

impl ClassBuilder {
    /// A public class with the given internal names.
    pub fn new(this_class: &str, super_class: Option<&str>) -> Self {
        Self {
            pool: Pool::default(),
            flags: 0x0021,
            this_class: this_class.to_string(),
            super_class: super_class.map(str::to_string),
            interfaces: Vec::new(),
            source_file: None,
            signature: None,
            class_annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Replaces the class access flags.
    pub fn flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    /// Adds a superinterface.
    pub fn interface(&mut self, name: &str) {
        self.interfaces.push(name.to_string());
    }

    /// Sets the `SourceFile` attribute.
    pub fn source_file(&mut self, name: &str) {
        self.source_file = Some(name.to_string());
    }

    /// Sets the `Signature` attribute.
    pub fn signature(&mut self, signature: &str) {
        self.signature = Some(signature.to_string());
    }

    /// Adds a runtime-visible class annotation without elements.
    pub fn class_annotation_visible(&mut self, descriptor: &str) {
        self.class_annotations.push(descriptor.to_string());
    }

    /// Declares a field.
    pub fn field(&mut self, member: MemberDef) {
        self.fields.push(member);
    }

    /// Declares a method.
    pub fn method(&mut self, member: MemberDef) {
        self.methods.push(member);
    }

    /// Adds a `Fieldref` constant.
    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) {
        self.pool.member_ref(9, owner, name, descriptor);
    }

    /// Adds a `Methodref` constant.
    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) {
        self.pool.member_ref(10, owner, name, descriptor);
    }

    /// Adds a `Class` constant.
    pub fn class_ref(&mut self, name: &str) {
        self.pool.class(name);
    }

    /// Encodes the class file.
    pub fn finish(mut self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.flags.to_be_bytes());
        let this = self.pool.class(&self.this_class.clone());
        body.extend_from_slice(&this.to_be_bytes());
        let sup = match self.super_class.clone() {
            Some(name) => self.pool.class(&name),
            None => 0,
        };
        body.extend_from_slice(&sup.to_be_bytes());

        body.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for name in self.interfaces.clone() {
            let i = self.pool.class(&name);
            body.extend_from_slice(&i.to_be_bytes());
        }

        let fields = std::mem::take(&mut self.fields);
        body.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for member in &fields {
            self.write_member(&mut body, member);
        }
        let methods = std::mem::take(&mut self.methods);
        body.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for member in &methods {
            self.write_member(&mut body, member);
        }

        let mut attrs: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(source) = self.source_file.clone() {
            let name = self.pool.utf8("SourceFile");
            let v = self.pool.utf8(&source);
            attrs.push((name, v.to_be_bytes().to_vec()));
        }
        if let Some(signature) = self.signature.clone() {
            let name = self.pool.utf8("Signature");
            let v = self.pool.utf8(&signature);
            attrs.push((name, v.to_be_bytes().to_vec()));
        }
        if !self.class_annotations.is_empty() {
            let name = self.pool.utf8("RuntimeVisibleAnnotations");
            let data = self.annotation_list(&self.class_annotations.clone());
            attrs.push((name, data));
        }
        write_attributes(&mut body, &attrs);

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&((self.pool.entries.len() + 1) as u16).to_be_bytes());
        for entry in &self.pool.entries {
            out.extend_from_slice(entry);
        }
        out.extend_from_slice(&body);
        out
    }

    fn annotation_list(&mut self, descriptors: &[String]) -> Vec<u8> {
        let mut data = (descriptors.len() as u16).to_be_bytes().to_vec();
        for descriptor in descriptors {
            let t = self.pool.utf8(descriptor);
            data.extend_from_slice(&t.to_be_bytes());
            data.extend_from_slice(&0u16.to_be_bytes());
        }
        data
    }

    fn write_member(&mut self, body: &mut Vec<u8>, member: &MemberDef) {
        body.extend_from_slice(&member.flags.to_be_bytes());
        let n = self.pool.utf8(&member.name);
        let d = self.pool.utf8(&member.descriptor);
        body.extend_from_slice(&n.to_be_bytes());
        body.extend_from_slice(&d.to_be_bytes());

        let mut attrs: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(v) = member.constant_int {
            let name = self.pool.utf8("ConstantValue");
            let i = self.pool.integer(v);
            attrs.push((name, i.to_be_bytes().to_vec()));
        }
        if !member.throws.is_empty() {
            let name = self.pool.utf8("Exceptions");
            let mut data = (member.throws.len() as u16).to_be_bytes().to_vec();
            for ex in &member.throws {
                let c = self.pool.class(ex);
                data.extend_from_slice(&c.to_be_bytes());
            }
            attrs.push((name, data));
        }
        if let Some(v) = member.annotation_default_int {
            let name = self.pool.utf8("AnnotationDefault");
            let i = self.pool.integer(v);
            let mut data = vec![b'I'];
            data.extend_from_slice(&i.to_be_bytes());
            attrs.push((name, data));
        }
        if !member.parameter_annotations.is_empty() {
            let name = self.pool.utf8("RuntimeVisibleParameterAnnotations");
            let mut data = vec![1u8];
            data.extend(self.annotation_list(&member.parameter_annotations));
            attrs.push((name, data));
        }
        write_attributes(body, &attrs);
    }
}

fn write_attributes(body: &mut Vec<u8>, attrs: &[(u16, Vec<u8>)]) {
    body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    for (name, data) in attrs {
        body.extend_from_slice(&name.to_be_bytes());
        body.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
    }
}
