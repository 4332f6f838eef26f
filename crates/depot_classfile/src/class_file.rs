//! Parsing a compiled class into interned cache data.

use std::collections::BTreeSet;
use std::path::Path;

use depot_common::{AccessFlags, Symbol, SymbolTable};

use crate::annotation::{AnnotationConstantValue, ConstantValue};
use crate::bytes::ByteReader;
use crate::constant_pool::{ConstantPool, CpEntry};
use crate::descriptor;
use crate::error::ClassFileError;
use crate::member::{FieldInfo, MethodInfo};
use crate::reference::ReferenceInfo;

const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Everything the dependency cache records about one compiled class.
///
/// All names are qualified (`java.lang.Object`) and interned in the
/// [`SymbolTable`] the class was read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Qualified name of the class.
    pub qualified_name: Symbol,
    /// Qualified name of the superclass; `None` only for `java.lang.Object`
    /// and for `module-info`.
    pub super_qualified_name: Option<Symbol>,
    /// Qualified names of the directly implemented interfaces.
    pub super_interfaces: Vec<Symbol>,
    /// Class access flags.
    pub flags: AccessFlags,
    /// Generic signature from the `Signature` attribute.
    pub generic_signature: Option<Symbol>,
    /// Value of the `SourceFile` attribute.
    pub source_file_name: Option<String>,
    /// Path the class file was read from, if it came from disk.
    pub path: Option<String>,
    /// Declared fields in class-file order.
    pub fields: Vec<FieldInfo>,
    /// Declared methods in class-file order.
    pub methods: Vec<MethodInfo>,
    /// Distinct references found in the constant pool, sorted.
    pub references: Vec<ReferenceInfo>,
    /// `RuntimeVisibleAnnotations` on the class.
    pub runtime_visible_annotations: Vec<AnnotationConstantValue>,
    /// `RuntimeInvisibleAnnotations` on the class.
    pub runtime_invisible_annotations: Vec<AnnotationConstantValue>,
}

impl ClassFile {
    /// Creates a class with the given name, superclass and flags and nothing else.
    pub fn new(qualified_name: Symbol, super_qualified_name: Option<Symbol>, flags: AccessFlags) -> Self {
        Self {
            qualified_name,
            super_qualified_name,
            super_interfaces: Vec::new(),
            flags,
            generic_signature: None,
            source_file_name: None,
            path: None,
            fields: Vec::new(),
            methods: Vec::new(),
            references: Vec::new(),
            runtime_visible_annotations: Vec::new(),
            runtime_invisible_annotations: Vec::new(),
        }
    }

    /// Qualified names of every class this class refers to, excluding itself.
    pub fn referenced_classes(&self) -> BTreeSet<Symbol> {
        self.references
            .iter()
            .map(ReferenceInfo::owner)
            .filter(|owner| *owner != self.qualified_name)
            .collect()
    }
}

/// Reads class files, interning into a shared [`SymbolTable`].
pub struct ClassFileReader<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> ClassFileReader<'a> {
    /// Creates a reader that interns into `symbols`.
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /// Reads and parses the class file at `path`.
    pub fn read_file(&self, path: &Path) -> Result<ClassFile, ClassFileError> {
        let bytes = std::fs::read(path)?;
        let mut class = self.read(&bytes)?;
        class.path = Some(path.display().to_string());
        Ok(class)
    }

    /// Parses a class file from memory.
    pub fn read(&self, bytes: &[u8]) -> Result<ClassFile, ClassFileError> {
        let symbols = self.symbols;
        let mut reader = ByteReader::new(bytes);

        let magic = reader.read_u4()?;
        if magic != CLASS_MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }
        let _minor = reader.read_u2()?;
        let _major = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let flags = AccessFlags::from_bits(reader.read_u2()?);
        let this_index = reader.read_u2()?;
        let this_internal = cp.class_name(this_index)?;
        let qualified_name = symbols.intern(&descriptor::internal_to_qualified(this_internal));

        let super_index = reader.read_u2()?;
        let super_qualified_name = if super_index == 0 {
            None
        } else {
            let name = cp.class_name(super_index)?;
            Some(symbols.intern(&descriptor::internal_to_qualified(name)))
        };

        let interface_count = reader.read_u2()? as usize;
        let mut super_interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            let name = cp.class_name(reader.read_u2()?)?;
            super_interfaces.push(symbols.intern(&descriptor::internal_to_qualified(name)));
        }

        let field_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(self.read_field(&mut reader, &cp)?);
        }

        let method_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(self.read_method(&mut reader, &cp)?);
        }

        let attrs = parse_attributes(&mut reader, &cp, symbols)?;
        let references = collect_references(&cp, this_index, symbols)?;

        Ok(ClassFile {
            qualified_name,
            super_qualified_name,
            super_interfaces,
            flags,
            generic_signature: attrs.signature,
            source_file_name: attrs.source_file,
            path: None,
            fields,
            methods,
            references,
            runtime_visible_annotations: attrs.runtime_visible_annotations,
            runtime_invisible_annotations: attrs.runtime_invisible_annotations,
        })
    }

    fn read_field(
        &self,
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
    ) -> Result<FieldInfo, ClassFileError> {
        let flags = AccessFlags::from_bits(reader.read_u2()?);
        let name = self.symbols.intern(cp.utf8(reader.read_u2()?)?);
        let descriptor = self.symbols.intern(cp.utf8(reader.read_u2()?)?);
        let attrs = parse_attributes(reader, cp, self.symbols)?;

        Ok(FieldInfo {
            name,
            descriptor,
            generic_signature: attrs.signature,
            flags,
            constant_value: attrs.constant_value,
            runtime_visible_annotations: attrs.runtime_visible_annotations,
            runtime_invisible_annotations: attrs.runtime_invisible_annotations,
        })
    }

    fn read_method(
        &self,
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
    ) -> Result<MethodInfo, ClassFileError> {
        let flags = AccessFlags::from_bits(reader.read_u2()?);
        let raw_name = cp.utf8(reader.read_u2()?)?;
        let name = self.symbols.intern(raw_name);
        let descriptor = self.symbols.intern(cp.utf8(reader.read_u2()?)?);
        let attrs = parse_attributes(reader, cp, self.symbols)?;

        Ok(MethodInfo {
            name,
            descriptor,
            generic_signature: attrs.signature,
            flags,
            thrown_exceptions: attrs.exceptions,
            is_constructor: raw_name == "<init>",
            runtime_visible_annotations: attrs.runtime_visible_annotations,
            runtime_invisible_annotations: attrs.runtime_invisible_annotations,
            runtime_visible_parameter_annotations: attrs.runtime_visible_parameter_annotations,
            runtime_invisible_parameter_annotations: attrs.runtime_invisible_parameter_annotations,
            annotation_default: attrs.annotation_default,
        })
    }
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<Symbol>,
    source_file: Option<String>,
    constant_value: Option<ConstantValue>,
    exceptions: Vec<Symbol>,
    runtime_visible_annotations: Vec<AnnotationConstantValue>,
    runtime_invisible_annotations: Vec<AnnotationConstantValue>,
    runtime_visible_parameter_annotations: Vec<Vec<AnnotationConstantValue>>,
    runtime_invisible_parameter_annotations: Vec<Vec<AnnotationConstantValue>>,
    annotation_default: Option<ConstantValue>,
}

fn parse_attributes(
    reader: &mut ByteReader<'_>,
    cp: &ConstantPool,
    symbols: &SymbolTable,
) -> Result<ParsedAttributes, ClassFileError> {
    let count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..count {
        let name = cp.utf8(reader.read_u2()?)?;
        let length = reader.read_u4()? as usize;
        let mut sub = ByteReader::new(reader.read_bytes(length)?);

        let kind: &'static str = match name {
            "Signature" => {
                parsed.signature = Some(symbols.intern(cp.utf8(sub.read_u2()?)?));
                "Signature"
            }
            "SourceFile" => {
                parsed.source_file = Some(cp.utf8(sub.read_u2()?)?.to_string());
                "SourceFile"
            }
            "ConstantValue" => {
                parsed.constant_value = Some(ConstantValue::from_pool(cp, sub.read_u2()?)?);
                "ConstantValue"
            }
            "Exceptions" => {
                let n = sub.read_u2()? as usize;
                for _ in 0..n {
                    let name = cp.class_name(sub.read_u2()?)?;
                    parsed
                        .exceptions
                        .push(symbols.intern(&descriptor::internal_to_qualified(name)));
                }
                "Exceptions"
            }
            "RuntimeVisibleAnnotations" => {
                parsed
                    .runtime_visible_annotations
                    .extend(AnnotationConstantValue::parse_list(&mut sub, cp, symbols)?);
                "RuntimeVisibleAnnotations"
            }
            "RuntimeInvisibleAnnotations" => {
                parsed
                    .runtime_invisible_annotations
                    .extend(AnnotationConstantValue::parse_list(&mut sub, cp, symbols)?);
                "RuntimeInvisibleAnnotations"
            }
            "RuntimeVisibleParameterAnnotations" => {
                parsed.runtime_visible_parameter_annotations =
                    AnnotationConstantValue::parse_parameter_lists(&mut sub, cp, symbols)?;
                "RuntimeVisibleParameterAnnotations"
            }
            "RuntimeInvisibleParameterAnnotations" => {
                parsed.runtime_invisible_parameter_annotations =
                    AnnotationConstantValue::parse_parameter_lists(&mut sub, cp, symbols)?;
                "RuntimeInvisibleParameterAnnotations"
            }
            "AnnotationDefault" => {
                parsed.annotation_default =
                    Some(ConstantValue::parse_element(&mut sub, cp, symbols)?);
                "AnnotationDefault"
            }
            // Code, LineNumberTable, InnerClasses, ... carry nothing the cache tracks.
            _ => continue,
        };

        if !sub.is_empty() {
            return Err(ClassFileError::MalformedAttribute(kind));
        }
    }
    Ok(parsed)
}

fn collect_references(
    cp: &ConstantPool,
    this_index: u16,
    symbols: &SymbolTable,
) -> Result<Vec<ReferenceInfo>, ClassFileError> {
    let mut references = BTreeSet::new();
    for (index, entry) in cp.entries() {
        match *entry {
            CpEntry::Class(_) if index != this_index => {
                if let Some(name) = descriptor::class_of_class_entry(cp.class_name(index)?) {
                    references.insert(ReferenceInfo::Class(symbols.intern(&name)));
                }
            }
            CpEntry::Fieldref {
                class,
                name_and_type,
            } => {
                let member = cp.member_ref(class, name_and_type)?;
                if let Some(owner) = descriptor::class_of_class_entry(member.owner) {
                    references.insert(ReferenceInfo::Field {
                        owner: symbols.intern(&owner),
                        name: symbols.intern(member.name),
                        descriptor: symbols.intern(member.descriptor),
                    });
                }
            }
            CpEntry::Methodref {
                class,
                name_and_type,
            }
            | CpEntry::InterfaceMethodref {
                class,
                name_and_type,
            } => {
                let member = cp.member_ref(class, name_and_type)?;
                if let Some(owner) = descriptor::class_of_class_entry(member.owner) {
                    references.insert(ReferenceInfo::Method {
                        owner: symbols.intern(&owner),
                        name: symbols.intern(member.name),
                        descriptor: symbols.intern(member.descriptor),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(references.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ClassBuilder, MemberDef};

    fn sample_class() -> Vec<u8> {
        let mut b = ClassBuilder::new("com/acme/Widget", Some("com/acme/Base"));
        b.flags(0x0021);
        b.interface("java/lang/Runnable");
        b.source_file("Widget.java");
        b.signature("Lcom/acme/Base;Ljava/lang/Runnable;");
        b.class_annotation_visible("Ljava/lang/Deprecated;");
        b.field(MemberDef::new(0x0019, "LIMIT", "I").constant_int(10));
        b.field(MemberDef::new(0x0002, "name", "Ljava/lang/String;"));
        b.method(MemberDef::new(0x0001, "<init>", "()V"));
        b.method(
            MemberDef::new(0x0001, "run", "()V").throws("java/io/IOException"),
        );
        b.field_ref("com/acme/Config", "DEBUG", "Z");
        b.method_ref("java/util/List", "size", "()I");
        b.class_ref("[Lcom/acme/Item;");
        b.class_ref("[I");
        b.finish()
    }

    #[test]
    fn reads_class_header() {
        let table = SymbolTable::new();
        let class = ClassFileReader::new(&table).read(&sample_class()).unwrap();

        assert_eq!(table.resolve(class.qualified_name), "com.acme.Widget");
        assert_eq!(
            class.super_qualified_name.map(|s| table.resolve(s)),
            Some("com.acme.Base")
        );
        assert_eq!(class.flags.bits(), 0x0021);
        assert_eq!(class.super_interfaces.len(), 1);
        assert_eq!(table.resolve(class.super_interfaces[0]), "java.lang.Runnable");
        assert_eq!(class.source_file_name.as_deref(), Some("Widget.java"));
        assert_eq!(
            class.generic_signature.map(|s| table.resolve(s)),
            Some("Lcom/acme/Base;Ljava/lang/Runnable;")
        );
        assert_eq!(class.runtime_visible_annotations.len(), 1);
        assert_eq!(
            table.resolve(class.runtime_visible_annotations[0].annotation_type),
            "java.lang.Deprecated"
        );
    }

    #[test]
    fn reads_members() {
        let table = SymbolTable::new();
        let class = ClassFileReader::new(&table).read(&sample_class()).unwrap();

        assert_eq!(class.fields.len(), 2);
        let limit = &class.fields[0];
        assert_eq!(table.resolve(limit.name), "LIMIT");
        assert!(limit.flags.is_static() && limit.flags.is_final());
        assert_eq!(limit.constant_value, Some(ConstantValue::Int(10)));
        assert!(class.fields[1].constant_value.is_none());

        assert_eq!(class.methods.len(), 2);
        assert!(class.methods[0].is_constructor);
        assert!(!class.methods[1].is_constructor);
        assert_eq!(class.methods[1].thrown_exceptions.len(), 1);
        assert_eq!(
            table.resolve(class.methods[1].thrown_exceptions[0]),
            "java.io.IOException"
        );
    }

    #[test]
    fn collects_references_without_self() {
        let table = SymbolTable::new();
        let class = ClassFileReader::new(&table).read(&sample_class()).unwrap();
        let referenced: Vec<&str> = class
            .referenced_classes()
            .into_iter()
            .map(|s| table.resolve(s))
            .collect();

        assert!(referenced.contains(&"com.acme.Base"));
        assert!(referenced.contains(&"java.lang.Runnable"));
        assert!(referenced.contains(&"com.acme.Config"));
        assert!(referenced.contains(&"java.util.List"));
        assert!(referenced.contains(&"com.acme.Item"));
        assert!(!referenced.contains(&"com.acme.Widget"));

        let field_ref = class.references.iter().find_map(|r| match *r {
            ReferenceInfo::Field { owner, name, .. } => Some((owner, name)),
            _ => None,
        });
        let (owner, name) = field_ref.unwrap();
        assert_eq!(table.resolve(owner), "com.acme.Config");
        assert_eq!(table.resolve(name), "DEBUG");
    }

    #[test]
    fn parses_annotation_default_and_parameter_annotations() {
        let mut b = ClassBuilder::new("com/acme/Marker", Some("java/lang/Object"));
        b.flags(0x2601);
        b.method(MemberDef::new(0x0401, "value", "()I").annotation_default_int(7));
        b.method(
            MemberDef::new(0x0001, "use", "(Ljava/lang/String;)V")
                .parameter_annotation_visible("Ljavax/annotation/Nonnull;"),
        );
        let table = SymbolTable::new();
        let class = ClassFileReader::new(&table).read(&b.finish()).unwrap();

        assert_eq!(class.methods[0].annotation_default, Some(ConstantValue::Int(7)));
        let params = &class.methods[1].runtime_visible_parameter_annotations;
        assert_eq!(params.len(), 1);
        assert_eq!(
            table.resolve(params[0][0].annotation_type),
            "javax.annotation.Nonnull"
        );
    }

    #[test]
    fn bad_magic_rejected() {
        let table = SymbolTable::new();
        let err = ClassFileReader::new(&table)
            .read(&[0xCA, 0xFE, 0xD0, 0x0D, 0, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(err, ClassFileError::InvalidMagic(0xCAFE_D00D)));
    }

    #[test]
    fn truncated_input_rejected() {
        let table = SymbolTable::new();
        let bytes = sample_class();
        let err = ClassFileReader::new(&table)
            .read(&bytes[..bytes.len() - 3])
            .unwrap_err();
        assert!(matches!(err, ClassFileError::UnexpectedEof));
    }

    #[test]
    fn read_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Widget.class");
        std::fs::write(&path, sample_class()).unwrap();

        let table = SymbolTable::new();
        let class = ClassFileReader::new(&table).read_file(&path).unwrap();
        assert_eq!(class.path.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn read_file_missing_is_io_error() {
        let table = SymbolTable::new();
        let err = ClassFileReader::new(&table)
            .read_file(Path::new("/nonexistent/Missing.class"))
            .unwrap_err();
        assert!(matches!(err, ClassFileError::Io(_)));
    }
}
