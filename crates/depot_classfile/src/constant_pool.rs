//! Constant pool decoding.

use crate::bytes::ByteReader;
use crate::error::ClassFileError;

#[derive(Debug, Clone)]
pub(crate) enum CpEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Fieldref { class: u16, name_and_type: u16 },
    Methodref { class: u16, name_and_type: u16 },
    InterfaceMethodref { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
    /// Second slot of a long or double entry.
    Unusable,
}

impl CpEntry {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CpEntry::Utf8(_) => "Utf8",
            CpEntry::Integer(_) => "Integer",
            CpEntry::Float(_) => "Float",
            CpEntry::Long(_) => "Long",
            CpEntry::Double(_) => "Double",
            CpEntry::Class(_) => "Class",
            CpEntry::String(_) => "String",
            CpEntry::Fieldref { .. } => "Fieldref",
            CpEntry::Methodref { .. } => "Methodref",
            CpEntry::InterfaceMethodref { .. } => "InterfaceMethodref",
            CpEntry::NameAndType { .. } => "NameAndType",
            CpEntry::MethodHandle => "MethodHandle",
            CpEntry::MethodType => "MethodType",
            CpEntry::Dynamic => "Dynamic",
            CpEntry::InvokeDynamic => "InvokeDynamic",
            CpEntry::Module => "Module",
            CpEntry::Package => "Package",
            CpEntry::Unusable => "Unusable",
        }
    }
}

/// A member reference resolved through its `NameAndType` entry.
pub(crate) struct MemberRef<'a> {
    pub(crate) owner: &'a str,
    pub(crate) name: &'a str,
    pub(crate) descriptor: &'a str,
}

pub(crate) struct ConstantPool {
    entries: Vec<CpEntry>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.read_u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        // Slot 0 is never valid.
        entries.push(CpEntry::Unusable);

        let mut index = 1u16;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    CpEntry::Utf8(decode_modified_utf8(reader.read_bytes(len)?)?)
                }
                3 => CpEntry::Integer(reader.read_u4()? as i32),
                4 => CpEntry::Float(f32::from_bits(reader.read_u4()?)),
                5 => CpEntry::Long(reader.read_u8()? as i64),
                6 => CpEntry::Double(f64::from_bits(reader.read_u8()?)),
                7 => CpEntry::Class(reader.read_u2()?),
                8 => CpEntry::String(reader.read_u2()?),
                9 => CpEntry::Fieldref {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                10 => CpEntry::Methodref {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                11 => CpEntry::InterfaceMethodref {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                12 => CpEntry::NameAndType {
                    name: reader.read_u2()?,
                    descriptor: reader.read_u2()?,
                },
                15 => {
                    reader.read_bytes(3)?;
                    CpEntry::MethodHandle
                }
                16 => {
                    reader.read_u2()?;
                    CpEntry::MethodType
                }
                17 => {
                    reader.read_u4()?;
                    CpEntry::Dynamic
                }
                18 => {
                    reader.read_u4()?;
                    CpEntry::InvokeDynamic
                }
                19 => {
                    reader.read_u2()?;
                    CpEntry::Module
                }
                20 => {
                    reader.read_u2()?;
                    CpEntry::Package
                }
                other => return Err(ClassFileError::InvalidConstantPoolTag(other)),
            };

            let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
            entries.push(entry);
            index += 1;
            if wide {
                entries.push(CpEntry::Unusable);
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (u16, &CpEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| u16::try_from(i).ok().map(|i| (i, e)))
    }

    pub(crate) fn get(&self, index: u16) -> Result<&CpEntry, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(CpEntry::Unusable) | None => {
                Err(ClassFileError::InvalidConstantPoolIndex(index))
            }
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            CpEntry::Utf8(s) => Ok(s),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    /// Returns the internal name (or array descriptor) of a `CONSTANT_Class`.
    pub(crate) fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            CpEntry::Class(name) => self.utf8(*name),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub(crate) fn string(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            CpEntry::String(utf8) => self.utf8(*utf8),
            other => Err(mismatch(index, "String", other)),
        }
    }

    pub(crate) fn member_ref(
        &self,
        class: u16,
        name_and_type: u16,
    ) -> Result<MemberRef<'_>, ClassFileError> {
        let owner = self.class_name(class)?;
        let (name, descriptor) = match self.get(name_and_type)? {
            CpEntry::NameAndType { name, descriptor } => (self.utf8(*name)?, self.utf8(*descriptor)?),
            other => return Err(mismatch(name_and_type, "NameAndType", other)),
        };
        Ok(MemberRef {
            owner,
            name,
            descriptor,
        })
    }
}

pub(crate) fn mismatch(index: u16, expected: &'static str, found: &CpEntry) -> ClassFileError {
    ClassFileError::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

/// Decodes the JVM's modified UTF-8: NUL is two bytes and supplementary
/// characters are surrogate pairs of three-byte sequences.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ClassFileError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let continuation = |offset: usize| -> Result<u16, ClassFileError> {
            match bytes.get(i + offset) {
                Some(&c) if c & 0xC0 == 0x80 => Ok(u16::from(c & 0x3F)),
                _ => Err(ClassFileError::InvalidModifiedUtf8),
            }
        };
        if b & 0x80 == 0 && b != 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            units.push((u16::from(b & 0x1F) << 6) | continuation(1)?);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            units.push((u16::from(b & 0x0F) << 12) | (continuation(1)? << 6) | continuation(2)?);
            i += 3;
        } else {
            return Err(ClassFileError::InvalidModifiedUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| ClassFileError::InvalidModifiedUtf8)
}
