//! Annotation values and constant values as stored in the cache.

use depot_common::{Symbol, SymbolTable};
use serde::{Deserialize, Serialize};

use crate::bytes::ByteReader;
use crate::constant_pool::{mismatch, ConstantPool, CpEntry};
use crate::descriptor;
use crate::error::ClassFileError;

/// A compile-time constant: a field's `ConstantValue`, an annotation element
/// value, or an annotation method's default.
///
/// `byte`, `char`, `short`, `boolean` and `int` all share the class-file
/// `CONSTANT_Integer` representation and are stored as [`ConstantValue::Int`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstantValue {
    /// An `int`-like value.
    Int(i32),
    /// A `long` value.
    Long(i64),
    /// A `float` value.
    Float(f32),
    /// A `double` value.
    Double(f64),
    /// A `String` literal.
    Str(String),
    /// An enum constant: the enum's qualified name and the constant's name.
    Enum {
        /// Qualified name of the enum type.
        type_name: Symbol,
        /// Name of the constant.
        constant_name: Symbol,
    },
    /// A class literal, stored as its return-type descriptor (`V` for `void.class`).
    Class(Symbol),
    /// A nested annotation.
    Annotation(Box<AnnotationConstantValue>),
    /// An array of element values.
    Array(Vec<ConstantValue>),
}

// Floats compare by bit pattern so a NaN constant equals itself across
// recompiles.
impl PartialEq for ConstantValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstantValue::Int(a), ConstantValue::Int(b)) => a == b,
            (ConstantValue::Long(a), ConstantValue::Long(b)) => a == b,
            (ConstantValue::Float(a), ConstantValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::Double(a), ConstantValue::Double(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::Str(a), ConstantValue::Str(b)) => a == b,
            (
                ConstantValue::Enum {
                    type_name: ta,
                    constant_name: ca,
                },
                ConstantValue::Enum {
                    type_name: tb,
                    constant_name: cb,
                },
            ) => ta == tb && ca == cb,
            (ConstantValue::Class(a), ConstantValue::Class(b)) => a == b,
            (ConstantValue::Annotation(a), ConstantValue::Annotation(b)) => a == b,
            (ConstantValue::Array(a), ConstantValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstantValue {}

/// A single annotation instance with its explicitly given element values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationConstantValue {
    /// Qualified name of the annotation type.
    pub annotation_type: Symbol,
    /// Element name/value pairs in class-file order.
    pub members: Vec<(Symbol, ConstantValue)>,
}

impl AnnotationConstantValue {
    /// Creates an annotation with no explicit element values.
    pub fn marker(annotation_type: Symbol) -> Self {
        Self {
            annotation_type,
            members: Vec::new(),
        }
    }

    pub(crate) fn parse(
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
        symbols: &SymbolTable,
    ) -> Result<Self, ClassFileError> {
        let type_descriptor = cp.utf8(reader.read_u2()?)?;
        let type_name = descriptor::class_of_field_descriptor(type_descriptor)
            .ok_or(ClassFileError::MalformedAttribute("annotation type"))?;
        let annotation_type = symbols.intern(&type_name);

        let count = reader.read_u2()? as usize;
        let mut members = Vec::with_capacity(count);
        for _ in 0..count {
            let name = symbols.intern(cp.utf8(reader.read_u2()?)?);
            let value = ConstantValue::parse_element(reader, cp, symbols)?;
            members.push((name, value));
        }

        Ok(Self {
            annotation_type,
            members,
        })
    }

    /// Parses the body of a `Runtime(In)VisibleAnnotations` attribute.
    pub(crate) fn parse_list(
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
        symbols: &SymbolTable,
    ) -> Result<Vec<Self>, ClassFileError> {
        let count = reader.read_u2()? as usize;
        let mut annotations = Vec::with_capacity(count);
        for _ in 0..count {
            annotations.push(Self::parse(reader, cp, symbols)?);
        }
        Ok(annotations)
    }

    /// Parses the body of a `Runtime(In)VisibleParameterAnnotations` attribute.
    pub(crate) fn parse_parameter_lists(
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
        symbols: &SymbolTable,
    ) -> Result<Vec<Vec<Self>>, ClassFileError> {
        let parameters = reader.read_u1()? as usize;
        let mut lists = Vec::with_capacity(parameters);
        for _ in 0..parameters {
            lists.push(Self::parse_list(reader, cp, symbols)?);
        }
        Ok(lists)
    }
}

impl ConstantValue {
    /// Parses an annotation `element_value`.
    pub(crate) fn parse_element(
        reader: &mut ByteReader<'_>,
        cp: &ConstantPool,
        symbols: &SymbolTable,
    ) -> Result<Self, ClassFileError> {
        let tag = reader.read_u1()?;
        match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' | b'D' | b'F' | b'J' => {
                Self::from_pool(cp, reader.read_u2()?)
            }
            b's' => Ok(ConstantValue::Str(cp.utf8(reader.read_u2()?)?.to_string())),
            b'e' => {
                let type_descriptor = cp.utf8(reader.read_u2()?)?;
                let type_name = descriptor::class_of_field_descriptor(type_descriptor)
                    .ok_or(ClassFileError::MalformedAttribute("enum element value"))?;
                let constant_name = symbols.intern(cp.utf8(reader.read_u2()?)?);
                Ok(ConstantValue::Enum {
                    type_name: symbols.intern(&type_name),
                    constant_name,
                })
            }
            b'c' => Ok(ConstantValue::Class(
                symbols.intern(cp.utf8(reader.read_u2()?)?),
            )),
            b'@' => Ok(ConstantValue::Annotation(Box::new(
                AnnotationConstantValue::parse(reader, cp, symbols)?,
            ))),
            b'[' => {
                let count = reader.read_u2()? as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(Self::parse_element(reader, cp, symbols)?);
                }
                Ok(ConstantValue::Array(values))
            }
            _ => Err(ClassFileError::MalformedAttribute("element value")),
        }
    }

    /// Reads a loadable numeric or string constant from the pool.
    pub(crate) fn from_pool(cp: &ConstantPool, index: u16) -> Result<Self, ClassFileError> {
        match cp.get(index)? {
            CpEntry::Integer(v) => Ok(ConstantValue::Int(*v)),
            CpEntry::Long(v) => Ok(ConstantValue::Long(*v)),
            CpEntry::Float(v) => Ok(ConstantValue::Float(*v)),
            CpEntry::Double(v) => Ok(ConstantValue::Double(*v)),
            CpEntry::String(_) => Ok(ConstantValue::Str(cp.string(index)?.to_string())),
            CpEntry::Utf8(s) => Ok(ConstantValue::Str(s.clone())),
            other => Err(mismatch(index, "constant", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equals_itself() {
        assert_eq!(ConstantValue::Float(f32::NAN), ConstantValue::Float(f32::NAN));
        assert_eq!(ConstantValue::Double(f64::NAN), ConstantValue::Double(f64::NAN));
    }

    #[test]
    fn signed_zeroes_differ() {
        assert_ne!(ConstantValue::Double(0.0), ConstantValue::Double(-0.0));
    }

    #[test]
    fn different_kinds_differ() {
        assert_ne!(ConstantValue::Int(1), ConstantValue::Long(1));
        assert_ne!(ConstantValue::Str("1".into()), ConstantValue::Int(1));
    }

    #[test]
    fn nested_annotation_equality() {
        let table = SymbolTable::new();
        let ty = table.intern("java.lang.Deprecated");
        let a = ConstantValue::Annotation(Box::new(AnnotationConstantValue::marker(ty)));
        let b = ConstantValue::Annotation(Box::new(AnnotationConstantValue::marker(ty)));
        assert_eq!(a, b);
    }
}
