//! Field and method declarations as parsed from a class file.

use depot_common::{AccessFlags, Symbol};
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationConstantValue, ConstantValue};

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Simple name of the field.
    pub name: Symbol,
    /// Field descriptor, e.g. `I` or `Ljava/lang/String;`.
    pub descriptor: Symbol,
    /// Generic signature from the `Signature` attribute.
    pub generic_signature: Option<Symbol>,
    /// Access flags.
    pub flags: AccessFlags,
    /// Value of the `ConstantValue` attribute, present for compile-time constants.
    pub constant_value: Option<ConstantValue>,
    /// `RuntimeVisibleAnnotations`.
    pub runtime_visible_annotations: Vec<AnnotationConstantValue>,
    /// `RuntimeInvisibleAnnotations`.
    pub runtime_invisible_annotations: Vec<AnnotationConstantValue>,
}

impl FieldInfo {
    /// Creates a field with no signature, constant value or annotations.
    pub fn new(name: Symbol, descriptor: Symbol, flags: AccessFlags) -> Self {
        Self {
            name,
            descriptor,
            generic_signature: None,
            flags,
            constant_value: None,
            runtime_visible_annotations: Vec::new(),
            runtime_invisible_annotations: Vec::new(),
        }
    }
}

/// A method (or constructor) declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Simple name; `<init>` for constructors, `<clinit>` for static initializers.
    pub name: Symbol,
    /// Method descriptor, e.g. `(ILjava/lang/String;)V`.
    pub descriptor: Symbol,
    /// Generic signature from the `Signature` attribute.
    pub generic_signature: Option<Symbol>,
    /// Access flags.
    pub flags: AccessFlags,
    /// Qualified names from the `Exceptions` attribute, in declaration order.
    pub thrown_exceptions: Vec<Symbol>,
    /// `true` for `<init>` methods.
    pub is_constructor: bool,
    /// `RuntimeVisibleAnnotations`.
    pub runtime_visible_annotations: Vec<AnnotationConstantValue>,
    /// `RuntimeInvisibleAnnotations`.
    pub runtime_invisible_annotations: Vec<AnnotationConstantValue>,
    /// `RuntimeVisibleParameterAnnotations`, one list per parameter.
    pub runtime_visible_parameter_annotations: Vec<Vec<AnnotationConstantValue>>,
    /// `RuntimeInvisibleParameterAnnotations`, one list per parameter.
    pub runtime_invisible_parameter_annotations: Vec<Vec<AnnotationConstantValue>>,
    /// `AnnotationDefault`, present on annotation-type elements with a default.
    pub annotation_default: Option<ConstantValue>,
}

impl MethodInfo {
    /// Creates a method with no signature, exceptions or annotations.
    pub fn new(name: Symbol, descriptor: Symbol, flags: AccessFlags) -> Self {
        Self {
            name,
            descriptor,
            generic_signature: None,
            flags,
            thrown_exceptions: Vec::new(),
            is_constructor: false,
            runtime_visible_annotations: Vec::new(),
            runtime_invisible_annotations: Vec::new(),
            runtime_visible_parameter_annotations: Vec::new(),
            runtime_invisible_parameter_annotations: Vec::new(),
            annotation_default: None,
        }
    }
}

/// A class member of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberInfo {
    /// A field.
    Field(FieldInfo),
    /// A method or constructor.
    Method(MethodInfo),
}

impl MemberInfo {
    /// Simple name of the member.
    pub fn name(&self) -> Symbol {
        match self {
            MemberInfo::Field(f) => f.name,
            MemberInfo::Method(m) => m.name,
        }
    }

    /// Field or method descriptor.
    pub fn descriptor(&self) -> Symbol {
        match self {
            MemberInfo::Field(f) => f.descriptor,
            MemberInfo::Method(m) => m.descriptor,
        }
    }

    /// Access flags.
    pub fn flags(&self) -> AccessFlags {
        match self {
            MemberInfo::Field(f) => f.flags,
            MemberInfo::Method(m) => m.flags,
        }
    }

    /// Generic signature, if any.
    pub fn generic_signature(&self) -> Option<Symbol> {
        match self {
            MemberInfo::Field(f) => f.generic_signature,
            MemberInfo::Method(m) => m.generic_signature,
        }
    }
}

impl From<FieldInfo> for MemberInfo {
    fn from(field: FieldInfo) -> Self {
        MemberInfo::Field(field)
    }
}

impl From<MethodInfo> for MemberInfo {
    fn from(method: MethodInfo) -> Self {
        MemberInfo::Method(method)
    }
}
