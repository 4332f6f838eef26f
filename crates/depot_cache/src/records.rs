//! Record layouts stored in the record pool.

use std::collections::BTreeSet;

use depot_classfile::{AnnotationConstantValue, ClassFile, FieldInfo, MethodInfo, ReferenceInfo};
use depot_common::{AccessFlags, Symbol};
use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, MethodId};

/// Structural metadata of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClassInfoRecord {
    pub(crate) qualified_name: Symbol,
    pub(crate) super_qualified_name: Option<Symbol>,
    pub(crate) super_interfaces: Vec<Symbol>,
    pub(crate) flags: AccessFlags,
    pub(crate) generic_signature: Option<Symbol>,
    pub(crate) source_file_name: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) references: Vec<ReferenceInfo>,
    pub(crate) referenced_classes: BTreeSet<Symbol>,
    pub(crate) subclasses: BTreeSet<Symbol>,
    pub(crate) runtime_visible_annotations: Vec<AnnotationConstantValue>,
    pub(crate) runtime_invisible_annotations: Vec<AnnotationConstantValue>,
}

impl ClassInfoRecord {
    pub(crate) fn from_class_file(class: &ClassFile) -> Self {
        Self {
            qualified_name: class.qualified_name,
            super_qualified_name: class.super_qualified_name,
            super_interfaces: class.super_interfaces.clone(),
            flags: class.flags,
            generic_signature: class.generic_signature,
            source_file_name: class.source_file_name.clone(),
            path: class.path.clone(),
            references: class.references.clone(),
            referenced_classes: class.referenced_classes(),
            subclasses: BTreeSet::new(),
            runtime_visible_annotations: class.runtime_visible_annotations.clone(),
            runtime_invisible_annotations: class.runtime_invisible_annotations.clone(),
        }
    }
}

/// Member ids and class-level referencers of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClassDeclarationRecord {
    pub(crate) qualified_name: Symbol,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) referencers: BTreeSet<Symbol>,
    /// Classes whose last link could not resolve a supertype or member
    /// through this class. They are relinked when this class is imported.
    pub(crate) waiting: BTreeSet<Symbol>,
}

impl ClassDeclarationRecord {
    pub(crate) fn new(qualified_name: Symbol) -> Self {
        Self {
            qualified_name,
            fields: Vec::new(),
            methods: Vec::new(),
            referencers: BTreeSet::new(),
            waiting: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FieldDeclarationRecord {
    pub(crate) info: FieldInfo,
    pub(crate) referencers: BTreeSet<Symbol>,
}

impl FieldDeclarationRecord {
    pub(crate) fn new(info: FieldInfo) -> Self {
        Self {
            info,
            referencers: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MethodDeclarationRecord {
    pub(crate) info: MethodInfo,
    pub(crate) referencers: BTreeSet<Symbol>,
}

impl MethodDeclarationRecord {
    pub(crate) fn new(info: MethodInfo) -> Self {
        Self {
            info,
            referencers: BTreeSet::new(),
        }
    }
}
