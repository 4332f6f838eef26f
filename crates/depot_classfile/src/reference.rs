//! References from a class's constant pool to other classes and members.

use depot_common::Symbol;
use serde::{Deserialize, Serialize};

/// Something a compiled class refers to.
///
/// Member references name the class the compiler resolved them against
/// (`owner`), which may be a subclass of the declaring class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceInfo {
    /// A direct reference to a class (`CONSTANT_Class`).
    Class(Symbol),
    /// A field access (`CONSTANT_Fieldref`).
    Field {
        /// Qualified name of the owning class.
        owner: Symbol,
        /// Field name.
        name: Symbol,
        /// Field descriptor.
        descriptor: Symbol,
    },
    /// A method call (`CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref`).
    Method {
        /// Qualified name of the owning class.
        owner: Symbol,
        /// Method name.
        name: Symbol,
        /// Method descriptor.
        descriptor: Symbol,
    },
}

impl ReferenceInfo {
    /// Qualified name of the class this reference points into.
    pub fn owner(&self) -> Symbol {
        match *self {
            ReferenceInfo::Class(owner) => owner,
            ReferenceInfo::Field { owner, .. } | ReferenceInfo::Method { owner, .. } => owner,
        }
    }
}
