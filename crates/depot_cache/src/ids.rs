//! Opaque record handles.
//!
//! [`ClassInfoId`], [`DeclarationId`], [`FieldId`] and [`MethodId`] are thin
//! `u32` wrappers addressing records in the cache's record pool. The pool owns
//! the records; the cache and its callers only ever hold handles. Ids are
//! never reused, so a handle to a removed record stays dead.

use serde::{Deserialize, Serialize};

use crate::error::RecordKind;

/// Common behaviour of record handles.
pub(crate) trait RecordHandle: Copy {
    /// Record family addressed by this handle type.
    const KIND: RecordKind;

    fn from_raw(index: u32) -> Self;

    fn as_raw(self) -> u32;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl RecordHandle for $name {
            const KIND: RecordKind = $kind;

            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a class-info record.
    ClassInfoId,
    RecordKind::ClassInfo
);

define_id!(
    /// Handle to a class-declaration record.
    DeclarationId,
    RecordKind::Declaration
);

define_id!(
    /// Handle to a field-declaration record.
    FieldId,
    RecordKind::Field
);

define_id!(
    /// Handle to a method-declaration record.
    MethodId,
    RecordKind::Method
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(FieldId::from_raw(42).as_raw(), 42);
        assert_eq!(MethodId::from_raw(7).as_raw(), 7);
    }

    #[test]
    fn handle_kind() {
        assert_eq!(<ClassInfoId as RecordHandle>::KIND, RecordKind::ClassInfo);
        assert_eq!(<DeclarationId as RecordHandle>::KIND, RecordKind::Declaration);
    }

    #[test]
    fn display_is_raw_index() {
        assert_eq!(DeclarationId::from_raw(3).to_string(), "3");
    }
}
