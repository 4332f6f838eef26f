//! JVM access flags for classes, fields and methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// The `access_flags` word of a class, field or method.
///
/// Some bits are shared between member kinds in the class-file format
/// (`SYNCHRONIZED`/`SUPER`, `VOLATILE`/`BRIDGE`, `TRANSIENT`/`VARARGS`); the
/// constants below name the common reading.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccessFlags(u16);

impl AccessFlags {
    /// `ACC_PUBLIC`.
    pub const PUBLIC: Self = Self(0x0001);
    /// `ACC_PRIVATE`.
    pub const PRIVATE: Self = Self(0x0002);
    /// `ACC_PROTECTED`.
    pub const PROTECTED: Self = Self(0x0004);
    /// `ACC_STATIC`.
    pub const STATIC: Self = Self(0x0008);
    /// `ACC_FINAL`.
    pub const FINAL: Self = Self(0x0010);
    /// `ACC_SYNCHRONIZED` on methods, `ACC_SUPER` on classes.
    pub const SYNCHRONIZED: Self = Self(0x0020);
    /// `ACC_VOLATILE` on fields, `ACC_BRIDGE` on methods.
    pub const VOLATILE: Self = Self(0x0040);
    /// `ACC_TRANSIENT` on fields, `ACC_VARARGS` on methods.
    pub const TRANSIENT: Self = Self(0x0080);
    /// `ACC_NATIVE`.
    pub const NATIVE: Self = Self(0x0100);
    /// `ACC_INTERFACE`.
    pub const INTERFACE: Self = Self(0x0200);
    /// `ACC_ABSTRACT`.
    pub const ABSTRACT: Self = Self(0x0400);
    /// `ACC_STRICT`.
    pub const STRICT: Self = Self(0x0800);
    /// `ACC_SYNTHETIC`.
    pub const SYNTHETIC: Self = Self(0x1000);
    /// `ACC_ANNOTATION`.
    pub const ANNOTATION: Self = Self(0x2000);
    /// `ACC_ENUM`.
    pub const ENUM: Self = Self(0x4000);

    /// Creates flags from the raw class-file word.
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw class-file word.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `ACC_PUBLIC` is set.
    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// Returns `true` if `ACC_PRIVATE` is set.
    pub fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// Returns `true` if `ACC_PROTECTED` is set.
    pub fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// Returns `true` if none of the access modifiers is set.
    pub fn is_package_private(self) -> bool {
        !self.is_public() && !self.is_private() && !self.is_protected()
    }

    /// Returns `true` if `ACC_STATIC` is set.
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Returns `true` if `ACC_FINAL` is set.
    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Returns `true` if `ACC_ABSTRACT` is set.
    pub fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    /// Returns `true` if `ACC_INTERFACE` is set.
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    /// Returns `true` if `ACC_ANNOTATION` is set.
    pub fn is_annotation(self) -> bool {
        self.contains(Self::ANNOTATION)
    }

    /// Orders access levels: private < package < protected < public.
    pub fn access_level(self) -> u8 {
        if self.is_public() {
            3
        } else if self.is_protected() {
            2
        } else if self.is_private() {
            0
        } else {
            1
        }
    }

    /// Returns `true` if `self` grants strictly wider access than `other`.
    pub fn is_more_accessible_than(self, other: Self) -> bool {
        self.access_level() > other.access_level()
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessFlags({:#06x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_and_bitor() {
        let flags = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL;
        assert!(flags.is_public());
        assert!(flags.is_static());
        assert!(flags.is_final());
        assert!(!flags.is_abstract());
        assert_eq!(flags.bits(), 0x0019);
    }

    #[test]
    fn package_private_has_no_modifier() {
        assert!(AccessFlags::from_bits(0).is_package_private());
        assert!(!AccessFlags::PRIVATE.is_package_private());
    }

    #[test]
    fn access_ordering() {
        let public = AccessFlags::PUBLIC;
        let protected = AccessFlags::PROTECTED;
        let package = AccessFlags::default();
        let private = AccessFlags::PRIVATE;
        assert!(public.is_more_accessible_than(protected));
        assert!(protected.is_more_accessible_than(package));
        assert!(package.is_more_accessible_than(private));
        assert!(!private.is_more_accessible_than(public));
        assert!(!public.is_more_accessible_than(public));
    }

    #[test]
    fn debug_shows_hex() {
        assert_eq!(format!("{:?}", AccessFlags::ABSTRACT), "AccessFlags(0x0400)");
    }
}
