//! Differences between two versions of a class or member.
//!
//! A change description compares the record stored in the old cache with the
//! record for the same declaration in the new cache. The incremental driver
//! uses the flags to decide whether a change is binary compatible or forces
//! dependent classes to be rebuilt.

use std::collections::BTreeSet;

use depot_classfile::descriptor;
use depot_classfile::{FieldInfo, MethodInfo};
use depot_common::SymbolTable;

use crate::cache::Cache;
use crate::error::CacheError;
use crate::ids::{ClassInfoId, FieldId, MethodId};

/// How a field changed between two compilations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldChangeDescription {
    /// The field's type changed.
    pub descriptor_changed: bool,
    /// Any access flag changed.
    pub flags_changed: bool,
    /// The generic signature changed.
    pub generic_signature_changed: bool,
    /// The compile-time constant changed. Callers may have inlined the old value.
    pub constant_value_changed: bool,
}

impl FieldChangeDescription {
    /// Compares field `old_id` in `old` with field `new_id` in `new`.
    pub fn new(old: &Cache, new: &Cache, old_id: FieldId, new_id: FieldId) -> Result<Self, CacheError> {
        Ok(Self::between(&old.field_info(old_id)?, &new.field_info(new_id)?))
    }

    /// Compares two field declarations directly.
    pub fn between(old: &FieldInfo, new: &FieldInfo) -> Self {
        Self {
            descriptor_changed: old.descriptor != new.descriptor,
            flags_changed: old.flags != new.flags,
            generic_signature_changed: old.generic_signature != new.generic_signature,
            constant_value_changed: old.constant_value != new.constant_value,
        }
    }

    /// Returns `true` if anything changed.
    pub fn is_changed(&self) -> bool {
        self.descriptor_changed
            || self.flags_changed
            || self.generic_signature_changed
            || self.constant_value_changed
    }
}

/// How a method changed between two compilations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodChangeDescription {
    /// The full descriptor changed.
    pub descriptor_changed: bool,
    /// Any access flag changed.
    pub flags_changed: bool,
    /// The generic signature changed.
    pub generic_signature_changed: bool,
    /// The return-type part of the descriptor changed.
    pub return_type_descriptor_changed: bool,
    /// The set of declared exceptions changed. Order is ignored.
    pub throws_list_changed: bool,
    /// The method became static or stopped being static.
    pub static_property_changed: bool,
    /// The new access level is narrower than the old one.
    pub access_restricted: bool,
    /// The method was concrete and is now abstract.
    pub became_abstract: bool,
    /// An annotation element lost its default value.
    pub removed_annotation_default: bool,
}

impl MethodChangeDescription {
    /// Compares method `old_id` in `old` with method `new_id` in `new`.
    pub fn new(
        old: &Cache,
        new: &Cache,
        old_id: MethodId,
        new_id: MethodId,
        symbols: &SymbolTable,
    ) -> Result<Self, CacheError> {
        Ok(Self::between(
            &old.method_info(old_id)?,
            &new.method_info(new_id)?,
            symbols,
        ))
    }

    /// Compares two method declarations directly.
    pub fn between(old: &MethodInfo, new: &MethodInfo, symbols: &SymbolTable) -> Self {
        let return_type = |m: &MethodInfo| {
            symbols
                .try_resolve(m.descriptor)
                .and_then(descriptor::method_return_type)
                .map(str::to_owned)
        };
        let old_throws: BTreeSet<_> = old.thrown_exceptions.iter().collect();
        let new_throws: BTreeSet<_> = new.thrown_exceptions.iter().collect();

        Self {
            descriptor_changed: old.descriptor != new.descriptor,
            flags_changed: old.flags != new.flags,
            generic_signature_changed: old.generic_signature != new.generic_signature,
            return_type_descriptor_changed: return_type(old) != return_type(new),
            throws_list_changed: old_throws != new_throws,
            static_property_changed: old.flags.is_static() != new.flags.is_static(),
            access_restricted: old.flags.is_more_accessible_than(new.flags),
            became_abstract: !old.flags.is_abstract() && new.flags.is_abstract(),
            removed_annotation_default: old.annotation_default.is_some()
                && new.annotation_default.is_none(),
        }
    }

    /// Returns `true` if anything changed.
    pub fn is_changed(&self) -> bool {
        self.descriptor_changed
            || self.flags_changed
            || self.generic_signature_changed
            || self.return_type_descriptor_changed
            || self.throws_list_changed
            || self.static_property_changed
            || self.access_restricted
            || self.became_abstract
            || self.removed_annotation_default
    }

    /// Returns `true` if the change forces subclasses to be rebuilt as well.
    pub fn affects_subclasses(&self) -> bool {
        self.became_abstract || self.access_restricted
    }
}

/// How a class's own declaration (not its members) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassChangeDescription {
    /// The superclass changed.
    pub super_class_changed: bool,
    /// The set of directly implemented interfaces changed.
    pub interfaces_changed: bool,
    /// Any class access flag changed.
    pub flags_changed: bool,
    /// The generic signature changed.
    pub generic_signature_changed: bool,
}

impl ClassChangeDescription {
    /// Compares class `old_id` in `old` with class `new_id` in `new`.
    pub fn new(
        old: &Cache,
        new: &Cache,
        old_id: ClassInfoId,
        new_id: ClassInfoId,
    ) -> Result<Self, CacheError> {
        let old_interfaces: BTreeSet<_> = old.super_interfaces(old_id)?.into_iter().collect();
        let new_interfaces: BTreeSet<_> = new.super_interfaces(new_id)?.into_iter().collect();
        Ok(Self {
            super_class_changed: old.super_qualified_name(old_id)?
                != new.super_qualified_name(new_id)?,
            interfaces_changed: old_interfaces != new_interfaces,
            flags_changed: old.flags(old_id)? != new.flags(new_id)?,
            generic_signature_changed: old.generic_signature(old_id)?
                != new.generic_signature(new_id)?,
        })
    }

    /// Returns `true` if anything changed.
    pub fn is_changed(&self) -> bool {
        self.super_class_changed
            || self.interfaces_changed
            || self.flags_changed
            || self.generic_signature_changed
    }
}
