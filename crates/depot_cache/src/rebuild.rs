//! Rebuild planning.
//!
//! After a set of classes has been recompiled into a staging cache, the plan
//! compares each of them with the version in the persistent cache and collects
//! the dependent classes that must be recompiled too.

use std::collections::{BTreeSet, HashSet, VecDeque};

use depot_common::{Symbol, SymbolTable};

use crate::cache::Cache;
use crate::change::{ClassChangeDescription, FieldChangeDescription, MethodChangeDescription};
use crate::error::CacheError;
use crate::ids::{ClassInfoId, DeclarationId, MethodId};

/// The classes that must be recompiled because classes they depend on changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildPlan {
    classes: BTreeSet<Symbol>,
}

impl RebuildPlan {
    /// Computes the plan for `changed`, comparing the class versions in `old`
    /// (the persistent cache, before merging) with those in `new` (freshly
    /// compiled).
    ///
    /// - A class missing from `new` was deleted: everything that depended on
    ///   it and all of its subclasses are rebuilt.
    /// - A change to the class declaration itself (superclass, interfaces,
    ///   flags, signature) does the same.
    /// - Otherwise each removed or changed field and method contributes its
    ///   own referencers. Subclasses are added when a method became abstract,
    ///   lost access, or a new abstract method appeared.
    /// - A newly added method can change overload resolution, so callers of
    ///   methods with the same name are rebuilt.
    ///
    /// Classes in `changed` are never part of the plan. Classes unknown to
    /// `old` are new and have no dependents yet.
    pub fn compute(
        old: &Cache,
        new: &Cache,
        symbols: &SymbolTable,
        changed: &[Symbol],
    ) -> Result<Self, CacheError> {
        let mut classes = BTreeSet::new();
        for &qualified_name in changed {
            let Some(old_id) = old.class_id(qualified_name) else {
                continue;
            };
            let whole_class = match new.class_id(qualified_name) {
                None => true,
                Some(new_id) => {
                    ClassChangeDescription::new(old, new, old_id, new_id)?.is_changed()
                }
            };
            if whole_class {
                for dependency in old.back_dependencies(qualified_name)? {
                    classes.insert(dependency.class_qualified_name());
                }
                classes.extend(all_subclasses(old, old_id)?);
                continue;
            }

            let affects_subclasses =
                collect_member_changes(old, new, symbols, qualified_name, &mut classes)?;
            if affects_subclasses {
                classes.extend(all_subclasses(old, old_id)?);
            }
        }

        for qualified_name in changed {
            classes.remove(qualified_name);
        }
        tracing::debug!(
            changed = changed.len(),
            dependents = classes.len(),
            "computed rebuild plan"
        );
        Ok(Self { classes })
    }

    /// Qualified names to rebuild, sorted by symbol id.
    pub fn classes(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.classes.iter().copied()
    }

    /// Returns `true` if `qualified_name` must be rebuilt.
    pub fn contains(&self, qualified_name: Symbol) -> bool {
        self.classes.contains(&qualified_name)
    }

    /// Returns `true` if nothing needs rebuilding.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of classes to rebuild.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Consumes the plan, returning the sorted class list.
    pub fn into_vec(self) -> Vec<Symbol> {
        self.classes.into_iter().collect()
    }
}

/// Adds member-level dependents of `qualified_name` to `out`. Returns whether
/// subclasses are affected.
fn collect_member_changes(
    old: &Cache,
    new: &Cache,
    symbols: &SymbolTable,
    qualified_name: Symbol,
    out: &mut BTreeSet<Symbol>,
) -> Result<bool, CacheError> {
    let Some(old_decl) = old.find_declaration_id(qualified_name) else {
        return Ok(false);
    };
    let new_decl = new.find_declaration_id(qualified_name);
    let mut affects_subclasses = false;

    for old_field in old.field_ids(old_decl)? {
        let name = old.field_name(old_field)?;
        let changed = match lookup(new_decl, |d| new.find_field(d, name))? {
            None => true,
            Some(new_field) => {
                FieldChangeDescription::new(old, new, old_field, new_field)?.is_changed()
            }
        };
        if changed {
            out.extend(old.field_referencers(old_field)?);
        }
    }

    let mut matched: HashSet<MethodId> = HashSet::new();
    for old_method in old.method_ids(old_decl)? {
        let name = old.method_name(old_method)?;
        let descriptor = old.method_descriptor(old_method)?;
        let found = lookup(new_decl, |d| {
            new.find_compatible_method(d, name, descriptor, symbols)
        })?;
        match found {
            None => out.extend(old.method_referencers(old_method)?),
            Some(new_method) => {
                matched.insert(new_method);
                let change =
                    MethodChangeDescription::new(old, new, old_method, new_method, symbols)?;
                if change.is_changed() {
                    out.extend(old.method_referencers(old_method)?);
                }
                affects_subclasses |= change.affects_subclasses();
            }
        }
    }

    if let Some(new_decl) = new_decl {
        for new_method in new.method_ids(new_decl)? {
            if matched.contains(&new_method) {
                continue;
            }
            if new.method_flags(new_method)?.is_abstract() {
                affects_subclasses = true;
            }
            let name = new.method_name(new_method)?;
            for overload in old.find_methods_by_name(old_decl, name)? {
                out.extend(old.method_referencers(overload)?);
            }
        }
    }
    Ok(affects_subclasses)
}

fn lookup<T>(
    declaration: Option<DeclarationId>,
    find: impl FnOnce(DeclarationId) -> Result<Option<T>, CacheError>,
) -> Result<Option<T>, CacheError> {
    match declaration {
        Some(d) => find(d),
        None => Ok(None),
    }
}

/// Direct and indirect subclasses recorded in `cache`.
fn all_subclasses(cache: &Cache, root: ClassInfoId) -> Result<BTreeSet<Symbol>, CacheError> {
    let mut found = BTreeSet::new();
    let mut queue: VecDeque<Symbol> = cache.subclasses(root)?.into();
    while let Some(subclass) = queue.pop_front() {
        if !found.insert(subclass) {
            continue;
        }
        if let Some(id) = cache.class_id(subclass) {
            queue.extend(cache.subclasses(id)?);
        }
    }
    Ok(found)
}
