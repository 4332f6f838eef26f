//! The dependency cache store.
//!
//! `Cache` ties together the two identity indices (qualified name → class-info
//! id, qualified name → declaration id) and the record pool. Every public
//! method locks the instance, so the store behaves as a monitor: concurrent
//! callers serialize, and no two operations ever touch the pool at once.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use depot_classfile::descriptor;
use depot_classfile::{
    AnnotationConstantValue, ClassFile, ConstantValue, FieldInfo, MemberInfo, MethodInfo,
    ReferenceInfo,
};
use depot_common::{AccessFlags, Symbol, SymbolTable};
use parking_lot::Mutex;

use crate::dependency::Dependency;
use crate::error::CacheError;
use crate::ids::{ClassInfoId, DeclarationId, FieldId, MethodId};
use crate::index::{read_index, remove_if_exists, tmp_path, write_index};
use crate::pool::RecordPool;
use crate::records::{
    ClassDeclarationRecord, ClassInfoRecord, FieldDeclarationRecord, MethodDeclarationRecord,
};

/// Index file mapping qualified names to declaration ids.
pub const DECLARATIONS_INDEX_FILE: &str = "declarations_index.dat";

/// Index file mapping qualified names to class-info ids.
pub const CLASSINFO_INDEX_FILE: &str = "classinfo_index.dat";

/// Record pool file.
pub const RECORDS_FILE: &str = "records.dat";

/// Upper bound on superclass/interface hops when resolving an inherited member.
const MAX_HIERARCHY_DEPTH: usize = 256;

/// Persistent, id-indexed store of per-class and per-member dependency data.
///
/// Open with [`Cache::open`], mutate through the import/referencer methods,
/// and persist with [`Cache::dispose`] (or [`Cache::flush`]). Nothing is
/// durable until then; a crash mid-session leaves the previous state on disk.
pub struct Cache {
    store_dir: PathBuf,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    pool: RecordPool,
    class_info_index: HashMap<Symbol, ClassInfoId>,
    declaration_index: HashMap<Symbol, DeclarationId>,
}

/// A class copied out of another cache for [`Cache::import_class_from`].
struct ClassSnapshot {
    info: ClassInfoRecord,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

impl Cache {
    /// Opens the store in `store_dir`, loading both indices and the record pool.
    ///
    /// A directory without store files yields an empty cache. Store files
    /// that are present but unreadable, or indices that point at missing
    /// records, are reported as [`CacheError::Corrupted`].
    pub fn open(store_dir: &Path) -> Result<Self, CacheError> {
        let pool_path = store_dir.join(RECORDS_FILE);
        let declarations_path = store_dir.join(DECLARATIONS_INDEX_FILE);
        let class_info_path = store_dir.join(CLASSINFO_INDEX_FILE);

        let present = [&pool_path, &declarations_path, &class_info_path]
            .iter()
            .filter(|p| p.exists())
            .count();
        if present != 0 && present != 3 {
            return Err(CacheError::corrupted_because(format!(
                "store at {} is incomplete",
                store_dir.display()
            )));
        }

        let pool = RecordPool::load(&pool_path)?.unwrap_or_default();
        let declaration_index = read_index::<DeclarationId>(&declarations_path)?;
        let class_info_index = read_index::<ClassInfoId>(&class_info_path)?;

        for id in declaration_index.values() {
            if !pool.declarations.contains(*id) {
                return Err(CacheError::corrupted_because(format!(
                    "declaration index points at missing record {id}"
                )));
            }
        }
        for id in class_info_index.values() {
            if !pool.class_infos.contains(*id) {
                return Err(CacheError::corrupted_because(format!(
                    "class info index points at missing record {id}"
                )));
            }
        }

        tracing::debug!(
            store = %store_dir.display(),
            classes = class_info_index.len(),
            declarations = declaration_index.len(),
            members = pool.fields.len() + pool.methods.len(),
            "opened dependency cache"
        );

        Ok(Self {
            store_dir: store_dir.to_path_buf(),
            state: Mutex::new(CacheState {
                pool,
                class_info_index,
                declaration_index,
            }),
        })
    }

    /// The directory this cache persists to.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Writes the indices and the record pool to disk.
    ///
    /// If any write fails, the index and pool files are deleted so the next
    /// [`open`](Self::open) sees an empty store and forces a full rebuild,
    /// rather than a half-written one.
    pub fn flush(&self) -> Result<(), CacheError> {
        let state = self.state.lock();
        let result = self.write_store(&state);
        if let Err(err) = &result {
            tracing::warn!(
                store = %self.store_dir.display(),
                error = %err,
                "failed to flush dependency cache; deleting index files"
            );
            self.delete_store_files_best_effort();
        } else {
            tracing::debug!(
                store = %self.store_dir.display(),
                classes = state.class_info_index.len(),
                "flushed dependency cache"
            );
        }
        result
    }

    /// Flushes and closes the cache.
    pub fn dispose(self) -> Result<(), CacheError> {
        self.flush()
    }

    /// Drops every record and index entry and deletes the store files.
    pub fn wipe(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        *state = CacheState::default();
        Self::remove_store_files(&self.store_dir)?;
        tracing::info!(store = %self.store_dir.display(), "wiped dependency cache");
        Ok(())
    }

    /// Deletes the index and pool files in `store_dir` without opening it.
    ///
    /// This is the recovery path when [`open`](Self::open) reports corruption.
    pub fn remove_store_files(store_dir: &Path) -> Result<(), CacheError> {
        for name in [DECLARATIONS_INDEX_FILE, CLASSINFO_INDEX_FILE, RECORDS_FILE] {
            remove_if_exists(&store_dir.join(name))?;
        }
        Ok(())
    }

    fn write_store(&self, state: &CacheState) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.store_dir).map_err(|e| CacheError::Io {
            path: self.store_dir.clone(),
            source: e,
        })?;
        state.pool.save(&self.store_dir.join(RECORDS_FILE))?;
        write_index(
            &self.store_dir.join(DECLARATIONS_INDEX_FILE),
            &state.declaration_index,
        )?;
        write_index(
            &self.store_dir.join(CLASSINFO_INDEX_FILE),
            &state.class_info_index,
        )
    }

    fn delete_store_files_best_effort(&self) {
        for name in [DECLARATIONS_INDEX_FILE, CLASSINFO_INDEX_FILE, RECORDS_FILE] {
            let path = self.store_dir.join(name);
            for candidate in [tmp_path(&path), path] {
                if let Err(err) = remove_if_exists(&candidate) {
                    tracing::warn!(error = %err, "could not delete store file");
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    /// Qualified names of all classes with a class-info record, sorted.
    pub fn all_class_names(&self) -> Vec<Symbol> {
        let state = self.state.lock();
        let mut names: Vec<Symbol> = state.class_info_index.keys().copied().collect();
        names.sort();
        names
    }

    /// Number of classes with a class-info record.
    pub fn class_count(&self) -> usize {
        self.state.lock().class_info_index.len()
    }

    /// The class-info id of `qualified_name`, or `None` if it was never imported.
    pub fn class_id(&self, qualified_name: Symbol) -> Option<ClassInfoId> {
        self.state
            .lock()
            .class_info_index
            .get(&qualified_name)
            .copied()
    }

    /// Returns `true` if `qualified_name` has been imported.
    pub fn contains_class(&self, qualified_name: Symbol) -> bool {
        self.class_id(qualified_name).is_some()
    }

    /// The declaration id of `qualified_name`, allocating an empty declaration
    /// record on first use.
    pub fn declaration_id(&self, qualified_name: Symbol) -> Result<DeclarationId, CacheError> {
        self.state.lock().declaration_id(qualified_name)
    }

    /// The declaration id of `qualified_name` without allocating.
    pub fn find_declaration_id(&self, qualified_name: Symbol) -> Option<DeclarationId> {
        self.state
            .lock()
            .declaration_index
            .get(&qualified_name)
            .copied()
    }

    // ---------------------------------------------------------------------
    // Import and removal
    // ---------------------------------------------------------------------

    /// Stores a freshly parsed class, returning its qualified name.
    ///
    /// Scalar class data is overwritten; subclasses recorded earlier are kept,
    /// and the class leaves the subclass sets of supertypes it no longer
    /// extends. Members are reconciled against the stored declarations so
    /// that surviving members keep their ids and referencer sets. The symbol
    /// table is used to match methods whose return type changed.
    ///
    /// Classes whose earlier link was waiting on this one are relinked.
    pub fn import_class_info(
        &self,
        class: &ClassFile,
        symbols: &SymbolTable,
    ) -> Result<Symbol, CacheError> {
        let info = ClassInfoRecord::from_class_file(class);
        self.state
            .lock()
            .store_class(info, &class.fields, &class.methods, symbols)
    }

    /// Copies `qualified_name` from `from` (typically a staging cache holding
    /// freshly compiled classes) into this cache, reconciling members the same
    /// way [`import_class_info`](Self::import_class_info) does.
    ///
    /// Referencer sets are not copied: they belong to the referencing classes
    /// and survive on the destination's member ids.
    pub fn import_class_from(
        &self,
        from: &Cache,
        qualified_name: Symbol,
        symbols: &SymbolTable,
    ) -> Result<(), CacheError> {
        if std::ptr::eq(self, from) {
            return Err(CacheError::InvariantViolation(
                "cannot import a cache into itself".to_string(),
            ));
        }
        // The source lock is released before the destination lock is taken.
        let snapshot = from.state.lock().snapshot(qualified_name)?;
        self.state.lock().store_class(
            snapshot.info,
            &snapshot.fields,
            &snapshot.methods,
            symbols,
        )?;
        tracing::debug!(
            class = qualified_name.as_raw(),
            from = %from.store_dir.display(),
            "imported class from cache"
        );
        Ok(())
    }

    /// Removes a class with all of its member records and both index entries.
    ///
    /// The class also leaves the subclass sets of its supertypes.
    pub fn remove_class(&self, qualified_name: Symbol) -> Result<(), CacheError> {
        self.state.lock().remove_class(qualified_name)
    }

    // ---------------------------------------------------------------------
    // Class info
    // ---------------------------------------------------------------------

    /// Qualified name of the class.
    pub fn qualified_name(&self, id: ClassInfoId) -> Result<Symbol, CacheError> {
        self.with_class(id, |c| c.qualified_name)
    }

    /// Qualified name of the superclass, if any.
    pub fn super_qualified_name(&self, id: ClassInfoId) -> Result<Option<Symbol>, CacheError> {
        self.with_class(id, |c| c.super_qualified_name)
    }

    /// Directly implemented interfaces, in declaration order.
    pub fn super_interfaces(&self, id: ClassInfoId) -> Result<Vec<Symbol>, CacheError> {
        self.with_class(id, |c| c.super_interfaces.clone())
    }

    /// Class access flags.
    pub fn flags(&self, id: ClassInfoId) -> Result<AccessFlags, CacheError> {
        self.with_class(id, |c| c.flags)
    }

    /// Generic signature of the class.
    pub fn generic_signature(&self, id: ClassInfoId) -> Result<Option<Symbol>, CacheError> {
        self.with_class(id, |c| c.generic_signature)
    }

    /// `SourceFile` attribute of the class.
    pub fn source_file_name(&self, id: ClassInfoId) -> Result<Option<String>, CacheError> {
        self.with_class(id, |c| c.source_file_name.clone())
    }

    /// Path of the class file the class was last imported from.
    pub fn path(&self, id: ClassInfoId) -> Result<Option<String>, CacheError> {
        self.with_class(id, |c| c.path.clone())
    }

    /// Records where the class file now lives.
    pub fn set_path(&self, id: ClassInfoId, path: Option<String>) -> Result<(), CacheError> {
        self.with_class_mut(id, |c| c.path = path)
    }

    /// Qualified names of the known direct subclasses and implementors.
    pub fn subclasses(&self, id: ClassInfoId) -> Result<Vec<Symbol>, CacheError> {
        self.with_class(id, |c| c.subclasses.iter().copied().collect())
    }

    /// Registers `subclass` as a direct subclass or implementor.
    pub fn add_subclass(&self, id: ClassInfoId, subclass: Symbol) -> Result<(), CacheError> {
        self.with_class_mut(id, |c| {
            c.subclasses.insert(subclass);
        })
    }

    /// Unregisters `subclass`.
    pub fn remove_subclass(&self, id: ClassInfoId, subclass: Symbol) -> Result<(), CacheError> {
        self.with_class_mut(id, |c| {
            c.subclasses.remove(&subclass);
        })
    }

    /// Qualified names of the classes this class refers to, sorted.
    pub fn referenced_classes(&self, id: ClassInfoId) -> Result<Vec<Symbol>, CacheError> {
        self.with_class(id, |c| c.referenced_classes.iter().copied().collect())
    }

    /// Class, field and method references recorded for this class.
    pub fn references(&self, id: ClassInfoId) -> Result<Vec<ReferenceInfo>, CacheError> {
        self.with_class(id, |c| c.references.clone())
    }

    /// Forgets what `qualified_name` refers to. Does nothing for unknown classes.
    pub fn clear_referenced_classes(&self, qualified_name: Symbol) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        if let Some(id) = state.class_info_index.get(&qualified_name).copied() {
            let record = state.pool.class_infos.get_mut(id)?;
            record.references.clear();
            record.referenced_classes.clear();
        }
        Ok(())
    }

    /// `RuntimeVisibleAnnotations` of the class.
    pub fn runtime_visible_annotations(
        &self,
        id: ClassInfoId,
    ) -> Result<Vec<AnnotationConstantValue>, CacheError> {
        self.with_class(id, |c| c.runtime_visible_annotations.clone())
    }

    /// `RuntimeInvisibleAnnotations` of the class.
    pub fn runtime_invisible_annotations(
        &self,
        id: ClassInfoId,
    ) -> Result<Vec<AnnotationConstantValue>, CacheError> {
        self.with_class(id, |c| c.runtime_invisible_annotations.clone())
    }

    fn with_class<R>(
        &self,
        id: ClassInfoId,
        f: impl FnOnce(&ClassInfoRecord) -> R,
    ) -> Result<R, CacheError> {
        let state = self.state.lock();
        Ok(f(state.pool.class_infos.get(id)?))
    }

    fn with_class_mut<R>(
        &self,
        id: ClassInfoId,
        f: impl FnOnce(&mut ClassInfoRecord) -> R,
    ) -> Result<R, CacheError> {
        let mut state = self.state.lock();
        Ok(f(state.pool.class_infos.get_mut(id)?))
    }

    // ---------------------------------------------------------------------
    // Members
    // ---------------------------------------------------------------------

    /// Field ids of the class, in declaration order.
    pub fn field_ids(&self, declaration: DeclarationId) -> Result<Vec<FieldId>, CacheError> {
        let state = self.state.lock();
        Ok(state.pool.declarations.get(declaration)?.fields.clone())
    }

    /// Method ids of the class, in declaration order.
    pub fn method_ids(&self, declaration: DeclarationId) -> Result<Vec<MethodId>, CacheError> {
        let state = self.state.lock();
        Ok(state.pool.declarations.get(declaration)?.methods.clone())
    }

    /// The field named `name`, if the class declares one.
    pub fn find_field(
        &self,
        declaration: DeclarationId,
        name: Symbol,
    ) -> Result<Option<FieldId>, CacheError> {
        self.state.lock().find_field(declaration, name)
    }

    /// The method with exactly this name and descriptor.
    pub fn find_method(
        &self,
        declaration: DeclarationId,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodId>, CacheError> {
        self.state.lock().find_method(declaration, name, descriptor)
    }

    /// The method with this name and descriptor or, failing that, the method
    /// with this name and the same parameter types (its return type changed).
    pub fn find_compatible_method(
        &self,
        declaration: DeclarationId,
        name: Symbol,
        descriptor: Symbol,
        symbols: &SymbolTable,
    ) -> Result<Option<MethodId>, CacheError> {
        let state = self.state.lock();
        if let Some(id) = state.find_method(declaration, name, descriptor)? {
            return Ok(Some(id));
        }
        let Some(params) = parameters_of(symbols, descriptor) else {
            return Ok(None);
        };
        for id in &state.pool.declarations.get(declaration)?.methods {
            let info = &state.pool.methods.get(*id)?.info;
            if info.name == name && parameters_of(symbols, info.descriptor) == Some(params) {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// All overloads named `name`.
    pub fn find_methods_by_name(
        &self,
        declaration: DeclarationId,
        name: Symbol,
    ) -> Result<Vec<MethodId>, CacheError> {
        let state = self.state.lock();
        let mut found = Vec::new();
        for id in &state.pool.declarations.get(declaration)?.methods {
            if state.pool.methods.get(*id)?.info.name == name {
                found.push(*id);
            }
        }
        Ok(found)
    }

    /// The stored field declaration.
    pub fn field_info(&self, id: FieldId) -> Result<FieldInfo, CacheError> {
        self.with_field(id, |f| f.clone())
    }

    /// Field name.
    pub fn field_name(&self, id: FieldId) -> Result<Symbol, CacheError> {
        self.with_field(id, |f| f.name)
    }

    /// Field descriptor.
    pub fn field_descriptor(&self, id: FieldId) -> Result<Symbol, CacheError> {
        self.with_field(id, |f| f.descriptor)
    }

    /// Field access flags.
    pub fn field_flags(&self, id: FieldId) -> Result<AccessFlags, CacheError> {
        self.with_field(id, |f| f.flags)
    }

    /// Field generic signature.
    pub fn field_generic_signature(&self, id: FieldId) -> Result<Option<Symbol>, CacheError> {
        self.with_field(id, |f| f.generic_signature)
    }

    /// Compile-time constant value of the field.
    pub fn field_constant_value(&self, id: FieldId) -> Result<Option<ConstantValue>, CacheError> {
        self.with_field(id, |f| f.constant_value.clone())
    }

    /// The stored method declaration.
    pub fn method_info(&self, id: MethodId) -> Result<MethodInfo, CacheError> {
        self.with_method(id, |m| m.clone())
    }

    /// Method name.
    pub fn method_name(&self, id: MethodId) -> Result<Symbol, CacheError> {
        self.with_method(id, |m| m.name)
    }

    /// Method descriptor.
    pub fn method_descriptor(&self, id: MethodId) -> Result<Symbol, CacheError> {
        self.with_method(id, |m| m.descriptor)
    }

    /// Method access flags.
    pub fn method_flags(&self, id: MethodId) -> Result<AccessFlags, CacheError> {
        self.with_method(id, |m| m.flags)
    }

    /// Method generic signature.
    pub fn method_generic_signature(&self, id: MethodId) -> Result<Option<Symbol>, CacheError> {
        self.with_method(id, |m| m.generic_signature)
    }

    /// Declared thrown exceptions.
    pub fn method_thrown_exceptions(&self, id: MethodId) -> Result<Vec<Symbol>, CacheError> {
        self.with_method(id, |m| m.thrown_exceptions.clone())
    }

    /// Returns `true` for constructors.
    pub fn is_constructor(&self, id: MethodId) -> Result<bool, CacheError> {
        self.with_method(id, |m| m.is_constructor)
    }

    /// Default value of an annotation-type element.
    pub fn annotation_default(&self, id: MethodId) -> Result<Option<ConstantValue>, CacheError> {
        self.with_method(id, |m| m.annotation_default.clone())
    }

    fn with_field<R>(&self, id: FieldId, f: impl FnOnce(&FieldInfo) -> R) -> Result<R, CacheError> {
        let state = self.state.lock();
        Ok(f(&state.pool.fields.get(id)?.info))
    }

    fn with_method<R>(
        &self,
        id: MethodId,
        f: impl FnOnce(&MethodInfo) -> R,
    ) -> Result<R, CacheError> {
        let state = self.state.lock();
        Ok(f(&state.pool.methods.get(id)?.info))
    }

    // ---------------------------------------------------------------------
    // Referencers
    // ---------------------------------------------------------------------

    /// Classes that reference the class itself.
    pub fn class_referencers(&self, declaration: DeclarationId) -> Result<Vec<Symbol>, CacheError> {
        let state = self.state.lock();
        Ok(state
            .pool
            .declarations
            .get(declaration)?
            .referencers
            .iter()
            .copied()
            .collect())
    }

    /// Classes that reference this field.
    pub fn field_referencers(&self, id: FieldId) -> Result<Vec<Symbol>, CacheError> {
        let state = self.state.lock();
        Ok(state.pool.fields.get(id)?.referencers.iter().copied().collect())
    }

    /// Classes that reference this method.
    pub fn method_referencers(&self, id: MethodId) -> Result<Vec<Symbol>, CacheError> {
        let state = self.state.lock();
        Ok(state.pool.methods.get(id)?.referencers.iter().copied().collect())
    }

    /// Records that `referencer` references `qualified_name` directly.
    pub fn add_class_referencer(
        &self,
        qualified_name: Symbol,
        referencer: Symbol,
    ) -> Result<(), CacheError> {
        self.state
            .lock()
            .add_class_referencer(qualified_name, referencer)
    }

    /// Drops `referencer` from the class-level referencers of `qualified_name`.
    pub fn remove_class_referencer(
        &self,
        qualified_name: Symbol,
        referencer: Symbol,
    ) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        if let Some(decl) = state.declaration_index.get(&qualified_name).copied() {
            state
                .pool
                .declarations
                .get_mut(decl)?
                .referencers
                .remove(&referencer);
        }
        Ok(())
    }

    /// Records that `referencer` uses field `field_name` of `qualified_name`.
    ///
    /// Returns `false` if the class declares no such field.
    pub fn add_field_referencer(
        &self,
        qualified_name: Symbol,
        field_name: Symbol,
        referencer: Symbol,
    ) -> Result<bool, CacheError> {
        let mut state = self.state.lock();
        let decl = state.declaration_id(qualified_name)?;
        match state.find_field(decl, field_name)? {
            Some(id) => {
                state.pool.fields.get_mut(id)?.referencers.insert(referencer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Records that `referencer` calls method `name`/`descriptor` of
    /// `qualified_name`.
    ///
    /// Returns `false` if the class declares no such method.
    pub fn add_method_referencer(
        &self,
        qualified_name: Symbol,
        name: Symbol,
        descriptor: Symbol,
        referencer: Symbol,
    ) -> Result<bool, CacheError> {
        let mut state = self.state.lock();
        let decl = state.declaration_id(qualified_name)?;
        match state.find_method(decl, name, descriptor)? {
            Some(id) => {
                state.pool.methods.get_mut(id)?.referencers.insert(referencer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops `referencer` from every referencer set in the store.
    ///
    /// Called before re-linking a recompiled class, whose references may have
    /// changed.
    pub fn remove_referencer(&self, referencer: Symbol) {
        let mut state = self.state.lock();
        let pool = &mut state.pool;
        for record in pool.declarations.values_mut() {
            record.referencers.remove(&referencer);
            record.waiting.remove(&referencer);
        }
        for record in pool.fields.values_mut() {
            record.referencers.remove(&referencer);
        }
        for record in pool.methods.values_mut() {
            record.referencers.remove(&referencer);
        }
    }

    /// Registers the recorded references of `qualified_name` as referencers on
    /// the classes and members it uses, and registers it as a subclass of its
    /// superclass and interfaces.
    ///
    /// Member references are resolved against the owner named in the constant
    /// pool first, then up its superclass and interface chain. When a
    /// supertype or member cannot be found, the class waits on every class
    /// along that lookup path and is linked again as soon as one of them is
    /// imported.
    pub fn link_class(&self, qualified_name: Symbol) -> Result<(), CacheError> {
        self.state.lock().link_class(qualified_name)
    }

    // ---------------------------------------------------------------------
    // Back dependencies
    // ---------------------------------------------------------------------

    /// Every class that depends on `qualified_name`, one [`Dependency`] per
    /// referencing class, sorted by referencer.
    ///
    /// Covers referencers of the class itself, of its fields, and of its
    /// methods. Self-references are excluded.
    pub fn back_dependencies(&self, qualified_name: Symbol) -> Result<Vec<Dependency>, CacheError> {
        let state = self.state.lock();
        let Some(decl) = state.declaration_index.get(&qualified_name).copied() else {
            return Ok(Vec::new());
        };
        let record = state.pool.declarations.get(decl)?;

        let mut dependencies: BTreeMap<Symbol, Dependency> = BTreeMap::new();
        for &referencer in &record.referencers {
            if referencer != qualified_name {
                dependencies
                    .entry(referencer)
                    .or_insert_with(|| Dependency::new(referencer));
            }
        }
        for &field_id in &record.fields {
            let field = state.pool.fields.get(field_id)?;
            for &referencer in &field.referencers {
                if referencer != qualified_name {
                    dependencies
                        .entry(referencer)
                        .or_insert_with(|| Dependency::new(referencer))
                        .add_member_info(MemberInfo::Field(field.info.clone()));
                }
            }
        }
        for &method_id in &record.methods {
            let method = state.pool.methods.get(method_id)?;
            for &referencer in &method.referencers {
                if referencer != qualified_name {
                    dependencies
                        .entry(referencer)
                        .or_insert_with(|| Dependency::new(referencer))
                        .add_member_info(MemberInfo::Method(method.info.clone()));
                }
            }
        }
        Ok(dependencies.into_values().collect())
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("store_dir", &self.store_dir)
            .finish_non_exhaustive()
    }
}

fn parameters_of(symbols: &SymbolTable, descriptor: Symbol) -> Option<&str> {
    symbols
        .try_resolve(descriptor)
        .and_then(descriptor::method_parameters)
}

impl CacheState {
    fn declaration_id(&mut self, qualified_name: Symbol) -> Result<DeclarationId, CacheError> {
        if let Some(id) = self.declaration_index.get(&qualified_name) {
            return Ok(*id);
        }
        let id = self
            .pool
            .declarations
            .insert(ClassDeclarationRecord::new(qualified_name))?;
        self.declaration_index.insert(qualified_name, id);
        Ok(id)
    }

    fn find_field(
        &self,
        declaration: DeclarationId,
        name: Symbol,
    ) -> Result<Option<FieldId>, CacheError> {
        for id in &self.pool.declarations.get(declaration)?.fields {
            if self.pool.fields.get(*id)?.info.name == name {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    fn find_method(
        &self,
        declaration: DeclarationId,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodId>, CacheError> {
        for id in &self.pool.declarations.get(declaration)?.methods {
            let info = &self.pool.methods.get(*id)?.info;
            if info.name == name && info.descriptor == descriptor {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    fn snapshot(&self, qualified_name: Symbol) -> Result<ClassSnapshot, CacheError> {
        let class_id = self
            .class_info_index
            .get(&qualified_name)
            .copied()
            .ok_or_else(|| {
                CacheError::InvariantViolation(format!(
                    "class {} is not in the source cache",
                    qualified_name.as_raw()
                ))
            })?;
        let info = self.pool.class_infos.get(class_id)?.clone();

        let (mut fields, mut methods) = (Vec::new(), Vec::new());
        if let Some(decl) = self.declaration_index.get(&qualified_name) {
            let record = self.pool.declarations.get(*decl)?;
            for id in &record.fields {
                fields.push(self.pool.fields.get(*id)?.info.clone());
            }
            for id in &record.methods {
                methods.push(self.pool.methods.get(*id)?.info.clone());
            }
        }
        Ok(ClassSnapshot {
            info,
            fields,
            methods,
        })
    }

    fn store_class(
        &mut self,
        mut info: ClassInfoRecord,
        fields: &[FieldInfo],
        methods: &[MethodInfo],
        symbols: &SymbolTable,
    ) -> Result<Symbol, CacheError> {
        let qualified_name = info.qualified_name;
        if info.super_qualified_name == Some(qualified_name) {
            return Err(CacheError::corrupted_because(format!(
                "class {} declares itself as its superclass",
                symbols
                    .try_resolve(qualified_name)
                    .unwrap_or("<unknown>")
            )));
        }

        match self.class_info_index.get(&qualified_name).copied() {
            Some(id) => {
                let record = self.pool.class_infos.get_mut(id)?;
                let dropped: Vec<Symbol> = supertypes_of(record)
                    .filter(|s| !supertypes_of(&info).any(|n| n == *s))
                    .collect();
                let mut subclasses = std::mem::take(&mut record.subclasses);
                subclasses.append(&mut info.subclasses);
                info.subclasses = subclasses;
                *record = info;
                for supertype in dropped {
                    self.forget_subclass(supertype, qualified_name)?;
                }
            }
            None => {
                let id = self.pool.class_infos.insert(info)?;
                self.class_info_index.insert(qualified_name, id);
            }
        }

        let decl = self.declaration_id(qualified_name)?;
        self.update_member_declarations(decl, fields, methods, symbols)?;

        let waiting = std::mem::take(&mut self.pool.declarations.get_mut(decl)?.waiting);
        let mut relinked = 0usize;
        for class in waiting {
            if class != qualified_name && self.class_info_index.contains_key(&class) {
                self.link_class(class)?;
                relinked += 1;
            }
        }

        tracing::debug!(
            class = qualified_name.as_raw(),
            fields = fields.len(),
            methods = methods.len(),
            relinked,
            "imported class info"
        );
        Ok(qualified_name)
    }

    fn forget_subclass(&mut self, supertype: Symbol, subclass: Symbol) -> Result<(), CacheError> {
        if let Some(id) = self.class_info_index.get(&supertype).copied() {
            self.pool.class_infos.get_mut(id)?.subclasses.remove(&subclass);
        }
        Ok(())
    }

    /// Records that `class` must be relinked once `on` is imported.
    fn wait_for(&mut self, on: Symbol, class: Symbol) -> Result<(), CacheError> {
        let decl = self.declaration_id(on)?;
        self.pool.declarations.get_mut(decl)?.waiting.insert(class);
        Ok(())
    }

    /// Reconciles stored member declarations with a new member list.
    ///
    /// Fields match by name. Methods match by name and descriptor, then by
    /// name and parameter types. Matched records are updated in place and keep
    /// their ids; unmatched old records are freed; unmatched new members get
    /// fresh records.
    fn update_member_declarations(
        &mut self,
        declaration: DeclarationId,
        fields: &[FieldInfo],
        methods: &[MethodInfo],
        symbols: &SymbolTable,
    ) -> Result<(), CacheError> {
        let (old_fields, old_methods) = {
            let record = self.pool.declarations.get(declaration)?;
            (record.fields.clone(), record.methods.clone())
        };

        // Fields
        let mut old_by_name: HashMap<Symbol, FieldId> = HashMap::new();
        for id in &old_fields {
            let name = self.pool.fields.get(*id)?.info.name;
            old_by_name.entry(name).or_insert(*id);
        }
        let mut field_ids = Vec::with_capacity(fields.len());
        for field in fields {
            match old_by_name.remove(&field.name) {
                Some(id) => {
                    self.pool.fields.get_mut(id)?.info = field.clone();
                    field_ids.push(id);
                }
                None => {
                    let id = self
                        .pool
                        .fields
                        .insert(FieldDeclarationRecord::new(field.clone()))?;
                    field_ids.push(id);
                }
            }
        }
        let kept_fields: HashSet<FieldId> = field_ids.iter().copied().collect();
        for id in old_fields {
            if !kept_fields.contains(&id) {
                self.pool.fields.remove(id)?;
            }
        }

        // Methods
        let mut old: Vec<(MethodId, Symbol, Symbol)> = Vec::with_capacity(old_methods.len());
        for id in &old_methods {
            let info = &self.pool.methods.get(*id)?.info;
            old.push((*id, info.name, info.descriptor));
        }
        let mut assigned: Vec<Option<MethodId>> = vec![None; methods.len()];
        let mut used: HashSet<MethodId> = HashSet::new();

        for (slot, method) in assigned.iter_mut().zip(methods) {
            let exact = old.iter().find(|(id, name, desc)| {
                !used.contains(id) && *name == method.name && *desc == method.descriptor
            });
            if let Some((id, _, _)) = exact {
                used.insert(*id);
                *slot = Some(*id);
            }
        }
        for (slot, method) in assigned.iter_mut().zip(methods) {
            if slot.is_some() {
                continue;
            }
            let Some(params) = parameters_of(symbols, method.descriptor) else {
                continue;
            };
            let compatible = old.iter().find(|(id, name, desc)| {
                !used.contains(id)
                    && *name == method.name
                    && parameters_of(symbols, *desc) == Some(params)
            });
            if let Some((id, _, _)) = compatible {
                used.insert(*id);
                *slot = Some(*id);
            }
        }

        let mut method_ids = Vec::with_capacity(methods.len());
        for (slot, method) in assigned.into_iter().zip(methods) {
            match slot {
                Some(id) => {
                    self.pool.methods.get_mut(id)?.info = method.clone();
                    method_ids.push(id);
                }
                None => {
                    let id = self
                        .pool
                        .methods
                        .insert(MethodDeclarationRecord::new(method.clone()))?;
                    method_ids.push(id);
                }
            }
        }
        for (id, _, _) in old {
            if !used.contains(&id) {
                self.pool.methods.remove(id)?;
            }
        }

        let record = self.pool.declarations.get_mut(declaration)?;
        record.fields = field_ids;
        record.methods = method_ids;
        Ok(())
    }

    fn remove_class(&mut self, qualified_name: Symbol) -> Result<(), CacheError> {
        if let Some(decl) = self.declaration_index.get(&qualified_name).copied() {
            let (fields, methods) = {
                let record = self.pool.declarations.get(decl)?;
                (record.fields.clone(), record.methods.clone())
            };
            // Members go first so their records are not orphaned.
            for id in fields {
                self.pool.fields.remove(id)?;
            }
            for id in methods {
                self.pool.methods.remove(id)?;
            }
            self.pool.declarations.remove(decl)?;
        }
        if let Some(id) = self.class_info_index.get(&qualified_name).copied() {
            let record = self.pool.class_infos.remove(id)?;
            for supertype in supertypes_of(&record) {
                self.forget_subclass(supertype, qualified_name)?;
            }
        }
        self.declaration_index.remove(&qualified_name);
        self.class_info_index.remove(&qualified_name);
        for record in self.pool.declarations.values_mut() {
            record.waiting.remove(&qualified_name);
        }

        tracing::debug!(class = qualified_name.as_raw(), "removed class");
        Ok(())
    }

    fn add_class_referencer(
        &mut self,
        qualified_name: Symbol,
        referencer: Symbol,
    ) -> Result<(), CacheError> {
        let decl = self.declaration_id(qualified_name)?;
        self.pool
            .declarations
            .get_mut(decl)?
            .referencers
            .insert(referencer);
        Ok(())
    }

    fn link_class(&mut self, qualified_name: Symbol) -> Result<(), CacheError> {
        let Some(class_id) = self.class_info_index.get(&qualified_name).copied() else {
            return Err(CacheError::InvariantViolation(format!(
                "cannot link class {} before importing it",
                qualified_name.as_raw()
            )));
        };
        let (references, supertypes) = {
            let record = self.pool.class_infos.get(class_id)?;
            let supertypes: Vec<Symbol> = supertypes_of(record).collect();
            (record.references.clone(), supertypes)
        };

        for supertype in supertypes {
            match self.class_info_index.get(&supertype).copied() {
                Some(id) => {
                    self.pool
                        .class_infos
                        .get_mut(id)?
                        .subclasses
                        .insert(qualified_name);
                }
                None => self.wait_for(supertype, qualified_name)?,
            }
        }

        let (mut linked, mut unresolved) = (0usize, 0usize);
        for reference in references {
            let (owner, member) = match reference {
                ReferenceInfo::Class(owner) => {
                    self.add_class_referencer(owner, qualified_name)?;
                    linked += 1;
                    continue;
                }
                ReferenceInfo::Field { owner, name, .. } => {
                    let field = self.resolve_member(owner, |state, decl| {
                        state.find_field(decl, name).map(|f| f.map(Member::Field))
                    })?;
                    (owner, field)
                }
                ReferenceInfo::Method {
                    owner,
                    name,
                    descriptor,
                } => {
                    let method = self.resolve_member(owner, |state, decl| {
                        state
                            .find_method(decl, name, descriptor)
                            .map(|m| m.map(Member::Method))
                    })?;
                    (owner, method)
                }
            };
            match member {
                Some(member) => {
                    self.add_member_referencer(member, qualified_name)?;
                    linked += 1;
                }
                None => {
                    // Any class on the lookup path may still be imported later.
                    for class in self.lookup_path(owner)? {
                        self.wait_for(class, qualified_name)?;
                    }
                    unresolved += 1;
                }
            }
        }

        tracing::debug!(
            class = qualified_name.as_raw(),
            references = linked,
            unresolved,
            "linked class references"
        );
        Ok(())
    }

    fn add_member_referencer(&mut self, member: Member, referencer: Symbol) -> Result<(), CacheError> {
        match member {
            Member::Field(id) => {
                self.pool.fields.get_mut(id)?.referencers.insert(referencer);
            }
            Member::Method(id) => {
                self.pool.methods.get_mut(id)?.referencers.insert(referencer);
            }
        }
        Ok(())
    }

    /// Breadth-first search from `owner` up the known supertypes for the
    /// first class whose declaration satisfies `find`.
    fn resolve_member(
        &self,
        owner: Symbol,
        find: impl Fn(&Self, DeclarationId) -> Result<Option<Member>, CacheError>,
    ) -> Result<Option<Member>, CacheError> {
        let mut queue = VecDeque::from([owner]);
        let mut visited = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) || visited.len() > MAX_HIERARCHY_DEPTH {
                continue;
            }
            if let Some(decl) = self.declaration_index.get(&current).copied() {
                if let Some(member) = find(self, decl)? {
                    return Ok(Some(member));
                }
            }
            if let Some(id) = self.class_info_index.get(&current).copied() {
                let record = self.pool.class_infos.get(id)?;
                queue.extend(record.super_qualified_name);
                queue.extend(record.super_interfaces.iter().copied());
            }
        }
        Ok(None)
    }

    /// `owner` and every supertype reachable from it, known or not.
    fn lookup_path(&self, owner: Symbol) -> Result<Vec<Symbol>, CacheError> {
        let mut queue = VecDeque::from([owner]);
        let mut visited = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if visited.len() >= MAX_HIERARCHY_DEPTH || !visited.insert(current) {
                continue;
            }
            if let Some(id) = self.class_info_index.get(&current).copied() {
                queue.extend(supertypes_of(self.pool.class_infos.get(id)?));
            }
        }
        Ok(visited.into_iter().collect())
    }
}

fn supertypes_of(record: &ClassInfoRecord) -> impl Iterator<Item = Symbol> + '_ {
    record
        .super_qualified_name
        .iter()
        .chain(record.super_interfaces.iter())
        .copied()
}

#[derive(Clone, Copy)]
enum Member {
    Field(FieldId),
    Method(MethodId),
}
