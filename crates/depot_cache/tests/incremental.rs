//! End-to-end incremental compile passes: stage recompiled classes, plan the
//! rebuild against the persistent store, then merge.

use depot_cache::{Cache, FieldChangeDescription, MethodChangeDescription, RebuildPlan};
use depot_classfile::{ClassFile, FieldInfo, MethodInfo, ReferenceInfo};
use depot_common::{AccessFlags, Symbol, SymbolTable};
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    store: Cache,
    staging: Cache,
    symbols: SymbolTable,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Cache::open(&dir.path().join("store")).unwrap();
        let staging = Cache::open(&dir.path().join("staging")).unwrap();
        Self {
            _dir: dir,
            store,
            staging,
            symbols: SymbolTable::new(),
        }
    }

    fn sym(&self, s: &str) -> Symbol {
        self.symbols.intern(s)
    }

    fn install(&self, class: &ClassFile) -> Symbol {
        let q = self.store.import_class_info(class, &self.symbols).unwrap();
        self.store.link_class(q).unwrap();
        q
    }

    /// Plans against the staged classes, then merges them into the store.
    fn recompile(&self, classes: &[ClassFile]) -> Vec<Symbol> {
        let mut changed = Vec::new();
        for class in classes {
            changed.push(self.staging.import_class_info(class, &self.symbols).unwrap());
        }
        let plan = RebuildPlan::compute(&self.store, &self.staging, &self.symbols, &changed)
            .unwrap();
        for &q in &changed {
            self.store.remove_referencer(q);
            self.store.clear_referenced_classes(q).unwrap();
            self.store
                .import_class_from(&self.staging, q, &self.symbols)
                .unwrap();
            self.store.link_class(q).unwrap();
        }
        self.staging.wipe().unwrap();
        plan.into_vec()
    }
}

fn counter(p: &Project, field_flags: AccessFlags, get_desc: &str) -> ClassFile {
    let mut class = ClassFile::new(p.sym("lib.Counter"), None, AccessFlags::PUBLIC);
    class.fields = vec![FieldInfo::new(p.sym("count"), p.sym("I"), field_flags)];
    class.methods = vec![
        MethodInfo::new(p.sym("get"), p.sym(get_desc), AccessFlags::PUBLIC),
        MethodInfo::new(p.sym("reset"), p.sym("()V"), AccessFlags::PUBLIC),
    ];
    class
}

fn reader(p: &Project) -> ClassFile {
    let mut class = ClassFile::new(p.sym("app.Reader"), None, AccessFlags::PUBLIC);
    class.references = vec![
        ReferenceInfo::Class(p.sym("lib.Counter")),
        ReferenceInfo::Method {
            owner: p.sym("lib.Counter"),
            name: p.sym("get"),
            descriptor: p.sym("()I"),
        },
    ];
    class
}

fn peeker(p: &Project) -> ClassFile {
    let mut class = ClassFile::new(p.sym("app.Peeker"), None, AccessFlags::PUBLIC);
    class.references = vec![ReferenceInfo::Field {
        owner: p.sym("lib.Counter"),
        name: p.sym("count"),
        descriptor: p.sym("I"),
    }];
    class
}

#[test]
fn return_type_change_rebuilds_callers_and_keeps_method_id() {
    let p = Project::new();
    let q = p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&reader(&p));
    p.install(&peeker(&p));

    let decl = p.store.find_declaration_id(q).unwrap();
    let get = p
        .store
        .find_method(decl, p.sym("get"), p.sym("()I"))
        .unwrap()
        .unwrap();

    let rebuild = p.recompile(&[counter(&p, AccessFlags::PUBLIC, "()J")]);
    assert_eq!(rebuild, vec![p.sym("app.Reader")]);

    assert_eq!(
        p.store
            .find_compatible_method(decl, p.sym("get"), p.sym("()J"), &p.symbols)
            .unwrap(),
        Some(get)
    );
    assert_eq!(p.store.method_descriptor(get).unwrap(), p.sym("()J"));
    assert_eq!(p.store.method_referencers(get).unwrap(), vec![p.sym("app.Reader")]);
}

#[test]
fn narrowing_a_field_rebuilds_its_readers() {
    let p = Project::new();
    let q = p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&reader(&p));
    p.install(&peeker(&p));

    let old_decl = p.store.find_declaration_id(q).unwrap();
    let old_field = p.store.find_field(old_decl, p.sym("count")).unwrap().unwrap();
    assert!(p.store.field_flags(old_field).unwrap().is_public());

    p.staging
        .import_class_info(&counter(&p, AccessFlags::PRIVATE, "()I"), &p.symbols)
        .unwrap();
    let new_decl = p.staging.find_declaration_id(q).unwrap();
    let new_field = p.staging.find_field(new_decl, p.sym("count")).unwrap().unwrap();
    let change = FieldChangeDescription::new(&p.store, &p.staging, old_field, new_field).unwrap();
    assert!(change.flags_changed);
    assert!(change.is_changed());
    p.staging.wipe().unwrap();

    let rebuild = p.recompile(&[counter(&p, AccessFlags::PRIVATE, "()I")]);
    assert_eq!(rebuild, vec![p.sym("app.Peeker")]);
}

#[test]
fn unchanged_recompile_is_a_no_op() {
    let p = Project::new();
    p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&reader(&p));

    let rebuild = p.recompile(&[counter(&p, AccessFlags::PUBLIC, "()I")]);
    assert!(rebuild.is_empty());

    let q = p.sym("lib.Counter");
    let deps = p.store.back_dependencies(q).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].class_qualified_name(), p.sym("app.Reader"));
    assert_eq!(deps[0].methods().count(), 1);
}

#[test]
fn relinking_a_client_drops_stale_references() {
    let p = Project::new();
    let q = p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&reader(&p));

    // The reader no longer calls get().
    let mut reader_v2 = reader(&p);
    reader_v2.references.truncate(1);
    p.recompile(&[reader_v2]);

    let decl = p.store.find_declaration_id(q).unwrap();
    let get = p
        .store
        .find_method(decl, p.sym("get"), p.sym("()I"))
        .unwrap()
        .unwrap();
    assert!(p.store.method_referencers(get).unwrap().is_empty());
    assert_eq!(p.store.class_referencers(decl).unwrap(), vec![p.sym("app.Reader")]);
}

#[test]
fn deleting_a_class_cascades_and_rebuilds_dependents() {
    let p = Project::new();
    let q = p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&reader(&p));
    p.install(&peeker(&p));

    let plan = RebuildPlan::compute(&p.store, &p.staging, &p.symbols, &[q]).unwrap();
    assert_eq!(plan.len(), 2);

    let decl = p.store.find_declaration_id(q).unwrap();
    let members = p.store.method_ids(decl).unwrap();
    p.store.remove_class(q).unwrap();
    assert!(p.store.class_id(q).is_none());
    assert!(p.store.find_declaration_id(q).is_none());
    for id in members {
        assert!(p.store.method_info(id).is_err());
    }
}

#[test]
fn method_change_description_across_caches() {
    let p = Project::new();
    let q = p.install(&counter(&p, AccessFlags::PUBLIC, "()I"));
    let old_decl = p.store.find_declaration_id(q).unwrap();
    let old_reset = p
        .store
        .find_method(old_decl, p.sym("reset"), p.sym("()V"))
        .unwrap()
        .unwrap();

    let mut v2 = counter(&p, AccessFlags::PUBLIC, "()I");
    v2.methods[1].flags = AccessFlags::PROTECTED;
    v2.methods[1].thrown_exceptions = vec![p.sym("java.io.IOException")];
    p.staging.import_class_info(&v2, &p.symbols).unwrap();
    let new_decl = p.staging.find_declaration_id(q).unwrap();
    let new_reset = p
        .staging
        .find_method(new_decl, p.sym("reset"), p.sym("()V"))
        .unwrap()
        .unwrap();

    let change =
        MethodChangeDescription::new(&p.store, &p.staging, old_reset, new_reset, &p.symbols)
            .unwrap();
    assert!(change.access_restricted);
    assert!(change.throws_list_changed);
    assert!(!change.descriptor_changed);
    assert!(!change.return_type_descriptor_changed);
}

fn widget(p: &Project, flags: AccessFlags, size_desc: &str) -> ClassFile {
    let mut class = ClassFile::new(p.sym("lib.Widget"), None, flags);
    class.methods = vec![MethodInfo::new(p.sym("size"), p.sym(size_desc), AccessFlags::PUBLIC)];
    class
}

fn measurer(p: &Project) -> ClassFile {
    let mut class = ClassFile::new(p.sym("app.Measurer"), None, AccessFlags::PUBLIC);
    class.references = vec![
        ReferenceInfo::Class(p.sym("lib.Widget")),
        ReferenceInfo::Method {
            owner: p.sym("lib.Widget"),
            name: p.sym("size"),
            descriptor: p.sym("()I"),
        },
    ];
    class
}

fn subclass(p: &Project, name: &str, superclass: &str) -> ClassFile {
    ClassFile::new(p.sym(name), Some(p.sym(superclass)), AccessFlags::PUBLIC)
}

#[test]
fn caller_installed_before_its_callee_is_still_rebuilt() {
    let p = Project::new();
    p.install(&measurer(&p));
    p.install(&widget(&p, AccessFlags::PUBLIC, "()I"));

    let rebuild = p.recompile(&[widget(&p, AccessFlags::PUBLIC, "()J")]);
    assert_eq!(rebuild, vec![p.sym("app.Measurer")]);
}

#[test]
fn subclass_installed_before_its_superclass_is_still_rebuilt() {
    let p = Project::new();
    p.install(&subclass(&p, "app.Fancy", "lib.Widget"));
    p.install(&widget(&p, AccessFlags::PUBLIC, "()I"));

    let rebuild = p.recompile(&[widget(&p, AccessFlags::PUBLIC | AccessFlags::FINAL, "()I")]);
    assert_eq!(rebuild, vec![p.sym("app.Fancy")]);
}

#[test]
fn deleted_subclass_drops_out_of_the_plan() {
    let p = Project::new();
    p.install(&widget(&p, AccessFlags::PUBLIC, "()I"));
    let fancy = p.install(&subclass(&p, "app.Fancy", "lib.Widget"));

    p.store.remove_referencer(fancy);
    p.store.remove_class(fancy).unwrap();

    let rebuild = p.recompile(&[widget(&p, AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "()I")]);
    assert!(rebuild.is_empty());
}

#[test]
fn moved_subclass_follows_its_new_superclass() {
    let p = Project::new();
    p.install(&widget(&p, AccessFlags::PUBLIC, "()I"));
    p.install(&ClassFile::new(p.sym("lib.Gadget"), None, AccessFlags::PUBLIC));
    let fancy = p.install(&subclass(&p, "app.Fancy", "lib.Widget"));

    p.recompile(&[subclass(&p, "app.Fancy", "lib.Gadget")]);

    let rebuild = p.recompile(&[widget(&p, AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "()I")]);
    assert!(rebuild.is_empty());
    let rebuild = p.recompile(&[ClassFile::new(
        p.sym("lib.Gadget"),
        None,
        AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
    )]);
    assert_eq!(rebuild, vec![fancy]);
}
