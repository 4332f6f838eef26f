//! Helpers shared by command tests.

use std::path::{Path, PathBuf};

use depot_classfile::testing::{ClassBuilder, MemberDef};

use crate::session::Settings;
use crate::GlobalArgs;

pub(crate) const ACC_PUBLIC: u16 = 0x0001;
pub(crate) const ACC_ABSTRACT: u16 = 0x0400;

pub(crate) fn settings(store: &Path) -> Settings {
    Settings {
        store_dir: store.to_path_buf(),
        staging_dir: store.join("staging"),
        class_roots: Vec::new(),
        log_directives: "warn".to_string(),
    }
}

pub(crate) fn quiet() -> GlobalArgs {
    GlobalArgs {
        quiet: true,
        verbose: false,
        config: None,
        store: None,
    }
}

/// A class extending `superclass` that declares `methods` as `(name, descriptor)`.
pub(crate) fn class(internal_name: &str, superclass: &str, methods: &[(&str, &str)]) -> ClassBuilder {
    let mut b = ClassBuilder::new(internal_name, Some(superclass));
    for (name, descriptor) in methods {
        b.method(MemberDef::new(ACC_PUBLIC, name, descriptor));
    }
    b
}

/// Writes `builder` under `root` at the path its internal name implies.
pub(crate) fn write_class(root: &Path, internal_name: &str, builder: ClassBuilder) -> PathBuf {
    let path = root.join(format!("{internal_name}.class"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, builder.finish()).unwrap();
    path
}
