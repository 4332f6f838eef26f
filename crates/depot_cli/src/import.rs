//! `depot import`: record compiled classes in the store.
//!
//! All classes are imported before any is linked, so references between
//! classes of the same batch resolve regardless of file order.

use depot_common::Symbol;

use crate::session::{discover_class_files, read_classes, store_error, Session, Settings};
use crate::{GlobalArgs, ImportArgs};

/// Runs the `depot import` command.
pub fn run(
    args: &ImportArgs,
    settings: &Settings,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let files = discover_class_files(&args.paths, &settings.class_roots)?;
    let session = Session::open(&settings.store_dir)?;
    let classes = read_classes(&files, &session.symbols)?;

    let mut imported: Vec<Symbol> = Vec::with_capacity(classes.len());
    for class in &classes {
        // References recorded by an earlier version of this class are stale.
        session.cache.remove_referencer(class.qualified_name);
        let q = session
            .cache
            .import_class_info(class, &session.symbols)
            .map_err(store_error)?;
        imported.push(q);
    }
    for &q in &imported {
        session.cache.link_class(q).map_err(store_error)?;
    }

    let total = session.cache.class_count();
    session.close()?;

    if !global.quiet {
        eprintln!(
            "   Imported {} class file(s) into {} ({} classes stored)",
            imported.len(),
            settings.store_dir.display(),
            total
        );
    }
    Ok(0)
}
