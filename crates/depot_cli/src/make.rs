//! `depot make`: plan the rebuild after a recompile.
//!
//! The pipeline:
//!
//! 1. Parse the recompiled classes into a fresh staging store
//! 2. Compare staged and stored versions to compute the rebuild plan
//! 3. Unless `--dry-run`, merge the staged classes into the store, relink
//!    them, and drop classes listed with `--removed`
//! 4. Print the plan

use depot_cache::{Cache, RebuildPlan};
use depot_common::Symbol;
use serde::Serialize;

use crate::session::{
    discover_class_files, read_classes, store_error, Session, Settings, SYMBOLS_FILE,
};
use crate::{GlobalArgs, MakeArgs, ReportFormat};

#[derive(Debug, Serialize)]
struct MakeReport {
    recompiled: Vec<String>,
    removed: Vec<String>,
    rebuild: Vec<String>,
}

/// Runs the `depot make` command. Returns exit code 0.
pub fn run(
    args: &MakeArgs,
    settings: &Settings,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let report = execute(args, settings)?;
    print_report(&report, args.format, global);
    Ok(0)
}

fn execute(args: &MakeArgs, settings: &Settings) -> Result<MakeReport, Box<dyn std::error::Error>> {
    let files = if args.paths.is_empty() && !args.removed.is_empty() {
        Vec::new()
    } else {
        discover_class_files(&args.paths, &settings.class_roots)?
    };

    let session = Session::open(&settings.store_dir)?;
    let classes = read_classes(&files, &session.symbols)?;

    // Leftovers from an interrupted run would skew the comparison.
    Cache::remove_store_files(&settings.staging_dir).map_err(store_error)?;
    let staging = Cache::open(&settings.staging_dir).map_err(store_error)?;

    let mut recompiled: Vec<Symbol> = Vec::with_capacity(classes.len());
    for class in &classes {
        recompiled.push(
            staging
                .import_class_info(class, &session.symbols)
                .map_err(store_error)?,
        );
    }
    let removed: Vec<Symbol> = args
        .removed
        .iter()
        .map(|name| session.symbols.intern(name))
        .collect();

    let changed: Vec<Symbol> = recompiled.iter().chain(&removed).copied().collect();
    let plan = RebuildPlan::compute(&session.cache, &staging, &session.symbols, &changed)
        .map_err(store_error)?;

    let report = MakeReport {
        recompiled: recompiled.iter().map(|q| session.name(*q).to_string()).collect(),
        removed: removed.iter().map(|q| session.name(*q).to_string()).collect(),
        rebuild: plan.classes().map(|q| session.name(q).to_string()).collect(),
    };

    if !args.dry_run {
        merge(&session, &staging, &recompiled, &removed)?;
    }
    staging.wipe().map_err(store_error)?;
    drop(staging);

    if args.dry_run {
        // Nothing changed in the store; only new symbols may need saving.
        session.symbols.save(&settings.store_dir.join(SYMBOLS_FILE))?;
    } else {
        session.close()?;
    }
    Ok(report)
}

fn merge(
    session: &Session,
    staging: &Cache,
    recompiled: &[Symbol],
    removed: &[Symbol],
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = &session.cache;
    for &q in removed {
        cache.remove_referencer(q);
        cache.remove_class(q).map_err(store_error)?;
    }
    for &q in recompiled {
        cache.remove_referencer(q);
        cache.clear_referenced_classes(q).map_err(store_error)?;
        cache
            .import_class_from(staging, q, &session.symbols)
            .map_err(store_error)?;
    }
    for &q in recompiled {
        cache.link_class(q).map_err(store_error)?;
    }
    Ok(())
}

fn print_report(report: &MakeReport, format: ReportFormat, global: &GlobalArgs) {
    match format {
        ReportFormat::Text => {
            if !global.quiet {
                eprintln!(
                    "   Compared {} recompiled and {} removed class(es)",
                    report.recompiled.len(),
                    report.removed.len()
                );
            }
            for class in &report.rebuild {
                println!("{class}");
            }
            if !global.quiet && report.rebuild.is_empty() {
                eprintln!("   Nothing else needs rebuilding");
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{class, quiet, settings, write_class, ACC_ABSTRACT, ACC_PUBLIC};
    use crate::ImportArgs;
    use std::path::Path;

    fn import(root: &Path, settings: &Settings) {
        let args = ImportArgs {
            paths: vec![root.display().to_string()],
        };
        crate::import::run(&args, settings, &quiet()).unwrap();
    }

    fn make(paths: &[&Path], removed: &[&str], settings: &Settings) -> MakeReport {
        let args = MakeArgs {
            paths: paths.iter().map(|p| p.display().to_string()).collect(),
            removed: removed.iter().map(|s| s.to_string()).collect(),
            dry_run: false,
            format: ReportFormat::Text,
        };
        execute(&args, settings).unwrap()
    }

    #[test]
    fn make_rebuilds_a_caller_imported_before_its_callee() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir.path().join("store"));
        let mut user = class("app/User", "java/lang/Object", &[]);
        user.method_ref("lib/Widget", "size", "()I");
        let first = dir.path().join("first");
        write_class(&first, "app/User", user);
        import(&first, &settings);
        let second = dir.path().join("second");
        write_class(
            &second,
            "lib/Widget",
            class("lib/Widget", "java/lang/Object", &[("size", "()I")]),
        );
        import(&second, &settings);

        let out = dir.path().join("out");
        write_class(
            &out,
            "lib/Widget",
            class("lib/Widget", "java/lang/Object", &[("size", "()J")]),
        );
        let report = make(&[out.as_path()], &[], &settings);
        assert_eq!(report.recompiled, vec!["lib.Widget"]);
        assert_eq!(report.rebuild, vec!["app.User"]);

        // The store now holds the new version.
        let report = make(&[out.as_path()], &[], &settings);
        assert!(report.rebuild.is_empty());
    }

    #[test]
    fn make_forgets_removed_subclasses() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir.path().join("store"));
        let out = dir.path().join("out");
        write_class(&out, "lib/Base", class("lib/Base", "java/lang/Object", &[]));
        write_class(&out, "app/Fancy", class("app/Fancy", "lib/Base", &[]));
        import(&out, &settings);

        let report = make(&[], &["app.Fancy"], &settings);
        assert_eq!(report.removed, vec!["app.Fancy"]);
        assert!(report.rebuild.is_empty());
        let session = Session::open(&settings.store_dir).unwrap();
        assert!(session.lookup_class("app.Fancy").is_err());
        drop(session);

        let mut base = class("lib/Base", "java/lang/Object", &[]);
        base.flags(ACC_PUBLIC | ACC_ABSTRACT);
        let next = dir.path().join("next");
        write_class(&next, "lib/Base", base);
        let report = make(&[next.as_path()], &[], &settings);
        assert!(report.rebuild.is_empty());
    }

    #[test]
    fn dry_run_leaves_the_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir.path().join("store"));
        let out = dir.path().join("out");
        write_class(&out, "lib/Base", class("lib/Base", "java/lang/Object", &[]));
        write_class(&out, "app/Fancy", class("app/Fancy", "lib/Base", &[]));
        import(&out, &settings);

        let mut base = class("lib/Base", "java/lang/Object", &[]);
        base.flags(ACC_PUBLIC | ACC_ABSTRACT);
        let next = dir.path().join("next");
        write_class(&next, "lib/Base", base);
        let args = MakeArgs {
            paths: vec![next.display().to_string()],
            removed: Vec::new(),
            dry_run: true,
            format: ReportFormat::Json,
        };
        for _ in 0..2 {
            let report = execute(&args, &settings).unwrap();
            assert_eq!(report.rebuild, vec!["app.Fancy"]);
        }
    }

    #[test]
    fn report_serializes_as_lists() {
        let report = MakeReport {
            recompiled: vec!["lib.A".to_string()],
            removed: Vec::new(),
            rebuild: vec!["app.B".to_string(), "app.C".to_string()],
        };
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["recompiled"][0], "lib.A");
        assert_eq!(value["rebuild"].as_array().unwrap().len(), 2);
        assert!(value["removed"].as_array().unwrap().is_empty());
    }
}
