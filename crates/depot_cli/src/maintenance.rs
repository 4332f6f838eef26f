//! `depot remove` and `depot wipe`.

use depot_cache::Cache;

use crate::session::{store_error, Session, Settings, SYMBOLS_FILE};
use crate::GlobalArgs;

/// Runs `depot remove <class>`: drops the class and every reference it made.
pub fn remove(
    class: &str,
    settings: &Settings,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(&settings.store_dir)?;
    let q = session.lookup_class(class)?;
    session.cache.remove_referencer(q);
    session.cache.remove_class(q).map_err(store_error)?;
    session.close()?;

    if !global.quiet {
        eprintln!("    Removed {class}");
    }
    Ok(0)
}

/// Runs `depot wipe`.
///
/// Works on a store that no longer opens: corrupted files are deleted
/// without being read.
pub fn wipe(settings: &Settings, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    match Cache::open(&settings.store_dir) {
        Ok(cache) => cache.wipe().map_err(store_error)?,
        Err(err) => {
            tracing::warn!(error = %err, "store does not open; deleting its files");
            Cache::remove_store_files(&settings.store_dir).map_err(store_error)?;
        }
    }
    Cache::remove_store_files(&settings.staging_dir).map_err(store_error)?;

    let symbols = settings.store_dir.join(SYMBOLS_FILE);
    match std::fs::remove_file(&symbols) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(format!("{}: {e}", symbols.display()).into()),
    }

    if !global.quiet {
        eprintln!("      Wiped {}", settings.store_dir.display());
    }
    Ok(0)
}
