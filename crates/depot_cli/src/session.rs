//! Shared plumbing for CLI commands.
//!
//! Resolves settings from the configuration and global flags, opens the store
//! together with its symbol table, and discovers class files on disk.

use std::path::{Path, PathBuf};

use depot_cache::{Cache, CacheError};
use depot_classfile::{ClassFile, ClassFileReader};
use depot_common::{Symbol, SymbolTable};

use crate::GlobalArgs;

/// File in the store directory holding the symbol table.
pub const SYMBOLS_FILE: &str = "symbols.dat";

/// Effective settings for one invocation.
#[derive(Debug)]
pub struct Settings {
    /// Directory holding the persistent store.
    pub store_dir: PathBuf,
    /// Directory holding the staging store used by `depot make`.
    pub staging_dir: PathBuf,
    /// Class-file roots used when a command is given no paths.
    pub class_roots: Vec<PathBuf>,
    /// Default `tracing` filter directives.
    pub log_directives: String,
}

impl Settings {
    /// Resolves settings from `--config`, `--store` and `depot.toml`.
    ///
    /// With `--config`, paths in the file are relative to the file's
    /// directory. Without it, `depot.toml` in the current directory is used
    /// if present.
    pub fn resolve(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let cwd = std::env::current_dir()?;
        let (config, project_dir) = match global.config {
            Some(ref path) => {
                let path = cwd.join(path);
                let config = depot_config::load_config_file(&path)?;
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.clone());
                (config, dir)
            }
            None => (depot_config::load_config(&cwd)?, cwd.clone()),
        };

        let store_dir = match global.store {
            Some(ref dir) => cwd.join(dir),
            None => config.store_path(&project_dir),
        };
        Ok(Self {
            staging_dir: store_dir.join(&config.store.staging),
            store_dir,
            class_roots: config.class_roots(&project_dir),
            log_directives: config.log.directives(),
        })
    }
}

/// An open store and the symbol table its handles refer to.
pub struct Session {
    store_dir: PathBuf,
    /// Interned names shared by the reader and the cache.
    pub symbols: SymbolTable,
    /// The persistent store.
    pub cache: Cache,
}

impl Session {
    /// Opens the store in `store_dir` and loads its symbol table.
    pub fn open(store_dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let symbols = SymbolTable::load_or_default(&store_dir.join(SYMBOLS_FILE))?;
        let cache = Cache::open(store_dir).map_err(store_error)?;
        Ok(Self {
            store_dir: store_dir.to_path_buf(),
            symbols,
            cache,
        })
    }

    /// Saves the symbol table, then flushes and closes the store.
    ///
    /// If the symbol table cannot be saved the store is left untouched on
    /// disk, since the new records would name symbols the old table lacks.
    pub fn close(self) -> Result<(), Box<dyn std::error::Error>> {
        self.symbols.save(&self.store_dir.join(SYMBOLS_FILE))?;
        self.cache.dispose().map_err(store_error)?;
        Ok(())
    }

    /// The symbol of a class the store knows about.
    pub fn lookup_class(&self, name: &str) -> Result<Symbol, Box<dyn std::error::Error>> {
        self.symbols
            .get(name)
            .filter(|q| self.cache.contains_class(*q))
            .ok_or_else(|| format!("class '{name}' is not in the store").into())
    }

    /// Resolves a symbol for display.
    pub fn name(&self, symbol: Symbol) -> &str {
        self.symbols.try_resolve(symbol).unwrap_or("<unknown>")
    }
}

/// Adds a recovery hint to store errors that call for a rebuild.
pub fn store_error(err: CacheError) -> Box<dyn std::error::Error> {
    if err.requires_rebuild() {
        format!("{err} (run `depot wipe` and rebuild)").into()
    } else {
        err.into()
    }
}

/// Expands files and directories into the `.class` files they contain,
/// sorted by path. Falls back to `roots` when `paths` is empty.
pub fn discover_class_files(
    paths: &[String],
    roots: &[PathBuf],
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let inputs: Vec<PathBuf> = if paths.is_empty() {
        roots.to_vec()
    } else {
        paths.iter().map(PathBuf::from).collect()
    };
    if inputs.is_empty() {
        return Err("no class files given and classpath.roots is empty".into());
    }

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk_dir(&input, &mut files)?;
        } else if input.is_file() {
            files.push(input);
        } else {
            return Err(format!("{} does not exist", input.display()).into());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "class") {
            files.push(path);
        }
    }
    Ok(())
}

/// Parses every file, interning into `symbols`.
pub fn read_classes(
    files: &[PathBuf],
    symbols: &SymbolTable,
) -> Result<Vec<ClassFile>, Box<dyn std::error::Error>> {
    let reader = ClassFileReader::new(symbols);
    let mut classes = Vec::with_capacity(files.len());
    for file in files {
        let class = reader
            .read_file(file)
            .map_err(|e| format!("{}: {e}", file.display()))?;
        classes.push(class);
    }
    Ok(classes)
}
