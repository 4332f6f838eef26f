//! Interned symbols for qualified names, descriptors and signatures.
//!
//! Every string the dependency cache stores (class and member names, type
//! descriptors, generic signatures, annotation type names) is interned once in
//! a [`SymbolTable`]. Records only ever hold the resulting [`Symbol`] handles,
//! so comparisons are integer comparisons and records stay small.

use std::path::{Path, PathBuf};

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned string handle.
///
/// Symbols are dense `u32` indices assigned in interning order, starting at 0.
/// They are only meaningful together with the [`SymbolTable`] that produced
/// them; a table saved with [`SymbolTable::save`] and reloaded with
/// [`SymbolTable::load`] reproduces the same handles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    /// Creates a `Symbol` from a raw `u32` index.
    ///
    /// This is intended for index files and tests. In normal use, symbols are
    /// created through [`SymbolTable::intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this symbol.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Symbol` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for Symbol {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Symbol)
    }
}

/// Errors raised while persisting or restoring a [`SymbolTable`].
#[derive(Debug, thiserror::Error)]
pub enum SymbolTableError {
    /// The symbol file could not be read or written.
    #[error("symbol table I/O error at {path}: {source}")]
    Io {
        /// The symbol file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The symbol file could not be encoded or decoded.
    #[error("symbol table serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The symbol file lists the same string twice, so handles would shift.
    #[error("symbol table contains duplicate entry '{value}'")]
    Duplicate {
        /// The repeated string.
        value: String,
    },
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// The table is shared by the class-file reader (which interns) and the
/// cache (which only stores handles). It is safe to intern from several
/// parsing threads at once.
pub struct SymbolTable {
    rodeo: ThreadedRodeo<Symbol>,
}

impl SymbolTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Symbol`]. If the string was already
    /// interned, returns the existing symbol without allocating.
    pub fn intern(&self, s: &str) -> Symbol {
        self.rodeo.get_or_intern(s)
    }

    /// Returns the symbol for `s` if it has been interned.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.rodeo.get(s)
    }

    /// Resolves a [`Symbol`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not created by this table.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.rodeo.resolve(&symbol)
    }

    /// Resolves a [`Symbol`], returning `None` for foreign handles.
    pub fn try_resolve(&self, symbol: Symbol) -> Option<&str> {
        self.rodeo.try_resolve(&symbol)
    }

    /// Returns the number of interned strings.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Writes all interned strings, in handle order, to `path`.
    ///
    /// The file is written next to its final location and renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), SymbolTableError> {
        let strings: Vec<&str> = (0..self.len())
            .filter_map(|index| u32::try_from(index).ok())
            .filter_map(|index| self.try_resolve(Symbol(index)))
            .collect();

        let bytes = bincode::serde::encode_to_vec(&strings, bincode::config::standard())
            .map_err(|e| SymbolTableError::Serialization {
                reason: e.to_string(),
            })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SymbolTableError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| SymbolTableError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| SymbolTableError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads a table previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, SymbolTableError> {
        let bytes = std::fs::read(path).map_err(|e| SymbolTableError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let (strings, _): (Vec<String>, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e| SymbolTableError::Serialization {
                    reason: e.to_string(),
                },
            )?;

        let table = Self::new();
        for (index, value) in strings.iter().enumerate() {
            let symbol = table.intern(value);
            if symbol.as_raw() as usize != index {
                return Err(SymbolTableError::Duplicate {
                    value: value.clone(),
                });
            }
        }
        Ok(table)
    }

    /// Loads the table at `path`, or returns an empty one if the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, SymbolTableError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}
