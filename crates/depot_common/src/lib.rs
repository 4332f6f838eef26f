//! Shared foundational types used across the Depot dependency cache.
//!
//! This crate provides the interned [`Symbol`] handles and the [`SymbolTable`]
//! that owns their strings, content hashing for on-disk integrity checks, and
//! JVM access flags.

#![warn(missing_docs)]

pub mod flags;
pub mod hash;
pub mod symbol;

pub use flags::AccessFlags;
pub use hash::ContentHash;
pub use symbol::{Symbol, SymbolTable, SymbolTableError};
