//! Incremental compilation dependency cache.
//!
//! The [`Cache`] keeps, for every compiled class, a class-info record
//! (superclass, interfaces, flags, annotations, references) and a declaration
//! record (member ids and the classes that reference the class or its
//! members). After a recompile, [`FieldChangeDescription`],
//! [`MethodChangeDescription`] and [`RebuildPlan`] turn the difference between
//! the old and the newly compiled classes into the set of dependent classes
//! that must be rebuilt.

#![warn(missing_docs)]

pub mod cache;
pub mod change;
pub mod dependency;
pub mod error;
pub mod ids;
mod index;
mod pool;
pub mod rebuild;
mod records;

pub use cache::{Cache, CLASSINFO_INDEX_FILE, DECLARATIONS_INDEX_FILE, RECORDS_FILE};
pub use change::{ClassChangeDescription, FieldChangeDescription, MethodChangeDescription};
pub use dependency::Dependency;
pub use error::{CacheError, RecordKind};
pub use ids::{ClassInfoId, DeclarationId, FieldId, MethodId};
pub use rebuild::RebuildPlan;
