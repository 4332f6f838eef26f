//! JVM class-file reading for the Depot dependency cache.
//!
//! [`ClassFileReader`] parses a compiled `.class` file and interns every name,
//! descriptor and signature it finds into a shared
//! [`SymbolTable`](depot_common::SymbolTable). The result is a [`ClassFile`]
//! whose members ([`FieldInfo`], [`MethodInfo`]) and constant-pool references
//! ([`ReferenceInfo`]) are exactly what the cache stores.

#![warn(missing_docs)]

pub mod annotation;
mod bytes;
pub mod class_file;
mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod member;
pub mod reference;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use annotation::{AnnotationConstantValue, ConstantValue};
pub use class_file::{ClassFile, ClassFileReader};
pub use error::ClassFileError;
pub use member::{FieldInfo, MemberInfo, MethodInfo};
pub use reference::ReferenceInfo;
