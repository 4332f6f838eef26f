//! The record pool: arenas of class, declaration and member records.
//!
//! Each record family lives in its own [`Arena`] addressed by a typed handle.
//! The whole pool is persisted as a single `records.dat` file with a header
//! containing magic bytes, a format version and a checksum of the payload.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::Path;

use depot_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::ids::{ClassInfoId, DeclarationId, FieldId, MethodId, RecordHandle};
use crate::records::{
    ClassDeclarationRecord, ClassInfoRecord, FieldDeclarationRecord, MethodDeclarationRecord,
};

/// Magic bytes identifying a Depot record pool.
const POOL_MAGIC: [u8; 4] = *b"DPCR";

/// Current pool format version. Increment on breaking changes to the header
/// or record layouts.
const POOL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoolHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

/// Records of one family, keyed by a monotonically allocated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Arena<I, T> {
    records: BTreeMap<u32, T>,
    next: u32,
    #[serde(skip)]
    _handle: PhantomData<I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next: 0,
            _handle: PhantomData,
        }
    }
}

impl<I: RecordHandle, T> Arena<I, T> {
    /// Stores a record under a fresh id.
    pub(crate) fn insert(&mut self, record: T) -> Result<I, CacheError> {
        let id = self.next;
        self.next = id
            .checked_add(1)
            .ok_or_else(|| CacheError::corrupted_because(format!("{} id space exhausted", I::KIND)))?;
        self.records.insert(id, record);
        Ok(I::from_raw(id))
    }

    pub(crate) fn get(&self, id: I) -> Result<&T, CacheError> {
        self.records.get(&id.as_raw()).ok_or(CacheError::RecordNotFound {
            kind: I::KIND,
            id: id.as_raw(),
        })
    }

    pub(crate) fn get_mut(&mut self, id: I) -> Result<&mut T, CacheError> {
        self.records
            .get_mut(&id.as_raw())
            .ok_or(CacheError::RecordNotFound {
                kind: I::KIND,
                id: id.as_raw(),
            })
    }

    pub(crate) fn remove(&mut self, id: I) -> Result<T, CacheError> {
        self.records
            .remove(&id.as_raw())
            .ok_or(CacheError::RecordNotFound {
                kind: I::KIND,
                id: id.as_raw(),
            })
    }

    pub(crate) fn contains(&self, id: I) -> bool {
        self.records.contains_key(&id.as_raw())
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.records.values_mut()
    }
}

/// All records of one store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RecordPool {
    pub(crate) class_infos: Arena<ClassInfoId, ClassInfoRecord>,
    pub(crate) declarations: Arena<DeclarationId, ClassDeclarationRecord>,
    pub(crate) fields: Arena<FieldId, FieldDeclarationRecord>,
    pub(crate) methods: Arena<MethodId, MethodDeclarationRecord>,
}

impl RecordPool {
    /// Loads the pool at `path`, returning `None` if the file doesn't exist.
    ///
    /// A file that exists but fails header, version or checksum validation is
    /// reported as corruption.
    pub(crate) fn load(path: &Path) -> Result<Option<Self>, CacheError> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        if raw.len() < 4 {
            return Err(CacheError::corrupted_because("record pool is truncated"));
        }
        let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let header_end = 4usize
            .checked_add(header_len)
            .filter(|end| *end <= raw.len())
            .ok_or_else(|| CacheError::corrupted_because("record pool header is truncated"))?;

        let (header, _): (PoolHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..header_end], bincode::config::standard())
                .map_err(|e| CacheError::corrupted_because(format!("record pool header: {e}")))?;

        if header.magic != POOL_MAGIC {
            return Err(CacheError::corrupted_because("record pool has wrong magic bytes"));
        }
        if header.format_version != POOL_FORMAT_VERSION {
            return Err(CacheError::corrupted_because(format!(
                "record pool format version {} is not {POOL_FORMAT_VERSION}",
                header.format_version
            )));
        }

        let payload = &raw[header_end..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return Err(CacheError::corrupted_because("record pool checksum mismatch"));
        }

        let (pool, _): (RecordPool, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())
                .map_err(|e| CacheError::Serialization {
                    reason: e.to_string(),
                })?;
        Ok(Some(pool))
    }

    /// Writes the pool to `path` via a temporary file renamed into place.
    pub(crate) fn save(&self, path: &Path) -> Result<(), CacheError> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| CacheError::Serialization {
                reason: e.to_string(),
            },
        )?;

        let header = PoolHeader {
            magic: POOL_MAGIC,
            format_version: POOL_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        crate::index::write_atomically(path, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordKind;
    use depot_classfile::FieldInfo;
    use depot_common::{AccessFlags, SymbolTable};

    #[test]
    fn ids_are_never_reused() {
        let mut arena: Arena<FieldId, u8> = Arena::default();
        let a = arena.insert(1).unwrap();
        let b = arena.insert(2).unwrap();
        arena.remove(a).unwrap();
        let c = arena.insert(3).unwrap();
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(!arena.contains(a));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn missing_record_reports_kind() {
        let arena: Arena<MethodId, u8> = Arena::default();
        let err = arena.get(MethodId::from_raw(9)).unwrap_err();
        assert!(matches!(
            err,
            CacheError::RecordNotFound {
                kind: RecordKind::Method,
                id: 9
            }
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.dat");
        let table = SymbolTable::new();

        let mut pool = RecordPool::default();
        let decl = pool
            .declarations
            .insert(ClassDeclarationRecord::new(table.intern("a.A")))
            .unwrap();
        let field = pool
            .fields
            .insert(FieldDeclarationRecord::new(FieldInfo::new(
                table.intern("f"),
                table.intern("I"),
                AccessFlags::PUBLIC,
            )))
            .unwrap();
        pool.declarations.get_mut(decl).unwrap().fields.push(field);
        pool.save(&path).unwrap();

        let loaded = RecordPool::load(&path).unwrap().unwrap();
        assert_eq!(loaded.declarations.get(decl).unwrap().fields, vec![field]);
        assert_eq!(
            loaded.fields.get(field).unwrap().info.flags,
            AccessFlags::PUBLIC
        );
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RecordPool::load(&dir.path().join("records.dat"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn load_garbage_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.dat");
        std::fs::write(&path, b"garbage data").unwrap();
        let err = RecordPool::load(&path).unwrap_err();
        assert!(matches!(err, CacheError::Corrupted { .. }));
    }

    #[test]
    fn load_flipped_payload_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.dat");
        let table = SymbolTable::new();
        let mut pool = RecordPool::default();
        pool.declarations
            .insert(ClassDeclarationRecord::new(table.intern("a.A")))
            .unwrap();
        pool.save(&path).unwrap();

        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        std::fs::write(&path, raw).unwrap();

        let err = RecordPool::load(&path).unwrap_err();
        assert_eq!(err.to_string(), "record pool checksum mismatch");
    }
}
