//! Identity index files.
//!
//! An index maps interned qualified-name ids to record ids. On disk it is a
//! flat table: a little-endian `u32` entry count followed by that many
//! `(u32 qualified name, u32 record id)` pairs, sorted by qualified name.

use std::collections::HashMap;
use std::path::Path;

use depot_common::Symbol;

use crate::error::CacheError;
use crate::ids::RecordHandle;

/// Reads an index file. A missing file is an empty index.
pub(crate) fn read_index<I: RecordHandle>(path: &Path) -> Result<HashMap<Symbol, I>, CacheError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let mut words = raw
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]));
    let count = words
        .next()
        .ok_or_else(|| CacheError::corrupted_because(format!("{} is empty", path.display())))?
        as usize;
    if count.checked_mul(8).and_then(|n| n.checked_add(4)) != Some(raw.len()) {
        return Err(CacheError::corrupted_because(format!(
            "{} declares {count} entries but holds {} bytes",
            path.display(),
            raw.len()
        )));
    }

    let mut index = HashMap::with_capacity(count);
    while let (Some(name), Some(id)) = (words.next(), words.next()) {
        if index.insert(Symbol::from_raw(name), I::from_raw(id)).is_some() {
            return Err(CacheError::corrupted_because(format!(
                "{} lists qualified name {name} twice",
                path.display()
            )));
        }
    }
    Ok(index)
}

/// Writes an index file via a temporary file renamed into place.
pub(crate) fn write_index<I: RecordHandle>(
    path: &Path,
    index: &HashMap<Symbol, I>,
) -> Result<(), CacheError> {
    let mut entries: Vec<(Symbol, I)> = index.iter().map(|(k, v)| (*k, *v)).collect();
    entries.sort_by_key(|(name, _)| *name);

    let mut bytes = Vec::with_capacity(4 + entries.len() * 8);
    bytes.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (name, id) in entries {
        bytes.extend_from_slice(&name.as_raw().to_le_bytes());
        bytes.extend_from_slice(&id.as_raw().to_le_bytes());
    }
    write_atomically(path, &bytes)
}

/// Writes `bytes` to `<path>.tmp` and renames it over `path`.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes).map_err(|e| CacheError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `records.dat` becomes `records.dat.tmp`.
pub(crate) fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    name.into()
}

/// Deletes `path`, treating an already-missing file as success.
pub(crate) fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ClassInfoId, DeclarationId};

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classinfo_index.dat");
        let mut index = HashMap::new();
        index.insert(Symbol::from_raw(5), ClassInfoId::from_raw(0));
        index.insert(Symbol::from_raw(2), ClassInfoId::from_raw(1));

        write_index(&path, &index).unwrap();
        let back: HashMap<Symbol, ClassInfoId> = read_index(&path).unwrap();
        assert_eq!(back, index);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn layout_is_count_then_sorted_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("declarations_index.dat");
        let mut index = HashMap::new();
        index.insert(Symbol::from_raw(9), DeclarationId::from_raw(1));
        index.insert(Symbol::from_raw(3), DeclarationId::from_raw(0));
        write_index(&path, &index).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let expected: Vec<u8> = [2u32, 3, 0, 9, 1]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        assert_eq!(raw, expected);
    }

    #[test]
    fn missing_file_is_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index: HashMap<Symbol, ClassInfoId> =
            read_index(&dir.path().join("none.dat")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn size_mismatch_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classinfo_index.dat");
        let raw: Vec<u8> = [3u32, 1, 1].iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&path, raw).unwrap();
        let err = read_index::<ClassInfoId>(&path).unwrap_err();
        assert!(matches!(err, CacheError::Corrupted { .. }));
    }

    #[test]
    fn duplicate_key_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classinfo_index.dat");
        let raw: Vec<u8> = [2u32, 4, 0, 4, 1]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        std::fs::write(&path, raw).unwrap();
        assert!(read_index::<ClassInfoId>(&path).is_err());
    }

    #[test]
    fn remove_if_exists_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_if_exists(&dir.path().join("gone.dat")).unwrap();
    }
}
