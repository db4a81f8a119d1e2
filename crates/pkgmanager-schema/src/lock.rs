use crate::types::ManagerType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("lock entry for {manager}:{name} has an empty version")]
    EmptyVersion { manager: ManagerType, name: String },
}

/// Exact versions pinned per manager type and package name.
///
/// Both levels are `BTreeMap`s, so the same installed state always
/// serializes to the same bytes regardless of listing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LockDocument {
    pub pins: BTreeMap<ManagerType, BTreeMap<String, String>>,
}

impl LockDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(&self, manager: ManagerType, name: &str) -> Option<&str> {
        self.pins
            .get(&manager)
            .and_then(|by_name| by_name.get(name))
            .map(String::as_str)
    }

    pub fn insert(&mut self, manager: ManagerType, name: impl Into<String>, version: impl Into<String>) {
        self.pins
            .entry(manager)
            .or_default()
            .insert(name.into(), version.into());
    }

    pub fn is_empty(&self) -> bool {
        self.pins.values().all(BTreeMap::is_empty)
    }

    pub fn len(&self) -> usize {
        self.pins.values().map(BTreeMap::len).sum()
    }

    /// Keep pins outside `managers` and replace those inside with `other`'s.
    ///
    /// Used when locking a subset of manager types so the rest of an existing
    /// lock file is not discarded.
    pub fn merge_from(&mut self, other: LockDocument, managers: &[ManagerType]) {
        for manager in managers {
            self.pins.remove(manager);
        }
        for (manager, by_name) in other.pins {
            if !by_name.is_empty() {
                self.pins.insert(manager, by_name);
            }
        }
    }

    pub fn parse_str(input: &str) -> Result<Self, LockError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let lock: LockDocument = serde_yaml::from_str(input)?;
        for (manager, by_name) in &lock.pins {
            if let Some((name, _)) = by_name.iter().find(|(_, v)| v.trim().is_empty()) {
                return Err(LockError::EmptyVersion {
                    manager: *manager,
                    name: name.clone(),
                });
            }
        }
        Ok(lock)
    }

    pub fn to_yaml_string(&self) -> Result<String, LockError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let content = self.to_yaml_string()?;
        write_atomic(path.as_ref(), &content)?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }
}

/// Replace `path` with `content` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LockDocument {
        let mut lock = LockDocument::new();
        lock.insert(ManagerType::Rust, "ripgrep", "14.1.0");
        lock.insert(ManagerType::Brew, "tmux", "3.4");
        lock.insert(ManagerType::Brew, "jq", "1.7.1");
        lock
    }

    #[test]
    fn lock_roundtrip() {
        let lock = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.lock.yaml");

        lock.write_to_file(&path).unwrap();
        let loaded = LockDocument::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);
    }

    #[test]
    fn serialization_is_sorted_and_stable() {
        let mut other = LockDocument::new();
        other.insert(ManagerType::Brew, "jq", "1.7.1");
        other.insert(ManagerType::Rust, "ripgrep", "14.1.0");
        other.insert(ManagerType::Brew, "tmux", "3.4");

        let a = sample().to_yaml_string().unwrap();
        let b = other.to_yaml_string().unwrap();
        assert_eq!(a, b);
        assert!(a.find("brew:").unwrap() < a.find("rust:").unwrap());
        assert!(a.find("jq").unwrap() < a.find("tmux").unwrap());
    }

    #[test]
    fn parses_flat_schema() {
        let lock = LockDocument::parse_str("conda:\n  python: 3.12.2\ncustom:\n  fisher: custom\n").unwrap();
        assert_eq!(lock.pinned(ManagerType::Conda, "python"), Some("3.12.2"));
        assert_eq!(lock.pinned(ManagerType::Custom, "fisher"), Some("custom"));
        assert_eq!(lock.pinned(ManagerType::Conda, "numpy"), None);
        assert_eq!(lock.len(), 2);
    }

    #[test]
    fn empty_file_is_empty_lock() {
        assert!(LockDocument::parse_str("").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_manager_key() {
        assert!(LockDocument::parse_str("apt:\n  vim: '9'\n").is_err());
    }

    #[test]
    fn rejects_empty_version() {
        assert!(matches!(
            LockDocument::parse_str("brew:\n  jq: ''\n"),
            Err(LockError::EmptyVersion { .. })
        ));
    }

    #[test]
    fn merge_replaces_only_selected_managers() {
        let mut base = sample();
        let mut fresh = LockDocument::new();
        fresh.insert(ManagerType::Brew, "jq", "1.8.0");

        base.merge_from(fresh, &[ManagerType::Brew]);
        assert_eq!(base.pinned(ManagerType::Brew, "jq"), Some("1.8.0"));
        assert_eq!(base.pinned(ManagerType::Brew, "tmux"), None);
        assert_eq!(base.pinned(ManagerType::Rust, "ripgrep"), Some("14.1.0"));
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("packages.lock.yaml");
        write_atomic(&path, "brew: {}\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "brew: {}\n");
    }
}
