//! Reading and writing the JSON data file.
//!
//! Every `JsonFile` pointing at the same path shares one lock, so loads and
//! saves of a file never interleave inside a process. Different files do not
//! contend. Nothing here locks against other processes.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::{Result, StoreError};
use crate::storage::wire::WireDataSet;

/// Dataset name assumed when none is configured.
pub const DEFAULT_DATASET_NAME: &str = "JsonTables";

type FileLock = Arc<Mutex<()>>;

fn registry() -> &'static Mutex<HashMap<PathBuf, FileLock>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, FileLock>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Key the registry by canonical parent directory plus file name, so that
/// `./a/../data.json` and `data.json` share a lock even before the file
/// exists.
fn lock_key(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    }
}

fn lock_for(path: &Path) -> FileLock {
    // The map is only ever inserted into, so a poisoned guard is still usable.
    let mut locks = registry().lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(lock_key(path)).or_default().clone()
}

/// The JSON document backing one dataset.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
    lock: FileLock,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self { path, lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| {
            StoreError::Other(format!(
                "Lock for {} poisoned by a panicked writer",
                self.path.display()
            ))
        })
    }

    /// Read and parse the document.
    ///
    /// The value is `Some` only on success. A missing file or blank content is
    /// a warning; bad JSON or a document for a different dataset is an error.
    /// A blank `expected_name` means [`DEFAULT_DATASET_NAME`].
    pub fn load(&self, expected_name: &str) -> Outcome<Option<WireDataSet>> {
        let mut diagnostics = Diagnostics::new();
        match self.load_inner(expected_name, &mut diagnostics) {
            Ok(document) => {
                let success = document.is_some();
                Outcome::new(success, document, diagnostics)
            }
            Err(e) => {
                diagnostics.error(&e);
                Outcome::new(false, None, diagnostics)
            }
        }
    }

    fn load_inner(
        &self,
        expected_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<WireDataSet>> {
        let expected = if expected_name.trim().is_empty() {
            DEFAULT_DATASET_NAME
        } else {
            expected_name
        };

        let content = {
            let _guard = self.guard()?;
            match fs::read_to_string(&self.path) {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    diagnostics.warning(StoreError::FileMissing(self.path.clone()));
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        };

        if content.trim().is_empty() {
            diagnostics.warning(StoreError::DataMissing(self.path.clone()));
            return Ok(None);
        }

        let document: WireDataSet = serde_json::from_str(&content)
            .map_err(|e| StoreError::MalformedDocument(format!("{}: {}", self.path.display(), e)))?;

        if document.data_set_name != expected {
            return Err(StoreError::DatasetNameMismatch {
                expected: expected.to_string(),
                found: document.data_set_name,
            });
        }

        debug!(
            path = %self.path.display(),
            tables = document.data_tables.len(),
            "Loaded dataset document"
        );
        Ok(Some(document))
    }

    /// Write the document as pretty-printed JSON, replacing the file whole.
    pub fn save(&self, document: &WireDataSet) -> Outcome<()> {
        let mut diagnostics = Diagnostics::new();
        let success = match self.save_inner(document) {
            Ok(()) => true,
            Err(e) => {
                diagnostics.error(&e);
                false
            }
        };
        Outcome::new(success, (), diagnostics)
    }

    fn save_inner(&self, document: &WireDataSet) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        let _guard = self.guard()?;
        crate::fs::write_atomic(&self.path, json.as_bytes())?;
        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            "Saved dataset document"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wire::{WireColumn, WireTable};
    use tempfile::tempdir;

    fn document(name: &str) -> WireDataSet {
        let mut doc = WireDataSet::new(name);
        doc.data_tables.push(WireTable {
            table_name: "People".into(),
            schema: vec![WireColumn {
                column_name: "Name".into(),
                data_type: "System.String".into(),
                unique: false,
            }],
            table: Vec::new(),
        });
        doc
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("data.json"));

        let saved = file.save(&document("People"));
        assert!(saved.success, "{}", saved.diagnostics);

        let loaded = file.load("People");
        assert!(loaded.success);
        assert_eq!(loaded.value, Some(document("People")));
    }

    #[test]
    fn test_saved_json_is_pretty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let file = JsonFile::new(&path);
        file.save(&document("People"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"DataSetName\": \"People\""));
    }

    #[test]
    fn test_missing_file_is_warning() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("absent.json"));

        let loaded = file.load("People");
        assert!(!loaded.success);
        assert!(loaded.value.is_none());
        assert!(loaded.has_warnings());
        assert!(!loaded.has_errors());
    }

    #[test]
    fn test_empty_file_is_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "  \n").unwrap();

        let loaded = JsonFile::new(&path).load("People");
        assert!(loaded.value.is_none());
        assert!(loaded.diagnostics.last_warning().unwrap().contains("Missing content"));
        assert!(!loaded.has_errors());
    }

    #[test]
    fn test_bad_json_and_name_mismatch_are_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        fs::write(&path, "{ not json").unwrap();
        let loaded = JsonFile::new(&path).load("People");
        assert!(loaded.has_errors());

        let file = JsonFile::new(&path);
        file.save(&document("Other"));
        let loaded = file.load("People");
        assert!(loaded.has_errors());
        assert!(loaded.diagnostics.last_error().unwrap().contains("mismatch"));
    }

    #[test]
    fn test_blank_expected_name_uses_default() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("data.json"));
        file.save(&WireDataSet::new(DEFAULT_DATASET_NAME));

        assert!(file.load("  ").success);
    }

    #[test]
    fn test_same_path_shares_lock() {
        let dir = tempdir().unwrap();
        let a = JsonFile::new(dir.path().join("data.json"));
        let b = JsonFile::new(dir.path().join(".").join("data.json"));
        let c = JsonFile::new(dir.path().join("other.json"));

        assert!(Arc::ptr_eq(&a.lock, &b.lock));
        assert!(!Arc::ptr_eq(&a.lock, &c.lock));
    }
}
