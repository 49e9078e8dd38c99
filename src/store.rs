use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::catalog::Catalog;
use crate::error::PersistenceError;
use crate::ledger::ProgressLedger;

/// Load/save interface for catalog and ledger state.
pub trait StateStore {
    fn load_catalog(&self) -> Result<Catalog, PersistenceError>;
    fn save_catalog(&self, catalog: &Catalog) -> Result<(), PersistenceError>;
    fn load_ledger(&self) -> Result<ProgressLedger, PersistenceError>;
    fn save_ledger(&self, ledger: &ProgressLedger) -> Result<(), PersistenceError>;
}

/// Pretty-printed JSON files, rewritten in full on every save.
pub struct JsonStore {
    items_path: PathBuf,
    progress_path: PathBuf,
}

impl JsonStore {
    pub fn new(items_path: impl Into<PathBuf>, progress_path: impl Into<PathBuf>) -> Self {
        JsonStore {
            items_path: items_path.into(),
            progress_path: progress_path.into(),
        }
    }

    pub fn items_path(&self) -> &Path {
        &self.items_path
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }
}

impl StateStore for JsonStore {
    fn load_catalog(&self) -> Result<Catalog, PersistenceError> {
        let mut catalog: Catalog = read_json(&self.items_path)?;
        catalog.reindex();
        Ok(catalog)
    }

    fn save_catalog(&self, catalog: &Catalog) -> Result<(), PersistenceError> {
        write_json_atomic(&self.items_path, catalog, "catalog")
    }

    fn load_ledger(&self) -> Result<ProgressLedger, PersistenceError> {
        if !self.progress_path.exists() {
            return Ok(ProgressLedger::new());
        }
        let mut ledger: ProgressLedger = read_json(&self.progress_path)?;
        ledger.normalize();
        Ok(ledger)
    }

    fn save_ledger(&self, ledger: &ProgressLedger) -> Result<(), PersistenceError> {
        write_json_atomic(&self.progress_path, ledger, "ledger")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a temp file in the target's directory, fsync, then rename over
/// the target. A crash leaves either the old or the new file, never a
/// truncated one.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> Result<(), PersistenceError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|source| PersistenceError::Serialize { what, source })?;
    json.push('\n');

    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
pub mod memory {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// In-memory store. `fail_after` makes the n-th and later saves fail.
    #[derive(Default)]
    pub struct MemoryStore {
        pub catalog: RefCell<Catalog>,
        pub ledger: RefCell<ProgressLedger>,
        pub saves: Cell<usize>,
        pub fail_after: Option<usize>,
    }

    impl MemoryStore {
        fn tick(&self) -> Result<(), PersistenceError> {
            let n = self.saves.get() + 1;
            self.saves.set(n);
            match self.fail_after {
                Some(limit) if n > limit => Err(PersistenceError::Write {
                    path: PathBuf::from("memory"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                }),
                _ => Ok(()),
            }
        }
    }

    impl StateStore for MemoryStore {
        fn load_catalog(&self) -> Result<Catalog, PersistenceError> {
            Ok(self.catalog.borrow().clone())
        }

        fn save_catalog(&self, catalog: &Catalog) -> Result<(), PersistenceError> {
            self.tick()?;
            *self.catalog.borrow_mut() = catalog.clone();
            Ok(())
        }

        fn load_ledger(&self) -> Result<ProgressLedger, PersistenceError> {
            Ok(self.ledger.borrow().clone())
        }

        fn save_ledger(&self, ledger: &ProgressLedger) -> Result<(), PersistenceError> {
            self.tick()?;
            *self.ledger.borrow_mut() = ledger.clone();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScrapeStatus;

    #[test]
    fn json_round_trip_keeps_extras() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.json");
        let progress = dir.path().join("progress.json");
        std::fs::write(
            &items,
            r#"{"issues": 3, "items": [{"name": "Cube", "url": "https://a.com", "category": "tools"}]}"#,
        )
        .unwrap();

        let store = JsonStore::new(&items, &progress);
        let mut catalog = store.load_catalog().unwrap();
        let ledger = store.load_ledger().unwrap();
        assert_eq!(ledger, ProgressLedger::new());

        catalog.items[0].image_url = Some("https://a.com/cube.jpg".into());
        catalog.items[0].mark(ScrapeStatus::Scraped);
        store.save_catalog(&catalog).unwrap();

        let reloaded = store.load_catalog().unwrap();
        assert_eq!(reloaded.items[0].image_url.as_deref(), Some("https://a.com/cube.jpg"));
        assert_eq!(reloaded.items[0].scrape_status, ScrapeStatus::Scraped);
        assert_eq!(reloaded.extra["issues"], 3);
        assert_eq!(reloaded.items[0].extra["category"], "tools");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let progress = dir.path().join("progress.json");
        let store = JsonStore::new(dir.path().join("items.json"), &progress);

        let mut ledger = ProgressLedger::new();
        ledger.record_success(3);
        ledger.persist(&store).unwrap();
        ledger.record_success(1);
        ledger.persist(&store).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let reloaded = store.load_ledger().unwrap();
        assert_eq!(reloaded.completed().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nope.json"), dir.path().join("p.json"));
        assert!(matches!(
            store.load_catalog(),
            Err(PersistenceError::Read { .. })
        ));
    }
}
