//! File-based local store implementation.
//!
//! `FileStore` persists each record set as one JSON array on disk so the
//! cart survives a process restart on the same device.
//!
//! # Directory Structure
//!
//! ```text
//! data/
//! ├── products.json    # Cached catalog
//! └── cart.json        # Mirrored cart lines
//! ```
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a crash mid-write leaves the previous copy intact.

use crate::{LocalStore, RecordSet, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Suffix for in-progress writes
const TEMP_SUFFIX: &str = "tmp";

/// File-based implementation of `LocalStore`
///
/// Each record set has its own lock so a cart write never waits on a catalog
/// write, while read-modify-write cycles on the same set are serialized.
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    locks: HashMap<RecordSet, Mutex<()>>,
}

impl FileStore {
    /// Open a store rooted at `base_path`, creating the directory if needed
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let locks = RecordSet::ALL
            .into_iter()
            .map(|set| (set, Mutex::new(())))
            .collect();

        tracing::debug!("Opened file store at {}", base_path.display());
        Ok(Self { base_path, locks })
    }

    /// Get the base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path backing a record set
    pub fn set_path(&self, set: RecordSet) -> PathBuf {
        self.base_path.join(format!("{}.json", set.name()))
    }

    fn read_records(&self, set: RecordSet) -> Result<Vec<Value>> {
        let path = self.set_path(set);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_records(&self, set: RecordSet, records: &[Value]) -> Result<()> {
        let path = self.set_path(set);
        let temp_path = path.with_extension(TEMP_SUFFIX);

        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer(&mut writer, records)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn with_lock<T>(&self, set: RecordSet, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .locks
            .get(&set)
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));
        f()
    }
}

impl LocalStore for FileStore {
    fn clear(&self, set: RecordSet) -> Result<()> {
        self.with_lock(set, || {
            let path = self.set_path(set);
            if path.exists() {
                fs::remove_file(path)?;
            }
            Ok(())
        })
    }

    fn bulk_insert(&self, set: RecordSet, records: Vec<Value>) -> Result<()> {
        self.with_lock(set, || {
            let mut existing = self.read_records(set)?;
            existing.extend(records);
            self.write_records(set, &existing)
        })
    }

    fn read_all(&self, set: RecordSet) -> Result<Vec<Value>> {
        self.with_lock(set, || self.read_records(set))
    }

    fn replace(&self, set: RecordSet, records: Vec<Value>) -> Result<()> {
        self.with_lock(set, || self.write_records(set, &records))
    }
}
