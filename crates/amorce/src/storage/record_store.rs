//! Persistence for transaction records.
//!
//! One JSON file per record, named `{record_id}.json`, wrapped with a
//! format version:
//! ```json
//! {
//!     "version": 1,
//!     "record": { ... TransactionRecord ... }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AmorceError, Result};
use crate::record::{RecordId, TransactionRecord};

const RECORD_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    version: u32,
    record: TransactionRecord,
}

/// Filesystem-backed store for [`TransactionRecord`]s.
///
/// Safe for single-process use; writes from multiple processes are not
/// coordinated.
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `base_dir`, creating it if missing.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Persist a record, overwriting any file with the same ID.
    pub fn save(&self, record: &TransactionRecord) -> Result<()> {
        let file = RecordFile {
            version: RECORD_FILE_VERSION,
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| AmorceError::SerializationError(e.to_string()))?;
        std::fs::write(self.record_path(&record.id), json.as_bytes())?;
        Ok(())
    }

    /// Load a record by its ID.
    pub fn load(&self, id: &RecordId) -> Result<TransactionRecord> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(AmorceError::NotFound(format!("record {id}")));
        }

        let bytes = std::fs::read(&path)?;
        let file: RecordFile = serde_json::from_slice(&bytes).map_err(|e| {
            AmorceError::InvalidFileFormat(format!(
                "failed to parse record file {}: {e}",
                path.display()
            ))
        })?;
        Ok(file.record)
    }

    /// List stored record IDs, in no particular order.
    pub fn list(&self) -> Result<Vec<RecordId>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(RecordId(stem.to_string()));
            }
        }
        Ok(ids)
    }

    /// Delete a record's file. Missing files are a no-op.
    pub fn delete(&self, id: &RecordId) -> Result<()> {
        match std::fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AmorceError::Io(e)),
        }
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.base_dir.join(format!("{}.json", id.0))
    }
}
