use rand::{distributions::Alphanumeric, Rng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::warn;

use crate::error::StoreError;
use crate::types::{AnalysisRecord, NewAnalysis};

static TS_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// CRUD collection of finished analyses.
pub trait RecordStore: Send + Sync {
    fn create(&self, new: NewAnalysis) -> Result<AnalysisRecord, StoreError>;
    /// All records, newest first.
    fn list(&self) -> Result<Vec<AnalysisRecord>, StoreError>;
    fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError>;
    /// Returns false when no record had that id.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// `YYYYMMDD_HHMMSS_<6 random alphanumerics>`.
pub fn new_record_id(now: OffsetDateTime) -> String {
    let ts = now
        .format(TS_FORMAT)
        .unwrap_or_else(|_| "unknown".to_string());
    let rand: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{ts}_{rand}")
}

fn sort_newest_first(records: &mut [AnalysisRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn create(&self, new: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let record = AnalysisRecord::from_new(new_record_id(now), now, new);
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let mut items = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sort_newest_first(&mut items);
        Ok(items)
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

/// One pretty-printed JSON file per record under `<data_dir>/analyses/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("analyses"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        safe.then(|| self.dir.join(format!("{id}.json")))
    }

    fn read_record(&self, path: &Path, id: &str) -> Result<AnalysisRecord, StoreError> {
        let data = fs::read_to_string(path).map_err(|source| io_err(path, source))?;
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl RecordStore for FileStore {
    fn create(&self, new: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| io_err(&self.dir, source))?;
        let now = OffsetDateTime::now_utc();
        let record = AnalysisRecord::from_new(new_record_id(now), now, new);
        let path = self.dir.join(format!("{}.json", record.id));
        let data = serde_json::to_string_pretty(&record)?;
        fs::write(&path, data).map_err(|source| io_err(&path, source))?;
        Ok(record)
    }

    fn list(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|source| io_err(&self.dir, source))? {
            let entry = entry.map_err(|source| io_err(&self.dir, source))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            match self.read_record(&path, &id) {
                Ok(record) => items.push(record),
                Err(err @ StoreError::Corrupt { .. }) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable record");
                }
                Err(err) => return Err(err),
            }
        }
        sort_newest_first(&mut items);
        Ok(items)
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        self.read_record(&path, id).map(Some)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| io_err(&path, source))?;
        Ok(true)
    }
}
