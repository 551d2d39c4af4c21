//! Backup ledger: verbatim copies of `project.pbxproj` taken before a
//! project is mutated.
//!
//! Each backup is a directory `<mapping>_<timestamp>` under the ledger root
//! holding the project file and a `metadata.json`. Timestamps are written
//! with a fixed width so directory names sort chronologically.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    graph::{project_file, PROJECT_FILE_NAME},
    ErrorKind,
};

/// Metadata file stored next to the copied project file
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// `:` is not allowed in directory names on every filesystem, so the
/// timestamp uses `-` throughout.
const STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6fZ";
const STAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.fZ";

/// Backup ledger errors
#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    /// No backup entry matches the mapping
    #[error("No backup found for mapping: {0}")]
    NoBackupFound(String),

    /// Copying, listing or deleting failed
    #[error("Backup I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `metadata.json` is unreadable
    #[error("Invalid backup metadata {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::NoBackupFound(_) => ErrorKind::NotFound,
            BackupError::Io { .. } => ErrorKind::Io,
            BackupError::Metadata { .. } => ErrorKind::Corruption,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    /// Project bundle the file was copied from
    pub original_project_path: PathBuf,
    pub mapping_id: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    /// Entry directory
    pub path: PathBuf,
    /// Directory name, `<mapping>_<timestamp>`
    pub name: String,
    pub mapping_id: String,
    /// Timestamp decoded from the name, when it is well formed
    pub timestamp: Option<DateTime<Utc>>,
}

impl BackupHandle {
    fn from_entry(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let (mapping_id, stamp) = name.rsplit_once('_')?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, STAMP_PARSE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc());
        Some(Self {
            mapping_id: mapping_id.to_string(),
            timestamp,
            name,
            path,
        })
    }

    /// Copied project file inside the entry
    pub fn project_file(&self) -> PathBuf {
        self.path.join(PROJECT_FILE_NAME)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.path.join(METADATA_FILE_NAME)
    }

    /// Read and decode `metadata.json`
    pub fn metadata(&self) -> Result<BackupMetadata, BackupError> {
        let file = self.metadata_file();
        let data = fs::read(&file).map_err(io_error(&file))?;
        serde_json::from_slice(&data).map_err(|source| BackupError::Metadata { path: file, source })
    }
}

/// Directory of backup entries
#[derive(Debug, Clone)]
pub struct BackupLedger {
    root: PathBuf,
}

impl BackupLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Back up the project file of `project_path` under `mapping_id`
    pub fn create(&self, project_path: &Path, mapping_id: &str) -> Result<BackupHandle, BackupError> {
        self.create_at(project_path, mapping_id, Utc::now())
    }

    /// [`Self::create`] with an explicit clock. An entry with the same name
    /// pushes the timestamp forward one microsecond at a time.
    pub fn create_at(
        &self,
        project_path: &Path,
        mapping_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<BackupHandle, BackupError> {
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let mut timestamp = timestamp;
        let mut entry = self.entry_path(mapping_id, timestamp);
        while entry.exists() {
            timestamp += Duration::microseconds(1);
            entry = self.entry_path(mapping_id, timestamp);
        }
        fs::create_dir(&entry).map_err(io_error(&entry))?;

        let source = project_file(project_path);
        let copy = entry.join(PROJECT_FILE_NAME);
        fs::copy(&source, &copy).map_err(io_error(&source))?;

        let metadata = BackupMetadata {
            original_project_path: project_path.to_path_buf(),
            mapping_id: mapping_id.to_string(),
            timestamp,
        };
        let metadata_file = entry.join(METADATA_FILE_NAME);
        let data = serde_json::to_vec_pretty(&metadata).map_err(|source| BackupError::Metadata {
            path: metadata_file.clone(),
            source,
        })?;
        fs::write(&metadata_file, data).map_err(io_error(&metadata_file))?;

        info!(
            mapping = mapping_id,
            project = %project_path.display(),
            backup = %entry.display(),
            "created backup"
        );

        BackupHandle::from_entry(entry.clone()).ok_or_else(|| BackupError::Io {
            path: entry,
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "unnamed backup entry"),
        })
    }

    /// Entries, oldest first, optionally restricted to one mapping
    pub fn list(&self, mapping_id: Option<&str>) -> Result<Vec<BackupHandle>, BackupError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let entry = entry.map_err(io_error(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(handle) = BackupHandle::from_entry(entry.path()) else {
                debug!(path = %entry.path().display(), "skipping unrecognised backup entry");
                continue;
            };
            if mapping_id.map_or(true, |id| handle.mapping_id == id) {
                handles.push(handle);
            }
        }
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(handles)
    }

    /// Newest entry for exactly `mapping_id`
    pub fn latest(&self, mapping_id: &str) -> Result<Option<BackupHandle>, BackupError> {
        Ok(self.list(Some(mapping_id))?.pop())
    }

    pub fn has_backup(&self, mapping_id: &str) -> Result<bool, BackupError> {
        Ok(self.latest(mapping_id)?.is_some())
    }

    /// Put the newest backup of `mapping_id` back over the project it came
    /// from, then drop the entry. Returns the restored project path.
    pub fn restore_latest(&self, mapping_id: &str) -> Result<PathBuf, BackupError> {
        let handle = self
            .latest(mapping_id)?
            .ok_or_else(|| BackupError::NoBackupFound(mapping_id.to_string()))?;
        let metadata = handle.metadata()?;

        let backup_file = handle.project_file();
        if !backup_file.exists() {
            return Err(BackupError::Io {
                path: backup_file,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "backup copy missing"),
            });
        }

        let live = project_file(&metadata.original_project_path);
        match fs::remove_file(&live) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(BackupError::Io { path: live, source }),
        }
        fs::copy(&backup_file, &live).map_err(io_error(&live))?;

        if let Err(err) = fs::remove_dir_all(&handle.path) {
            warn!(backup = %handle.path.display(), error = %err, "failed to delete restored backup");
        }

        info!(
            mapping = mapping_id,
            project = %metadata.original_project_path.display(),
            backup = %handle.name,
            "restored backup"
        );
        Ok(metadata.original_project_path)
    }

    /// Delete every entry of exactly `mapping_id` without restoring any.
    /// Returns how many were removed.
    pub fn discard(&self, mapping_id: &str) -> Result<usize, BackupError> {
        let handles = self.list(Some(mapping_id))?;
        for handle in &handles {
            fs::remove_dir_all(&handle.path).map_err(io_error(&handle.path))?;
        }
        if !handles.is_empty() {
            info!(mapping = mapping_id, removed = handles.len(), "discarded backups");
        }
        Ok(handles.len())
    }

    fn entry_path(&self, mapping_id: &str, timestamp: DateTime<Utc>) -> PathBuf {
        self.root
            .join(format!("{mapping_id}_{}", timestamp.format(STAMP_FORMAT)))
    }
}
