//! Persisted link state: which mapping is enabled for a base directory and
//! the reversal token needed to undo it.

use std::{
    fs,
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{atomic::write_atomically, mutator::ReversalToken, ErrorKind};

/// Default record file name inside the base directory
pub const STATE_FILE_NAME: &str = ".xcode-helper-state.json";

/// Link-state errors
#[derive(thiserror::Error, Debug)]
pub enum StateError {
    /// No record exists
    #[error("No link state found at {0}")]
    NotFound(PathBuf),

    /// The record is not valid JSON for [`LinkState`]
    #[error("Malformed link state {path}: {source}. Delete it or run 'fix' to recover.")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Link state I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::NotFound(_) => ErrorKind::NotFound,
            StateError::Malformed { .. } => ErrorKind::Corruption,
            StateError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// The persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub enabled: bool,
    pub mapping: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "savedXCFrameworkInfo", default)]
    pub saved_xc_framework_info: Option<ReversalToken>,
}

/// Location of the record for one base directory
#[derive(Debug, Clone)]
pub struct LinkStateRecord {
    path: PathBuf,
}

impl LinkStateRecord {
    pub fn new(base_dir: &Path, file_name: &str) -> Self {
        Self {
            path: base_dir.join(file_name),
        }
    }

    /// Record with the default file name
    pub fn in_dir(base_dir: &Path) -> Self {
        Self::new(base_dir, STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the record, stamping it with the current time
    pub fn write(
        &self,
        enabled: bool,
        mapping: &str,
        token: Option<ReversalToken>,
    ) -> Result<LinkState, StateError> {
        let state = LinkState {
            enabled,
            mapping: mapping.to_string(),
            timestamp: Utc::now(),
            saved_xc_framework_info: token,
        };

        let mut data = serde_json::to_vec_pretty(&state).map_err(|source| StateError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        data.push(b'\n');
        write_atomically(&self.path, &data).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(mapping, enabled, path = %self.path.display(), "wrote link state");
        Ok(state)
    }

    pub fn read(&self) -> Result<LinkState, StateError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                return Err(StateError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&data).map_err(|source| StateError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the record, treating absence as `None`
    pub fn read_optional(&self) -> Result<Option<LinkState>, StateError> {
        match self.read() {
            Ok(state) => Ok(Some(state)),
            Err(StateError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Delete the record. Absence is fine and other failures are only logged.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "cleared link state"),
            Err(err) if err.kind() == IoErrorKind::NotFound => {}
            Err(err) => debug!(path = %self.path.display(), error = %err, "could not clear link state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::graph::ObjectId;

    fn token() -> ReversalToken {
        ReversalToken {
            file_reference_id: ObjectId::from("F1F1F1F1F1F1F1F1F1F1F1F1"),
            build_file_ids: vec![ObjectId::from("B1B1B1B1B1B1B1B1B1B1B1B1")],
            group_id: Some(ObjectId::from("G1G1G1G1G1G1G1G1G1G1G1G1")),
            original_path: "Carthage/Build/Sub.xcframework".to_string(),
            original_name: "Sub.xcframework".to_string(),
            group_index: Some(0),
            build_file_index: Some(1),
        }
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let record = LinkStateRecord::in_dir(temp.path());

        let written = record.write(true, "subscription", Some(token())).unwrap();
        let read = record.read().unwrap();

        assert_eq!(read, written);
        assert!(read.enabled);
        assert_eq!(read.saved_xc_framework_info, Some(token()));
        assert!(record.exists());
    }

    #[test]
    fn test_record_field_names() {
        let temp = TempDir::new().unwrap();
        let record = LinkStateRecord::in_dir(temp.path());
        record.write(true, "subscription", None).unwrap();

        let raw: Value =
            serde_json::from_slice(&fs::read(temp.path().join(STATE_FILE_NAME)).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["enabled", "mapping", "savedXCFrameworkInfo", "timestamp"]);
        assert_eq!(object["savedXCFrameworkInfo"], Value::Null);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let record = LinkStateRecord::in_dir(temp.path());

        let err = record.read().unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(record.read_optional().unwrap(), None);
    }

    #[test]
    fn test_malformed_record_is_corruption() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STATE_FILE_NAME), "{ not json").unwrap();

        let err = LinkStateRecord::in_dir(temp.path()).read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let record = LinkStateRecord::in_dir(temp.path());
        record.clear();

        record.write(false, "subscription", None).unwrap();
        record.clear();
        assert!(!record.exists());
        record.clear();
    }

    #[test]
    fn test_reads_record_without_token_field() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(STATE_FILE_NAME),
            r#"{"enabled": true, "mapping": "subscription", "timestamp": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();

        let state = LinkStateRecord::in_dir(temp.path()).read().unwrap();
        assert_eq!(state.mapping, "subscription");
        assert!(state.saved_xc_framework_info.is_none());
    }
}
