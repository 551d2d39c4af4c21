//! # xcode-helper core
//!
//! Core engine for toggling an Xcode project dependency between its packaged
//! form (a prebuilt `.xcframework`) and its linked form (the framework's own
//! `.xcodeproj` nested inside the consuming project), including:
//! - The project object graph (flat arena of typed nodes keyed by id)
//! - A JSON-backed graph store for `project.pbxproj`
//! - The graph mutator with cascading deletes and reversible swaps
//! - The backup ledger and the persisted link state
//! - Mapping configuration and project discovery
//!
//! The command-line crate sequences these pieces; nothing in here prompts or
//! prints.

#![warn(clippy::all)]

pub mod atomic;
pub mod backup;
pub mod graph;
pub mod locator;
pub mod mapping;
pub mod mutator;
pub mod state;

use std::path::PathBuf;

// Re-export commonly used types
pub use backup::{BackupError, BackupHandle, BackupLedger, BackupMetadata};
pub use graph::{
    GraphError, GraphStore, JsonGraphStore, Node, NodeKind, ObjectGraph, ObjectId,
};
pub use locator::{LocatedProjects, LocatorError, ProjectLocator};
pub use mapping::{
    FrameworkMapping, FrameworkRemapping, MappingRegistry, ProjectReference, TargetFrameworkInfo,
};
pub use mutator::{CascadeReport, ProjectModifier, RemapDirection, ReversalToken};
pub use state::{LinkState, LinkStateRecord, StateError};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the data directory
pub const HOME_ENV_VAR: &str = "XCODE_HELPER_HOME";

/// Name of the data directory under the user's home
pub const DATA_DIR_NAME: &str = ".xcode-helper";

/// Initialize tracing for the CLI and the core components.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects between `debug` and
/// `warn` for this crate's targets.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "xcode_helper_core={default_level},xcode_helper_cli={default_level}"
        ))
    });

    // A second initialisation (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runtime configuration shared by every command
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Directory holding backups and the optional mappings file
    pub data_dir: PathBuf,
    /// File name of the link-state record inside the base directory
    pub state_file_name: String,
    /// Report planned edits without touching any file
    pub dry_run: bool,
    /// Emit verbose console output
    pub verbose: bool,
}

impl LinkConfig {
    /// Resolve the data directory from `XCODE_HELPER_HOME`, falling back to
    /// `~/.xcode-helper`.
    pub fn default_data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    }

    /// Configuration rooted at an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Directory holding backup entries
    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    /// Location of the user mapping table
    pub fn mappings_file(&self) -> PathBuf {
        self.data_dir.join("mappings.json")
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            state_file_name: state::STATE_FILE_NAME.to_string(),
            dry_run: false,
            verbose: false,
        }
    }
}

/// Broad classes of failure, used by callers to choose between falling back
/// and aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Mapping, backup, state or project missing; a fallback usually exists
    NotFound,
    /// Dangling ids or malformed persisted data; restore from backup or VCS
    Corruption,
    /// Filesystem failure; abort the current step
    Io,
    /// A project generator exited nonzero
    ExternalTool,
    /// The requested transition conflicts with the recorded state
    Conflict,
}

/// Error types for link operations
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    /// Project graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Backup ledger error
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// Link-state record error
    #[error(transparent)]
    State(#[from] StateError),

    /// Project discovery error
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// Mapping id not present in the registry
    #[error("Unknown mapping: '{mapping}'\nAvailable mappings: {}", .available.join(", "))]
    UnknownMapping {
        mapping: String,
        available: Vec<String>,
    },

    /// Mapping file could not be read or decoded
    #[error("Invalid mapping configuration {path}: {message}")]
    MappingConfig { path: PathBuf, message: String },

    /// Another mapping is already linked in this base directory
    #[error("Project is already linked with mapping '{mapping}'. Run 'disable {mapping}' first.")]
    AlreadyLinked { mapping: String },

    /// External project generator failed
    #[error("{tool} failed with status {status}:\n{output}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        output: String,
    },

    /// No automatic recovery path exists
    #[error("Unable to fix the project: {0}")]
    CannotFix(String),

    /// Filesystem error outside the ledger and store
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    /// Classify this error for fallback decisions and exit reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Graph(err) => err.kind(),
            LinkError::Backup(err) => err.kind(),
            LinkError::State(err) => err.kind(),
            LinkError::Locator(_) | LinkError::UnknownMapping { .. } => ErrorKind::NotFound,
            LinkError::MappingConfig { .. } => ErrorKind::Corruption,
            LinkError::AlreadyLinked { .. } | LinkError::CannotFix(_) => ErrorKind::Conflict,
            LinkError::ExternalToolFailure { .. } => ErrorKind::ExternalTool,
            LinkError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether a caller may fall back to another strategy
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths_hang_off_data_dir() {
        let config = LinkConfig::with_data_dir("/tmp/xh");
        assert_eq!(config.backup_dir(), PathBuf::from("/tmp/xh/backups"));
        assert_eq!(config.mappings_file(), PathBuf::from("/tmp/xh/mappings.json"));
        assert_eq!(config.state_file_name, ".xcode-helper-state.json");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_error_kinds() {
        let err = LinkError::UnknownMapping {
            mapping: "nope".to_string(),
            available: vec!["subscription".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Available mappings: subscription"));

        let err = LinkError::from(BackupError::NoBackupFound("m".to_string()));
        assert!(err.is_not_found());

        let err = LinkError::ExternalToolFailure {
            tool: "tuist generate".to_string(),
            status: "exit status: 1".to_string(),
            output: "boom".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
    }
}
