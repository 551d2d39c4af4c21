//! Link command orchestration
//!
//! A [`LinkSession`] owns the configuration, the mapping table and the
//! collaborators every command needs, and sequences them:
//! - locate the source and target projects of a mapping
//! - back up a project before touching it
//! - mutate and save its graph
//! - record or clear the link state
//!
//! Each command lives in its own module as an `impl LinkSession` block.

use std::path::{Path, PathBuf};

use tracing::debug;
use xcode_helper_core::{
    BackupLedger, LinkConfig, LinkError, LinkStateRecord, MappingRegistry, ProjectLocator, Result,
};

pub mod commands;
mod disable;
mod enable;
mod fix;
pub mod reporter;
mod status;

pub use commands::{build_cli, parse_args, Invocation, LinkCommand};
pub use fix::ProjectGenerator;
pub use reporter::{ConsoleReporter, MemoryReporter, ReportLevel, Reporter};

/// Everything a link command needs
pub struct LinkSession {
    config: LinkConfig,
    registry: MappingRegistry,
    locator: ProjectLocator,
    ledger: BackupLedger,
    reporter: Box<dyn Reporter>,
}

impl LinkSession {
    /// Session printing to the console
    pub fn new(config: LinkConfig, registry: MappingRegistry) -> Self {
        let ledger = BackupLedger::new(config.backup_dir());
        let reporter = Box::new(ConsoleReporter::new(config.verbose));
        Self {
            config,
            registry,
            locator: ProjectLocator::new(),
            ledger,
            reporter,
        }
    }

    /// Replace the output backend
    pub fn set_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporter = reporter;
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &BackupLedger {
        &self.ledger
    }

    /// Run one command to completion
    pub fn handle_command(&self, command: LinkCommand) -> Result<()> {
        debug!(?command, "handling command");
        match command {
            LinkCommand::Enable {
                mapping,
                path,
                dry_run,
            } => {
                let base = resolve_base(path)?;
                self.enable(&mapping, &base, dry_run || self.config.dry_run)
            }
            LinkCommand::Disable { mapping, path } => {
                let base = resolve_base(path)?;
                self.disable(&mapping, &base)
            }
            LinkCommand::Status { path } => {
                let base = resolve_base(path)?;
                self.status(&base)
            }
            LinkCommand::Fix { mapping, path } => {
                let base = resolve_base(path)?;
                self.fix(mapping.as_deref(), &base)
            }
        }
    }

    /// Link-state record for a base directory
    fn state_record(&self, base_path: &Path) -> LinkStateRecord {
        LinkStateRecord::new(base_path, &self.config.state_file_name)
    }
}

/// The `--path` argument, or the current directory
fn resolve_base(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|source| LinkError::Io {
            path: PathBuf::from("."),
            source,
        }),
    }
}
