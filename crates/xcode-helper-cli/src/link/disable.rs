use std::path::Path;

use tracing::{info, warn};
use xcode_helper_core::{
    ErrorKind, FrameworkMapping, LinkError, LocatedProjects, ProjectModifier, RemapDirection,
    Result, ReversalToken,
};

use super::LinkSession;

impl LinkSession {
    /// Undo [`LinkSession::enable`]: restore the source project and swap the
    /// packaged framework back into the target
    pub(crate) fn disable(&self, mapping_id: &str, base: &Path) -> Result<()> {
        let reporter = self.reporter();
        reporter.info(&format!("Disabling framework linking for '{mapping_id}'..."));

        let mapping = self.registry.require(mapping_id)?;
        reporter.verbose(&format!("Looking for projects from: {}", base.display()));
        let projects = self.locator.locate(base, mapping)?;

        let record = self.state_record(&projects.base_path);
        let token = match record.read() {
            Ok(state) => {
                if state.mapping != mapping.id {
                    reporter.warning(&format!(
                        "Saved state belongs to '{}', not '{}'; its reversal data is ignored",
                        state.mapping, mapping.id
                    ));
                    None
                } else {
                    state.saved_xc_framework_info
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                reporter.verbose("No saved state found, will use default restoration");
                None
            }
            Err(err) => {
                warn!(error = %err, "unreadable link state");
                reporter.warning(&format!("{err}; falling back to default restoration"));
                None
            }
        };

        self.restore_source(mapping, &projects)?;
        self.restore_target(mapping, &projects, token.as_ref())?;

        let discarded = self.ledger.discard(&mapping.target_backup_id())?;
        if discarded > 0 {
            reporter.verbose(&format!("Discarded {discarded} target backup(s)"));
        }

        record.clear();
        info!(mapping = %mapping.id, "framework linking disabled");

        reporter.info("");
        reporter.success(&format!("Framework linking disabled for '{}'!", mapping.id));
        reporter.info("");
        reporter.info("The projects have been restored to their original configuration.");
        reporter.info("");
        reporter.info("You may need to:");
        reporter.info("  1. Close and reopen the project in Xcode");
        reporter.info("  2. Clean build folder (Cmd+Shift+K)");
        Ok(())
    }

    /// Prefer the backup taken by `enable`; remap in place without one
    fn restore_source(&self, mapping: &FrameworkMapping, projects: &LocatedProjects) -> Result<()> {
        let reporter = self.reporter();
        reporter.info("Restoring source project...");

        match self.ledger.restore_latest(&mapping.id) {
            Ok(path) => {
                reporter.info(&format!("Source project restored from backup: {}", path.display()));
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                reporter.verbose("No source backup found, remapping framework paths back");
            }
            Err(err) => return Err(LinkError::from(err)),
        }

        let mut source = ProjectModifier::open_json(&projects.source_project)?;
        let remapped = source
            .graph_mut()
            .remap_paths(&mapping.framework_remappings, RemapDirection::ToOriginal);
        source.save()?;
        reporter.verbose(&format!("{remapped} framework reference(s) remapped"));
        reporter.info("Source project frameworks remapped to original paths");
        Ok(())
    }

    fn restore_target(
        &self,
        mapping: &FrameworkMapping,
        projects: &LocatedProjects,
        token: Option<&ReversalToken>,
    ) -> Result<()> {
        let reporter = self.reporter();

        if let Some(framework) = &mapping.target_framework {
            reporter.info("");
            reporter.info("Restoring target project...");
            if token.is_none() {
                reporter.warning(&format!(
                    "No saved reference for {}; restoring it into the Frameworks group",
                    framework.framework_name
                ));
            }

            let mut target = ProjectModifier::open_json(&projects.target_project)?;
            reporter.info(&format!(
                "Replacing {} with {}...",
                framework.nested_project_path, framework.framework_name
            ));
            target.graph_mut().swap_nested_for_packaged(
                &framework.nested_project_path,
                &framework.framework_path,
                &framework.framework_name,
                token,
            );
            target.save()?;
            reporter.info("Target project restored successfully");
        } else if let Some(nested) = &mapping.nested_project_path {
            reporter.info("");
            reporter.info("Removing nested project reference...");
            let mut target = ProjectModifier::open_json(&projects.target_project)?;
            match target.graph_mut().remove_nested_project_reference(nested) {
                Some(report) => reporter.verbose(&format!("Removed {} object(s)", report.removed())),
                None => reporter.verbose("Nested project was not referenced"),
            }
            target.save()?;
            reporter.info("Nested project reference removed");
        }
        Ok(())
    }
}
