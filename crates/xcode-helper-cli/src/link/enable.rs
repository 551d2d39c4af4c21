use std::path::Path;

use tracing::{info, warn};
use xcode_helper_core::{
    FrameworkMapping, LinkError, LocatedProjects, ProjectModifier, RemapDirection, Result,
    ReversalToken,
};

use super::LinkSession;

impl LinkSession {
    /// Point the source project at the consumer's frameworks and nest the
    /// source project inside the consumer
    pub(crate) fn enable(&self, mapping_id: &str, base: &Path, dry_run: bool) -> Result<()> {
        let reporter = self.reporter();
        reporter.info(&format!("Enabling framework linking for '{mapping_id}'..."));

        let mapping = self.registry.require(mapping_id)?;
        reporter.verbose(&format!("Looking for projects from: {}", base.display()));
        let projects = self.locator.locate(base, mapping)?;

        reporter.info("Found projects:");
        reporter.info(&format!("  Source: {}", projects.source_project.display()));
        reporter.info(&format!("  Target: {}", projects.target_project.display()));

        let record = self.state_record(&projects.base_path);
        if let Some(state) = record.read_optional()? {
            if state.enabled && state.mapping != mapping.id {
                return Err(LinkError::AlreadyLinked {
                    mapping: state.mapping,
                });
            }
            if state.enabled {
                reporter.warning(&format!(
                    "'{}' is already enabled (since {}); nothing to do",
                    mapping.id, state.timestamp
                ));
                return Ok(());
            }
        }

        if dry_run {
            self.report_plan(mapping);
            return Ok(());
        }

        let token = self.link(mapping, &projects)?;

        let has_token = token.is_some();
        record.write(true, &mapping.id, token)?;
        info!(mapping = %mapping.id, has_token, "framework linking enabled");

        reporter.info("");
        reporter.success(&format!("Framework linking enabled for '{}'!", mapping.id));
        reporter.info("");
        reporter.info("Next steps:");
        reporter.info(&format!(
            "  1. Open {} in Xcode",
            mapping.target_project.name
        ));
        reporter.info(&format!(
            "  2. The {} project should appear in the navigator",
            mapping.source_project.name
        ));
        reporter.info("  3. You can now set breakpoints and debug the framework source");
        Ok(())
    }

    /// Back up and mutate both projects; returns the swap's reversal token
    fn link(&self, mapping: &FrameworkMapping, projects: &LocatedProjects) -> Result<Option<ReversalToken>> {
        let reporter = self.reporter();

        reporter.info("");
        // Only a failed attempt leaves a source backup behind without an
        // enabled state; it still holds the unlinked source.
        match self.ledger.latest(&mapping.id)? {
            Some(backup) => {
                warn!(
                    mapping = %mapping.id,
                    backup = %backup.name,
                    "reusing source backup from an earlier attempt"
                );
                reporter.warning(&format!(
                    "Keeping source backup from an earlier attempt: {}",
                    backup.path.display()
                ));
            }
            None => {
                reporter.info("Backing up source project...");
                let backup = self.ledger.create(&projects.source_project, &mapping.id)?;
                reporter.verbose(&format!("Backup created at: {}", backup.path.display()));
            }
        }

        reporter.info("Remapping framework paths...");
        let mut source = ProjectModifier::open_json(&projects.source_project)?;
        let remapped = source
            .graph_mut()
            .remap_paths(&mapping.framework_remappings, RemapDirection::ToLinked);
        source.save()?;
        reporter.verbose(&format!(
            "{remapped} framework reference(s) point at the linked paths"
        ));
        reporter.info("Source project updated successfully");

        if !mapping.modifies_target() {
            return Ok(None);
        }

        reporter.info("");
        reporter.info("Backing up target project...");
        let backup = self
            .ledger
            .create(&projects.target_project, &mapping.target_backup_id())?;
        reporter.verbose(&format!("Backup created at: {}", backup.path.display()));

        let mut target = ProjectModifier::open_json(&projects.target_project)?;
        let token = match (&mapping.target_framework, &mapping.nested_project_path) {
            (Some(framework), _) => {
                reporter.info(&format!(
                    "Replacing {} with {}...",
                    framework.framework_name, framework.nested_project_path
                ));
                let token = target.graph_mut().swap_packaged_for_nested(
                    &framework.framework_name,
                    &framework.framework_path,
                    &framework.nested_project_path,
                    &framework.product_name,
                );
                if token.is_none() {
                    reporter.warning(&format!(
                        "{} not found in the target project; assuming it was already replaced",
                        framework.framework_name
                    ));
                }
                token
            }
            (None, Some(nested)) => {
                reporter.info("Adding nested project reference...");
                target.graph_mut().add_nested_project_reference(nested);
                None
            }
            (None, None) => None,
        };
        target.save()?;
        reporter.info("Target project updated successfully");

        Ok(token)
    }

    fn report_plan(&self, mapping: &FrameworkMapping) {
        let reporter = self.reporter();
        reporter.info("");
        reporter.info("[DRY RUN] Would perform the following changes:");
        reporter.info("");
        reporter.info(&format!(
            "1. Remap framework paths in {}:",
            mapping.source_project.name
        ));
        for remapping in &mapping.framework_remappings {
            reporter.info(&format!("   - {}", remapping.framework_name));
            reporter.info(&format!("     FROM: {}", remapping.original_path));
            reporter.info(&format!("     TO:   {}", remapping.linked_path));
        }

        if let Some(framework) = &mapping.target_framework {
            reporter.info("");
            reporter.info(&format!(
                "2. Replace {} in {} with:",
                framework.framework_name, mapping.target_project.name
            ));
            reporter.info(&format!("   - {}", framework.nested_project_path));
            reporter.info(&format!("   - {}.framework (linked)", framework.product_name));
        } else if let Some(nested) = &mapping.nested_project_path {
            reporter.info("");
            reporter.info(&format!(
                "2. Add nested project reference in {}:",
                mapping.target_project.name
            ));
            reporter.info(&format!("   - {nested}"));
        }
    }
}
