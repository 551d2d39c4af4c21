use std::path::Path;

use xcode_helper_core::{LinkState, Result};

use super::LinkSession;

impl LinkSession {
    /// Report the link state of `base`, or of its parent when run from
    /// inside the target repository
    pub(crate) fn status(&self, base: &Path) -> Result<()> {
        let reporter = self.reporter();
        reporter.info("Checking framework linking status...");
        reporter.info("");

        match self.find_state(base)? {
            Some(state) if state.enabled => self.report_enabled(&state),
            _ => self.report_disabled(),
        }
        Ok(())
    }

    fn find_state(&self, base: &Path) -> Result<Option<LinkState>> {
        let candidates = std::iter::once(base).chain(base.parent());
        for dir in candidates {
            let record = self.state_record(dir);
            if let Some(state) = record.read_optional()? {
                self.reporter()
                    .verbose(&format!("State file: {}", record.path().display()));
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    fn report_enabled(&self, state: &LinkState) {
        let reporter = self.reporter();
        reporter.info("Status: ENABLED");
        reporter.info(&format!("  Mapping: {}", state.mapping));
        reporter.info(&format!("  Enabled at: {}", state.timestamp.to_rfc3339()));

        match &state.saved_xc_framework_info {
            Some(token) => {
                reporter.verbose(&format!(
                    "  Replaced: {} ({})",
                    token.original_name, token.original_path
                ));
                reporter.verbose(&format!("  File reference: {}", token.file_reference_id));
                let build_files: Vec<&str> =
                    token.build_file_ids.iter().map(|id| id.as_str()).collect();
                reporter.verbose(&format!("  Build files: {}", build_files.join(", ")));
                match &token.group_id {
                    Some(group) => reporter.verbose(&format!("  Group: {group}")),
                    None => reporter.verbose("  Group: none"),
                }
            }
            None => reporter.verbose("  No reversal data saved"),
        }

        match self.ledger.list(Some(&state.mapping)) {
            Ok(backups) => reporter.verbose(&format!("  Source backups: {}", backups.len())),
            Err(err) => reporter.verbose(&format!("  Backups unavailable: {err}")),
        }

        reporter.info("");
        reporter.info("To disable, run:");
        reporter.info(&format!("  xcode-helper disable {}", state.mapping));
    }

    fn report_disabled(&self) {
        let reporter = self.reporter();
        reporter.info("Status: DISABLED");
        reporter.info("");
        reporter.info("Available mappings:");
        for mapping in self.registry.iter() {
            reporter.info(&format!("  - {}: {}", mapping.id, mapping.display_name));
        }
        reporter.info("");
        reporter.info("To enable framework linking, run:");
        reporter.info("  xcode-helper enable <mapping>");
    }
}
