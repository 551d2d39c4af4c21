use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};
use xcode_helper_core::{ErrorKind, FrameworkMapping, LinkError, Result};

use super::LinkSession;

/// Tool that can regenerate a project from a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectGenerator {
    Tuist,
    XcodeGen,
}

impl ProjectGenerator {
    const TUIST_MARKERS: [&'static str; 3] = ["Project.swift", "Workspace.swift", "Tuist"];
    const XCODEGEN_MARKERS: [&'static str; 3] = ["project.yml", "project.yaml", "project.json"];

    /// Generator whose manifest is present in `dir`; Tuist wins over XcodeGen
    pub fn detect(dir: &Path) -> Option<Self> {
        let present = |markers: &[&str]| markers.iter().any(|marker| dir.join(marker).exists());
        if present(&Self::TUIST_MARKERS) {
            Some(Self::Tuist)
        } else if present(&Self::XCODEGEN_MARKERS) {
            Some(Self::XcodeGen)
        } else {
            None
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Self::Tuist => "tuist",
            Self::XcodeGen => "xcodegen",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tuist => "Tuist",
            Self::XcodeGen => "XcodeGen",
        }
    }

    /// Run `<program> generate` in `dir`, capturing its output
    pub fn regenerate(&self, dir: &Path) -> Result<()> {
        let tool = format!("{} generate", self.program());
        let output = Command::new(self.program())
            .arg("generate")
            .current_dir(dir)
            .output()
            .map_err(|err| LinkError::ExternalToolFailure {
                tool: tool.clone(),
                status: "not started".to_string(),
                output: err.to_string(),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(LinkError::ExternalToolFailure {
                tool,
                status: output.status.to_string(),
                output: combined,
            });
        }
        debug!(%tool, dir = %dir.display(), "project regenerated");
        Ok(())
    }
}

/// The project to fix and, when its mapping is known, the backup to try
struct FixTarget {
    backup_id: Option<String>,
    project: PathBuf,
}

impl LinkSession {
    fn backup_if_linked(&self, mapping: &FrameworkMapping, linked: bool) -> Option<String> {
        if !linked {
            self.reporter().verbose(&format!(
                "'{}' is not linked; target backups are not used",
                mapping.id
            ));
        }
        linked.then(|| mapping.target_backup_id())
    }

    /// Recover the target project: restore its backup, else regenerate it
    pub(crate) fn fix(&self, mapping_id: Option<&str>, base: &Path) -> Result<()> {
        let reporter = self.reporter();
        let target = self.resolve_fix_target(mapping_id, base)?;
        reporter.info(&format!(
            "Attempting to fix project at: {}",
            target.project.display()
        ));

        if let Some(backup_id) = &target.backup_id {
            match self.ledger.restore_latest(backup_id) {
                Ok(path) => {
                    info!(backup = %backup_id, "target project restored from backup");
                    reporter.success(&format!(
                        "Project restored from backup: {}",
                        path.display()
                    ));
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    reporter.verbose(&format!("No backup for '{backup_id}', trying a generator"));
                }
                Err(err) => return Err(err.into()),
            }
        }

        let project_dir = target
            .project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let Some(generator) = ProjectGenerator::detect(&project_dir) else {
            return Err(LinkError::CannotFix(format!(
                "No project generator detected (looked for Tuist manifest files or project.yml).\n\n\
                 Manual recovery options:\n  \
                 1. Restore from backup: cp {}/<latest>/project.pbxproj {}/\n  \
                 2. Restore from git: git checkout {}/project.pbxproj\n  \
                 3. Manually fix the project in Xcode",
                self.ledger.root().display(),
                target.project.display(),
                target.project.display()
            )));
        };

        reporter.info(&format!("Detected {}-managed project", generator.display_name()));
        reporter.info(&format!("Running: {} generate", generator.program()));
        generator.regenerate(&project_dir)?;

        reporter.success("Project regenerated successfully!");
        Ok(())
    }

    /// Mapping argument, then saved state, then the only `.xcodeproj` in
    /// `base`. A backup is only offered while the mapping is still linked.
    fn resolve_fix_target(&self, mapping_id: Option<&str>, base: &Path) -> Result<FixTarget> {
        if let Some(mapping_id) = mapping_id {
            let mapping = self.registry.require(mapping_id)?;
            let projects = self.locator.locate(base, mapping)?;
            let linked = self
                .state_record(&projects.base_path)
                .read_optional()
                .unwrap_or_default()
                .is_some_and(|state| state.enabled && state.mapping == mapping.id);
            return Ok(FixTarget {
                backup_id: self.backup_if_linked(mapping, linked),
                project: projects.target_project,
            });
        }

        let saved = self.state_record(base).read_optional().unwrap_or_default();
        if let Some(state) = saved {
            if let Some(mapping) = self.registry.get(&state.mapping) {
                self.reporter().verbose(&format!(
                    "Using mapping '{}' from saved state",
                    mapping.id
                ));
                let projects = self.locator.locate(base, mapping)?;
                return Ok(FixTarget {
                    backup_id: self.backup_if_linked(mapping, state.enabled),
                    project: projects.target_project,
                });
            }
        }

        let entries = fs::read_dir(base).map_err(|source| LinkError::Io {
            path: base.to_path_buf(),
            source,
        })?;
        let mut projects: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "xcodeproj"))
            .collect();
        projects.sort();

        match projects.len() {
            1 => {
                let project = projects.remove(0);
                self.reporter()
                    .verbose(&format!("Auto-detected project: {}", project.display()));
                Ok(FixTarget {
                    backup_id: None,
                    project,
                })
            }
            0 => Err(LinkError::CannotFix(
                "No .xcodeproj found in current directory.\n\
                 Please specify a mapping: xcode-helper fix <mapping>\n\
                 Or run from the project directory."
                    .to_string(),
            )),
            _ => {
                let names: Vec<String> = projects
                    .iter()
                    .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .collect();
                Err(LinkError::CannotFix(format!(
                    "Multiple .xcodeproj files found: {}\n\
                     Please specify which mapping to fix: xcode-helper fix <mapping>",
                    names.join(", ")
                )))
            }
        }
    }
}
