//! Finding the source and target projects of a mapping on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::mapping::FrameworkMapping;

#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error(
        "Could not locate both projects:\n  - {source_name}\n  - {target_name}\n\n\
         Run this command from:\n  \
         1. Inside the {target_name} repository, OR\n  \
         2. A parent directory containing both repositories"
    )]
    ProjectsNotFound {
        source_name: String,
        target_name: String,
    },
}

/// Both projects of a mapping plus the directory that holds their
/// repositories (where the link state lives)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedProjects {
    pub source_project: PathBuf,
    pub target_project: PathBuf,
    pub base_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLocator;

impl ProjectLocator {
    pub fn new() -> Self {
        Self
    }

    /// Try running from inside the target repository, then from the parent
    /// directory of both repositories.
    pub fn locate(&self, base: &Path, mapping: &FrameworkMapping) -> Result<LocatedProjects, LocatorError> {
        let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());

        if let Some(found) = Self::from_target(&base, mapping) {
            debug!(base = %found.base_path.display(), "located projects from target repository");
            return Ok(found);
        }
        if let Some(found) = Self::from_parent(&base, mapping) {
            debug!(base = %found.base_path.display(), "located projects from parent directory");
            return Ok(found);
        }

        Err(LocatorError::ProjectsNotFound {
            source_name: mapping.source_project.name.clone(),
            target_name: mapping.target_project.name.clone(),
        })
    }

    fn from_target(base: &Path, mapping: &FrameworkMapping) -> Option<LocatedProjects> {
        let target_project = base.join(&mapping.target_project.project_path);
        if !target_project.exists() {
            return None;
        }

        let parent = base.parent()?;
        let source_project = parent
            .join(&mapping.source_project.expected_directory)
            .join(&mapping.source_project.project_path);
        if !source_project.exists() {
            return None;
        }

        Some(LocatedProjects {
            source_project,
            target_project,
            base_path: parent.to_path_buf(),
        })
    }

    fn from_parent(base: &Path, mapping: &FrameworkMapping) -> Option<LocatedProjects> {
        let source_project = base
            .join(&mapping.source_project.expected_directory)
            .join(&mapping.source_project.project_path);
        let target_project = base
            .join(&mapping.target_project.expected_directory)
            .join(&mapping.target_project.project_path);
        if !source_project.exists() || !target_project.exists() {
            return None;
        }

        Some(LocatedProjects {
            source_project,
            target_project,
            base_path: base.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    /// `<tmp>/pd-mob-subscription-ios/Subscription/Subscription.xcodeproj`
    /// and `<tmp>/pd-mob-b2c-ios/Volo.xcodeproj`
    fn checkout() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("pd-mob-subscription-ios/Subscription/Subscription.xcodeproj"))
            .unwrap();
        fs::create_dir_all(root.join("pd-mob-b2c-ios/Volo.xcodeproj")).unwrap();
        (temp, root)
    }

    #[test]
    fn test_locate_from_parent() {
        let (_temp, root) = checkout();
        let found = ProjectLocator::new()
            .locate(&root, &FrameworkMapping::subscription())
            .unwrap();

        assert_eq!(found.base_path, root);
        assert_eq!(
            found.source_project,
            root.join("pd-mob-subscription-ios/Subscription/Subscription.xcodeproj")
        );
        assert_eq!(found.target_project, root.join("pd-mob-b2c-ios/Volo.xcodeproj"));
    }

    #[test]
    fn test_locate_from_target() {
        let (_temp, root) = checkout();
        let found = ProjectLocator::new()
            .locate(&root.join("pd-mob-b2c-ios"), &FrameworkMapping::subscription())
            .unwrap();

        assert_eq!(found.base_path, root);
        assert_eq!(found.target_project, root.join("pd-mob-b2c-ios/Volo.xcodeproj"));
    }

    #[test]
    fn test_locate_missing_source() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("pd-mob-b2c-ios/Volo.xcodeproj")).unwrap();

        let err = ProjectLocator::new()
            .locate(temp.path(), &FrameworkMapping::subscription())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("pd-mob-subscription-ios"));
        assert!(message.contains("Inside the pd-mob-b2c-ios repository"));
    }
}
