//! Framework mappings: which project is debugged, which consumes it, and the
//! path edits that link one into the other.

use std::{collections::BTreeMap, fs, io::ErrorKind as IoErrorKind};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{LinkConfig, LinkError, Result};

/// A repository holding one of the two projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    /// Repository name
    pub name: String,
    /// `.xcodeproj` path inside the repository
    pub project_path: String,
    /// Directory name the repository is checked out under
    pub expected_directory: String,
}

/// One framework path that differs between packaged and linked builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkRemapping {
    pub framework_name: String,
    /// Path relative to the source project when not linked
    pub original_path: String,
    /// Path relative to the source project while linked
    pub linked_path: String,
}

/// The packaged framework in the target project that gets swapped for the
/// source project itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFrameworkInfo {
    /// e.g. `Subscription.xcframework`
    pub framework_name: String,
    /// Path of the xcframework relative to the target project
    pub framework_path: String,
    /// Source project path relative to the target project
    pub nested_project_path: String,
    /// Product built by the nested project, without extension
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkMapping {
    pub id: String,
    pub display_name: String,
    /// The framework being debugged
    pub source_project: ProjectReference,
    /// The app consuming it
    pub target_project: ProjectReference,
    #[serde(default)]
    pub framework_remappings: Vec<FrameworkRemapping>,
    #[serde(default)]
    pub nested_project_path: Option<String>,
    #[serde(default)]
    pub target_framework: Option<TargetFrameworkInfo>,
}

impl FrameworkMapping {
    /// Backup id used for the target project of this mapping
    pub fn target_backup_id(&self) -> String {
        format!("{}-target", self.id)
    }

    /// Whether enabling touches the target project at all
    pub fn modifies_target(&self) -> bool {
        self.target_framework.is_some() || self.nested_project_path.is_some()
    }

    /// `pd-mob-subscription-ios` linked into `pd-mob-b2c-ios`
    pub fn subscription() -> Self {
        const BUILD: &str = "Carthage/Build";
        const APOLLO: &str = "Carthage/Checkouts/apollo-ios-xcframework/xcframeworks";
        const NESTED: &str = "../pd-mob-subscription-ios/Subscription/Subscription.xcodeproj";

        let remap = |name: &str, dir: &str| FrameworkRemapping {
            framework_name: format!("{name}.xcframework"),
            original_path: format!("../{dir}/{name}.xcframework"),
            linked_path: format!("../../pd-mob-b2c-ios/{dir}/{name}.xcframework"),
        };

        Self {
            id: "subscription".to_string(),
            display_name: "pd-mob-subscription-ios".to_string(),
            source_project: ProjectReference {
                name: "pd-mob-subscription-ios".to_string(),
                project_path: "Subscription/Subscription.xcodeproj".to_string(),
                expected_directory: "pd-mob-subscription-ios".to_string(),
            },
            target_project: ProjectReference {
                name: "pd-mob-b2c-ios".to_string(),
                project_path: "Volo.xcodeproj".to_string(),
                expected_directory: "pd-mob-b2c-ios".to_string(),
            },
            framework_remappings: vec![
                remap("ApiClient", BUILD),
                remap("RxCocoa", BUILD),
                remap("RxRelay", BUILD),
                remap("RxSwift", BUILD),
                remap("SDWebImage", BUILD),
                remap("Bento", BUILD),
                remap("Lottie", BUILD),
                remap("UnifiedLogging", BUILD),
                remap("Apollo", APOLLO),
                remap("ApolloAPI", APOLLO),
            ],
            nested_project_path: Some(NESTED.to_string()),
            target_framework: Some(TargetFrameworkInfo {
                framework_name: "Subscription.xcframework".to_string(),
                framework_path: "Carthage/Build/Subscription.xcframework".to_string(),
                nested_project_path: NESTED.to_string(),
                product_name: "Subscription".to_string(),
            }),
        }
    }
}

/// Immutable table of mappings, built once at startup
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: BTreeMap<String, FrameworkMapping>,
}

impl MappingRegistry {
    /// Registry holding only the given mappings
    pub fn from_mappings(mappings: impl IntoIterator<Item = FrameworkMapping>) -> Self {
        Self {
            mappings: mappings.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    /// The mappings shipped with the tool
    pub fn builtin() -> Self {
        Self::from_mappings([FrameworkMapping::subscription()])
    }

    /// Built-in mappings extended by `<data dir>/mappings.json`, a JSON list
    /// of mappings. Entries replace built-ins with the same id.
    pub fn load(config: &LinkConfig) -> Result<Self> {
        let mut registry = Self::builtin();
        let path = config.mappings_file();

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                debug!(path = %path.display(), "no user mapping file");
                return Ok(registry);
            }
            Err(source) => return Err(LinkError::Io { path, source }),
        };

        let extra: Vec<FrameworkMapping> =
            serde_json::from_str(&text).map_err(|err| LinkError::MappingConfig {
                path: path.clone(),
                message: err.to_string(),
            })?;
        info!(path = %path.display(), count = extra.len(), "loaded user mappings");
        for mapping in extra {
            registry.mappings.insert(mapping.id.clone(), mapping);
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&FrameworkMapping> {
        self.mappings.get(id)
    }

    /// Look up `id`, failing with the list of known ids
    pub fn require(&self, id: &str) -> Result<&FrameworkMapping> {
        self.get(id).ok_or_else(|| LinkError::UnknownMapping {
            mapping: id.to_string(),
            available: self.available(),
        })
    }

    /// Known ids, sorted
    pub fn available(&self) -> Vec<String> {
        self.mappings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameworkMapping> {
        self.mappings.values()
    }
}
