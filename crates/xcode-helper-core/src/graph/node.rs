//! Typed node kinds of the project object graph.
//!
//! Every node keeps the fields it does not model in `extra`, so a load/save
//! cycle never drops information the mutator did not touch.

use serde_json::{Map, Value};

use super::ObjectId;

/// Unmodelled fields of a node, in file order
pub type Fields = Map<String, Value>;

/// `lastKnownFileType` of a nested Xcode project
pub const NESTED_PROJECT_FILE_TYPE: &str = "wrapper.pb-project";
/// `lastKnownFileType` of a prebuilt xcframework
pub const XCFRAMEWORK_FILE_TYPE: &str = "wrapper.xcframework";
/// `lastKnownFileType` of a framework bundle
pub const FRAMEWORK_FILE_TYPE: &str = "wrapper.framework";
/// Product type tag of an application target
pub const APPLICATION_PRODUCT_TYPE: &str = "com.apple.product-type.application";

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    FileReference,
    BuildFile,
    BuildPhase,
    Group,
    Target,
    TargetDependency,
    ContainerItemProxy,
    ReferenceProxy,
    Project,
    Other,
}

/// A node of the project object graph
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    FileReference(FileReference),
    BuildFile(BuildFile),
    BuildPhase(BuildPhase),
    Group(Group),
    Target(Target),
    TargetDependency(TargetDependency),
    ContainerItemProxy(ContainerItemProxy),
    ReferenceProxy(ReferenceProxy),
    Project(Project),
    Other(OtherNode),
}

/// An id-valued edge leaving a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    /// Field holding the id
    pub field: &'static str,
    /// Referenced id
    pub target: &'a ObjectId,
    /// Kinds the target may have
    pub accepts: &'static [NodeKind],
}

const FILE_LIKE: &[NodeKind] = &[
    NodeKind::FileReference,
    NodeKind::Group,
    NodeKind::ReferenceProxy,
    NodeKind::Other,
];

impl Node {
    /// Kind discriminant
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::FileReference(_) => NodeKind::FileReference,
            Node::BuildFile(_) => NodeKind::BuildFile,
            Node::BuildPhase(_) => NodeKind::BuildPhase,
            Node::Group(_) => NodeKind::Group,
            Node::Target(_) => NodeKind::Target,
            Node::TargetDependency(_) => NodeKind::TargetDependency,
            Node::ContainerItemProxy(_) => NodeKind::ContainerItemProxy,
            Node::ReferenceProxy(_) => NodeKind::ReferenceProxy,
            Node::Project(_) => NodeKind::Project,
            Node::Other(_) => NodeKind::Other,
        }
    }

    /// The `isa` tag this node is written with
    pub fn isa(&self) -> &str {
        match self {
            Node::FileReference(_) => "PBXFileReference",
            Node::BuildFile(_) => "PBXBuildFile",
            Node::BuildPhase(phase) => phase.kind.isa(),
            Node::Group(group) => group.kind.isa(),
            Node::Target(target) => target.kind.isa(),
            Node::TargetDependency(_) => "PBXTargetDependency",
            Node::ContainerItemProxy(_) => "PBXContainerItemProxy",
            Node::ReferenceProxy(_) => "PBXReferenceProxy",
            Node::Project(_) => "PBXProject",
            Node::Other(other) => &other.isa,
        }
    }

    /// Every modelled id-valued edge leaving this node
    pub fn edges(&self) -> Vec<Edge<'_>> {
        fn many<'a>(
            field: &'static str,
            ids: &'a [ObjectId],
            accepts: &'static [NodeKind],
        ) -> impl Iterator<Item = Edge<'a>> {
            ids.iter().map(move |target| Edge {
                field,
                target,
                accepts,
            })
        }

        let mut edges = Vec::new();
        match self {
            Node::FileReference(_) | Node::Other(_) => {}
            Node::BuildFile(build_file) => {
                if let Some(target) = &build_file.file_ref {
                    edges.push(Edge {
                        field: "fileRef",
                        target,
                        accepts: FILE_LIKE,
                    });
                }
            }
            Node::BuildPhase(phase) => {
                edges.extend(many("files", &phase.files, &[NodeKind::BuildFile]));
            }
            Node::Group(group) => {
                edges.extend(many("children", &group.children, FILE_LIKE));
            }
            Node::Target(target) => {
                edges.extend(many(
                    "buildPhases",
                    &target.build_phases,
                    &[NodeKind::BuildPhase],
                ));
                edges.extend(many(
                    "dependencies",
                    &target.dependencies,
                    &[NodeKind::TargetDependency],
                ));
            }
            Node::TargetDependency(dependency) => {
                if let Some(target) = &dependency.target {
                    edges.push(Edge {
                        field: "target",
                        target,
                        accepts: &[NodeKind::Target],
                    });
                }
                if let Some(target) = &dependency.target_proxy {
                    edges.push(Edge {
                        field: "targetProxy",
                        target,
                        accepts: &[NodeKind::ContainerItemProxy],
                    });
                }
            }
            Node::ContainerItemProxy(proxy) => edges.push(Edge {
                field: "containerPortal",
                target: &proxy.container_portal,
                accepts: &[NodeKind::FileReference, NodeKind::Project],
            }),
            Node::ReferenceProxy(proxy) => {
                if let Some(target) = &proxy.remote_ref {
                    edges.push(Edge {
                        field: "remoteRef",
                        target,
                        accepts: &[NodeKind::ContainerItemProxy],
                    });
                }
            }
            Node::Project(project) => {
                edges.push(Edge {
                    field: "mainGroup",
                    target: &project.main_group,
                    accepts: &[NodeKind::Group],
                });
                if let Some(target) = &project.product_ref_group {
                    edges.push(Edge {
                        field: "productRefGroup",
                        target,
                        accepts: &[NodeKind::Group],
                    });
                }
                edges.extend(many("targets", &project.targets, &[NodeKind::Target]));
                for entry in &project.project_references {
                    edges.push(Edge {
                        field: "projectReferences.ProductGroup",
                        target: &entry.product_group,
                        accepts: &[NodeKind::Group],
                    });
                    edges.push(Edge {
                        field: "projectReferences.ProjectRef",
                        target: &entry.project_ref,
                        accepts: &[NodeKind::FileReference],
                    });
                }
            }
        }
        edges
    }
}

/// `sourceTree` of a file or group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTree {
    Group,
    SourceRoot,
    BuildProductsDir,
    Absolute,
    SdkRoot,
    DeveloperDir,
    Other(String),
}

impl SourceTree {
    pub fn as_str(&self) -> &str {
        match self {
            SourceTree::Group => "<group>",
            SourceTree::SourceRoot => "SOURCE_ROOT",
            SourceTree::BuildProductsDir => "BUILT_PRODUCTS_DIR",
            SourceTree::Absolute => "<absolute>",
            SourceTree::SdkRoot => "SDKROOT",
            SourceTree::DeveloperDir => "DEVELOPER_DIR",
            SourceTree::Other(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "<group>" => SourceTree::Group,
            "SOURCE_ROOT" => SourceTree::SourceRoot,
            "BUILT_PRODUCTS_DIR" => SourceTree::BuildProductsDir,
            "<absolute>" => SourceTree::Absolute,
            "SDKROOT" => SourceTree::SdkRoot,
            "DEVELOPER_DIR" => SourceTree::DeveloperDir,
            other => SourceTree::Other(other.to_string()),
        }
    }
}

/// `PBXFileReference`
#[derive(Debug, Clone, PartialEq)]
pub struct FileReference {
    pub name: Option<String>,
    pub path: Option<String>,
    pub source_tree: Option<SourceTree>,
    pub last_known_file_type: Option<String>,
    pub explicit_file_type: Option<String>,
    pub extra: Fields,
}

impl FileReference {
    /// Reference to another `.xcodeproj`, named after its last path segment
    pub fn nested_project(relative_path: &str) -> Self {
        Self {
            name: Some(last_segment(relative_path).to_string()),
            path: Some(relative_path.to_string()),
            source_tree: Some(SourceTree::SourceRoot),
            last_known_file_type: Some(NESTED_PROJECT_FILE_TYPE.to_string()),
            explicit_file_type: None,
            extra: Fields::new(),
        }
    }

    /// `<product>.framework` built by a nested project
    pub fn built_product(product_file_name: &str) -> Self {
        Self {
            name: Some(product_file_name.to_string()),
            path: Some(product_file_name.to_string()),
            source_tree: Some(SourceTree::BuildProductsDir),
            last_known_file_type: Some(FRAMEWORK_FILE_TYPE.to_string()),
            explicit_file_type: None,
            extra: Fields::new(),
        }
    }

    /// Prebuilt xcframework referenced relative to its group
    pub fn packaged_framework(name: &str, path: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            path: Some(path.to_string()),
            source_tree: Some(SourceTree::Group),
            last_known_file_type: Some(XCFRAMEWORK_FILE_TYPE.to_string()),
            explicit_file_type: None,
            extra: Fields::new(),
        }
    }

    /// Display name: the explicit name, else the last path segment
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.path.as_deref().map(last_segment))
    }

    /// Name equals `framework_name`, or path ends with it
    pub fn matches_framework(&self, framework_name: &str) -> bool {
        self.name.as_deref() == Some(framework_name)
            || self
                .path
                .as_deref()
                .is_some_and(|path| path.ends_with(framework_name))
    }

    pub fn is_nested_project(&self) -> bool {
        self.last_known_file_type.as_deref() == Some(NESTED_PROJECT_FILE_TYPE)
            || self.explicit_file_type.as_deref() == Some(NESTED_PROJECT_FILE_TYPE)
    }
}

/// Last `/`-separated segment of a relative path
pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// `PBXBuildFile`
#[derive(Debug, Clone, PartialEq)]
pub struct BuildFile {
    pub file_ref: Option<ObjectId>,
    pub extra: Fields,
}

impl BuildFile {
    pub fn wrapping(file_ref: ObjectId) -> Self {
        Self {
            file_ref: Some(file_ref),
            extra: Fields::new(),
        }
    }
}

/// Build phase variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhaseKind {
    Frameworks,
    CopyFiles,
    Sources,
    Resources,
    Headers,
    ShellScript,
}

impl BuildPhaseKind {
    pub fn isa(&self) -> &'static str {
        match self {
            BuildPhaseKind::Frameworks => "PBXFrameworksBuildPhase",
            BuildPhaseKind::CopyFiles => "PBXCopyFilesBuildPhase",
            BuildPhaseKind::Sources => "PBXSourcesBuildPhase",
            BuildPhaseKind::Resources => "PBXResourcesBuildPhase",
            BuildPhaseKind::Headers => "PBXHeadersBuildPhase",
            BuildPhaseKind::ShellScript => "PBXShellScriptBuildPhase",
        }
    }

    pub fn from_isa(isa: &str) -> Option<Self> {
        Some(match isa {
            "PBXFrameworksBuildPhase" => BuildPhaseKind::Frameworks,
            "PBXCopyFilesBuildPhase" => BuildPhaseKind::CopyFiles,
            "PBXSourcesBuildPhase" => BuildPhaseKind::Sources,
            "PBXResourcesBuildPhase" => BuildPhaseKind::Resources,
            "PBXHeadersBuildPhase" => BuildPhaseKind::Headers,
            "PBXShellScriptBuildPhase" => BuildPhaseKind::ShellScript,
            _ => return None,
        })
    }
}

/// Any `PBX*BuildPhase`
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPhase {
    pub kind: BuildPhaseKind,
    pub files: Vec<ObjectId>,
    pub extra: Fields,
}

impl BuildPhase {
    pub fn new(kind: BuildPhaseKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
            extra: Fields::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Group,
    VariantGroup,
}

impl GroupKind {
    pub fn isa(&self) -> &'static str {
        match self {
            GroupKind::Group => "PBXGroup",
            GroupKind::VariantGroup => "PBXVariantGroup",
        }
    }
}

/// `PBXGroup` / `PBXVariantGroup`
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub name: Option<String>,
    pub path: Option<String>,
    pub children: Vec<ObjectId>,
    pub extra: Fields,
}

impl Group {
    pub fn named(name: &str) -> Self {
        Self {
            kind: GroupKind::Group,
            name: Some(name.to_string()),
            path: None,
            children: Vec::new(),
            extra: Fields::new(),
        }
    }

    /// Anonymous group, the shape Xcode gives the main group
    pub fn anonymous() -> Self {
        Self {
            kind: GroupKind::Group,
            name: None,
            path: None,
            children: Vec::new(),
            extra: Fields::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Native,
    Aggregate,
    Legacy,
}

impl TargetKind {
    pub fn isa(&self) -> &'static str {
        match self {
            TargetKind::Native => "PBXNativeTarget",
            TargetKind::Aggregate => "PBXAggregateTarget",
            TargetKind::Legacy => "PBXLegacyTarget",
        }
    }
}

/// `PBXNativeTarget` and friends
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    pub name: Option<String>,
    pub build_phases: Vec<ObjectId>,
    pub dependencies: Vec<ObjectId>,
    pub product_type: Option<String>,
    pub extra: Fields,
}

impl Target {
    pub fn application(name: &str) -> Self {
        Self {
            kind: TargetKind::Native,
            name: Some(name.to_string()),
            build_phases: Vec::new(),
            dependencies: Vec::new(),
            product_type: Some(APPLICATION_PRODUCT_TYPE.to_string()),
            extra: Fields::new(),
        }
    }

    pub fn is_application(&self) -> bool {
        self.product_type.as_deref() == Some(APPLICATION_PRODUCT_TYPE)
    }
}

/// `PBXTargetDependency`
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDependency {
    pub target: Option<ObjectId>,
    pub target_proxy: Option<ObjectId>,
    pub extra: Fields,
}

/// `PBXContainerItemProxy`
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerItemProxy {
    pub container_portal: ObjectId,
    pub proxy_type: Option<String>,
    pub remote_global_id: Option<String>,
    pub remote_info: Option<String>,
    pub extra: Fields,
}

/// `PBXReferenceProxy`
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProxy {
    pub remote_ref: Option<ObjectId>,
    pub path: Option<String>,
    pub file_type: Option<String>,
    pub extra: Fields,
}

/// One `projectReferences` entry of the root project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReferenceEntry {
    pub product_group: ObjectId,
    pub project_ref: ObjectId,
}

/// `PBXProject`, the graph root
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub main_group: ObjectId,
    pub product_ref_group: Option<ObjectId>,
    pub targets: Vec<ObjectId>,
    pub project_references: Vec<ProjectReferenceEntry>,
    pub extra: Fields,
}

impl Project {
    pub fn new(main_group: ObjectId) -> Self {
        Self {
            main_group,
            product_ref_group: None,
            targets: Vec::new(),
            project_references: Vec::new(),
            extra: Fields::new(),
        }
    }
}

/// Node kinds the mutator never inspects, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct OtherNode {
    pub isa: String,
    pub fields: Fields,
}
