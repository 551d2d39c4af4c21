use std::{fmt, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::ErrorKind;

pub mod codec;
pub mod node;
pub mod store;

pub use node::{
    BuildFile, BuildPhase, BuildPhaseKind, ContainerItemProxy, Edge, FileReference, Group,
    GroupKind, Node, NodeKind, OtherNode, Project, ProjectReferenceEntry, ReferenceProxy,
    SourceTree, Target, TargetDependency, TargetKind,
};
pub use store::{project_file, GraphStore, JsonGraphStore, PROJECT_FILE_NAME};

/// Project graph errors
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Reading or writing the project file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project file is not a well-formed object graph
    #[error("Failed to parse project file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The in-memory graph could not be encoded
    #[error("Failed to serialize project graph: {0}")]
    Serialize(#[source] serde_json::Error),

    /// An edge points at a missing node or a node of the wrong kind
    #[error(
        "Object {owner} references {target} through `{field}`, which is missing or of the wrong kind. \
         Restore the project from a backup or version control."
    )]
    DanglingReference {
        owner: ObjectId,
        field: &'static str,
        target: ObjectId,
    },

    /// The root object is absent or not a project
    #[error("Project graph root {0} is missing or is not a PBXProject")]
    MissingRoot(ObjectId),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Io { .. } | GraphError::Serialize(_) => ErrorKind::Io,
            GraphError::Parse { .. }
            | GraphError::DanglingReference { .. }
            | GraphError::MissingRoot(_) => ErrorKind::Corruption,
        }
    }
}

/// Opaque object identifier.
///
/// Ids read from disk are kept as-is; fresh ids follow the project-file
/// convention of 24 upper-case hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Random 96-bit id rendered as 24 hex digits
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let hex: String = bytes[..12].iter().map(|b| format!("{b:02X}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// What a container item proxy points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Portal {
    /// A nested project's file reference
    FileReference(ObjectId),
    /// The owning project itself
    Project(ObjectId),
    /// Missing, or a kind that cannot be a portal
    Unknown(ObjectId),
}

/// The project object graph: a flat arena of nodes keyed by id plus the root.
///
/// Edges are ids, never owning references, so cycles (group ↔ child, target
/// ↔ dependency ↔ proxy ↔ portal) need no special handling and deletion is
/// arena removal plus index-list fix-up.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGraph {
    header: Map<String, Value>,
    objects: IndexMap<ObjectId, Node>,
    root: ObjectId,
}

macro_rules! typed_access {
    ($iter:ident, $get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        pub fn $iter(&self) -> impl Iterator<Item = (&ObjectId, &$ty)> + '_ {
            self.objects.iter().filter_map(|(id, node)| match node {
                Node::$variant(inner) => Some((id, inner)),
                _ => None,
            })
        }

        pub fn $get(&self, id: &ObjectId) -> Option<&$ty> {
            match self.objects.get(id) {
                Some(Node::$variant(inner)) => Some(inner),
                _ => None,
            }
        }

        pub fn $get_mut(&mut self, id: &ObjectId) -> Option<&mut $ty> {
            match self.objects.get_mut(id) {
                Some(Node::$variant(inner)) => Some(inner),
                _ => None,
            }
        }
    };
}

impl ObjectGraph {
    /// Minimal project: a root `PBXProject` owning an empty main group
    pub fn new_project() -> Self {
        let main_group = ObjectId::generate();
        let mut root = ObjectId::generate();
        while root == main_group {
            root = ObjectId::generate();
        }

        let mut header = Map::new();
        header.insert("archiveVersion".to_string(), Value::from("1"));
        header.insert("classes".to_string(), Value::Object(Map::new()));
        header.insert("objectVersion".to_string(), Value::from("56"));

        let mut objects = IndexMap::new();
        objects.insert(main_group.clone(), Node::Group(Group::anonymous()));
        objects.insert(root.clone(), Node::Project(Project::new(main_group)));

        Self {
            header,
            objects,
            root,
        }
    }

    /// Assemble a graph from decoded parts; the root must be a project
    pub fn from_parts(
        header: Map<String, Value>,
        objects: IndexMap<ObjectId, Node>,
        root: ObjectId,
    ) -> Result<Self, GraphError> {
        match objects.get(&root) {
            Some(Node::Project(_)) => Ok(Self {
                header,
                objects,
                root,
            }),
            _ => Err(GraphError::MissingRoot(root)),
        }
    }

    /// Top-level fields other than `objects` and `rootObject`
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn root_id(&self) -> &ObjectId {
        &self.root
    }

    pub fn project(&self) -> &Project {
        match self.objects.get(&self.root) {
            Some(Node::Project(project)) => project,
            // from_parts/new_project guarantee the root, and remove() refuses it
            _ => unreachable!("graph root is always a project"),
        }
    }

    pub fn project_mut(&mut self) -> &mut Project {
        match self.objects.get_mut(&self.root) {
            Some(Node::Project(project)) => project,
            _ => unreachable!("graph root is always a project"),
        }
    }

    pub fn main_group_id(&self) -> ObjectId {
        self.project().main_group.clone()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Node> {
        self.objects.get(id)
    }

    /// Mutable access to any node but the root; use [`Self::project_mut`]
    /// for the root so it stays a project.
    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut Node> {
        if *id == self.root {
            return None;
        }
        self.objects.get_mut(id)
    }

    /// Nodes in file order
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Node)> + '_ {
        self.objects.iter()
    }

    /// An id not yet used in this graph
    pub fn fresh_id(&self) -> ObjectId {
        loop {
            let id = ObjectId::generate();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Insert under a fresh id
    pub fn insert(&mut self, node: Node) -> ObjectId {
        let id = self.fresh_id();
        self.objects.insert(id.clone(), node);
        id
    }

    /// Insert under `preferred` when it is free, otherwise under a fresh id
    pub fn insert_preferring(&mut self, preferred: Option<&ObjectId>, node: Node) -> ObjectId {
        match preferred {
            Some(id) if !self.contains(id) => {
                self.objects.insert(id.clone(), node);
                id.clone()
            }
            _ => self.insert(node),
        }
    }

    /// Remove a node from the arena. Incoming edges are the caller's job.
    /// The root project cannot be removed.
    pub fn remove(&mut self, id: &ObjectId) -> Option<Node> {
        if *id == self.root {
            return None;
        }
        self.objects.shift_remove(id)
    }

    typed_access!(file_references, file_reference, file_reference_mut, FileReference, FileReference);
    typed_access!(build_files, build_file, build_file_mut, BuildFile, BuildFile);
    typed_access!(build_phases, build_phase, build_phase_mut, BuildPhase, BuildPhase);
    typed_access!(groups, group, group_mut, Group, Group);
    typed_access!(targets, target, target_mut, Target, Target);
    typed_access!(
        target_dependencies,
        target_dependency,
        target_dependency_mut,
        TargetDependency,
        TargetDependency
    );
    typed_access!(
        container_item_proxies,
        container_item_proxy,
        container_item_proxy_mut,
        ContainerItemProxy,
        ContainerItemProxy
    );
    typed_access!(
        reference_proxies,
        reference_proxy,
        reference_proxy_mut,
        ReferenceProxy,
        ReferenceProxy
    );

    /// File reference whose path is exactly `path`
    pub fn find_file_reference_by_path(&self, path: &str) -> Option<ObjectId> {
        self.file_references()
            .find(|(_, reference)| reference.path.as_deref() == Some(path))
            .map(|(id, _)| id.clone())
    }

    /// File references matched by name or path suffix, in file order
    pub fn find_framework_references(&self, framework_name: &str) -> Vec<ObjectId> {
        self.file_references()
            .filter(|(_, reference)| reference.matches_framework(framework_name))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Build-products references named (or pathed) exactly `product_file`.
    /// SDK frameworks sharing a suffix, like `UIKit.framework` for
    /// `Kit.framework`, never match.
    pub fn find_built_product_references(&self, product_file: &str) -> Vec<ObjectId> {
        self.file_references()
            .filter(|(_, reference)| {
                reference.source_tree == Some(SourceTree::BuildProductsDir)
                    && (reference.name.as_deref() == Some(product_file)
                        || reference.path.as_deref() == Some(product_file))
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// First group whose name is `name`
    pub fn find_group_named(&self, name: &str) -> Option<ObjectId> {
        self.groups()
            .find(|(_, group)| group.name.as_deref() == Some(name))
            .map(|(id, _)| id.clone())
    }

    /// The `Frameworks` group, or the main group when there is none
    pub fn frameworks_group_or_main(&self) -> ObjectId {
        self.find_group_named("Frameworks")
            .unwrap_or_else(|| self.main_group_id())
    }

    /// Groups listing `child`, in file order
    pub fn groups_containing(&self, child: &ObjectId) -> Vec<ObjectId> {
        self.groups()
            .filter(|(_, group)| group.children.contains(child))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Build files whose `fileRef` is `file_ref`
    pub fn build_files_referencing(&self, file_ref: &ObjectId) -> Vec<ObjectId> {
        self.build_files()
            .filter(|(_, build_file)| build_file.file_ref.as_ref() == Some(file_ref))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop `child` from every group's children; returns how many lists changed
    pub fn detach_from_groups(&mut self, child: &ObjectId) -> usize {
        let mut detached = 0;
        for node in self.objects.values_mut() {
            if let Node::Group(group) = node {
                let before = group.children.len();
                group.children.retain(|id| id != child);
                if group.children.len() != before {
                    detached += 1;
                }
            }
        }
        detached
    }

    /// Drop `build_file` from every build phase; returns how many lists changed
    pub fn detach_from_build_phases(&mut self, build_file: &ObjectId) -> usize {
        let mut detached = 0;
        for node in self.objects.values_mut() {
            if let Node::BuildPhase(phase) = node {
                let before = phase.files.len();
                phase.files.retain(|id| id != build_file);
                if phase.files.len() != before {
                    detached += 1;
                }
            }
        }
        detached
    }

    /// Append `child` to `group` unless already listed
    pub fn add_to_group(&mut self, group: &ObjectId, child: ObjectId) -> bool {
        match self.group_mut(group) {
            Some(group) if !group.children.contains(&child) => {
                group.children.push(child);
                true
            }
            _ => false,
        }
    }

    /// Insert `child` into `group` at `index` (clamped to the end) unless
    /// already listed
    pub fn add_to_group_at(&mut self, group: &ObjectId, child: ObjectId, index: usize) -> bool {
        match self.group_mut(group) {
            Some(group) if !group.children.contains(&child) => {
                let index = index.min(group.children.len());
                group.children.insert(index, child);
                true
            }
            _ => false,
        }
    }

    /// Resolve the portal of a container item proxy
    pub fn portal(&self, proxy: &ContainerItemProxy) -> Portal {
        let id = proxy.container_portal.clone();
        match self.get(&id) {
            Some(Node::FileReference(_)) => Portal::FileReference(id),
            Some(Node::Project(_)) => Portal::Project(id),
            _ => Portal::Unknown(id),
        }
    }

    /// First application target, in the project's target order
    pub fn first_application_target(&self) -> Option<ObjectId> {
        let ordered = self.project().targets.iter().find(|id| {
            self.target(id).is_some_and(Target::is_application)
        });
        ordered.cloned().or_else(|| {
            self.targets()
                .find(|(_, target)| target.is_application())
                .map(|(id, _)| id.clone())
        })
    }

    /// First build phase of `kind` owned by `target`
    pub fn first_phase_of_kind(&self, target: &ObjectId, kind: BuildPhaseKind) -> Option<ObjectId> {
        self.target(target)?
            .build_phases
            .iter()
            .find(|id| self.build_phase(id).is_some_and(|phase| phase.kind == kind))
            .cloned()
    }

    /// Frameworks phase of the first application target
    pub fn main_frameworks_phase(&self) -> Option<ObjectId> {
        let target = self.first_application_target()?;
        self.first_phase_of_kind(&target, BuildPhaseKind::Frameworks)
    }

    /// Check that every modelled edge resolves to a node of an accepted kind
    pub fn validate(&self) -> Result<(), GraphError> {
        for (owner, node) in &self.objects {
            for edge in node.edges() {
                let resolved = self.objects.get(edge.target).map(Node::kind);
                let accepted = resolved.is_some_and(|kind| edge.accepts.contains(&kind));
                if !accepted {
                    return Err(GraphError::DanglingReference {
                        owner: owner.clone(),
                        field: edge.field,
                        target: edge.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether any modelled edge still names `id`
    pub fn is_referenced(&self, id: &ObjectId) -> bool {
        self.objects
            .values()
            .any(|node| node.edges().iter().any(|edge| edge.target == id))
    }
}
