//! Graph mutator: structural edits on an [`ObjectGraph`] that keep every edge
//! resolvable.
//!
//! All operations are safe to re-run. A lookup that finds nothing (reference
//! already removed, already added, already swapped) is a silent no-op rather
//! than an error. None of them touch the disk; [`ProjectModifier`] pairs a
//! graph with the store it came from.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    graph::{
        FileReference, GraphError, GraphStore, JsonGraphStore, Node, ObjectGraph, ObjectId, Portal,
    },
    mapping::FrameworkRemapping,
};

mod swap;
mod token;

pub use token::ReversalToken;

/// Which side of a remapping to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapDirection {
    /// Point at the linked (debug) location
    ToLinked,
    /// Point back at the original location
    ToOriginal,
}

/// What a cascading nested-project removal deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub file_reference: Option<ObjectId>,
    pub container_proxies: Vec<ObjectId>,
    pub target_dependencies: Vec<ObjectId>,
    pub reference_proxies: Vec<ObjectId>,
    /// Build files that linked or embedded a nested product
    pub product_build_files: Vec<ObjectId>,
    pub product_groups: Vec<ObjectId>,
}

impl CascadeReport {
    /// Number of nodes deleted
    pub fn removed(&self) -> usize {
        usize::from(self.file_reference.is_some())
            + self.container_proxies.len()
            + self.target_dependencies.len()
            + self.reference_proxies.len()
            + self.product_build_files.len()
            + self.product_groups.len()
    }
}

impl ObjectGraph {
    /// Rewrite the path of every file reference matching a remapping's
    /// framework name (by display name or path suffix). Returns how many
    /// references were rewritten.
    pub fn remap_paths(
        &mut self,
        remappings: &[FrameworkRemapping],
        direction: RemapDirection,
    ) -> usize {
        let mut rewritten = 0;
        for remapping in remappings {
            let new_path = match direction {
                RemapDirection::ToLinked => &remapping.linked_path,
                RemapDirection::ToOriginal => &remapping.original_path,
            };

            for id in self.find_framework_references(&remapping.framework_name) {
                if let Some(reference) = self.file_reference_mut(&id) {
                    if reference.path.as_deref() != Some(new_path.as_str()) {
                        debug!(%id, framework = %remapping.framework_name, path = %new_path, "remapped framework path");
                        reference.path = Some(new_path.clone());
                    }
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    /// Reference a nested project by relative path, appending it to the main
    /// group. Returns the existing id when the path is already referenced.
    pub fn add_nested_project_reference(&mut self, relative_path: &str) -> ObjectId {
        if let Some(existing) = self.find_file_reference_by_path(relative_path) {
            debug!(%existing, path = relative_path, "nested project already referenced");
            return existing;
        }

        let id = self.insert(Node::FileReference(FileReference::nested_project(
            relative_path,
        )));
        let main_group = self.main_group_id();
        self.add_to_group(&main_group, id.clone());
        debug!(%id, path = relative_path, "added nested project reference");
        id
    }

    /// Remove the nested project at `relative_path` together with every node
    /// that only exists because of it.
    ///
    /// Proxies pointing at the reference go first, then the dependencies and
    /// reference proxies built on those proxies (each detached from its
    /// owning list before deletion, reference proxies with the build files
    /// wrapping them), then the project's `projectReferences`
    /// entry and its product group, and finally the reference itself.
    /// Returns `None` when nothing references that path.
    pub fn remove_nested_project_reference(&mut self, relative_path: &str) -> Option<CascadeReport> {
        let file_ref = self.find_file_reference_by_path(relative_path)?;
        let mut report = CascadeReport::default();

        // (a) container item proxies whose portal is the nested project
        report.container_proxies = self
            .container_item_proxies()
            .filter(|(_, proxy)| matches!(self.portal(proxy), Portal::FileReference(ref id) if *id == file_ref))
            .map(|(id, _)| id.clone())
            .collect();
        for proxy in &report.container_proxies {
            self.remove(proxy);
        }

        // (b) target dependencies built on those proxies
        let proxies = &report.container_proxies;
        report.target_dependencies = self
            .target_dependencies()
            .filter(|(_, dep)| dep.target_proxy.as_ref().is_some_and(|p| proxies.contains(p)))
            .map(|(id, _)| id.clone())
            .collect();
        if !report.target_dependencies.is_empty() {
            let doomed = report.target_dependencies.clone();
            let target_ids: Vec<ObjectId> = self.targets().map(|(id, _)| id.clone()).collect();
            for target_id in target_ids {
                if let Some(target) = self.target_mut(&target_id) {
                    target.dependencies.retain(|dep| !doomed.contains(dep));
                }
            }
            for dependency in &doomed {
                self.remove(dependency);
            }
        }

        // (c) products exposed through those proxies
        let proxies = &report.container_proxies;
        report.reference_proxies = self
            .reference_proxies()
            .filter(|(_, rp)| rp.remote_ref.as_ref().is_some_and(|r| proxies.contains(r)))
            .map(|(id, _)| id.clone())
            .collect();
        for reference_proxy in report.reference_proxies.clone() {
            let build_files = self.remove_file_reference_with_build_files(&reference_proxy);
            report.product_build_files.extend(build_files);
        }

        // (c') projectReferences entries and their now-empty product groups
        let product_groups: Vec<ObjectId> = self
            .project()
            .project_references
            .iter()
            .filter(|entry| entry.project_ref == file_ref)
            .map(|entry| entry.product_group.clone())
            .collect();
        self.project_mut()
            .project_references
            .retain(|entry| entry.project_ref != file_ref);
        for group in product_groups {
            let empty = self.group(&group).is_some_and(|g| g.children.is_empty());
            if empty && !self.is_referenced(&group) {
                self.detach_from_groups(&group);
                self.remove(&group);
                report.product_groups.push(group);
            }
        }

        // (d) group membership, (e) the reference itself
        self.detach_from_groups(&file_ref);
        self.remove(&file_ref);
        report.file_reference = Some(file_ref.clone());

        debug!(
            %file_ref,
            path = relative_path,
            removed = report.removed(),
            "removed nested project reference"
        );
        Some(report)
    }

    /// Delete a file reference and every build file wrapping it, detaching
    /// each from its groups and build phases first. Returns the removed build
    /// file ids.
    pub(crate) fn remove_file_reference_with_build_files(
        &mut self,
        file_ref: &ObjectId,
    ) -> Vec<ObjectId> {
        self.detach_from_groups(file_ref);

        let build_files = self.build_files_referencing(file_ref);
        for build_file in &build_files {
            self.detach_from_build_phases(build_file);
            self.remove(build_file);
        }
        self.remove(file_ref);
        build_files
    }
}

/// A project graph opened from disk, paired with the store that saves it
pub struct ProjectModifier<S: GraphStore = JsonGraphStore> {
    store: S,
    project_path: PathBuf,
    graph: ObjectGraph,
}

impl ProjectModifier<JsonGraphStore> {
    /// Open a project bundle with the JSON store
    pub fn open_json(project_path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        Self::open(JsonGraphStore::new(), project_path)
    }
}

impl<S: GraphStore> ProjectModifier<S> {
    /// Load the graph of the project bundle at `project_path`
    pub fn open(store: S, project_path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        let project_path = project_path.into();
        let graph = store.load(&project_path)?;
        Ok(Self {
            store,
            project_path,
            graph,
        })
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ObjectGraph {
        &mut self.graph
    }

    /// Validate and write the graph back. A graph with dangling ids is never
    /// written.
    pub fn save(&self) -> Result<(), GraphError> {
        self.graph.validate()?;
        self.store.save(&self.graph, &self.project_path)
    }
}
