//! Packaged ⇄ nested framework swap for a consuming project.

use tracing::{debug, warn};

use super::ReversalToken;
use crate::graph::{BuildFile, FileReference, Node, ObjectGraph, ObjectId};

/// `Sub.xcframework` → `Sub.framework`
fn product_file_for(framework_name: &str) -> String {
    let stem = framework_name
        .strip_suffix(".xcframework")
        .unwrap_or(framework_name);
    format!("{stem}.framework")
}

impl ObjectGraph {
    /// Replace the packaged framework `framework_name` with a reference to
    /// the nested project that builds it.
    ///
    /// Returns `None` when no packaged reference matches, which means the
    /// swap already happened; the nested reference and product link are
    /// still ensured so a half-finished earlier run converges.
    pub fn swap_packaged_for_nested(
        &mut self,
        framework_name: &str,
        framework_path: &str,
        nested_project_path: &str,
        product_name: &str,
    ) -> Option<ReversalToken> {
        let token = self.take_packaged_reference(framework_name, framework_path);

        self.add_nested_project_reference(nested_project_path);
        self.link_built_product(&format!("{product_name}.framework"));

        token
    }

    /// Inverse of [`Self::swap_packaged_for_nested`].
    ///
    /// With a token the packaged reference comes back with its original name,
    /// path, group and ids (where still free). Without one the caller's
    /// defaults and the `Frameworks` group are used instead.
    pub fn swap_nested_for_packaged(
        &mut self,
        nested_project_path: &str,
        framework_path: &str,
        framework_name: &str,
        token: Option<&ReversalToken>,
    ) {
        self.remove_nested_project_reference(nested_project_path);

        let product_file = product_file_for(framework_name);
        for product in self.find_built_product_references(&product_file) {
            let build_files = self.remove_file_reference_with_build_files(&product);
            debug!(%product, build_files = build_files.len(), "removed built product reference");
        }

        if let Some(existing) = self.find_framework_references(framework_name).first() {
            debug!(%existing, framework = framework_name, "packaged framework already referenced");
            return;
        }

        let (name, path) = match token {
            Some(token) => (token.original_name.as_str(), token.original_path.as_str()),
            None => {
                warn!(
                    framework = framework_name,
                    path = framework_path,
                    "no reversal token; restoring packaged framework with default placement"
                );
                (framework_name, framework_path)
            }
        };

        let file_ref = self.insert_preferring(
            token.map(|t| &t.file_reference_id),
            Node::FileReference(FileReference::packaged_framework(name, path)),
        );

        let original_group = token.and_then(|t| {
            t.group_id
                .clone()
                .filter(|id| self.group(id).is_some())
                .map(|id| (id, t.group_index))
        });
        let group = match original_group {
            Some((group, index)) => {
                self.add_to_group_at(&group, file_ref.clone(), index.unwrap_or(usize::MAX));
                group
            }
            None => {
                let group = self.frameworks_group_or_main();
                self.add_to_group(&group, file_ref.clone());
                group
            }
        };

        match self.main_frameworks_phase() {
            Some(phase) => {
                let build_file = self.insert_preferring(
                    token.and_then(|t| t.build_file_ids.first()),
                    Node::BuildFile(BuildFile::wrapping(file_ref.clone())),
                );
                let index = token.and_then(|t| t.build_file_index).unwrap_or(usize::MAX);
                if let Some(phase) = self.build_phase_mut(&phase) {
                    let index = index.min(phase.files.len());
                    phase.files.insert(index, build_file);
                }
            }
            None => warn!(
                framework = framework_name,
                "no application Frameworks phase; packaged framework is referenced but not linked"
            ),
        }

        debug!(%file_ref, %group, framework = name, "restored packaged framework");
    }

    /// Snapshot then delete the packaged reference and its build files
    fn take_packaged_reference(
        &mut self,
        framework_name: &str,
        framework_path: &str,
    ) -> Option<ReversalToken> {
        let file_ref = self
            .find_framework_references(framework_name)
            .into_iter()
            .find(|id| {
                self.file_reference(id)
                    .is_some_and(|reference| !reference.is_nested_project())
            })?;
        let reference = self.file_reference(&file_ref)?;

        let build_file_ids = self.build_files_referencing(&file_ref);
        let group_id = self.groups_containing(&file_ref).into_iter().next();
        let group_index = group_id
            .as_ref()
            .and_then(|id| self.group(id))
            .and_then(|group| group.children.iter().position(|child| *child == file_ref));
        let build_file_index = self
            .main_frameworks_phase()
            .and_then(|phase| self.build_phase(&phase))
            .and_then(|phase| {
                let first = build_file_ids.first()?;
                phase.files.iter().position(|id| id == first)
            });

        let token = ReversalToken {
            file_reference_id: file_ref.clone(),
            build_file_ids,
            group_id,
            group_index,
            build_file_index,
            original_path: reference
                .path
                .clone()
                .unwrap_or_else(|| framework_path.to_string()),
            original_name: reference
                .display_name()
                .unwrap_or(framework_name)
                .to_string(),
        };

        self.remove_file_reference_with_build_files(&file_ref);
        debug!(%file_ref, framework = framework_name, "removed packaged framework reference");
        Some(token)
    }

    /// Reference `<product>.framework` from the build products directory and
    /// link it into the main Frameworks phase, unless already there
    fn link_built_product(&mut self, product_file: &str) -> ObjectId {
        let existing = self.find_built_product_references(product_file).into_iter().next();
        let product = match existing {
            Some(id) => id,
            None => self.insert(Node::FileReference(FileReference::built_product(product_file))),
        };

        let group = self.frameworks_group_or_main();
        self.add_to_group(&group, product.clone());

        if !self.build_files_referencing(&product).is_empty() {
            return product;
        }
        match self.main_frameworks_phase() {
            Some(phase) => {
                let build_file = self.insert(Node::BuildFile(BuildFile::wrapping(product.clone())));
                if let Some(phase) = self.build_phase_mut(&phase) {
                    phase.files.push(build_file.clone());
                }
                debug!(%product, %build_file, "linked built product");
            }
            None => warn!(
                product = product_file,
                "no application Frameworks phase; built product is referenced but not linked"
            ),
        }
        product
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        graph::{Group, SourceTree},
        mutator::fixtures::{app_with_packaged_framework, wire_nested_project, PackagedApp},
    };

    const FRAMEWORK: &str = "Sub.xcframework";
    const FRAMEWORK_PATH: &str = "Carthage/Build/Sub.xcframework";
    const NESTED: &str = "../Sub/Sub.xcodeproj";

    #[test]
    fn test_product_file_name() {
        assert_eq!(product_file_for("Sub.xcframework"), "Sub.framework");
        assert_eq!(product_file_for("Plain"), "Plain.framework");
    }

    #[test]
    fn test_swap_links_nested_product() {
        let PackagedApp {
            mut graph,
            target,
            frameworks_phase,
            frameworks_group,
            packaged_ref,
            packaged_build_file,
        } = app_with_packaged_framework();

        let token = graph
            .swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub")
            .unwrap();

        assert_eq!(token.file_reference_id, packaged_ref);
        assert_eq!(token.build_file_ids, vec![packaged_build_file.clone()]);
        assert_eq!(token.group_id, Some(frameworks_group.clone()));
        assert_eq!(token.original_name, FRAMEWORK);
        assert_eq!(token.original_path, FRAMEWORK_PATH);

        assert!(!graph.contains(&packaged_ref));
        assert!(!graph.contains(&packaged_build_file));
        assert!(graph.find_framework_references(FRAMEWORK).is_empty());

        let nested = graph.find_file_reference_by_path(NESTED).unwrap();
        let main = graph.group(&graph.main_group_id()).unwrap();
        assert!(main.children.contains(&nested));
        assert_eq!(
            graph.file_reference(&nested).unwrap().name.as_deref(),
            Some("Sub.xcodeproj")
        );

        let phase = graph.build_phase(&frameworks_phase).unwrap();
        assert_eq!(phase.files.len(), 1);
        let linked = graph.build_file(&phase.files[0]).unwrap();
        let product_id = linked.file_ref.clone().unwrap();
        let product = graph.file_reference(&product_id).unwrap();
        assert_eq!(product.name.as_deref(), Some("Sub.framework"));
        assert_eq!(product.source_tree, Some(SourceTree::BuildProductsDir));
        assert!(graph
            .group(&frameworks_group)
            .unwrap()
            .children
            .contains(&product_id));

        assert!(graph.target(&target).is_some());
        graph.validate().unwrap();
    }

    #[test]
    fn test_swap_twice_returns_none_and_changes_nothing() {
        let PackagedApp { mut graph, .. } = app_with_packaged_framework();
        graph.swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub");
        let once = graph.clone();

        assert!(graph
            .swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub")
            .is_none());
        assert_eq!(graph, once);
    }

    #[test]
    fn test_swap_round_trip_with_token_is_exact() {
        let PackagedApp { mut graph, .. } = app_with_packaged_framework();
        let before = graph.clone();

        let token = graph.swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub");
        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, token.as_ref());

        graph.validate().unwrap();
        assert_eq!(graph, before);
    }

    /// Link an SDK framework from the `Frameworks` group and phase
    fn link_sdk_framework(
        graph: &mut ObjectGraph,
        group: &ObjectId,
        phase: &ObjectId,
        name: &str,
    ) -> ObjectId {
        let path = format!("System/Library/Frameworks/{name}");
        let mut reference = FileReference::packaged_framework(name, &path);
        reference.source_tree = Some(SourceTree::SdkRoot);
        reference.last_known_file_type = Some("wrapper.framework".to_string());
        let reference = graph.insert(Node::FileReference(reference));
        graph.add_to_group(group, reference.clone());
        let build_file = graph.insert(Node::BuildFile(BuildFile::wrapping(reference.clone())));
        graph.build_phase_mut(phase).unwrap().files.push(build_file);
        reference
    }

    #[test]
    fn test_reverse_keeps_sdk_framework_sharing_product_suffix() {
        let PackagedApp {
            mut graph,
            frameworks_phase,
            frameworks_group,
            ..
        } = app_with_packaged_framework();
        // `Sub.framework` is a suffix of `GameSub.framework`
        let sdk = link_sdk_framework(
            &mut graph,
            &frameworks_group,
            &frameworks_phase,
            "GameSub.framework",
        );
        let before = graph.clone();

        let token = graph.swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub");
        assert!(graph.contains(&sdk));
        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, token.as_ref());

        assert!(graph.contains(&sdk));
        assert_eq!(graph.build_files_referencing(&sdk).len(), 1);
        graph.validate().unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_reverse_restores_original_positions() {
        let PackagedApp {
            mut graph,
            frameworks_phase,
            frameworks_group,
            packaged_ref,
            packaged_build_file,
            ..
        } = app_with_packaged_framework();
        link_sdk_framework(&mut graph, &frameworks_group, &frameworks_phase, "UIKit.framework");
        link_sdk_framework(&mut graph, &frameworks_group, &frameworks_phase, "StoreKit.framework");
        let before = graph.clone();

        let token = graph
            .swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub")
            .unwrap();
        assert_eq!(token.group_index, Some(0));
        assert_eq!(token.build_file_index, Some(0));

        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, Some(&token));

        assert_eq!(graph.group(&frameworks_group).unwrap().children[0], packaged_ref);
        assert_eq!(graph.build_phase(&frameworks_phase).unwrap().files[0], packaged_build_file);
        assert_eq!(graph, before);
    }

    #[test]
    fn test_reverse_keeps_original_group_and_path() {
        let PackagedApp { mut graph, .. } = app_with_packaged_framework();

        // Move the framework into a custom group with a custom path first
        let custom = graph.insert(Node::Group(Group::named("Vendor")));
        let main = graph.main_group_id();
        graph.add_to_group(&main, custom.clone());
        let packaged = graph.find_framework_references(FRAMEWORK)[0].clone();
        graph.detach_from_groups(&packaged);
        graph.add_to_group(&custom, packaged.clone());
        graph.file_reference_mut(&packaged).unwrap().path = Some("Vendor/Sub.xcframework".into());

        let token = graph.swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub");
        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, token.as_ref());

        let restored = graph.find_framework_references(FRAMEWORK);
        assert_eq!(restored, vec![packaged.clone()]);
        let reference = graph.file_reference(&packaged).unwrap();
        assert_eq!(reference.name.as_deref(), Some(FRAMEWORK));
        assert_eq!(reference.path.as_deref(), Some("Vendor/Sub.xcframework"));
        assert_eq!(graph.groups_containing(&packaged), vec![custom]);
    }

    #[test]
    fn test_reverse_without_token_uses_defaults() {
        let PackagedApp {
            mut graph,
            frameworks_phase,
            frameworks_group,
            ..
        } = app_with_packaged_framework();
        graph.swap_packaged_for_nested(FRAMEWORK, "elsewhere/Sub.xcframework", NESTED, "Sub");

        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, None);

        let restored = graph.find_framework_references(FRAMEWORK);
        assert_eq!(restored.len(), 1);
        let reference = graph.file_reference(&restored[0]).unwrap();
        assert_eq!(reference.path.as_deref(), Some(FRAMEWORK_PATH));
        assert_eq!(graph.groups_containing(&restored[0]), vec![frameworks_group]);

        let phase = graph.build_phase(&frameworks_phase).unwrap();
        assert_eq!(phase.files.len(), 1);
        assert_eq!(
            graph.build_file(&phase.files[0]).unwrap().file_ref.as_ref(),
            Some(&restored[0])
        );
        assert!(graph.find_framework_references("Sub.framework").is_empty());
        graph.validate().unwrap();
    }

    #[test]
    fn test_reverse_when_packaged_already_present_is_noop() {
        let PackagedApp { mut graph, .. } = app_with_packaged_framework();
        let before = graph.clone();

        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, None);

        assert_eq!(graph, before);
    }

    #[test]
    fn test_reverse_removes_xcode_wired_nested_project() {
        let PackagedApp {
            mut graph, target, ..
        } = app_with_packaged_framework();
        let token = graph.swap_packaged_for_nested(FRAMEWORK, FRAMEWORK_PATH, NESTED, "Sub");
        wire_nested_project(&mut graph, &target, NESTED);

        graph.swap_nested_for_packaged(NESTED, FRAMEWORK_PATH, FRAMEWORK, token.as_ref());

        assert!(graph.find_file_reference_by_path(NESTED).is_none());
        assert!(graph.container_item_proxies().next().is_none());
        assert!(graph.reference_proxies().next().is_none());
        assert!(graph.target(&target).unwrap().dependencies.is_empty());
        graph.validate().unwrap();
    }
}
