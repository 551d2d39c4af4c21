//! Conversion between `isa`-tagged JSON objects and typed [`Node`]s.

use serde_json::{Map, Value};

use super::{
    node::{
        BuildFile, BuildPhase, BuildPhaseKind, ContainerItemProxy, Fields, FileReference, Group,
        GroupKind, OtherNode, Project, ProjectReferenceEntry, ReferenceProxy, SourceTree, Target,
        TargetDependency, TargetKind,
    },
    Node, ObjectId,
};

fn take_string(fields: &mut Fields, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

fn take_id(fields: &mut Fields, key: &str) -> Option<ObjectId> {
    take_string(fields, key).map(ObjectId)
}

fn take_ids(fields: &mut Fields, key: &str) -> Result<Vec<ObjectId>, String> {
    match fields.remove(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(ObjectId(s)),
                other => Err(format!("`{key}` holds a non-string id: {other}")),
            })
            .collect(),
        Some(other) => Err(format!("`{key}` is not a list: {other}")),
    }
}

fn require_id(fields: &mut Fields, key: &str, isa: &str) -> Result<ObjectId, String> {
    take_id(fields, key).ok_or_else(|| format!("{isa} is missing `{key}`"))
}

fn take_project_references(fields: &mut Fields) -> Result<Vec<ProjectReferenceEntry>, String> {
    let Some(value) = fields.remove("projectReferences") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = value else {
        return Err("`projectReferences` is not a list".to_string());
    };

    items
        .into_iter()
        .map(|item| {
            let Value::Object(mut entry) = item else {
                return Err("`projectReferences` entry is not a dictionary".to_string());
            };
            Ok(ProjectReferenceEntry {
                product_group: require_id(&mut entry, "ProductGroup", "projectReferences entry")?,
                project_ref: require_id(&mut entry, "ProjectRef", "projectReferences entry")?,
            })
        })
        .collect()
}

/// Decode one entry of the `objects` dictionary
pub fn decode_node(value: Value) -> Result<Node, String> {
    let Value::Object(mut fields) = value else {
        return Err("object is not a dictionary".to_string());
    };
    let isa = take_string(&mut fields, "isa").ok_or_else(|| "object has no `isa`".to_string())?;

    if let Some(kind) = BuildPhaseKind::from_isa(&isa) {
        let files = take_ids(&mut fields, "files")?;
        return Ok(Node::BuildPhase(BuildPhase {
            kind,
            files,
            extra: fields,
        }));
    }

    let node = match isa.as_str() {
        "PBXFileReference" => Node::FileReference(FileReference {
            name: take_string(&mut fields, "name"),
            path: take_string(&mut fields, "path"),
            source_tree: take_string(&mut fields, "sourceTree").map(|s| SourceTree::parse(&s)),
            last_known_file_type: take_string(&mut fields, "lastKnownFileType"),
            explicit_file_type: take_string(&mut fields, "explicitFileType"),
            extra: fields,
        }),
        "PBXBuildFile" => Node::BuildFile(BuildFile {
            file_ref: take_id(&mut fields, "fileRef"),
            extra: fields,
        }),
        "PBXGroup" | "PBXVariantGroup" => Node::Group(Group {
            kind: if isa == "PBXGroup" {
                GroupKind::Group
            } else {
                GroupKind::VariantGroup
            },
            name: take_string(&mut fields, "name"),
            path: take_string(&mut fields, "path"),
            children: take_ids(&mut fields, "children")?,
            extra: fields,
        }),
        "PBXNativeTarget" | "PBXAggregateTarget" | "PBXLegacyTarget" => Node::Target(Target {
            kind: match isa.as_str() {
                "PBXNativeTarget" => TargetKind::Native,
                "PBXAggregateTarget" => TargetKind::Aggregate,
                _ => TargetKind::Legacy,
            },
            name: take_string(&mut fields, "name"),
            build_phases: take_ids(&mut fields, "buildPhases")?,
            dependencies: take_ids(&mut fields, "dependencies")?,
            product_type: take_string(&mut fields, "productType"),
            extra: fields,
        }),
        "PBXTargetDependency" => Node::TargetDependency(TargetDependency {
            target: take_id(&mut fields, "target"),
            target_proxy: take_id(&mut fields, "targetProxy"),
            extra: fields,
        }),
        "PBXContainerItemProxy" => Node::ContainerItemProxy(ContainerItemProxy {
            container_portal: require_id(&mut fields, "containerPortal", &isa)?,
            proxy_type: take_string(&mut fields, "proxyType"),
            remote_global_id: take_string(&mut fields, "remoteGlobalIDString"),
            remote_info: take_string(&mut fields, "remoteInfo"),
            extra: fields,
        }),
        "PBXReferenceProxy" => Node::ReferenceProxy(ReferenceProxy {
            remote_ref: take_id(&mut fields, "remoteRef"),
            path: take_string(&mut fields, "path"),
            file_type: take_string(&mut fields, "fileType"),
            extra: fields,
        }),
        "PBXProject" => Node::Project(Project {
            main_group: require_id(&mut fields, "mainGroup", &isa)?,
            product_ref_group: take_id(&mut fields, "productRefGroup"),
            targets: take_ids(&mut fields, "targets")?,
            project_references: take_project_references(&mut fields)?,
            extra: fields,
        }),
        _ => Node::Other(OtherNode {
            isa,
            fields,
        }),
    };
    Ok(node)
}

fn put_string(fields: &mut Fields, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), Value::String(value.clone()));
    }
}

fn put_id(fields: &mut Fields, key: &str, value: &Option<ObjectId>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), Value::String(value.0.clone()));
    }
}

fn put_ids(fields: &mut Fields, key: &str, ids: &[ObjectId]) {
    let items = ids.iter().map(|id| Value::String(id.0.clone())).collect();
    fields.insert(key.to_string(), Value::Array(items));
}

fn extend(fields: &mut Fields, extra: &Fields) {
    for (key, value) in extra {
        fields.insert(key.clone(), value.clone());
    }
}

/// Encode a node back into its `isa`-tagged dictionary
pub fn encode_node(node: &Node) -> Value {
    let mut fields = Map::new();
    fields.insert("isa".to_string(), Value::String(node.isa().to_string()));

    match node {
        Node::FileReference(reference) => {
            put_string(&mut fields, "name", &reference.name);
            put_string(&mut fields, "path", &reference.path);
            put_string(
                &mut fields,
                "sourceTree",
                &reference.source_tree.as_ref().map(|t| t.as_str().to_string()),
            );
            put_string(&mut fields, "lastKnownFileType", &reference.last_known_file_type);
            put_string(&mut fields, "explicitFileType", &reference.explicit_file_type);
            extend(&mut fields, &reference.extra);
        }
        Node::BuildFile(build_file) => {
            put_id(&mut fields, "fileRef", &build_file.file_ref);
            extend(&mut fields, &build_file.extra);
        }
        Node::BuildPhase(phase) => {
            put_ids(&mut fields, "files", &phase.files);
            extend(&mut fields, &phase.extra);
        }
        Node::Group(group) => {
            put_string(&mut fields, "name", &group.name);
            put_string(&mut fields, "path", &group.path);
            put_ids(&mut fields, "children", &group.children);
            extend(&mut fields, &group.extra);
        }
        Node::Target(target) => {
            put_string(&mut fields, "name", &target.name);
            put_ids(&mut fields, "buildPhases", &target.build_phases);
            put_ids(&mut fields, "dependencies", &target.dependencies);
            put_string(&mut fields, "productType", &target.product_type);
            extend(&mut fields, &target.extra);
        }
        Node::TargetDependency(dependency) => {
            put_id(&mut fields, "target", &dependency.target);
            put_id(&mut fields, "targetProxy", &dependency.target_proxy);
            extend(&mut fields, &dependency.extra);
        }
        Node::ContainerItemProxy(proxy) => {
            put_id(
                &mut fields,
                "containerPortal",
                &Some(proxy.container_portal.clone()),
            );
            put_string(&mut fields, "proxyType", &proxy.proxy_type);
            put_string(&mut fields, "remoteGlobalIDString", &proxy.remote_global_id);
            put_string(&mut fields, "remoteInfo", &proxy.remote_info);
            extend(&mut fields, &proxy.extra);
        }
        Node::ReferenceProxy(proxy) => {
            put_id(&mut fields, "remoteRef", &proxy.remote_ref);
            put_string(&mut fields, "path", &proxy.path);
            put_string(&mut fields, "fileType", &proxy.file_type);
            extend(&mut fields, &proxy.extra);
        }
        Node::Project(project) => {
            put_id(&mut fields, "mainGroup", &Some(project.main_group.clone()));
            put_id(&mut fields, "productRefGroup", &project.product_ref_group);
            put_ids(&mut fields, "targets", &project.targets);
            if !project.project_references.is_empty() {
                let entries = project
                    .project_references
                    .iter()
                    .map(|entry| {
                        let mut map = Map::new();
                        map.insert(
                            "ProductGroup".to_string(),
                            Value::String(entry.product_group.0.clone()),
                        );
                        map.insert(
                            "ProjectRef".to_string(),
                            Value::String(entry.project_ref.0.clone()),
                        );
                        Value::Object(map)
                    })
                    .collect();
                fields.insert("projectReferences".to_string(), Value::Array(entries));
            }
            extend(&mut fields, &project.extra);
        }
        Node::Other(other) => extend(&mut fields, &other.fields),
    }

    Value::Object(fields)
}
