//! Loading and saving project graphs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use super::{codec, GraphError, ObjectGraph, ObjectId};
use crate::atomic::write_atomically;

/// File holding the object graph inside an `.xcodeproj` bundle
pub const PROJECT_FILE_NAME: &str = "project.pbxproj";

/// Path of the graph file for a project bundle
pub fn project_file(project_path: &Path) -> PathBuf {
    project_path.join(PROJECT_FILE_NAME)
}

/// Read/write provider beneath the mutator
pub trait GraphStore {
    /// Load the graph of the project bundle at `project_path`
    fn load(&self, project_path: &Path) -> Result<ObjectGraph, GraphError>;

    /// Persist `graph` into the project bundle at `project_path`
    fn save(&self, graph: &ObjectGraph, project_path: &Path) -> Result<(), GraphError>;
}

/// Store for project files kept in their JSON property-list form
/// (`plutil -convert json project.pbxproj`), which Xcode reads natively.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphStore;

impl JsonGraphStore {
    pub fn new() -> Self {
        Self
    }

    /// Decode a graph from JSON text; `origin` only labels errors
    pub fn parse(text: &str, origin: &Path) -> Result<ObjectGraph, GraphError> {
        let parse_error = |message: String| GraphError::Parse {
            path: origin.to_path_buf(),
            message,
        };

        let value: Value =
            serde_json::from_str(text).map_err(|err| parse_error(err.to_string()))?;
        let Value::Object(mut top) = value else {
            return Err(parse_error("top level is not a dictionary".to_string()));
        };

        let root = match top.remove("rootObject") {
            Some(Value::String(root)) => ObjectId(root),
            _ => return Err(parse_error("missing `rootObject`".to_string())),
        };
        let raw_objects = match top.remove("objects") {
            Some(Value::Object(objects)) => objects,
            _ => return Err(parse_error("missing `objects` dictionary".to_string())),
        };

        let mut objects = IndexMap::with_capacity(raw_objects.len());
        for (id, raw) in raw_objects {
            let node = codec::decode_node(raw).map_err(|message| parse_error(format!("{id}: {message}")))?;
            objects.insert(ObjectId(id), node);
        }

        ObjectGraph::from_parts(top, objects, root)
    }

    /// Encode a graph as pretty-printed JSON
    pub fn render(graph: &ObjectGraph) -> Result<String, GraphError> {
        let mut top = Map::new();
        for (key, value) in graph.header() {
            top.insert(key.clone(), value.clone());
        }

        let mut objects = Map::new();
        for (id, node) in graph.iter() {
            objects.insert(id.0.clone(), codec::encode_node(node));
        }
        top.insert("objects".to_string(), Value::Object(objects));
        top.insert(
            "rootObject".to_string(),
            Value::String(graph.root_id().0.clone()),
        );

        let mut text =
            serde_json::to_string_pretty(&Value::Object(top)).map_err(GraphError::Serialize)?;
        text.push('\n');
        Ok(text)
    }
}

impl GraphStore for JsonGraphStore {
    fn load(&self, project_path: &Path) -> Result<ObjectGraph, GraphError> {
        let file = project_file(project_path);
        let text = fs::read_to_string(&file).map_err(|source| GraphError::Io {
            path: file.clone(),
            source,
        })?;
        let graph = Self::parse(&text, &file)?;
        debug!(path = %file.display(), objects = graph.len(), "loaded project graph");
        Ok(graph)
    }

    fn save(&self, graph: &ObjectGraph, project_path: &Path) -> Result<(), GraphError> {
        let file = project_file(project_path);
        let text = Self::render(graph)?;
        write_atomically(&file, text.as_bytes()).map_err(|source| GraphError::Io {
            path: file.clone(),
            source,
        })?;
        debug!(path = %file.display(), objects = graph.len(), "saved project graph");
        Ok(())
    }
}
