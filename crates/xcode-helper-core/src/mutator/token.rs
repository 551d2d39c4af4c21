use serde::{Deserialize, Serialize};

use crate::graph::ObjectId;

/// State captured when a packaged framework reference is swapped out, enough
/// to put an equivalent reference back without re-deriving the structure.
///
/// Serialized as `savedXCFrameworkInfo` in the link-state record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalToken {
    /// Id the packaged file reference had
    pub file_reference_id: ObjectId,
    /// Ids of every build file that wrapped it
    pub build_file_ids: Vec<ObjectId>,
    /// Group that listed it, if any
    pub group_id: Option<ObjectId>,
    /// Path it had
    pub original_path: String,
    /// Display name it had
    pub original_name: String,
    /// Position in that group's children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_index: Option<usize>,
    /// Position of the first build file in the main Frameworks phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_file_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let token = ReversalToken {
            file_reference_id: ObjectId::from("AAAAAAAAAAAAAAAAAAAAAAAA"),
            build_file_ids: vec![ObjectId::from("BBBBBBBBBBBBBBBBBBBBBBBB")],
            group_id: None,
            original_path: "Carthage/Build/Sub.xcframework".to_string(),
            original_name: "Sub.xcframework".to_string(),
            group_index: None,
            build_file_index: None,
        };

        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            json!({
                "fileReferenceId": "AAAAAAAAAAAAAAAAAAAAAAAA",
                "buildFileIds": ["BBBBBBBBBBBBBBBBBBBBBBBB"],
                "groupId": null,
                "originalPath": "Carthage/Build/Sub.xcframework",
                "originalName": "Sub.xcframework"
            })
        );
    }

    #[test]
    fn test_positions_are_optional_on_the_wire() {
        let token: ReversalToken = serde_json::from_value(json!({
            "fileReferenceId": "AAAAAAAAAAAAAAAAAAAAAAAA",
            "buildFileIds": [],
            "groupId": "CCCCCCCCCCCCCCCCCCCCCCCC",
            "originalPath": "Carthage/Build/Sub.xcframework",
            "originalName": "Sub.xcframework"
        }))
        .unwrap();
        assert_eq!(token.group_index, None);
        assert_eq!(token.build_file_index, None);

        let positioned = ReversalToken {
            group_index: Some(2),
            build_file_index: Some(0),
            ..token
        };
        let value = serde_json::to_value(&positioned).unwrap();
        assert_eq!(value["groupIndex"], json!(2));
        assert_eq!(value["buildFileIndex"], json!(0));
    }
}
