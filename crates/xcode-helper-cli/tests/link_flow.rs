use std::{
    fs,
    path::{Path, PathBuf},
};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use xcode_helper_cli::{LinkCommand, LinkSession, MemoryReporter};
use xcode_helper_core::{
    graph::project_file, BackupLedger, ErrorKind, GraphStore, JsonGraphStore, LinkConfig,
    LinkStateRecord, MappingRegistry,
};

/// Framework project consuming two prebuilt dependencies
const SOURCE_PROJECT: &str = r#"{
  "archiveVersion": "1",
  "classes": {},
  "objectVersion": "56",
  "objects": {
    "5B0000000000000000000001": {"isa": "PBXGroup", "children": ["5B0000000000000000000002"], "sourceTree": "<group>"},
    "5B0000000000000000000002": {"isa": "PBXGroup", "children": ["5B0000000000000000000003", "5B0000000000000000000004"], "name": "Frameworks", "sourceTree": "<group>"},
    "5B0000000000000000000003": {"isa": "PBXFileReference", "lastKnownFileType": "wrapper.xcframework", "name": "ApiClient.xcframework", "path": "../Carthage/Build/ApiClient.xcframework", "sourceTree": "<group>"},
    "5B0000000000000000000004": {"isa": "PBXFileReference", "lastKnownFileType": "wrapper.xcframework", "name": "Apollo.xcframework", "path": "../Carthage/Checkouts/apollo-ios-xcframework/xcframeworks/Apollo.xcframework", "sourceTree": "<group>"},
    "5B0000000000000000000005": {"isa": "PBXProject", "compatibilityVersion": "Xcode 14.0", "mainGroup": "5B0000000000000000000001", "targets": []}
  },
  "rootObject": "5B0000000000000000000005"
}"#;

/// App linking `Lottie.xcframework` and `Subscription.xcframework`
const TARGET_PROJECT: &str = r#"{
  "archiveVersion": "1",
  "classes": {},
  "objectVersion": "56",
  "objects": {
    "7C0000000000000000000001": {"isa": "PBXGroup", "children": ["7C0000000000000000000002"], "sourceTree": "<group>"},
    "7C0000000000000000000002": {"isa": "PBXGroup", "children": ["7C0000000000000000000003", "7C0000000000000000000004"], "name": "Frameworks", "sourceTree": "<group>"},
    "7C0000000000000000000003": {"isa": "PBXFileReference", "lastKnownFileType": "wrapper.xcframework", "name": "Lottie.xcframework", "path": "Carthage/Build/Lottie.xcframework", "sourceTree": "<group>"},
    "7C0000000000000000000004": {"isa": "PBXFileReference", "lastKnownFileType": "wrapper.xcframework", "name": "Subscription.xcframework", "path": "Carthage/Build/Subscription.xcframework", "sourceTree": "<group>"},
    "7C0000000000000000000005": {"isa": "PBXBuildFile", "fileRef": "7C0000000000000000000003"},
    "7C0000000000000000000006": {"isa": "PBXBuildFile", "fileRef": "7C0000000000000000000004"},
    "7C0000000000000000000007": {"isa": "PBXFrameworksBuildPhase", "buildActionMask": "2147483647", "files": ["7C0000000000000000000005", "7C0000000000000000000006"], "runOnlyForDeploymentPostprocessing": "0"},
    "7C0000000000000000000008": {"isa": "PBXNativeTarget", "buildPhases": ["7C0000000000000000000007"], "dependencies": [], "name": "Volo", "productType": "com.apple.product-type.application"},
    "7C0000000000000000000009": {"isa": "PBXProject", "compatibilityVersion": "Xcode 14.0", "mainGroup": "7C0000000000000000000001", "targets": ["7C0000000000000000000008"]}
  },
  "rootObject": "7C0000000000000000000009"
}"#;

const NESTED: &str = "../pd-mob-subscription-ios/Subscription/Subscription.xcodeproj";

struct Workspace {
    _temp: TempDir,
    base: PathBuf,
    source: PathBuf,
    target: PathBuf,
    data_dir: PathBuf,
    session: LinkSession,
    reporter: MemoryReporter,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap().join("work");
        let source = base.join("pd-mob-subscription-ios/Subscription/Subscription.xcodeproj");
        let target = base.join("pd-mob-b2c-ios/Volo.xcodeproj");
        for (project, contents) in [(&source, SOURCE_PROJECT), (&target, TARGET_PROJECT)] {
            fs::create_dir_all(project).unwrap();
            fs::write(project_file(project), contents).unwrap();
        }

        let data_dir = temp.path().join("data");
        let reporter = MemoryReporter::new();
        let mut session =
            LinkSession::new(LinkConfig::with_data_dir(&data_dir), MappingRegistry::builtin());
        session.set_reporter(Box::new(reporter.clone()));

        Self {
            _temp: temp,
            base,
            source,
            target,
            data_dir,
            session,
            reporter,
        }
    }

    fn enable(&self, dry_run: bool) -> xcode_helper_core::Result<()> {
        self.session.handle_command(LinkCommand::Enable {
            mapping: "subscription".to_string(),
            path: Some(self.base.clone()),
            dry_run,
        })
    }

    fn disable(&self) -> xcode_helper_core::Result<()> {
        self.session.handle_command(LinkCommand::Disable {
            mapping: "subscription".to_string(),
            path: Some(self.base.clone()),
        })
    }

    fn status(&self) {
        self.session
            .handle_command(LinkCommand::Status {
                path: Some(self.base.clone()),
            })
            .unwrap();
    }

    fn state(&self) -> LinkStateRecord {
        LinkStateRecord::in_dir(&self.base)
    }

    fn ledger(&self) -> BackupLedger {
        BackupLedger::new(self.data_dir.join("backups"))
    }
}

fn read(project: &Path) -> String {
    fs::read_to_string(project_file(project)).unwrap()
}

#[test]
fn enable_status_disable_round_trip() {
    let ws = Workspace::new();

    ws.enable(false).unwrap();

    let source = JsonGraphStore::new().load(&ws.source).unwrap();
    let api_client = source.find_framework_references("ApiClient.xcframework");
    assert_eq!(
        source.file_reference(&api_client[0]).unwrap().path.as_deref(),
        Some("../../pd-mob-b2c-ios/Carthage/Build/ApiClient.xcframework")
    );

    let target = JsonGraphStore::new().load(&ws.target).unwrap();
    assert!(target.find_framework_references("Subscription.xcframework").is_empty());
    assert!(target.find_file_reference_by_path(NESTED).is_some());
    target.validate().unwrap();

    let state = ws.state().read().unwrap();
    assert!(state.enabled);
    assert_eq!(state.mapping, "subscription");
    let token = state.saved_xc_framework_info.unwrap();
    assert_eq!(token.file_reference_id.as_str(), "7C0000000000000000000004");
    assert_eq!(token.original_path, "Carthage/Build/Subscription.xcframework");

    ws.status();
    assert!(ws.reporter.contains("Status: ENABLED"));
    assert!(ws.reporter.contains("Mapping: subscription"));

    ws.disable().unwrap();

    assert_eq!(read(&ws.source), SOURCE_PROJECT);
    let restored = JsonGraphStore::new().load(&ws.target).unwrap();
    let original = JsonGraphStore::parse(TARGET_PROJECT, &ws.target).unwrap();
    assert_eq!(restored, original);
    assert!(!ws.state().exists());

    let ledger = ws.ledger();
    assert!(!ledger.has_backup("subscription").unwrap());
    assert!(!ledger.has_backup("subscription-target").unwrap());

    ws.status();
    assert!(ws.reporter.contains("Status: DISABLED"));
    assert!(ws.reporter.contains("subscription: pd-mob-subscription-ios"));
}

#[test]
fn dry_run_writes_nothing() {
    let ws = Workspace::new();

    ws.enable(true).unwrap();

    assert_eq!(read(&ws.source), SOURCE_PROJECT);
    assert_eq!(read(&ws.target), TARGET_PROJECT);
    assert!(!ws.data_dir.join("backups").exists());
    assert!(!ws.state().exists());
    assert!(ws.reporter.contains("[DRY RUN]"));
    assert!(ws.reporter.contains("FROM: ../Carthage/Build/ApiClient.xcframework"));
}

#[test]
fn enable_refuses_when_another_mapping_is_linked() {
    let ws = Workspace::new();
    ws.state().write(true, "payments", None).unwrap();

    let err = ws.enable(false).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("payments"));
    assert_eq!(read(&ws.source), SOURCE_PROJECT);
    assert_eq!(read(&ws.target), TARGET_PROJECT);
}

#[test]
fn enable_twice_keeps_first_backups() {
    let ws = Workspace::new();
    ws.enable(false).unwrap();
    ws.enable(false).unwrap();

    assert_eq!(ws.ledger().list(Some("subscription")).unwrap().len(), 1);
    assert!(ws.reporter.contains("already enabled"));
}

#[test]
fn enable_retry_after_failed_attempt_still_disables_cleanly() {
    let ws = Workspace::new();
    fs::write(project_file(&ws.target), "{ broken").unwrap();

    let err = ws.enable(false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
    assert!(!ws.state().exists());

    fs::write(project_file(&ws.target), TARGET_PROJECT).unwrap();
    ws.enable(false).unwrap();
    assert_eq!(ws.ledger().list(Some("subscription")).unwrap().len(), 1);
    assert!(ws.reporter.contains("Keeping source backup from an earlier attempt"));

    ws.disable().unwrap();

    assert_eq!(read(&ws.source), SOURCE_PROJECT);
    let restored = JsonGraphStore::new().load(&ws.target).unwrap();
    assert_eq!(restored, JsonGraphStore::parse(TARGET_PROJECT, &ws.target).unwrap());
    assert!(ws.ledger().list(None).unwrap().is_empty());
}

#[test]
fn fix_after_disable_keeps_later_edits() {
    let ws = Workspace::new();
    ws.enable(false).unwrap();
    ws.disable().unwrap();

    let edited = TARGET_PROJECT.replace("\"Volo\"", "\"VoloRenamed\"");
    fs::write(project_file(&ws.target), &edited).unwrap();

    let err = ws
        .session
        .handle_command(LinkCommand::Fix {
            mapping: Some("subscription".to_string()),
            path: Some(ws.base.clone()),
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(read(&ws.target), edited);
    assert!(ws.reporter.contains("not linked"));
}

#[test]
fn disable_without_state_restores_default_reference() {
    let ws = Workspace::new();
    ws.enable(false).unwrap();
    ws.state().clear();

    ws.disable().unwrap();

    let target = JsonGraphStore::new().load(&ws.target).unwrap();
    let restored = target.find_framework_references("Subscription.xcframework");
    assert_eq!(restored.len(), 1);
    assert_eq!(
        target.file_reference(&restored[0]).unwrap().path.as_deref(),
        Some("Carthage/Build/Subscription.xcframework")
    );
    assert!(target.find_file_reference_by_path(NESTED).is_none());
    target.validate().unwrap();
}

#[test]
fn unknown_mapping_lists_available() {
    let ws = Workspace::new();
    let err = ws
        .session
        .handle_command(LinkCommand::Enable {
            mapping: "nope".to_string(),
            path: Some(ws.base.clone()),
            dry_run: false,
        })
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("Available mappings: subscription"));
}

#[test]
fn fix_restores_target_from_backup() {
    let ws = Workspace::new();
    ws.enable(false).unwrap();
    fs::write(project_file(&ws.target), "{ corrupted").unwrap();

    ws.session
        .handle_command(LinkCommand::Fix {
            mapping: Some("subscription".to_string()),
            path: Some(ws.base.clone()),
        })
        .unwrap();

    assert_eq!(read(&ws.target), TARGET_PROJECT);
    assert!(ws.reporter.contains("Project restored from backup"));
}

#[test]
fn fix_uses_mapping_from_saved_state() {
    let ws = Workspace::new();
    ws.enable(false).unwrap();
    fs::write(project_file(&ws.target), "{ corrupted").unwrap();

    ws.session
        .handle_command(LinkCommand::Fix {
            mapping: None,
            path: Some(ws.base.clone()),
        })
        .unwrap();

    assert_eq!(read(&ws.target), TARGET_PROJECT);
}

#[test]
fn fix_without_backup_or_generator_cannot_fix() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("App.xcodeproj")).unwrap();
    let session = LinkSession::new(
        LinkConfig::with_data_dir(temp.path().join("data")),
        MappingRegistry::builtin(),
    );

    let err = session
        .handle_command(LinkCommand::Fix {
            mapping: None,
            path: Some(temp.path().to_path_buf()),
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("Manual recovery options"));
}
