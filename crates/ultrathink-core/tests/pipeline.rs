//! End-to-end: extract two releases of a package, snapshot both, diff,
//! classify, suggest a bump and record the result in the version store.

use std::path::Path;

use ultrathink_core::diffing::{
    suggest_version_bump, ApiDiffer, BumpKind, ChangeClassifier, Compatibility, Severity,
};
use ultrathink_core::introspection::{ApiExtractor, Sensitivity};
use ultrathink_core::store::VersionTracker;

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const V1_INIT: &str = r#""""Demo package."""
__version__ = "1.0.0"
__all__ = ["run", "collector_run"]


def run(path: str) -> int:
    """Run the pipeline over ``path``."""
    return 0


def collector_run():
    """Collect everything."""
"#;

const V2_INIT: &str = r#""""Demo package."""
__version__ = "1.1.0"
__all__ = ["run", "new_helper"]


def run(path: str, retries: int = 3) -> int:
    """Run the pipeline over ``path``."""
    return 0


def new_helper(value):
    """Small helper added in 1.1."""
    return value
"#;

#[test]
fn extract_snapshot_diff_classify_and_record() {
    let workspace = tempfile::tempdir().unwrap();
    let src = workspace.path().join("src");
    let storage = workspace.path().join("storage");
    let extractor = ApiExtractor::new("demo", &src);
    let differ = ApiDiffer::new(&storage, Sensitivity::Strict).unwrap();

    write(&src, "demo/__init__.py", V1_INIT);
    let v1 = extractor.extract_complete_api().unwrap();
    assert_eq!(v1.package_info.version, "1.0.0");
    let v1_file = differ.create_api_snapshot(&v1, "1.0.0").unwrap();

    write(&src, "demo/__init__.py", V2_INIT);
    let v2 = extractor.extract_complete_api().unwrap();
    let v2_file = differ.create_api_snapshot(&v2, "1.1.0").unwrap();

    // Reloading a snapshot gives back exactly what was captured.
    let reloaded = differ.load_latest_snapshot("1.0.0").unwrap();
    assert_eq!(reloaded.api_data, v1);

    let diff = differ.compare_versions("1.0.0", "1.1.0").unwrap();
    assert_eq!(diff.signature_changes.added, vec!["new_helper".to_string()]);
    assert_eq!(diff.signature_changes.removed, vec!["collector_run".to_string()]);
    assert_eq!(diff.signature_changes.modified, vec!["run".to_string()]);

    let classified = ChangeClassifier::new().classify_changes(diff);
    let removal = &classified.classified_changes.removals[0];
    assert_eq!(removal.element, "collector_run");
    assert_eq!(removal.severity, Severity::Critical);
    assert!(removal.breaking);
    let addition = &classified.classified_changes.additions[0];
    assert_eq!(addition.element, "new_helper");
    assert_eq!(addition.severity, Severity::Info);
    assert!(!addition.breaking);
    assert_eq!(classified.compatibility_impact, Compatibility::Breaking);

    let suggestion = suggest_version_bump(&classified.classified_changes, "1.0.0");
    assert_eq!(suggestion.suggested_bump, Some(BumpKind::Major));
    assert_eq!(suggestion.suggested_version.as_deref(), Some("2.0.0"));

    let tracker = VersionTracker::new(&storage).unwrap();
    tracker
        .register_version("1.0.0", v1_file.to_str(), None)
        .unwrap();
    tracker
        .register_version("1.1.0", v2_file.to_str(), Some("adds new_helper"))
        .unwrap();
    let recorded = tracker
        .record_changes("1.0.0", "1.1.0", classified.classified_changes.iter())
        .unwrap();
    assert_eq!(recorded, 3);

    let changes = tracker.get_changes_between_versions("1.0.0", "1.1.0").unwrap();
    assert_eq!(changes.len(), 3);
    assert!(changes
        .iter()
        .any(|c| c.element_name == "collector_run" && c.severity == "critical"));
    assert_eq!(
        tracker.get_current_version().unwrap().unwrap().version_string,
        "1.1.0"
    );
}
