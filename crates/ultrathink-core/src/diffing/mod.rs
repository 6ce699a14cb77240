pub mod classifier;
pub mod differ;
pub mod snapshot;
pub mod version;

pub use classifier::{suggest_version_bump, ChangeClassifier, ClassifiedDiff, VersionSuggestion};
pub use differ::{compare_snapshots, ApiDiffer, Compatibility, DiffResult, Severity};
pub use snapshot::{ApiSnapshot, SnapshotStore};
pub use version::{bump_version, compare_versions, next_version, parse_version, BumpKind};
