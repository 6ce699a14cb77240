pub mod schema;
pub mod tracker;

pub use tracker::{
    ChangeRecord, DeprecationRecord, TrackerStatistics, VersionRecord, VersionTracker,
};
