pub mod completeness;
pub mod doctest;
pub mod help;

pub use completeness::{CompletenessChecker, CompletenessResult};
pub use doctest::{DoctestRunner, DoctestValidation, DoctestValidator, PythonRunner};
pub use help::{
    HelpComparison, HelpSnapshotSet, HelpSnapshotter, HelpValidation, HelpValidationStatus,
};
