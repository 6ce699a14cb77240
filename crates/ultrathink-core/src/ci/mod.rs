//! CI-facing checks: the documentation gate for pull requests and the
//! pre-commit check over staged files.

pub mod gating;
pub mod staged;

pub use gating::{BreakingChangeTolerance, DocumentationGate, GateContext, GateResult, GateStatus};
pub use staged::{StagedFileChecker, StagedStatus, StagedValidation};
