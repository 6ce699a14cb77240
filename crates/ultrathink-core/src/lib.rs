//! Ultrathink core library: API documentation tooling for Python packages.
//!
//! The crate extracts a package's public API statically with tree-sitter,
//! snapshots and diffs it between versions, classifies the changes, tracks
//! versions and deprecations in SQLite, and generates and validates the
//! reference documentation. With the `python` feature it also builds the
//! `_ultrathink_core` extension module.

pub mod ci;
pub mod config;
pub mod diffing;
pub mod errors;
pub mod generation;
pub mod introspection;
pub mod models;
pub mod persist;
pub mod store;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use config::UltrathinkConfig;
pub use errors::{UltrathinkError, UltrathinkResult};
pub use models::{ApiData, ApiElement, ElementKind};
