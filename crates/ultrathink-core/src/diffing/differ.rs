//! Snapshot comparison.
//!
//! [`compare_snapshots`] is pure: hash-level changes, structural changes for
//! elements present on both sides, documentation changes, and a first-pass
//! breaking-change list from a fixed policy. [`ApiDiffer`] wraps it with
//! snapshot lookup and persistence of the diff under `api_diffs/`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UltrathinkConfig;
use crate::diffing::snapshot::{ApiSnapshot, SnapshotEntry, SnapshotStore};
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::hasher::{compare_signatures, Sensitivity, SignatureComparison};
use crate::models::{ApiData, ApiElement, ElementKind, Parameter};
use crate::persist::{file_timestamp, now_iso, write_sorted_json};

// ---------------------------------------------------------------------------
// Shared vocabulary
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Breaking,
    #[default]
    Compatible,
    Unknown,
}

impl Compatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compatibility::Breaking => "breaking",
            Compatibility::Compatible => "compatible",
            Compatibility::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An `old -> new` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub old: T,
    pub new: T,
}

// ---------------------------------------------------------------------------
// Diff model
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonInfo {
    pub old_version: String,
    pub new_version: String,
    pub comparison_timestamp: String,
    pub old_snapshot_timestamp: String,
    pub new_snapshot_timestamp: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceChange {
    pub added_bases: Vec<String>,
    pub removed_bases: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Change<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Change<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Change<String>>,
}

impl ParameterDiff {
    fn is_empty(&self) -> bool {
        self.annotation.is_none() && self.default.is_none() && self.kind.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChanges {
    pub added_parameters: Vec<String>,
    pub removed_parameters: Vec<String>,
    pub modified_parameters: BTreeMap<String, ParameterDiff>,
}

impl ParameterChanges {
    pub fn is_empty(&self) -> bool {
        self.added_parameters.is_empty()
            && self.removed_parameters.is_empty()
            && self.modified_parameters.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiChanges {
    pub type_changes: BTreeMap<String, Change<String>>,
    pub module_changes: BTreeMap<String, Change<String>>,
    pub inheritance_changes: BTreeMap<String, InheritanceChange>,
    pub parameter_changes: BTreeMap<String, ParameterChanges>,
    pub return_type_changes: BTreeMap<String, Change<Option<String>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocChange {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub raw_changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Change<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sections_changed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationChanges {
    pub added_docs: Vec<String>,
    pub removed_docs: Vec<String>,
    pub modified_docs: BTreeMap<String, DocChange>,
    pub summary_changes: BTreeMap<String, Change<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakingKind {
    Removal,
    SignatureChange,
    ParameterRemoval,
    ParameterAddition,
    TypeChange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingChange {
    #[serde(rename = "type")]
    pub kind: BreakingKind,
    pub element: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityAnalysis {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_changes: usize,
    pub api_additions: usize,
    pub api_removals: usize,
    pub api_modifications: usize,
    pub breaking_changes_count: usize,
    pub documentation_changes: DocCounts,
    pub severity_analysis: SeverityAnalysis,
    pub compatibility_assessment: Compatibility,
}

/// Everything known about the change from one snapshot to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub comparison_info: ComparisonInfo,
    pub signature_changes: SignatureComparison,
    pub api_changes: ApiChanges,
    pub documentation_changes: DocumentationChanges,
    pub breaking_changes: Vec<BreakingChange>,
    #[serde(default)]
    pub deprecations: Vec<serde_json::Value>,
    pub summary: DiffSummary,
}

// ---------------------------------------------------------------------------
// Pure comparison
// ---------------------------------------------------------------------------

pub fn compare_snapshots(old: &ApiSnapshot, new: &ApiSnapshot) -> DiffResult {
    let signature_changes = compare_signatures(&old.signature_hashes, &new.signature_hashes);
    let api_changes = compare_structures(&old.api_data, &new.api_data);
    let documentation_changes = compare_documentation(&old.api_data, &new.api_data);
    let breaking_changes = breaking_changes(&signature_changes, &api_changes);
    let summary = summarize(&signature_changes, &documentation_changes, &breaking_changes);

    DiffResult {
        comparison_info: ComparisonInfo {
            old_version: old.version.clone(),
            new_version: new.version.clone(),
            comparison_timestamp: now_iso(),
            old_snapshot_timestamp: old.timestamp.clone(),
            new_snapshot_timestamp: new.timestamp.clone(),
        },
        signature_changes,
        api_changes,
        documentation_changes,
        breaking_changes,
        deprecations: Vec::new(),
        summary,
    }
}

fn compare_structures(old: &ApiData, new: &ApiData) -> ApiChanges {
    let mut changes = ApiChanges::default();
    for (name, old_element) in &old.public_api {
        let Some(new_element) = new.public_api.get(name) else {
            continue;
        };
        if old_element.kind != new_element.kind {
            changes.type_changes.insert(
                name.clone(),
                Change {
                    old: old_element.kind.to_string(),
                    new: new_element.kind.to_string(),
                },
            );
        }
        if old_element.module != new_element.module {
            changes.module_changes.insert(
                name.clone(),
                Change {
                    old: old_element.module.clone(),
                    new: new_element.module.clone(),
                },
            );
        }

        if old_element.kind == ElementKind::Class && new_element.kind == ElementKind::Class {
            compare_classes(name, old_element, new_element, &mut changes);
        } else if old_element.kind.is_function_like() && new_element.kind.is_function_like() {
            compare_functions(name, old_element, new_element, &mut changes);
        }
    }
    changes
}

fn compare_classes(name: &str, old: &ApiElement, new: &ApiElement, changes: &mut ApiChanges) {
    let bases = |e: &ApiElement| -> BTreeSet<String> {
        e.class_info
            .as_ref()
            .map(|c| c.base_classes.iter().cloned().collect())
            .unwrap_or_default()
    };
    let (old_bases, new_bases) = (bases(old), bases(new));
    if old_bases != new_bases {
        changes.inheritance_changes.insert(
            name.to_string(),
            InheritanceChange {
                added_bases: new_bases.difference(&old_bases).cloned().collect(),
                removed_bases: old_bases.difference(&new_bases).cloned().collect(),
            },
        );
    }
}

fn compare_functions(name: &str, old: &ApiElement, new: &ApiElement, changes: &mut ApiChanges) {
    let params = |e: &ApiElement| -> BTreeMap<String, Parameter> {
        e.function_info
            .as_ref()
            .map(|f| f.parameters.iter().map(|p| (p.name.clone(), p.clone())).collect())
            .unwrap_or_default()
    };
    let (old_params, new_params) = (params(old), params(new));

    let mut param_changes = ParameterChanges {
        added_parameters: new_params
            .keys()
            .filter(|k| !old_params.contains_key(*k))
            .cloned()
            .collect(),
        removed_parameters: old_params
            .keys()
            .filter(|k| !new_params.contains_key(*k))
            .cloned()
            .collect(),
        ..ParameterChanges::default()
    };
    for (param_name, old_param) in &old_params {
        let Some(new_param) = new_params.get(param_name) else {
            continue;
        };
        let mut diff = ParameterDiff::default();
        if old_param.annotation != new_param.annotation {
            diff.annotation = Some(Change {
                old: old_param.annotation.clone(),
                new: new_param.annotation.clone(),
            });
        }
        if old_param.default != new_param.default {
            diff.default = Some(Change {
                old: old_param.default.clone(),
                new: new_param.default.clone(),
            });
        }
        if old_param.kind != new_param.kind {
            diff.kind = Some(Change {
                old: old_param.kind.as_str().to_string(),
                new: new_param.kind.as_str().to_string(),
            });
        }
        if !diff.is_empty() {
            param_changes.modified_parameters.insert(param_name.clone(), diff);
        }
    }
    if !param_changes.is_empty() {
        changes.parameter_changes.insert(name.to_string(), param_changes);
    }

    let return_annotation =
        |e: &ApiElement| e.function_info.as_ref().and_then(|f| f.return_annotation.clone());
    let (old_return, new_return) = (return_annotation(old), return_annotation(new));
    if old_return != new_return {
        changes.return_type_changes.insert(
            name.to_string(),
            Change {
                old: old_return,
                new: new_return,
            },
        );
    }
}

fn compare_documentation(old: &ApiData, new: &ApiData) -> DocumentationChanges {
    let mut changes = DocumentationChanges {
        added_docs: new
            .docstrings
            .keys()
            .filter(|k| !old.docstrings.contains_key(*k))
            .cloned()
            .collect(),
        removed_docs: old
            .docstrings
            .keys()
            .filter(|k| !new.docstrings.contains_key(*k))
            .cloned()
            .collect(),
        ..DocumentationChanges::default()
    };

    for (name, old_doc) in &old.docstrings {
        let Some(new_doc) = new.docstrings.get(name) else {
            continue;
        };
        let mut change = DocChange {
            raw_changed: old_doc.raw != new_doc.raw,
            sections_changed: old_doc.sections != new_doc.sections,
            ..DocChange::default()
        };
        if old_doc.summary != new_doc.summary {
            let summary = Change {
                old: old_doc.summary.clone(),
                new: new_doc.summary.clone(),
            };
            changes.summary_changes.insert(name.clone(), summary.clone());
            change.summary = Some(summary);
        }
        if change != DocChange::default() {
            changes.modified_docs.insert(name.clone(), change);
        }
    }
    changes
}

/// Render names like a Python list literal: `['a', 'b']`.
fn name_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    format!("[{}]", quoted.join(", "))
}

fn breaking_changes(signatures: &SignatureComparison, api: &ApiChanges) -> Vec<BreakingChange> {
    let mut out = Vec::new();
    for element in &signatures.removed {
        out.push(BreakingChange {
            kind: BreakingKind::Removal,
            element: element.clone(),
            severity: Severity::High,
            description: format!("API element '{element}' was removed"),
        });
    }
    for element in &signatures.modified {
        out.push(BreakingChange {
            kind: BreakingKind::SignatureChange,
            element: element.clone(),
            severity: Severity::Medium,
            description: format!("API signature for '{element}' was modified"),
        });
    }
    for (function, changes) in &api.parameter_changes {
        if !changes.removed_parameters.is_empty() {
            out.push(BreakingChange {
                kind: BreakingKind::ParameterRemoval,
                element: function.clone(),
                severity: Severity::High,
                description: format!(
                    "Parameters removed from '{function}': {}",
                    name_list(&changes.removed_parameters)
                ),
            });
        }
        if !changes.added_parameters.is_empty() {
            out.push(BreakingChange {
                kind: BreakingKind::ParameterAddition,
                element: function.clone(),
                severity: Severity::Medium,
                description: format!(
                    "Parameters added to '{function}': {}",
                    name_list(&changes.added_parameters)
                ),
            });
        }
    }
    for (element, change) in &api.type_changes {
        out.push(BreakingChange {
            kind: BreakingKind::TypeChange,
            element: element.clone(),
            severity: Severity::High,
            description: format!(
                "Type of '{element}' changed from {} to {}",
                change.old, change.new
            ),
        });
    }
    out
}

fn summarize(
    signatures: &SignatureComparison,
    docs: &DocumentationChanges,
    breaking: &[BreakingChange],
) -> DiffSummary {
    let count = |severity: Severity| breaking.iter().filter(|b| b.severity == severity).count();
    DiffSummary {
        total_changes: signatures.added.len()
            + signatures.removed.len()
            + signatures.modified.len(),
        api_additions: signatures.added.len(),
        api_removals: signatures.removed.len(),
        api_modifications: signatures.modified.len(),
        breaking_changes_count: breaking.len(),
        documentation_changes: DocCounts {
            added: docs.added_docs.len(),
            removed: docs.removed_docs.len(),
            modified: docs.modified_docs.len(),
        },
        severity_analysis: SeverityAnalysis {
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
        },
        compatibility_assessment: if breaking.is_empty() {
            Compatibility::Compatible
        } else {
            Compatibility::Breaking
        },
    }
}

// ---------------------------------------------------------------------------
// ApiDiffer
// ---------------------------------------------------------------------------

pub struct ApiDiffer {
    store: SnapshotStore,
    diffs_dir: PathBuf,
}

impl ApiDiffer {
    pub fn new(storage_root: &Path, sensitivity: Sensitivity) -> UltrathinkResult<Self> {
        let diffs_dir = storage_root.join("api_diffs");
        std::fs::create_dir_all(&diffs_dir)?;
        Ok(Self {
            store: SnapshotStore::open(storage_root, sensitivity)?,
            diffs_dir,
        })
    }

    pub fn from_config(config: &UltrathinkConfig) -> UltrathinkResult<Self> {
        Self::new(config.storage_root(), config.hashing.sensitivity)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn create_api_snapshot(
        &self,
        api_data: &ApiData,
        version: &str,
    ) -> UltrathinkResult<PathBuf> {
        self.store.create_api_snapshot(api_data, version)
    }

    pub fn load_latest_snapshot(&self, version: &str) -> Option<ApiSnapshot> {
        self.store.load_latest_snapshot(version)
    }

    /// Diff the latest snapshots of two versions and persist the result.
    pub fn compare_versions(
        &self,
        old_version: &str,
        new_version: &str,
    ) -> UltrathinkResult<DiffResult> {
        let old = self.store.load_latest_snapshot(old_version).ok_or_else(|| {
            UltrathinkError::Value(format!("No snapshot found for version {old_version}"))
        })?;
        let new = self.store.load_latest_snapshot(new_version).ok_or_else(|| {
            UltrathinkError::Value(format!("No snapshot found for version {new_version}"))
        })?;

        let diff = compare_snapshots(&old, &new);
        self.save_diff(&diff)?;
        info!("API comparison completed: {old_version} -> {new_version}");
        Ok(diff)
    }

    pub fn save_diff(&self, diff: &DiffResult) -> UltrathinkResult<PathBuf> {
        let path = self.diffs_dir.join(format!(
            "diff_{}_to_{}_{}.json",
            diff.comparison_info.old_version,
            diff.comparison_info.new_version,
            file_timestamp()
        ));
        write_sorted_json(&path, diff)?;
        info!("Diff saved to {}", path.display());
        Ok(path)
    }

    pub fn version_history(&self) -> Vec<SnapshotEntry> {
        self.store.version_history()
    }

    pub fn cleanup_old_snapshots(&self, retention_days: u64) -> usize {
        self.store.cleanup_old_snapshots(retention_days)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::introspection::hasher::SignatureHasher;
    use crate::models::{ClassInfo, DocstringInfo, FunctionInfo, ParameterKind};

    pub(crate) fn function(
        name: &str,
        params: &[(&str, Option<&str>)],
        ret: Option<&str>,
    ) -> ApiElement {
        let mut element = ApiElement::new(name, ElementKind::Function, "demo.core");
        let parameters: Vec<Parameter> = params
            .iter()
            .map(|(p, annotation)| Parameter {
                name: p.to_string(),
                kind: ParameterKind::PositionalOrKeyword,
                annotation: annotation.map(str::to_string),
                default: None,
                has_default: false,
            })
            .collect();
        element.signature = Some(format!(
            "({})",
            params.iter().map(|(p, _)| *p).collect::<Vec<_>>().join(", ")
        ));
        element.function_info = Some(FunctionInfo {
            parameters,
            return_annotation: ret.map(str::to_string),
            ..FunctionInfo::default()
        });
        element
    }

    pub(crate) fn snapshot(version: &str, elements: Vec<ApiElement>) -> ApiSnapshot {
        let mut data = ApiData::default();
        data.package_info.name = "demo".to_string();
        for element in elements {
            data.public_api.insert(element.name.clone(), element);
        }
        ApiSnapshot::capture(data, version, &SignatureHasher::default())
    }

    #[test]
    fn test_parameter_and_return_changes() {
        let old = function("fetch", &[("a", Some("int")), ("b", None)], Some("list"));
        let new = function("fetch", &[("a", Some("str")), ("c", None)], None);
        let (old, new) = (snapshot("1.0.0", vec![old]), snapshot("1.1.0", vec![new]));
        let diff = compare_snapshots(&old, &new);

        let params = &diff.api_changes.parameter_changes["fetch"];
        assert_eq!(params.added_parameters, vec!["c"]);
        assert_eq!(params.removed_parameters, vec!["b"]);
        assert_eq!(
            params.modified_parameters["a"].annotation,
            Some(Change { old: Some("int".to_string()), new: Some("str".to_string()) })
        );
        assert_eq!(diff.api_changes.return_type_changes["fetch"].old.as_deref(), Some("list"));

        let kinds: Vec<BreakingKind> = diff.breaking_changes.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BreakingKind::SignatureChange,
                BreakingKind::ParameterRemoval,
                BreakingKind::ParameterAddition
            ]
        );
        assert_eq!(
            diff.breaking_changes[1].description,
            "Parameters removed from 'fetch': ['b']"
        );
        assert_eq!(diff.summary.severity_analysis.high, 1);
        assert_eq!(diff.summary.severity_analysis.medium, 2);
        assert_eq!(diff.summary.compatibility_assessment, Compatibility::Breaking);
    }

    #[test]
    fn test_type_module_and_base_changes() {
        let mut class_old = ApiElement::new("Store", ElementKind::Class, "demo.a");
        class_old.class_info = Some(ClassInfo {
            base_classes: vec!["Base".to_string()],
            ..ClassInfo::default()
        });
        let mut class_new = class_old.clone();
        class_new.module = "demo.b".to_string();
        class_new.class_info = Some(ClassInfo {
            base_classes: vec!["Mixin".to_string()],
            ..ClassInfo::default()
        });
        let var_old = ApiElement::new("reader", ElementKind::Variable, "demo");
        let fn_new = function("reader", &[], None);

        let diff = compare_snapshots(
            &snapshot("1", vec![class_old, var_old]),
            &snapshot("2", vec![class_new, fn_new]),
        );
        assert_eq!(diff.api_changes.module_changes["Store"].new, "demo.b");
        assert_eq!(diff.api_changes.inheritance_changes["Store"].added_bases, vec!["Mixin"]);
        assert_eq!(diff.api_changes.inheritance_changes["Store"].removed_bases, vec!["Base"]);
        assert_eq!(diff.api_changes.type_changes["reader"].old, "variable");
        assert!(diff.breaking_changes.iter().any(|b| b.kind == BreakingKind::TypeChange
            && b.description == "Type of 'reader' changed from variable to function"));
    }

    #[test]
    fn test_documentation_changes() {
        let mut old = snapshot("1", vec![]);
        let mut new = snapshot("2", vec![]);
        let doc = |raw: &str, summary: &str| DocstringInfo {
            raw: raw.to_string(),
            summary: summary.to_string(),
            sections: BTreeMap::new(),
        };
        old.api_data.docstrings.insert("a".into(), doc("A.", "A."));
        old.api_data.docstrings.insert("gone".into(), doc("G.", "G."));
        new.api_data.docstrings.insert("a".into(), doc("A!\n\nMore.", "A!"));
        new.api_data.docstrings.insert("fresh".into(), doc("F.", "F."));

        let diff = compare_snapshots(&old, &new);
        let docs = &diff.documentation_changes;
        assert_eq!(docs.added_docs, vec!["fresh"]);
        assert_eq!(docs.removed_docs, vec!["gone"]);
        assert!(docs.modified_docs["a"].raw_changed);
        assert!(!docs.modified_docs["a"].sections_changed);
        assert_eq!(docs.summary_changes["a"].new, "A!");
        assert_eq!(diff.summary.documentation_changes.modified, 1);
    }

    #[test]
    fn test_identical_snapshots_are_compatible() {
        let a = snapshot("1", vec![function("run", &[("x", None)], None)]);
        let b = snapshot("2", vec![function("run", &[("x", None)], None)]);
        let diff = compare_snapshots(&a, &b);
        assert_eq!(diff.summary.total_changes, 0);
        assert!(diff.breaking_changes.is_empty());
        assert_eq!(diff.summary.compatibility_assessment, Compatibility::Compatible);
    }

    #[test]
    fn test_compare_versions_requires_snapshots_and_saves_diff() {
        let dir = tempfile::tempdir().unwrap();
        let differ = ApiDiffer::new(dir.path(), Sensitivity::Strict).unwrap();
        let err = differ.compare_versions("1.0.0", "1.1.0").unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));

        differ
            .create_api_snapshot(&snapshot("x", vec![function("run", &[], None)]).api_data, "1.0.0")
            .unwrap();
        differ
            .create_api_snapshot(&snapshot("x", vec![]).api_data, "1.1.0")
            .unwrap();
        let diff = differ.compare_versions("1.0.0", "1.1.0").unwrap();
        assert_eq!(diff.signature_changes.removed, vec!["run"]);

        let saved: Vec<_> = std::fs::read_dir(dir.path().join("api_diffs"))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].file_name().to_string_lossy().to_string();
        assert!(name.starts_with("diff_1.0.0_to_1.1.0_"));
    }
}
