//! Severity and compatibility classification of a [`DiffResult`].
//!
//! Additions and removals are classified by name through ordered
//! [`NameRule`] tables. These are substring heuristics and will misfire on
//! names that happen to contain a pattern. Modifications are classified from
//! the structural changes the differ recorded for the element.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UltrathinkConfig;
use crate::diffing::differ::{
    Change, Compatibility, DiffResult, InheritanceChange, ParameterChanges, Severity,
};
use crate::diffing::version::{bump_version, parse_version, BumpKind};

const DEFAULT_CORE_PATTERNS: &[&str] = &["collector", "filler", "data", "csv", "operations"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Addition,
    Removal,
    Modification,
    Deprecation,
    Move,
    Rename,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Addition => "addition",
            ChangeType::Removal => "removal",
            ChangeType::Modification => "modification",
            ChangeType::Deprecation => "deprecation",
            ChangeType::Move => "move",
            ChangeType::Rename => "rename",
        }
    }
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameMatcher {
    /// Name starts with the literal prefix.
    Prefix(String),
    /// Lowercased name contains any of the (lowercase) patterns.
    ContainsAny(Vec<String>),
}

impl NameMatcher {
    fn contains_any(patterns: &[&str]) -> Self {
        NameMatcher::ContainsAny(patterns.iter().map(|p| p.to_lowercase()).collect())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NameMatcher::ContainsAny(patterns) => {
                let lower = name.to_lowercase();
                patterns.iter().any(|p| lower.contains(p.as_str()))
            }
        }
    }
}

/// A named name-based rule. When it matches, `severity` replaces the current
/// severity and `remark` is appended to the description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRule {
    pub label: &'static str,
    pub matcher: NameMatcher,
    pub severity: Severity,
    pub remark: &'static str,
}

fn addition_rules() -> Vec<NameRule> {
    vec![
        NameRule {
            label: "initialization_or_required",
            matcher: NameMatcher::contains_any(&["__init__", "required", "mandatory"]),
            severity: Severity::Low,
            remark: " - may require updates to existing usage",
        },
        NameRule {
            label: "abstract_interface",
            matcher: NameMatcher::contains_any(&["abstract", "interface", "protocol"]),
            severity: Severity::Low,
            remark: " - new abstract interface",
        },
    ]
}

fn removal_rules(core_patterns: &[String]) -> Vec<NameRule> {
    let core: Vec<&str> = if core_patterns.is_empty() {
        DEFAULT_CORE_PATTERNS.to_vec()
    } else {
        core_patterns.iter().map(String::as_str).collect()
    };
    vec![
        NameRule {
            label: "private",
            matcher: NameMatcher::Prefix("_".to_string()),
            severity: Severity::High,
            remark: " (internal/private element)",
        },
        NameRule {
            label: "deprecated",
            matcher: NameMatcher::contains_any(&["deprecated"]),
            severity: Severity::Medium,
            remark: " (previously deprecated)",
        },
        NameRule {
            label: "core_functionality",
            matcher: NameMatcher::contains_any(&core),
            severity: Severity::Critical,
            remark: " (core functionality)",
        },
    ]
}

fn apply_rules(rules: &[NameRule], change: &mut ClassifiedChange) {
    for rule in rules.iter().filter(|r| r.matcher.matches(&change.element)) {
        change.severity = rule.severity;
        change.description.push_str(rule.remark);
    }
}

// ---------------------------------------------------------------------------
// Output model
// ---------------------------------------------------------------------------

/// Structural changes the differ recorded for one modified element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_changes: Option<ParameterChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Change<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Change<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Change<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<InheritanceChange>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedChange {
    pub element: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    pub compatibility_impact: Compatibility,
    pub description: String,
    pub breaking: bool,
    pub deprecation_target: Option<String>,
    pub migration_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_details: Option<ChangeDetails>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub total_changes: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_compatibility: BTreeMap<String, usize>,
    pub breaking_changes_count: usize,
    pub critical_changes: Vec<String>,
    pub migration_required: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedChanges {
    pub additions: Vec<ClassifiedChange>,
    pub removals: Vec<ClassifiedChange>,
    pub modifications: Vec<ClassifiedChange>,
    pub summary: ClassificationSummary,
}

impl ClassifiedChanges {
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedChange> {
        self.additions
            .iter()
            .chain(&self.removals)
            .chain(&self.modifications)
    }
}

/// A diff with its classification attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedDiff {
    #[serde(flatten)]
    pub diff: DiffResult,
    pub classified_changes: ClassifiedChanges,
    pub compatibility_impact: Compatibility,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSuggestion {
    pub current_version: String,
    pub suggested_bump: Option<BumpKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_version: Option<String>,
    pub reason: String,
    pub breaking_changes: usize,
    pub total_changes: usize,
    pub critical_changes: usize,
    pub migration_required: usize,
}

// ---------------------------------------------------------------------------
// ChangeClassifier
// ---------------------------------------------------------------------------

pub struct ChangeClassifier {
    addition_rules: Vec<NameRule>,
    removal_rules: Vec<NameRule>,
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeClassifier {
    pub fn new() -> Self {
        Self::with_core_patterns(&[])
    }

    /// Classifier whose "core functionality" removal rule uses `patterns`
    /// instead of the built-in list. An empty slice keeps the built-in list.
    pub fn with_core_patterns(patterns: &[String]) -> Self {
        Self {
            addition_rules: addition_rules(),
            removal_rules: removal_rules(patterns),
        }
    }

    pub fn from_config(config: &UltrathinkConfig) -> Self {
        Self::with_core_patterns(&config.classification.core_patterns)
    }

    pub fn addition_rules(&self) -> &[NameRule] {
        &self.addition_rules
    }

    pub fn removal_rules(&self) -> &[NameRule] {
        &self.removal_rules
    }

    pub fn classify_changes(&self, diff: DiffResult) -> ClassifiedDiff {
        let mut classified = ClassifiedChanges {
            additions: diff
                .signature_changes
                .added
                .iter()
                .map(|e| self.classify_addition(e))
                .collect(),
            removals: diff
                .signature_changes
                .removed
                .iter()
                .map(|e| self.classify_removal(e))
                .collect(),
            modifications: diff
                .signature_changes
                .modified
                .iter()
                .map(|e| classify_modification(e, element_details(e, &diff)))
                .collect(),
            summary: ClassificationSummary::default(),
        };
        classified.summary = summarize(&classified);

        let compatibility_impact = if classified.summary.breaking_changes_count > 0 {
            Compatibility::Breaking
        } else {
            Compatibility::Compatible
        };
        info!("Change classification completed");
        ClassifiedDiff {
            diff,
            classified_changes: classified,
            compatibility_impact,
        }
    }

    fn classify_addition(&self, element: &str) -> ClassifiedChange {
        let mut change = ClassifiedChange {
            element: element.to_string(),
            change_type: ChangeType::Addition,
            severity: Severity::Info,
            compatibility_impact: Compatibility::Compatible,
            description: format!("New API element '{element}' added"),
            breaking: false,
            deprecation_target: None,
            migration_notes: None,
            change_details: None,
        };
        apply_rules(&self.addition_rules, &mut change);
        change
    }

    fn classify_removal(&self, element: &str) -> ClassifiedChange {
        let mut change = ClassifiedChange {
            element: element.to_string(),
            change_type: ChangeType::Removal,
            severity: Severity::Critical,
            compatibility_impact: Compatibility::Breaking,
            description: format!("API element '{element}' removed"),
            breaking: true,
            deprecation_target: None,
            migration_notes: Some(format!("Remove usage of '{element}' - no longer available")),
            change_details: None,
        };
        apply_rules(&self.removal_rules, &mut change);
        change
    }
}

fn element_details(element: &str, diff: &DiffResult) -> ChangeDetails {
    let api = &diff.api_changes;
    ChangeDetails {
        parameter_changes: api.parameter_changes.get(element).cloned(),
        return_type: api.return_type_changes.get(element).cloned(),
        element_type: api.type_changes.get(element).cloned(),
        module: api.module_changes.get(element).cloned(),
        inheritance: api.inheritance_changes.get(element).cloned(),
    }
}

fn classify_modification(element: &str, details: ChangeDetails) -> ClassifiedChange {
    let mut indicators: Vec<(String, Severity)> = Vec::new();

    if let Some(params) = &details.parameter_changes {
        if !params.removed_parameters.is_empty() {
            indicators.push(("Parameters removed".to_string(), Severity::Critical));
        }
        if !params.added_parameters.is_empty() {
            indicators.push(("Parameters added".to_string(), Severity::Medium));
        }
        for (name, diff) in &params.modified_parameters {
            if diff.annotation.is_some() {
                indicators.push((format!("Parameter type changed: {name}"), Severity::High));
            }
            if diff.kind.is_some() {
                indicators.push((format!("Parameter kind changed: {name}"), Severity::High));
            }
        }
    }
    if details.return_type.is_some() {
        indicators.push(("Return type changed".to_string(), Severity::High));
    }
    if let Some(inheritance) = &details.inheritance {
        if !inheritance.removed_bases.is_empty() {
            indicators.push(("Base classes removed".to_string(), Severity::High));
        }
        if !inheritance.added_bases.is_empty() {
            indicators.push(("Base classes added".to_string(), Severity::Low));
        }
    }
    if details.element_type.is_some() {
        indicators.push(("Element type changed".to_string(), Severity::Critical));
    }
    if details.module.is_some() {
        indicators.push(("Module location changed".to_string(), Severity::Medium));
    }

    let mut change = ClassifiedChange {
        element: element.to_string(),
        change_type: ChangeType::Modification,
        severity: Severity::Low,
        compatibility_impact: Compatibility::Compatible,
        description: format!("API element '{element}' modified"),
        breaking: false,
        deprecation_target: None,
        migration_notes: None,
        change_details: None,
    };

    if indicators.is_empty() {
        change.description.push_str(" - non-breaking changes");
    } else {
        let has = |s: Severity| indicators.iter().any(|(_, sev)| *sev == s);
        change.severity = if has(Severity::Critical) {
            Severity::Critical
        } else if has(Severity::High) {
            Severity::High
        } else {
            Severity::Medium
        };
        change.breaking = true;
        change.compatibility_impact = Compatibility::Breaking;
        let labels: Vec<&str> = indicators.iter().map(|(l, _)| l.as_str()).collect();
        change.description.push_str(&format!(" - {}", labels.join(", ")));
        change.migration_notes = Some(migration_notes(element, &details));
    }
    change.change_details = Some(details);
    change
}

fn migration_notes(element: &str, details: &ChangeDetails) -> String {
    let mut notes = vec![format!("Migration required for '{element}':")];
    if let Some(params) = &details.parameter_changes {
        if !params.removed_parameters.is_empty() {
            notes.push(format!("- Remove parameters: {}", params.removed_parameters.join(", ")));
        }
        if !params.added_parameters.is_empty() {
            notes.push(format!("- Add parameters: {}", params.added_parameters.join(", ")));
        }
    }
    if let Some(ret) = &details.return_type {
        notes.push(format!(
            "- Update return type handling: {} -> {}",
            ret.old.as_deref().unwrap_or("None"),
            ret.new.as_deref().unwrap_or("None")
        ));
    }
    if let Some(kind) = &details.element_type {
        notes.push(format!("- Element type changed: {} -> {}", kind.old, kind.new));
    }
    if let Some(module) = &details.module {
        notes.push(format!("- Update import: from {} to {}", module.old, module.new));
    }
    notes.join("\n")
}

fn summarize(classified: &ClassifiedChanges) -> ClassificationSummary {
    let mut summary = ClassificationSummary::default();
    for change in classified.iter() {
        summary.total_changes += 1;
        *summary.by_type.entry(change.change_type.as_str().to_string()).or_default() += 1;
        *summary.by_severity.entry(change.severity.as_str().to_string()).or_default() += 1;
        *summary
            .by_compatibility
            .entry(change.compatibility_impact.as_str().to_string())
            .or_default() += 1;
        if change.breaking {
            summary.breaking_changes_count += 1;
        }
        if change.severity == Severity::Critical {
            summary.critical_changes.push(change.element.clone());
        }
        if change.migration_notes.is_some() {
            summary.migration_required.push(change.element.clone());
        }
    }
    summary
}

/// Map classified changes onto a semver bump.
pub fn suggest_version_bump(
    classified: &ClassifiedChanges,
    current_version: &str,
) -> VersionSuggestion {
    let summary = &classified.summary;
    let additions = summary.by_type.get("addition").copied().unwrap_or(0);

    let (bump, reason) = if summary.breaking_changes_count > 0 {
        (
            Some(BumpKind::Major),
            format!(
                "Breaking changes detected ({} breaking changes)",
                summary.breaking_changes_count
            ),
        )
    } else if additions > 0 {
        (
            Some(BumpKind::Minor),
            format!("New features added ({additions} additions)"),
        )
    } else if summary.total_changes > 0 {
        (
            Some(BumpKind::Patch),
            format!(
                "Bug fixes or documentation changes ({} changes)",
                summary.total_changes
            ),
        )
    } else {
        (None, "No changes detected".to_string())
    };

    let suggested_version = bump
        .filter(|_| parse_version(current_version).is_valid_semver)
        .and_then(|b| bump_version(current_version, b).ok());

    VersionSuggestion {
        current_version: current_version.to_string(),
        suggested_bump: bump,
        suggested_version,
        reason,
        breaking_changes: summary.breaking_changes_count,
        total_changes: summary.total_changes,
        critical_changes: summary.critical_changes.len(),
        migration_required: summary.migration_required.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffing::differ::compare_snapshots;
    use crate::diffing::differ::tests::{function, snapshot};

    fn classify(
        old: Vec<crate::models::ApiElement>,
        new: Vec<crate::models::ApiElement>,
    ) -> ClassifiedDiff {
        let diff = compare_snapshots(&snapshot("1.0.0", old), &snapshot("1.1.0", new));
        ChangeClassifier::new().classify_changes(diff)
    }

    #[test]
    fn test_addition_rules() {
        let classifier = ChangeClassifier::new();
        let plain = classifier.classify_addition("fetch");
        assert_eq!(plain.severity, Severity::Info);
        assert!(!plain.breaking);

        let abstract_iface = classifier.classify_addition("AbstractReader");
        assert_eq!(abstract_iface.severity, Severity::Low);
        assert_eq!(
            abstract_iface.description,
            "New API element 'AbstractReader' added - new abstract interface"
        );
    }

    #[test]
    fn test_removal_rules_accumulate_remarks() {
        let classifier = ChangeClassifier::new();
        let private = classifier.classify_removal("_helper");
        assert_eq!(private.severity, Severity::High);

        let deprecated = classifier.classify_removal("old_deprecated_fn");
        assert_eq!(deprecated.severity, Severity::Medium);

        // Later rules override severity, remarks stack.
        let both = classifier.classify_removal("_deprecated_data");
        assert_eq!(both.severity, Severity::Critical);
        assert_eq!(
            both.description,
            concat!(
                "API element '_deprecated_data' removed (internal/private element) ",
                "(previously deprecated) (core functionality)",
            )
        );
        assert_eq!(
            both.migration_notes.as_deref(),
            Some("Remove usage of '_deprecated_data' - no longer available")
        );
    }

    #[test]
    fn test_core_patterns_are_configurable() {
        let classifier = ChangeClassifier::with_core_patterns(&["Engine".to_string()]);
        assert_eq!(classifier.classify_removal("render_engine").severity, Severity::Critical);
        // "data" is no longer a core pattern once overridden.
        assert_eq!(classifier.classify_removal("_load_data").severity, Severity::High);
        assert_eq!(classifier.removal_rules()[2].label, "core_functionality");
    }

    #[test]
    fn test_modification_with_parameter_removal() {
        let classified = classify(
            vec![function("fetch", &[("a", None), ("b", None)], Some("int"))],
            vec![function("fetch", &[("a", None)], Some("str"))],
        );
        let change = &classified.classified_changes.modifications[0];
        assert_eq!(change.severity, Severity::Critical);
        assert!(change.breaking);
        assert_eq!(
            change.description,
            "API element 'fetch' modified - Parameters removed, Return type changed"
        );
        assert_eq!(
            change.migration_notes.as_deref(),
            Some(concat!(
                "Migration required for 'fetch':\n",
                "- Remove parameters: b\n",
                "- Update return type handling: int -> str",
            ))
        );
        assert_eq!(classified.compatibility_impact, Compatibility::Breaking);
        assert_eq!(classified.classified_changes.summary.critical_changes, vec!["fetch"]);
    }

    #[test]
    fn test_modification_without_structural_change_is_compatible() {
        let mut new = function("fetch", &[("a", None)], None);
        new.signature = Some("(a, /)".to_string());
        let classified = classify(vec![function("fetch", &[("a", None)], None)], vec![new]);
        let change = &classified.classified_changes.modifications[0];
        assert_eq!(change.severity, Severity::Low);
        assert!(!change.breaking);
        assert!(change.description.ends_with(" - non-breaking changes"));
        assert_eq!(classified.compatibility_impact, Compatibility::Compatible);
    }

    #[test]
    fn test_suggest_version_bump() {
        let breaking = classify(vec![function("fetch", &[], None)], vec![]);
        let suggestion = suggest_version_bump(&breaking.classified_changes, "1.4.2");
        assert_eq!(suggestion.suggested_bump, Some(BumpKind::Major));
        assert_eq!(suggestion.suggested_version.as_deref(), Some("2.0.0"));

        let additive = classify(vec![], vec![function("fetch", &[], None)]);
        let suggestion = suggest_version_bump(&additive.classified_changes, "1.4.2");
        assert_eq!(suggestion.suggested_bump, Some(BumpKind::Minor));
        assert_eq!(suggestion.reason, "New features added (1 additions)");

        let unchanged = classify(vec![], vec![]);
        let suggestion = suggest_version_bump(&unchanged.classified_changes, "not-a-version");
        assert_eq!(suggestion.suggested_bump, None);
        assert_eq!(suggestion.suggested_version, None);
        assert_eq!(suggestion.reason, "No changes detected");
    }
}
