//! Deprecation candidates, removal plans and deprecation documentation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UltrathinkConfig;
use crate::diffing::classifier::ClassifiedDiff;
use crate::diffing::differ::Severity;
use crate::diffing::version::{bump_version, compare_versions, BumpKind};
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::persist::{file_timestamp, now_iso, write_sorted_json};
use crate::store::tracker::{DeprecationRecord, VersionTracker};

const FOOTER: &str = "---\n*Generated by Ultrathink Documentation System*";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    RemovedWithoutDeprecation,
    BreakingChangeCandidate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationCandidate {
    pub element: String,
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub priority: Severity,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_details: Option<String>,
    pub current_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDeprecation {
    pub element: String,
    pub deprecation_version: String,
    pub removal_version: String,
    pub reason: String,
    pub alternative: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePhase {
    pub phase: String,
    pub version: String,
    pub elements: Vec<String>,
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAction {
    pub action: String,
    pub element: String,
    pub description: String,
    pub priority: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    pub section: String,
    pub entries: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPlan {
    pub changelog_entries: Vec<ChangelogEntry>,
    pub documentation_updates: Vec<String>,
    pub release_notes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationPlan {
    pub plan_id: String,
    pub created: String,
    pub current_version: String,
    pub target_removal_version: String,
    pub deprecations: Vec<PlannedDeprecation>,
    pub timeline: Vec<TimelinePhase>,
    pub immediate_actions: Vec<PlanAction>,
    pub communication_plan: CommunicationPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalCandidate {
    pub element: String,
    pub deprecated_in: String,
    pub removal_target: String,
    pub reason: Option<String>,
    pub alternative: Option<String>,
    pub ready_for_removal: bool,
}

pub struct DeprecationManager {
    plans_dir: PathBuf,
    docs_dir: PathBuf,
    tracker: VersionTracker,
}

impl DeprecationManager {
    pub fn new(storage_root: &Path) -> UltrathinkResult<Self> {
        Ok(Self {
            plans_dir: storage_root.join("deprecation_plans"),
            docs_dir: storage_root.join("generated_docs").join("deprecations"),
            tracker: VersionTracker::new(storage_root)?,
        })
    }

    pub fn from_config(config: &UltrathinkConfig) -> UltrathinkResult<Self> {
        Self::new(config.storage_root())
    }

    pub fn tracker(&self) -> &VersionTracker {
        &self.tracker
    }

    /// Removed elements that were never deprecated, plus high-impact breaking
    /// modifications that could have gone through a deprecation cycle.
    pub fn analyze_deprecation_candidates(
        &self,
        diff: &ClassifiedDiff,
        current_version: &str,
    ) -> UltrathinkResult<Vec<DeprecationCandidate>> {
        let already_deprecated: BTreeSet<String> = self
            .tracker
            .get_deprecations(None)?
            .into_iter()
            .map(|d| d.element_name)
            .collect();

        let mut candidates: Vec<DeprecationCandidate> = diff
            .diff
            .signature_changes
            .removed
            .iter()
            .filter(|e| !already_deprecated.contains(*e))
            .map(|element| DeprecationCandidate {
                element: element.clone(),
                kind: CandidateKind::RemovedWithoutDeprecation,
                priority: Severity::High,
                recommendation: "Should have been deprecated in a previous version".to_string(),
                change_details: None,
                current_version: current_version.to_string(),
            })
            .collect();

        candidates.extend(
            diff.classified_changes
                .modifications
                .iter()
                .filter(|c| c.breaking && matches!(c.severity, Severity::Critical | Severity::High))
                .map(|change| DeprecationCandidate {
                    element: change.element.clone(),
                    kind: CandidateKind::BreakingChangeCandidate,
                    priority: Severity::Medium,
                    recommendation:
                        "Consider deprecating current signature and introducing new one".to_string(),
                    change_details: Some(change.description.clone()),
                    current_version: current_version.to_string(),
                }),
        );

        info!("Identified {} deprecation candidates", candidates.len());
        Ok(candidates)
    }

    /// Plan deprecation of `candidates` from the current version, removing
    /// them in `target_version` (default: next major).
    pub fn create_deprecation_plan(
        &self,
        candidates: &[DeprecationCandidate],
        target_version: Option<&str>,
    ) -> UltrathinkResult<DeprecationPlan> {
        let current = self.tracker.get_current_version()?.ok_or_else(|| {
            UltrathinkError::Value("No current version found in version tracker".to_string())
        })?;
        let current_version = current.version_string;
        let target = match target_version {
            Some(target) => target.to_string(),
            None => bump_version(&current_version, BumpKind::Major)?,
        };

        let mut deprecations = Vec::new();
        let mut immediate_actions = Vec::new();
        for candidate in candidates {
            let element = &candidate.element;
            match candidate.kind {
                CandidateKind::RemovedWithoutDeprecation => immediate_actions.push(PlanAction {
                    action: "document_removal".to_string(),
                    element: element.clone(),
                    description: format!(
                        "Document that {element} was removed without deprecation warning"
                    ),
                    priority: Severity::High,
                }),
                CandidateKind::BreakingChangeCandidate => {
                    deprecations.push(PlannedDeprecation {
                        element: element.clone(),
                        deprecation_version: current_version.clone(),
                        removal_version: target.clone(),
                        reason: candidate
                            .change_details
                            .clone()
                            .unwrap_or_else(|| "Breaking change detected".to_string()),
                        alternative: "TBD - needs manual specification".to_string(),
                    });
                    immediate_actions.push(PlanAction {
                        action: "add_deprecation_warning".to_string(),
                        element: element.clone(),
                        description: format!("Add deprecation warning to {element}"),
                        priority: Severity::High,
                    });
                }
            }
        }

        let timeline = if deprecations.is_empty() {
            Vec::new()
        } else {
            let elements: Vec<String> = deprecations.iter().map(|d| d.element.clone()).collect();
            vec![
                TimelinePhase {
                    phase: "deprecation_warning".to_string(),
                    version: current_version.clone(),
                    elements: elements.clone(),
                    actions: vec![
                        "Add deprecation warning to docstring".to_string(),
                        "Add runtime deprecation warning".to_string(),
                        "Update documentation with deprecation notice".to_string(),
                    ],
                },
                TimelinePhase {
                    phase: "removal".to_string(),
                    version: target.clone(),
                    elements,
                    actions: vec![
                        "Remove deprecated element".to_string(),
                        "Update documentation".to_string(),
                        "Ensure migration guide is complete".to_string(),
                    ],
                },
            ]
        };

        let communication_plan = CommunicationPlan {
            changelog_entries: vec![ChangelogEntry {
                version: current_version.clone(),
                section: "deprecated".to_string(),
                entries: deprecations
                    .iter()
                    .map(|d| format!("Deprecated {}: {}", d.element, d.reason))
                    .collect(),
            }],
            documentation_updates: vec![
                "Update API reference with deprecation warnings".to_string(),
                "Create migration guide for deprecated elements".to_string(),
                "Update examples to use non-deprecated APIs".to_string(),
            ],
            release_notes: vec![
                format!("This version deprecates {} API elements", deprecations.len()),
                format!("Deprecated elements will be removed in version {target}"),
            ],
        };

        let stamp = file_timestamp();
        let mut plan = DeprecationPlan {
            plan_id: format!("deprecation_plan_{stamp}"),
            created: now_iso(),
            current_version,
            target_removal_version: target,
            deprecations,
            timeline,
            immediate_actions,
            communication_plan,
            plan_file: None,
        };
        let path = self.plans_dir.join(format!("{}.json", plan.plan_id));
        plan.plan_file = Some(path.to_string_lossy().to_string());
        write_sorted_json(&path, &plan)?;

        info!(
            "Created deprecation plan with {} elements at {}",
            plan.deprecations.len(),
            path.display()
        );
        Ok(plan)
    }

    /// Write the summary, migration guide and timeline pages from the
    /// recorded deprecations. Returns `kind -> path`.
    pub fn generate_deprecation_documentation(
        &self,
    ) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        let deprecations = self.tracker.get_deprecations(None)?;
        let current = self
            .tracker
            .get_current_version()?
            .map(|v| v.version_string)
            .unwrap_or_else(|| "unknown".to_string());
        std::fs::create_dir_all(&self.docs_dir)?;

        let pages = [
            ("summary", "deprecation_summary.md", render_summary(&deprecations, &current)),
            ("migration_guide", "migration_guide.md", render_migration_guide(&deprecations)),
            ("timeline", "deprecation_timeline.md", render_timeline(&deprecations)),
        ];
        let mut docs = BTreeMap::new();
        for (kind, file, content) in pages {
            let path = self.docs_dir.join(file);
            std::fs::write(&path, content)?;
            docs.insert(kind.to_string(), path);
        }
        info!("Generated {} deprecation documentation files", docs.len());
        Ok(docs)
    }

    pub fn get_active_deprecations(
        &self,
        current_version: Option<&str>,
    ) -> UltrathinkResult<Vec<DeprecationRecord>> {
        self.tracker.get_deprecations(current_version)
    }

    /// Deprecations whose removal target is at or below `current_version`.
    pub fn check_removal_candidates(
        &self,
        current_version: &str,
    ) -> UltrathinkResult<Vec<RemovalCandidate>> {
        let candidates: Vec<RemovalCandidate> = self
            .get_active_deprecations(Some(current_version))?
            .into_iter()
            .filter_map(|dep| {
                let target = dep.removal_target_version?;
                compare_versions(current_version, &target)
                    .is_ge()
                    .then(|| RemovalCandidate {
                        element: dep.element_name,
                        deprecated_in: dep.deprecated_in_version,
                        removal_target: target,
                        reason: dep.reason,
                        alternative: dep.alternative,
                        ready_for_removal: true,
                    })
            })
            .collect();
        info!("Found {} elements ready for removal", candidates.len());
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// Markdown rendering
// ---------------------------------------------------------------------------

fn or_unspecified(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("No reason specified")
}

fn render_summary(deprecations: &[DeprecationRecord], current_version: &str) -> String {
    let mut lines = vec![
        "# Deprecation Summary".to_string(),
        String::new(),
        format!("**Current Version:** {current_version}"),
        format!("**Last Updated:** {}", now_iso()),
        String::new(),
        "## Overview".to_string(),
        String::new(),
        format!(
            "This document summarizes {} deprecated API elements and their removal timeline.",
            deprecations.len()
        ),
        String::new(),
        "## Deprecated Elements".to_string(),
        String::new(),
    ];

    let mut by_version: BTreeMap<&str, Vec<&DeprecationRecord>> = BTreeMap::new();
    for dep in deprecations {
        by_version.entry(dep.deprecated_in_version.as_str()).or_default().push(dep);
    }
    for (version, items) in by_version {
        lines.push(format!("### Deprecated in Version {version}"));
        lines.push(String::new());
        for dep in items {
            lines.push(format!("#### {}", dep.element_name));
            lines.push(String::new());
            lines.push(format!("**Reason:** {}", or_unspecified(&dep.reason)));
            lines.push(format!(
                "**Alternative:** {}",
                dep.alternative.as_deref().unwrap_or("No alternative specified")
            ));
            if let Some(target) = &dep.removal_target_version {
                lines.push(format!("**Removal Target:** {target}"));
            }
            lines.push(String::new());
        }
    }

    lines.extend([
        "## Migration Timeline".to_string(),
        String::new(),
        "1. **Immediate:** Update code to use non-deprecated alternatives".to_string(),
        "2. **Before Next Major Version:** Ensure all deprecated API usage is removed".to_string(),
        "3. **Future Versions:** Deprecated elements will be removed".to_string(),
        String::new(),
        FOOTER.to_string(),
    ]);
    lines.join("\n")
}

fn render_migration_guide(deprecations: &[DeprecationRecord]) -> String {
    let mut lines = vec![
        "# Migration Guide for Deprecated APIs".to_string(),
        String::new(),
        format!("**Generated:** {}", now_iso()),
        String::new(),
        "## Quick Migration Checklist".to_string(),
        String::new(),
        "- [ ] Identify deprecated API usage in your code".to_string(),
        "- [ ] Review alternatives for each deprecated element".to_string(),
        "- [ ] Update code to use new APIs".to_string(),
        "- [ ] Test thoroughly".to_string(),
        String::new(),
        "## Element-by-Element Migration Guide".to_string(),
        String::new(),
    ];
    for dep in deprecations {
        let element = &dep.element_name;
        let alternative = dep.alternative.as_deref().unwrap_or("No alternative specified");
        lines.extend([
            format!("### {element}"),
            String::new(),
            "**Status:** Deprecated".to_string(),
            format!("**Reason:** {}", or_unspecified(&dep.reason)),
            String::new(),
            "1. **Find Usage:**".to_string(),
            "   ```bash".to_string(),
            format!("   grep -r '{element}' your_project/"),
            "   ```".to_string(),
            String::new(),
            "2. **Replace With:**".to_string(),
            "   ```python".to_string(),
            "   # Old (deprecated)".to_string(),
            format!("   # {element}(...)"),
            "   # New (recommended)".to_string(),
            format!("   # {alternative}"),
            "   ```".to_string(),
            String::new(),
            "3. **Verify:** No deprecation warnings in logs".to_string(),
            String::new(),
        ]);
    }
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

fn render_timeline(deprecations: &[DeprecationRecord]) -> String {
    let mut lines = vec![
        "# Deprecation Timeline".to_string(),
        String::new(),
        format!("**Generated:** {}", now_iso()),
        String::new(),
        "## Current Deprecations".to_string(),
        String::new(),
    ];
    for dep in deprecations {
        lines.extend([
            format!("### {}", dep.element_name),
            String::new(),
            format!("- **Deprecated in:** {}", dep.deprecated_in_version),
            format!(
                "- **Removal target:** {}",
                dep.removal_target_version.as_deref().unwrap_or("TBD")
            ),
            format!("- **Reason:** {}", or_unspecified(&dep.reason)),
            String::new(),
        ]);
    }
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffing::classifier::ChangeClassifier;
    use crate::diffing::differ::compare_snapshots;
    use crate::diffing::differ::tests::{function, snapshot};

    fn manager() -> (tempfile::TempDir, DeprecationManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = DeprecationManager::new(dir.path()).unwrap();
        (dir, manager)
    }

    fn classified() -> ClassifiedDiff {
        let diff = compare_snapshots(
            &snapshot(
                "1.0.0",
                vec![
                    function("gone", &[], None),
                    function("old_api", &[], None),
                    function("fetch", &[("a", None), ("b", None)], None),
                ],
            ),
            &snapshot("2.0.0", vec![function("fetch", &[("a", None)], None)]),
        );
        ChangeClassifier::new().classify_changes(diff)
    }

    #[test]
    fn test_candidates_skip_recorded_deprecations() {
        let (_dir, manager) = manager();
        manager.tracker().register_version("1.0.0", None, None).unwrap();
        manager
            .tracker()
            .add_deprecation("old_api", "1.0.0", None, None, None)
            .unwrap();

        let candidates = manager
            .analyze_deprecation_candidates(&classified(), "2.0.0")
            .unwrap();
        let summary: Vec<(&str, CandidateKind)> =
            candidates.iter().map(|c| (c.element.as_str(), c.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("gone", CandidateKind::RemovedWithoutDeprecation),
                ("fetch", CandidateKind::BreakingChangeCandidate),
            ]
        );
        assert_eq!(candidates[1].priority, Severity::Medium);
    }

    #[test]
    fn test_plan_requires_current_version() {
        let (_dir, manager) = manager();
        let err = manager.create_deprecation_plan(&[], None).unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));
    }

    #[test]
    fn test_plan_defaults_to_next_major_and_is_saved() {
        let (dir, manager) = manager();
        manager.tracker().register_version("1.4.0", None, None).unwrap();
        let candidates = manager
            .analyze_deprecation_candidates(&classified(), "1.4.0")
            .unwrap();
        let plan = manager.create_deprecation_plan(&candidates, None).unwrap();

        assert_eq!(plan.target_removal_version, "2.0.0");
        assert_eq!(plan.deprecations.len(), 1);
        assert_eq!(plan.deprecations[0].deprecation_version, "1.4.0");
        assert_eq!(plan.immediate_actions.len(), 3);
        assert_eq!(plan.timeline[1].phase, "removal");
        assert_eq!(
            plan.communication_plan.release_notes[1],
            "Deprecated elements will be removed in version 2.0.0"
        );

        let saved = PathBuf::from(plan.plan_file.as_ref().unwrap());
        assert!(saved.starts_with(dir.path().join("deprecation_plans")));
        let reloaded: DeprecationPlan =
            serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(reloaded.plan_id, plan.plan_id);
    }

    #[test]
    fn test_documentation_and_removal_candidates() {
        let (dir, manager) = manager();
        let tracker = manager.tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        tracker.register_version("2.0.0", None, None).unwrap();
        tracker
            .add_deprecation("old_fetch", "1.0.0", Some("2.0.0"), Some("slow"), Some("fetch"))
            .unwrap();
        tracker
            .add_deprecation("later", "1.0.0", None, None, None)
            .unwrap();

        let docs = manager.generate_deprecation_documentation().unwrap();
        assert_eq!(docs.len(), 3);
        let summary = std::fs::read_to_string(&docs["summary"]).unwrap();
        assert!(summary.contains("#### old_fetch"));
        assert!(summary.contains("**Removal Target:** 2.0.0"));
        assert!(docs["timeline"].starts_with(dir.path().join("generated_docs/deprecations")));

        let ready = manager.check_removal_candidates("2.0.0").unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].element, "old_fetch");
        assert!(manager.check_removal_candidates("1.0.0").unwrap().is_empty());
    }
}
