//! Merge gate over documentation quality and API change policy.
//!
//! A gate evaluation runs five checks (completeness, doctests, API changes,
//! breaking-change documentation, new-API documentation) and folds them into
//! one status. A check that errors becomes an `error` entry; evaluation
//! always returns a [`GateResult`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::UltrathinkConfig;
use crate::diffing::classifier::{ChangeClassifier, ChangeType, ClassifiedDiff};
use crate::diffing::differ::{compare_snapshots, ApiDiffer};
use crate::diffing::snapshot::ApiSnapshot;
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::generation::Markdown;
use crate::introspection::extractor::ApiExtractor;
use crate::models::ApiData;
use crate::persist::{file_timestamp, now_iso, write_sorted_json};
use crate::store::tracker::VersionTracker;
use crate::validation::completeness::CompletenessChecker;
use crate::validation::doctest::DoctestValidator;

/// Docstrings shorter than this do not count as documentation for new APIs.
pub const MIN_NEW_API_DOC_CHARS: usize = 20;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How many breaking changes a gate accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakingChangeTolerance {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl BreakingChangeTolerance {
    /// Upper bound on breaking changes, `None` meaning unlimited.
    pub fn max_allowed(&self) -> Option<usize> {
        match self {
            Self::None => Some(0),
            Self::Low => Some(1),
            Self::Medium => Some(5),
            Self::High => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for BreakingChangeTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakingChangeTolerance {
    type Err = UltrathinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UltrathinkError::Value(format!(
                "Unknown breaking change tolerance: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Which pair of tracked versions a gate compares, plus free-form labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl GateContext {
    pub fn between(base: &str, head: &str) -> Self {
        Self {
            base_version: Some(base.to_string()),
            head_version: Some(head.to_string()),
            ..Self::default()
        }
    }

    fn version_pair(&self) -> Option<(&str, &str)> {
        Some((self.base_version.as_deref()?, self.head_version.as_deref()?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
    Skipped,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    fn emoji(&self) -> &'static str {
        match self {
            Self::Passed => "✅",
            Self::Warning => "⚠️",
            Self::Failed => "❌",
            Self::Skipped => "⏭️",
            Self::Error => "💥",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateCheck {
    pub status: CheckStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl GateCheck {
    pub fn new(status: CheckStatus, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    fn error(message: String, err: &UltrathinkError) -> Self {
        Self::new(CheckStatus::Error, message, json!({ "error": err.to_string() }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Passed,
    Warning,
    Failed,
    Overridden,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Overridden => "overridden",
        }
    }

    /// Whether the gate lets the change through.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideStatus {
    Applied,
    Denied,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub override_timestamp: String,
    pub override_user: String,
    pub override_reason: String,
    pub override_status: OverrideStatus,
    pub message: String,
    pub context: GateContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_timestamp: String,
    pub package_name: String,
    pub context: GateContext,
    pub gate_status: GateStatus,
    pub gate_checks: IndexMap<String, GateCheck>,
    pub blocking_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub override_allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_override: Option<OverrideRecord>,
}

impl GateResult {
    pub fn check_status(&self, name: &str) -> Option<CheckStatus> {
        self.gate_checks.get(name).map(|c| c.status)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

pub struct DocumentationGate {
    package: String,
    config: UltrathinkConfig,
}

impl DocumentationGate {
    pub fn new(package: &str, config: &UltrathinkConfig) -> Self {
        Self {
            package: package.to_string(),
            config: config.clone(),
        }
    }

    pub fn evaluate_documentation_gate(&self, context: &GateContext) -> GateResult {
        info!("Evaluating documentation gate for {}", self.package);

        let api = ApiExtractor::new(&self.package, &self.config.package.source_directory)
            .extract_complete_api();
        let diff = context
            .version_pair()
            .map(|(base, head)| self.classified_diff(base, head));

        let mut checks = IndexMap::new();
        checks.insert(
            "completeness".to_string(),
            self.api_check("Completeness check", &api, Self::check_completeness),
        );
        checks.insert(
            "doctest_validation".to_string(),
            self.api_check("Doctest validation", &api, Self::check_doctests),
        );
        checks.insert(
            "api_changes".to_string(),
            self.diff_check("API change check", &diff, Self::check_api_changes),
        );
        checks.insert(
            "breaking_changes".to_string(),
            self.diff_check(
                "Breaking change documentation check",
                &diff,
                Self::check_breaking_documentation,
            ),
        );
        checks.insert(
            "new_apis".to_string(),
            self.diff_check("New API documentation check", &diff, Self::check_new_apis),
        );

        let mut result = GateResult {
            gate_timestamp: now_iso(),
            package_name: self.package.clone(),
            context: context.clone(),
            gate_status: GateStatus::Passed,
            gate_checks: checks,
            blocking_issues: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            override_allowed: false,
            override_reason: None,
            applied_override: None,
        };
        self.fold_status(&mut result);
        result.recommendations = recommendations(&result);

        info!("Documentation gate evaluation completed: {}", result.gate_status.as_str());
        result
    }

    fn api_check(
        &self,
        label: &str,
        api: &UltrathinkResult<ApiData>,
        check: fn(&Self, &ApiData) -> UltrathinkResult<GateCheck>,
    ) -> GateCheck {
        match api {
            Ok(api) => guard(label, check(self, api)),
            Err(e) => GateCheck::error(format!("{label} failed: {e}"), e),
        }
    }

    /// Diff-dependent checks are skipped without a version pair.
    fn diff_check(
        &self,
        label: &str,
        diff: &Option<UltrathinkResult<(ClassifiedDiff, ApiData)>>,
        check: fn(&Self, &ClassifiedDiff, &ApiData) -> UltrathinkResult<GateCheck>,
    ) -> GateCheck {
        match diff {
            None => GateCheck::new(
                CheckStatus::Skipped,
                "No version comparison context available",
                json!({}),
            ),
            Some(Ok((classified, head))) => guard(label, check(self, classified, head)),
            Some(Err(e)) => GateCheck::error(format!("{label} failed: {e}"), e),
        }
    }

    fn classified_diff(
        &self,
        base: &str,
        head: &str,
    ) -> UltrathinkResult<(ClassifiedDiff, ApiData)> {
        let differ = ApiDiffer::from_config(&self.config)?;
        let head_snapshot = differ
            .load_latest_snapshot(head)
            .ok_or_else(|| {
                UltrathinkError::Value(format!("No snapshot found for version {head}"))
            })?;
        let diff = differ.compare_versions(base, head)?;
        let classified = ChangeClassifier::from_config(&self.config).classify_changes(diff);
        Ok((classified, head_snapshot.api_data))
    }

    fn check_completeness(&self, api: &ApiData) -> UltrathinkResult<GateCheck> {
        let threshold = self.config.validation.completeness_threshold;
        let result = CompletenessChecker::from_config(&self.config, &self.package)
            .check_documentation_completeness(api, threshold)?;
        let pct = result.completeness_percentage;
        let required = threshold * 100.0;
        let details = json!({
            "completeness_percentage": pct,
            "total_elements": result.total_elements,
            "documented_elements": result.documented_elements,
            "partially_documented_elements": result.partially_documented_elements,
            "undocumented_elements": result.undocumented_elements,
            "result_file": result.result_file,
        });
        Ok(if pct >= required {
            GateCheck::new(
                CheckStatus::Passed,
                format!("Documentation completeness: {pct:.1}% (threshold: {required:.1}%)"),
                details,
            )
        } else {
            GateCheck::new(
                CheckStatus::Failed,
                format!("Documentation completeness below threshold: {pct:.1}% < {required:.1}%"),
                details,
            )
        })
    }

    fn check_doctests(&self, api: &ApiData) -> UltrathinkResult<GateCheck> {
        let validation = DoctestValidator::from_config(&self.config, &self.package)
            .validate_package_doctests(api)?;
        let details = json!({
            "total_tests": validation.total_tests,
            "passed_tests": validation.passed_tests,
            "failed_tests": validation.failed_tests,
            "error_tests": validation.error_tests,
            "skipped_tests": validation.skipped_tests,
            "result_file": validation.result_file,
        });

        let Some(rate) = validation.pass_rate() else {
            let message = if validation.total_tests == 0 {
                "No doctests found".to_string()
            } else {
                format!("Doctest execution disabled: {} tests skipped", validation.skipped_tests)
            };
            return Ok(GateCheck::new(CheckStatus::Warning, message, details));
        };

        let required = self.config.validation.doctest_pass_rate;
        let executed = validation.total_tests - validation.skipped_tests;
        Ok(if rate >= required {
            GateCheck::new(
                CheckStatus::Passed,
                format!(
                    "Doctests passed: {}/{executed} ({:.1}%)",
                    validation.passed_tests,
                    rate * 100.0
                ),
                details,
            )
        } else {
            GateCheck::new(
                CheckStatus::Failed,
                format!(
                    "Doctest pass rate below threshold: {:.1}% < {:.1}%",
                    rate * 100.0,
                    required * 100.0
                ),
                details,
            )
        })
    }

    fn check_api_changes(
        &self,
        classified: &ClassifiedDiff,
        _head: &ApiData,
    ) -> UltrathinkResult<GateCheck> {
        let summary = &classified.classified_changes.summary;
        let breaking = summary.breaking_changes_count;
        let tolerance = self.config.gating.breaking_change_tolerance;
        let details = json!({
            "total_changes": summary.total_changes,
            "breaking_changes": breaking,
            "tolerance": tolerance.as_str(),
            "compatibility_impact": classified.compatibility_impact.as_str(),
        });

        Ok(match tolerance.max_allowed() {
            Some(0) if breaking > 0 => GateCheck::new(
                CheckStatus::Failed,
                format!("Breaking changes not allowed: {breaking} detected"),
                details,
            ),
            Some(max) if breaking > max => GateCheck::new(
                CheckStatus::Failed,
                format!("Too many breaking changes: {breaking} > {max}"),
                details,
            ),
            _ if summary.total_changes == 0 => {
                GateCheck::new(CheckStatus::Passed, "No API changes detected", details)
            }
            _ => GateCheck::new(
                CheckStatus::Passed,
                format!(
                    "API changes acceptable: {} total, {breaking} breaking",
                    summary.total_changes
                ),
                details,
            ),
        })
    }

    fn check_breaking_documentation(
        &self,
        classified: &ClassifiedDiff,
        _head: &ApiData,
    ) -> UltrathinkResult<GateCheck> {
        let breaking: Vec<_> =
            classified.classified_changes.iter().filter(|c| c.breaking).collect();
        if breaking.is_empty() {
            return Ok(GateCheck::new(
                CheckStatus::Passed,
                "No breaking changes to document",
                json!({}),
            ));
        }

        let deprecated: Vec<String> = VersionTracker::from_config(&self.config)?
            .get_deprecations(None)?
            .into_iter()
            .map(|d| d.element_name)
            .collect();

        let mut issues = Vec::new();
        for change in &breaking {
            if change.migration_notes.as_deref().map_or(true, |n| n.trim().is_empty()) {
                issues.push(json!({
                    "element": change.element,
                    "issue": "missing_migration_notes",
                    "change_type": change.change_type.as_str(),
                }));
            }
            if change.change_type == ChangeType::Removal && !deprecated.contains(&change.element) {
                issues.push(json!({
                    "element": change.element,
                    "issue": "removal_without_deprecation",
                    "change_type": change.change_type.as_str(),
                }));
            }
        }

        let elements: Vec<&str> = breaking.iter().map(|c| c.element.as_str()).collect();
        Ok(if issues.is_empty() {
            GateCheck::new(
                CheckStatus::Passed,
                format!("Breaking changes properly documented: {} changes", breaking.len()),
                json!({ "breaking_changes": elements }),
            )
        } else {
            GateCheck::new(
                CheckStatus::Failed,
                format!("Breaking changes lack proper documentation: {} issues", issues.len()),
                json!({ "issues": issues, "breaking_changes": elements }),
            )
        })
    }

    fn check_new_apis(
        &self,
        classified: &ClassifiedDiff,
        head: &ApiData,
    ) -> UltrathinkResult<GateCheck> {
        Ok(check_new_api_documentation(classified, head))
    }

    /// New-API documentation check of the current sources against the
    /// latest snapshot of `base`, without running the rest of the gate.
    pub fn check_new_apis_since(&self, base: &str) -> UltrathinkResult<GateCheck> {
        let differ = ApiDiffer::from_config(&self.config)?;
        let old = differ
            .load_latest_snapshot(base)
            .ok_or_else(|| {
                UltrathinkError::Value(format!("No snapshot found for version {base}"))
            })?;
        let api = ApiExtractor::new(&self.package, &self.config.package.source_directory)
            .extract_complete_api()?;
        let head = ApiSnapshot::capture(api, "working-tree", differ.store().hasher());
        let classified = ChangeClassifier::from_config(&self.config)
            .classify_changes(compare_snapshots(&old, &head));
        Ok(check_new_api_documentation(&classified, &head.api_data))
    }

    fn fold_status(&self, result: &mut GateResult) {
        let mut blocking_checks = Vec::new();
        for (name, check) in &result.gate_checks {
            match check.status {
                CheckStatus::Failed | CheckStatus::Error => {
                    blocking_checks.push(name.clone());
                    result.blocking_issues.push(format!("{name}: {}", check.message));
                }
                CheckStatus::Warning => result.warnings.push(format!("{name}: {}", check.message)),
                CheckStatus::Passed | CheckStatus::Skipped => {}
            }
        }

        result.gate_status = if !blocking_checks.is_empty() {
            if self.config.gating.require_maintainer_override {
                result.override_allowed = true;
                result.override_reason =
                    Some(format!("Failed checks: {}", blocking_checks.join(", ")));
            }
            GateStatus::Failed
        } else if !result.warnings.is_empty() {
            GateStatus::Warning
        } else {
            GateStatus::Passed
        };
    }

    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    pub fn check_override_permission(&self, user: &str) -> bool {
        self.config.gating.maintainers.iter().any(|m| m == user)
    }

    /// Let a maintainer open a failed gate. Applied overrides are persisted
    /// under `gate_overrides/` and flip the gate to `overridden`; denied ones
    /// leave the gate untouched.
    pub fn apply_maintainer_override(
        &self,
        gate: &mut GateResult,
        user: &str,
        reason: &str,
    ) -> UltrathinkResult<OverrideRecord> {
        if gate.gate_status != GateStatus::Failed {
            return Err(UltrathinkError::Value(format!(
                "Gate is {}; only a failed gate can be overridden",
                gate.gate_status.as_str()
            )));
        }

        let mut record = OverrideRecord {
            override_timestamp: now_iso(),
            override_user: user.to_string(),
            override_reason: reason.to_string(),
            override_status: OverrideStatus::Denied,
            message: format!("User {user} does not have override permissions"),
            context: gate.context.clone(),
            record_file: None,
        };
        if !gate.override_allowed || !self.check_override_permission(user) {
            if !gate.override_allowed {
                record.message = "Maintainer override is disabled for this gate".to_string();
            }
            warn!("Documentation gate override denied for {user}");
            return Ok(record);
        }

        warn!("Documentation gate override applied by {user}: {reason}");
        record.override_status = OverrideStatus::Applied;
        record.message = format!("Override applied by {user}");

        let path = self
            .config
            .storage_root()
            .join("gate_overrides")
            .join(format!("override_{}.json", file_timestamp()));
        write_sorted_json(&path, &record)?;
        info!("Saved override record: {}", path.display());
        record.record_file = Some(path);

        gate.gate_status = GateStatus::Overridden;
        gate.applied_override = Some(record.clone());
        Ok(record)
    }

    pub fn generate_gate_report(&self, gate: &GateResult) -> String {
        generate_gate_report(gate)
    }
}

fn guard(label: &str, outcome: UltrathinkResult<GateCheck>) -> GateCheck {
    outcome.unwrap_or_else(|e| {
        warn!("{label} failed: {e}");
        GateCheck::error(format!("{label} failed: {e}"), &e)
    })
}

fn check_new_api_documentation(classified: &ClassifiedDiff, head: &ApiData) -> GateCheck {
    let added = &classified.diff.signature_changes.added;
    if added.is_empty() {
        return GateCheck::new(CheckStatus::Passed, "No new APIs added", json!({}));
    }

    let undocumented: Vec<Value> = added
        .iter()
        .filter_map(|name| {
            let element = head.element(name)?;
            let doc = element.doc.trim();
            (doc.chars().count() < MIN_NEW_API_DOC_CHARS).then(|| {
                json!({
                    "element": name,
                    "type": element.kind.as_str(),
                    "docstring_length": doc.chars().count(),
                })
            })
        })
        .collect();

    if undocumented.is_empty() {
        GateCheck::new(
            CheckStatus::Passed,
            format!("All new APIs documented: {} elements", added.len()),
            json!({ "new_elements": added }),
        )
    } else {
        GateCheck::new(
            CheckStatus::Failed,
            format!("New APIs lack documentation: {}/{}", undocumented.len(), added.len()),
            json!({ "undocumented_elements": undocumented, "new_elements": added }),
        )
    }
}

fn recommendations(gate: &GateResult) -> Vec<String> {
    let mut recs = Vec::new();
    if gate.check_status("completeness") == Some(CheckStatus::Failed) {
        let undocumented = gate.gate_checks["completeness"].details["undocumented_elements"]
            .as_u64()
            .unwrap_or(0);
        if undocumented > 0 {
            recs.push(format!("Add documentation to {undocumented} undocumented elements"));
        } else {
            recs.push("Raise documentation completeness above the threshold".to_string());
        }
    }
    for (check, rec) in [
        ("doctest_validation", "Fix failing doctests before merging"),
        ("api_changes", "Review breaking changes and consider deprecation path"),
        ("breaking_changes", "Add migration notes for breaking changes"),
        ("new_apis", "Add documentation for new APIs"),
    ] {
        if gate.check_status(check) == Some(CheckStatus::Failed) {
            recs.push(rec.to_string());
        }
    }
    if gate.gate_status == GateStatus::Failed {
        recs.push("Address blocking issues before merging".to_string());
    }
    if gate.override_allowed {
        recs.push(
            "Consider maintainer override if issues cannot be immediately resolved".to_string(),
        );
    }
    recs
}

fn title(name: &str) -> String {
    name.split('_')
        .map(|w| {
            let mut c = w.chars();
            c.next()
                .map(|f| f.to_uppercase().chain(c).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_gate_report(gate: &GateResult) -> String {
    let status_emoji = match gate.gate_status {
        GateStatus::Passed => "✅",
        GateStatus::Warning => "⚠️",
        GateStatus::Failed => "❌",
        GateStatus::Overridden => "🔓",
    };

    let mut md = Markdown::new();
    md.heading(1, "📚 Documentation Gate Report")
        .line(format!(
            "**Status:** {status_emoji} {}  ",
            gate.gate_status.as_str().to_uppercase()
        ))
        .line(format!("**Package:** {}  ", gate.package_name))
        .para(format!("**Timestamp:** {}", gate.gate_timestamp));

    if !gate.gate_checks.is_empty() {
        md.heading(2, "Gate Checks");
        for (name, check) in &gate.gate_checks {
            md.heading(3, title(name))
                .line(format!(
                    "**Status:** {} {}  ",
                    check.status.emoji(),
                    check.status.as_str().to_uppercase()
                ))
                .para(format!("**Message:** {}", check.message));
        }
    }

    for (heading, items) in [
        ("❌ Blocking Issues", &gate.blocking_issues),
        ("⚠️ Warnings", &gate.warnings),
    ] {
        if items.is_empty() {
            continue;
        }
        md.heading(2, heading);
        for item in items {
            md.line(format!("- {item}"));
        }
        md.blank();
    }

    if !gate.recommendations.is_empty() {
        md.heading(2, "💡 Recommendations");
        for (i, rec) in gate.recommendations.iter().enumerate() {
            md.line(format!("{}. {rec}", i + 1));
        }
        md.blank();
    }

    if let Some(applied) = &gate.applied_override {
        md.heading(2, "🔓 Override Applied")
            .line(format!("**By:** {}  ", applied.override_user))
            .para(format!("**Reason:** {}", applied.override_reason));
    } else if gate.override_allowed {
        md.heading(2, "🔓 Override Available")
            .para("Maintainers can override this gate with appropriate justification.")
            .para(format!(
                "**Override Reason:** {}",
                gate.override_reason.as_deref().unwrap_or("Not specified")
            ));
    }
    md.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffing::differ::tests::{function, snapshot};
    use std::path::Path;

    fn config(root: &Path) -> UltrathinkConfig {
        let mut config = UltrathinkConfig::for_package("demo");
        config.package.source_directory = root.join("src");
        config.storage.root = root.join("storage");
        config.validation.run_doctests = false;
        config.gating.maintainers = vec!["alice".to_string()];
        config
    }

    fn write_package(root: &Path, source: &str) {
        let pkg = root.join("src").join("demo");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("__init__.py"), source).unwrap();
    }

    #[test]
    fn test_tolerance_limits() {
        assert_eq!(BreakingChangeTolerance::None.max_allowed(), Some(0));
        assert_eq!(BreakingChangeTolerance::Low.max_allowed(), Some(1));
        assert_eq!(BreakingChangeTolerance::Medium.max_allowed(), Some(5));
        assert_eq!(BreakingChangeTolerance::High.max_allowed(), None);
        assert_eq!(
            "MEDIUM".parse::<BreakingChangeTolerance>().unwrap(),
            BreakingChangeTolerance::Medium
        );
        assert!("huge".parse::<BreakingChangeTolerance>().is_err());
    }

    #[test]
    fn test_gate_without_versions_skips_diff_checks() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "def run():\n    pass\n");
        let gate = DocumentationGate::new("demo", &config(dir.path()));
        let result = gate.evaluate_documentation_gate(&GateContext::default());

        assert_eq!(result.check_status("api_changes"), Some(CheckStatus::Skipped));
        assert_eq!(result.check_status("new_apis"), Some(CheckStatus::Skipped));
        assert_eq!(result.check_status("completeness"), Some(CheckStatus::Failed));
        assert_eq!(result.check_status("doctest_validation"), Some(CheckStatus::Warning));
        assert_eq!(result.gate_status, GateStatus::Failed);
        assert!(result.override_allowed);
        assert_eq!(result.override_reason.as_deref(), Some("Failed checks: completeness"));

        let report = generate_gate_report(&result);
        assert!(report.contains("**Status:** ❌ FAILED"));
        assert!(report.contains("### Doctest Validation"));
    }

    #[test]
    fn test_missing_package_becomes_error_checks() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DocumentationGate::new("demo", &config(dir.path()));
        let result = gate.evaluate_documentation_gate(&GateContext::default());
        assert_eq!(result.check_status("completeness"), Some(CheckStatus::Error));
        assert!(result.gate_checks["completeness"].details["error"]
            .as_str()
            .unwrap()
            .contains("No module named 'demo'"));
        assert_eq!(result.gate_status, GateStatus::Failed);
    }

    #[test]
    fn test_breaking_removal_against_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        write_package(dir.path(), "def run():\n    pass\n");

        let differ = ApiDiffer::from_config(&cfg).unwrap();
        let v1 = snapshot(
            "1.0.0",
            vec![function("fetch", &[], None), function("run", &[], None)],
        )
        .api_data;
        differ.create_api_snapshot(&v1, "1.0.0").unwrap();
        let v2 = snapshot("1.1.0", vec![function("run", &[], None)]).api_data;
        differ.create_api_snapshot(&v2, "1.1.0").unwrap();

        let ctx = GateContext::between("1.0.0", "1.1.0");
        let strict = DocumentationGate::new("demo", &cfg).evaluate_documentation_gate(&ctx);
        assert_eq!(strict.check_status("api_changes"), Some(CheckStatus::Failed));
        assert_eq!(strict.check_status("breaking_changes"), Some(CheckStatus::Failed));
        let issues = strict.gate_checks["breaking_changes"].details["issues"].as_array().unwrap();
        assert!(issues.iter().any(|i| i["issue"] == "removal_without_deprecation"));

        cfg.gating.breaking_change_tolerance = BreakingChangeTolerance::Low;
        let lenient = DocumentationGate::new("demo", &cfg).evaluate_documentation_gate(&ctx);
        assert_eq!(lenient.check_status("api_changes"), Some(CheckStatus::Passed));
    }

    #[test]
    fn test_new_api_documentation() {
        let old = snapshot("1.0.0", vec![]);
        let mut documented = function("good", &[], None);
        documented.doc = "Does a thing thoroughly and well.".to_string();
        let new = snapshot("1.1.0", vec![documented, function("bare", &[], None)]);
        let classified = ChangeClassifier::new().classify_changes(compare_snapshots(&old, &new));

        let check = check_new_api_documentation(&classified, &new.api_data);
        assert_eq!(check.status, CheckStatus::Failed);
        assert_eq!(check.message, "New APIs lack documentation: 1/2");
        assert_eq!(check.details["undocumented_elements"][0]["element"], "bare");
    }

    #[test]
    fn test_new_apis_since_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_package(dir.path(), "def run():\n    \"\"\"Run the whole pipeline once.\"\"\"\n");
        let api = ApiExtractor::from_config(&cfg).unwrap().extract_complete_api().unwrap();
        ApiDiffer::from_config(&cfg).unwrap().create_api_snapshot(&api, "1.0.0").unwrap();

        write_package(
            dir.path(),
            "def run():\n    \"\"\"Run the whole pipeline once.\"\"\"\n\ndef extra():\n    pass\n",
        );
        let gate = DocumentationGate::new("demo", &cfg);
        let check = gate.check_new_apis_since("1.0.0").unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
        assert_eq!(check.details["undocumented_elements"][0]["element"], "extra");
        assert!(gate.check_new_apis_since("0.9.0").is_err());
    }

    #[test]
    fn test_override_requires_maintainer() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "def run():\n    pass\n");
        let gate = DocumentationGate::new("demo", &config(dir.path()));
        let mut result = gate.evaluate_documentation_gate(&GateContext::default());
        assert_eq!(result.gate_status, GateStatus::Failed);

        let denied = gate.apply_maintainer_override(&mut result, "mallory", "trust me").unwrap();
        assert_eq!(denied.override_status, OverrideStatus::Denied);
        assert_eq!(result.gate_status, GateStatus::Failed);

        let applied = gate.apply_maintainer_override(&mut result, "alice", "hotfix").unwrap();
        assert_eq!(applied.override_status, OverrideStatus::Applied);
        assert!(applied.record_file.unwrap().exists());
        assert_eq!(result.gate_status, GateStatus::Overridden);
        assert!(gate.apply_maintainer_override(&mut result, "alice", "again").is_err());
    }
}
