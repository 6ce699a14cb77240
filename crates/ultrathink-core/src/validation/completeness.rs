//! Documentation completeness scoring.
//!
//! Each public element is scored from the presence of a docstring, a
//! signature, a generated reference page, examples and type hints, nudged by
//! docstring quality. The package passes when the share of elements at or
//! above the threshold reaches it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UltrathinkConfig;
use crate::errors::UltrathinkResult;
use crate::generation::stubs::StubGenerator;
use crate::generation::Markdown;
use crate::models::{ApiData, ApiElement, ElementKind};
use crate::persist::{file_timestamp, now_iso, write_sorted_json};

const W_DOCSTRING: f64 = 0.3;
const W_SIGNATURE: f64 = 0.1;
const W_STUB: f64 = 0.2;
const W_EXAMPLES: f64 = 0.2;
const W_TYPE_HINTS: f64 = 0.2;
const W_QUALITY: f64 = 0.1;
const PENALTY_PER_ISSUE: f64 = 0.05;
const MAX_PENALTY: f64 = 0.2;

const MAX_SUMMARY_CHARS: usize = 100;
const MIN_DOCSTRING_CHARS: usize = 20;

const PARAMETER_SECTIONS: &[&str] = &["args:", "arguments:", "parameters:"];
const RETURN_SECTIONS: &[&str] = &["returns:", "return:"];
const EXAMPLE_SECTIONS: &[&str] = &["examples:", "example:"];
const RAISES_SECTIONS: &[&str] = &["raises:", "except:"];

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocstringQuality {
    pub length: usize,
    pub line_count: usize,
    pub has_summary: bool,
    pub has_description: bool,
    pub has_parameters: bool,
    pub has_returns: bool,
    pub has_examples: bool,
    pub has_raises: bool,
    pub quality_score: f64,
    pub issues: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementCompleteness {
    pub element_name: String,
    pub element_type: ElementKind,
    pub has_docstring: bool,
    pub has_signature: bool,
    pub has_stub_file: bool,
    pub has_examples: bool,
    pub has_type_hints: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring_quality: Option<DocstringQuality>,
    pub completeness_score: f64,
    pub missing_items: Vec<String>,
    pub quality_issues: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentationDistribution {
    pub fully_documented: usize,
    pub partially_documented: usize,
    pub undocumented: usize,
    pub fully_documented_percentage: f64,
    pub partially_documented_percentage: f64,
    pub undocumented_percentage: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletenessSummary {
    pub overall_completeness: f64,
    pub meets_threshold: bool,
    pub average_score: f64,
    pub documentation_distribution: DocumentationDistribution,
    /// Missing item kinds, most frequent first.
    pub most_common_missing_items: IndexMap<String, usize>,
    /// Docstring issue kinds, most frequent first.
    pub quality_issues_summary: IndexMap<String, usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletenessResult {
    pub package_name: String,
    pub check_timestamp: String,
    pub completeness_threshold: f64,
    pub total_elements: usize,
    pub documented_elements: usize,
    pub partially_documented_elements: usize,
    pub undocumented_elements: usize,
    pub completeness_percentage: f64,
    pub element_completeness: BTreeMap<String, ElementCompleteness>,
    pub missing_documentation: BTreeMap<String, Vec<String>>,
    pub documentation_quality: BTreeMap<String, Vec<String>>,
    pub summary: CompletenessSummary,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<PathBuf>,
}

impl CompletenessResult {
    pub fn meets_threshold(&self) -> bool {
        self.summary.meets_threshold
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

pub struct CompletenessChecker {
    package: String,
    cache_dir: PathBuf,
    stubs: StubGenerator,
}

impl CompletenessChecker {
    pub fn new(package: &str, storage_root: &Path) -> Self {
        Self {
            package: package.to_string(),
            cache_dir: storage_root.join("validation_cache"),
            stubs: StubGenerator::new(storage_root),
        }
    }

    pub fn from_config(config: &UltrathinkConfig, package: &str) -> Self {
        Self::new(package, config.storage_root())
    }

    /// Score every public element of `api_data` and persist the result.
    pub fn check_documentation_completeness(
        &self,
        api_data: &ApiData,
        threshold: f64,
    ) -> UltrathinkResult<CompletenessResult> {
        info!("Checking documentation completeness for package {}", self.package);

        let mut result = CompletenessResult {
            package_name: self.package.clone(),
            check_timestamp: now_iso(),
            completeness_threshold: threshold,
            total_elements: api_data.public_api.len(),
            documented_elements: 0,
            partially_documented_elements: 0,
            undocumented_elements: 0,
            completeness_percentage: 0.0,
            element_completeness: BTreeMap::new(),
            missing_documentation: BTreeMap::new(),
            documentation_quality: BTreeMap::new(),
            summary: CompletenessSummary::default(),
            recommendations: Vec::new(),
            result_file: None,
        };

        for (name, element) in &api_data.public_api {
            let checked = self.check_element(name, element);
            if checked.completeness_score >= threshold {
                result.documented_elements += 1;
            } else if checked.completeness_score > 0.0 {
                result.partially_documented_elements += 1;
            } else {
                result.undocumented_elements += 1;
            }
            if !checked.missing_items.is_empty() {
                result.missing_documentation.insert(name.clone(), checked.missing_items.clone());
            }
            if !checked.quality_issues.is_empty() {
                result.documentation_quality.insert(name.clone(), checked.quality_issues.clone());
            }
            result.element_completeness.insert(name.clone(), checked);
        }

        if result.total_elements > 0 {
            result.completeness_percentage =
                result.documented_elements as f64 / result.total_elements as f64 * 100.0;
        }
        result.summary = summarize(&result);
        result.recommendations = recommendations(&result);

        let path = self
            .cache_dir
            .join(format!("completeness_check_{}.json", file_timestamp()));
        write_sorted_json(&path, &result)?;
        info!("Saved completeness results to {}", path.display());
        result.result_file = Some(path);

        info!("Documentation completeness: {:.1}%", result.completeness_percentage);
        Ok(result)
    }

    fn check_element(&self, name: &str, element: &ApiElement) -> ElementCompleteness {
        let mut missing = Vec::new();
        let doc = element.doc.as_str();

        let has_docstring = !doc.trim().is_empty();
        let docstring_quality = has_docstring.then(|| analyze_docstring_quality(doc));
        if !has_docstring {
            missing.push("docstring".to_string());
        }

        let has_signature = element.signature.as_deref().is_some_and(|s| !s.is_empty());
        if !has_signature {
            missing.push("signature".to_string());
        }

        let stub_path = self.stubs.stub_path(name, element.kind);
        let has_stub_file = stub_path.exists();
        if !has_stub_file {
            missing.push("stub_file".to_string());
        }

        let has_examples =
            mentions_examples(doc) || (has_stub_file && stub_has_examples(&stub_path));
        if !has_examples {
            missing.push("examples".to_string());
        }

        let has_type_hints = has_type_hints(element);
        if !has_type_hints {
            missing.push("type_hints".to_string());
        }

        match element.kind {
            ElementKind::Class => missing.extend(class_gaps(element)),
            ElementKind::Function | ElementKind::Method => missing.extend(function_gaps(element)),
            _ => {}
        }

        let quality_issues = docstring_quality
            .as_ref()
            .map(|q| q.issues.clone())
            .unwrap_or_default();

        let mut checked = ElementCompleteness {
            element_name: name.to_string(),
            element_type: element.kind,
            has_docstring,
            has_signature,
            has_stub_file,
            has_examples,
            has_type_hints,
            docstring_quality,
            completeness_score: 0.0,
            missing_items: missing,
            quality_issues,
        };
        checked.completeness_score = completeness_score(&checked);
        checked
    }

    pub fn generate_completeness_report(&self, result: &CompletenessResult) -> String {
        generate_completeness_report(result)
    }
}

// ---------------------------------------------------------------------------
// Element checks
// ---------------------------------------------------------------------------

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn analyze_docstring_quality(doc: &str) -> DocstringQuality {
    let mut quality = DocstringQuality {
        length: doc.chars().count(),
        line_count: doc.lines().count(),
        ..DocstringQuality::default()
    };

    let lines: Vec<&str> = doc.trim().lines().collect();
    let Some(first) = lines.first().map(|l| l.trim()) else {
        quality.issues.push("empty_docstring".to_string());
        return quality;
    };

    if !first.is_empty() && !first.ends_with("TODO") {
        quality.has_summary = true;
    } else {
        quality.issues.push("missing_or_poor_summary".to_string());
    }
    quality.has_description = lines.len() > 2;

    let lower = doc.to_lowercase();
    quality.has_parameters = contains_any(&lower, PARAMETER_SECTIONS);
    quality.has_returns = contains_any(&lower, RETURN_SECTIONS);
    quality.has_examples = contains_any(&lower, EXAMPLE_SECTIONS);
    quality.has_raises = contains_any(&lower, RAISES_SECTIONS);

    if doc.contains("TODO") {
        quality.issues.push("contains_todo".to_string());
    }
    if first.chars().count() > MAX_SUMMARY_CHARS {
        quality.issues.push("summary_too_long".to_string());
    }
    if quality.length < MIN_DOCSTRING_CHARS {
        quality.issues.push("docstring_too_short".to_string());
    }

    let factors = [
        quality.has_summary,
        quality.has_description,
        quality.has_parameters,
        quality.has_returns,
        quality.has_examples,
    ];
    quality.quality_score = factors.iter().filter(|f| **f).count() as f64 / factors.len() as f64;
    quality
}

fn mentions_examples(text: &str) -> bool {
    text.contains(">>>") || text.to_lowercase().contains("example")
}

fn stub_has_examples(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains("```python") || content.to_lowercase().contains("example"))
        .unwrap_or(false)
}

fn has_type_hints(element: &ApiElement) -> bool {
    match element.kind {
        ElementKind::Function | ElementKind::Method => {
            element.function_info.as_ref().is_some_and(|f| {
                f.return_annotation.is_some()
                    || f.parameters.iter().any(|p| p.annotation.is_some())
            })
        }
        ElementKind::Class => element.class_info.as_ref().is_some_and(|c| {
            c.methods
                .values()
                .chain(c.class_methods.values())
                .chain(c.static_methods.values())
                .filter_map(|m| m.signature.as_deref())
                .any(|sig| sig.contains("->") || sig.contains(':'))
        }),
        _ => false,
    }
}

fn class_gaps(element: &ApiElement) -> Vec<String> {
    let Some(info) = &element.class_info else {
        return Vec::new();
    };
    let mut gaps = Vec::new();

    let undocumented: Vec<&str> = info
        .methods
        .iter()
        .filter(|(name, m)| !name.starts_with('_') && m.doc.trim().is_empty())
        .map(|(name, _)| name.as_str())
        .collect();
    if !undocumented.is_empty() {
        gaps.push(format!("method_documentation: {}", undocumented.join(", ")));
    }

    if info.methods.get("__init__").is_some_and(|init| init.doc.trim().is_empty()) {
        gaps.push("__init___documentation".to_string());
    }

    let undocumented_props: Vec<&str> = info
        .properties
        .iter()
        .filter(|(_, p)| p.doc.trim().is_empty())
        .map(|(name, _)| name.as_str())
        .collect();
    if !undocumented_props.is_empty() {
        gaps.push(format!("property_documentation: {}", undocumented_props.join(", ")));
    }
    gaps
}

fn function_gaps(element: &ApiElement) -> Vec<String> {
    let Some(info) = &element.function_info else {
        return Vec::new();
    };
    let mut gaps = Vec::new();

    let unannotated: Vec<&str> = info
        .parameters
        .iter()
        .filter(|p| p.annotation.is_none() && p.name != "self" && p.name != "cls")
        .map(|p| p.name.as_str())
        .collect();
    if !unannotated.is_empty() {
        gaps.push(format!("parameter_annotations: {}", unannotated.join(", ")));
    }
    if info.return_annotation.is_none() {
        gaps.push("return_annotation".to_string());
    }
    gaps
}

pub fn completeness_score(checked: &ElementCompleteness) -> f64 {
    let mut score = 0.0;
    for (present, weight) in [
        (checked.has_docstring, W_DOCSTRING),
        (checked.has_signature, W_SIGNATURE),
        (checked.has_stub_file, W_STUB),
        (checked.has_examples, W_EXAMPLES),
        (checked.has_type_hints, W_TYPE_HINTS),
    ] {
        if present {
            score += weight;
        }
    }
    if let Some(quality) = &checked.docstring_quality {
        score += quality.quality_score * W_QUALITY;
    }
    let penalty = (checked.quality_issues.len() as f64 * PENALTY_PER_ISSUE).min(MAX_PENALTY);
    (score - penalty).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Summary and recommendations
// ---------------------------------------------------------------------------

/// Count occurrences, keeping the text before any `:`, most frequent first.
fn frequency<'a>(items: impl Iterator<Item = &'a String>) -> IndexMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        let base = item.split(':').next().unwrap_or(item);
        *counts.entry(base.to_string()).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.into_iter().collect()
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn summarize(result: &CompletenessResult) -> CompletenessSummary {
    let total = result.total_elements;
    let average_score = if total == 0 {
        0.0
    } else {
        result
            .element_completeness
            .values()
            .map(|e| e.completeness_score)
            .sum::<f64>()
            / total as f64
    };

    CompletenessSummary {
        overall_completeness: result.completeness_percentage,
        meets_threshold: result.completeness_percentage >= result.completeness_threshold * 100.0,
        average_score,
        documentation_distribution: DocumentationDistribution {
            fully_documented: result.documented_elements,
            partially_documented: result.partially_documented_elements,
            undocumented: result.undocumented_elements,
            fully_documented_percentage: percentage(result.documented_elements, total),
            partially_documented_percentage: percentage(
                result.partially_documented_elements,
                total,
            ),
            undocumented_percentage: percentage(result.undocumented_elements, total),
        },
        most_common_missing_items: frequency(result.missing_documentation.values().flatten()),
        quality_issues_summary: frequency(result.documentation_quality.values().flatten()),
    }
}

fn recommendations(result: &CompletenessResult) -> Vec<String> {
    let mut recs = Vec::new();
    let pct = result.completeness_percentage;
    let threshold = result.completeness_threshold * 100.0;
    if pct < threshold {
        recs.push(format!(
            "Increase documentation completeness from {pct:.1}% to at least {threshold:.1}%"
        ));
    }

    let missing = &result.summary.most_common_missing_items;
    for (key, text) in [
        ("docstring", "Add docstrings to"),
        ("examples", "Add examples to"),
        ("type_hints", "Add type hints to"),
        ("stub_file", "Generate stub files for"),
    ] {
        if let Some(n) = missing.get(key).filter(|n| **n > 0) {
            recs.push(format!("{text} {n} elements"));
        }
    }

    let issues = &result.summary.quality_issues_summary;
    if let Some(n) = issues.get("contains_todo") {
        recs.push(format!("Complete TODO items in {n} docstrings"));
    }
    if let Some(n) = issues.get("missing_or_poor_summary") {
        recs.push(format!("Improve summary lines in {n} docstrings"));
    }

    if result.undocumented_elements > 0 {
        recs.push(format!(
            "Prioritize documenting {} completely undocumented elements",
            result.undocumented_elements
        ));
    }
    recs
}

fn humanize(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_completeness_report(result: &CompletenessResult) -> String {
    let summary = &result.summary;
    let dist = &summary.documentation_distribution;
    let mut md = Markdown::new();

    md.heading(1, "Documentation Completeness Report")
        .line(format!("**Package:** {}  ", result.package_name))
        .line(format!("**Check Time:** {}  ", result.check_timestamp))
        .para(format!("**Threshold:** {:.1}%", result.completeness_threshold * 100.0));

    md.heading(2, "Overall Results")
        .line(format!("- **Completeness:** {:.1}%", result.completeness_percentage))
        .line(format!(
            "- **Status:** {}",
            if summary.meets_threshold { "✅ PASSED" } else { "❌ FAILED" }
        ))
        .line(format!("- **Average Score:** {:.2}", summary.average_score))
        .line(format!("- **Total Elements:** {}", result.total_elements))
        .blank();

    md.heading(2, "Documentation Distribution")
        .line(format!(
            "- **Fully Documented:** {} ({:.1}%)",
            dist.fully_documented, dist.fully_documented_percentage
        ))
        .line(format!(
            "- **Partially Documented:** {} ({:.1}%)",
            dist.partially_documented, dist.partially_documented_percentage
        ))
        .line(format!(
            "- **Undocumented:** {} ({:.1}%)",
            dist.undocumented, dist.undocumented_percentage
        ))
        .blank();

    for (title, counts) in [
        ("Most Common Missing Items", &summary.most_common_missing_items),
        ("Quality Issues", &summary.quality_issues_summary),
    ] {
        if counts.is_empty() {
            continue;
        }
        md.heading(2, title);
        for (item, count) in counts.iter().take(5) {
            md.line(format!("- **{}:** {count} elements", humanize(item)));
        }
        md.blank();
    }

    if !result.recommendations.is_empty() {
        md.heading(2, "Recommendations");
        for (i, rec) in result.recommendations.iter().enumerate() {
            md.line(format!("{}. {rec}", i + 1));
        }
        md.blank();
    }

    let undocumented: Vec<&String> = result
        .element_completeness
        .iter()
        .filter(|(_, e)| e.completeness_score == 0.0)
        .map(|(name, _)| name)
        .collect();
    if !undocumented.is_empty() {
        md.heading(2, "Undocumented Elements");
        for name in undocumented.iter().take(10) {
            md.line(format!("- {name}"));
        }
        if undocumented.len() > 10 {
            md.line(format!("- ... and {} more", undocumented.len() - 10));
        }
    }
    md.finish()
}
