//! Help-text snapshots.
//!
//! Every public element gets a pydoc-style help page rendered from its
//! signature, docstring and members. Pages are normalized and hashed, saved
//! under `<storage>/help_snapshots/`, and compared between captures, so a
//! change to what users see in `help()` is caught even when the element's
//! signature hash stays the same.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::UltrathinkConfig;
use crate::errors::UltrathinkResult;
use crate::generation::Markdown;
use crate::models::{ApiData, ApiElement, ElementKind, MemberInfo};
use crate::persist::{file_timestamp, now_iso, write_sorted_json};

static MEMORY_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at 0x[0-9a-fA-F]+").unwrap());
static FILE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"file ".*?""#).unwrap());

const SNAPSHOT_PREFIX: &str = "help_snapshots_";

const CLASS_BAR: &str = " |  ";

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// The help page `help(package.name)` would show, built from extracted data.
pub fn render_help(name: &str, element: &ApiElement) -> String {
    let mut lines = Vec::new();
    match element.kind {
        ElementKind::Class => render_class(&mut lines, name, element),
        ElementKind::Module => render_module(&mut lines, element),
        ElementKind::Function
        | ElementKind::Method
        | ElementKind::Builtin
        | ElementKind::Callable => render_callable(&mut lines, name, element),
        ElementKind::Variable => {
            lines.push(format!("Help on {name} in module {}:", element.module));
            lines.push(String::new());
            lines.push(name.to_string());
            push_indented(&mut lines, "    ", &element.doc);
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn push_indented(lines: &mut Vec<String>, indent: &str, text: &str) {
    for line in text.trim().lines() {
        lines.push(format!("{indent}{line}"));
    }
}

fn render_callable(lines: &mut Vec<String>, name: &str, element: &ApiElement) {
    let label = match element.kind {
        ElementKind::Method => "method",
        ElementKind::Builtin => "built-in function",
        ElementKind::Callable => "callable",
        _ => "function",
    };
    lines.push(format!("Help on {label} {} in module {}:", element.qualname, element.module));
    lines.push(String::new());
    lines.push(format!("{name}{}", element.signature.as_deref().unwrap_or("(...)")));
    push_indented(lines, "    ", &element.doc);
}

fn render_class(lines: &mut Vec<String>, name: &str, element: &ApiElement) {
    let info = element.class_info.clone().unwrap_or_default();
    lines.push(format!("Help on class {} in module {}:", element.qualname, element.module));
    lines.push(String::new());
    lines.push(format!("class {name}({})", info.base_classes.join(", ")));
    if let Some(signature) = &element.signature {
        lines.push(format!("{CLASS_BAR}{name}{signature}"));
        lines.push(CLASS_BAR.trim_end().to_string());
    }
    push_indented(lines, CLASS_BAR, &element.doc);

    if info.mro.len() > 1 {
        lines.push(CLASS_BAR.trim_end().to_string());
        lines.push(format!("{CLASS_BAR}Method resolution order:"));
        for entry in &info.mro {
            lines.push(format!("{CLASS_BAR}    {entry}"));
        }
    }

    let sections: [(&str, &BTreeMap<String, MemberInfo>); 6] = [
        ("Methods", &info.methods),
        ("Class methods", &info.class_methods),
        ("Static methods", &info.static_methods),
        ("Properties", &info.properties),
        ("Data descriptors", &info.descriptors),
        ("Data and other attributes", &info.class_variables),
    ];
    for (title, members) in sections {
        if members.is_empty() {
            continue;
        }
        lines.push(CLASS_BAR.trim_end().to_string());
        lines.push(format!("{CLASS_BAR}{title}:"));
        for (member_name, member) in members {
            let own = member.defined_in.is_empty() || member.defined_in == element.qualname;
            let inherited = if own {
                String::new()
            } else {
                format!(" (from {})", member.defined_in)
            };
            lines.push(format!(
                "{CLASS_BAR}{member_name}{}{inherited}",
                member.signature.as_deref().unwrap_or_default()
            ));
            push_indented(lines, &format!("{CLASS_BAR}    "), &member.doc);
        }
    }
}

fn render_module(lines: &mut Vec<String>, element: &ApiElement) {
    lines.push(format!("Help on module {}:", element.module));
    lines.push(String::new());
    lines.push("NAME".to_string());
    lines.push(format!("    {}", element.module));
    if !element.doc.trim().is_empty() {
        lines.push(String::new());
        lines.push("DESCRIPTION".to_string());
        push_indented(lines, "    ", &element.doc);
    }
    if let Some(info) = &element.module_info {
        if !info.members.is_empty() {
            lines.push(String::new());
            lines.push("MEMBERS".to_string());
            for member in &info.members {
                lines.push(format!("    {member}"));
            }
        }
    }
}

/// Mask memory addresses and file references and drop trailing whitespace.
pub fn normalize_help_output(help: &str) -> String {
    let masked = MEMORY_ADDRESS.replace_all(help, "at 0x...");
    let masked = FILE_REFERENCE.replace_all(&masked, r#"file "...""#);
    masked.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn hash_help_output(help: &str) -> String {
    sha256_hex(&normalize_help_output(help))
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpMetadata {
    pub output_length: usize,
    pub line_count: usize,
    pub contains_docstring: bool,
    pub contains_signature: bool,
    pub docstring_length: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpSnapshot {
    pub element_name: String,
    pub element_type: ElementKind,
    pub help_output: String,
    pub help_hash: String,
    pub docstring_hash: String,
    pub capture_timestamp: String,
    pub module: String,
    pub signature: String,
    pub metadata: HelpMetadata,
}

impl HelpSnapshot {
    pub fn capture(name: &str, element: &ApiElement) -> Self {
        let help_output = render_help(name, element);
        let doc = element.doc.trim();
        Self {
            element_name: name.to_string(),
            element_type: element.kind,
            help_hash: hash_help_output(&help_output),
            docstring_hash: sha256_hex(doc),
            capture_timestamp: now_iso(),
            module: element.module.clone(),
            signature: element.signature.clone().unwrap_or_default(),
            metadata: HelpMetadata {
                output_length: help_output.chars().count(),
                line_count: help_output.lines().count(),
                contains_docstring: !doc.is_empty(),
                contains_signature: element.signature.is_some(),
                docstring_length: doc.chars().count(),
            },
            help_output,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRecord {
    pub element: String,
    pub length: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub total_output_length: usize,
    pub average_output_length: f64,
    pub elements_by_type: BTreeMap<String, usize>,
    pub elements_with_docstrings: usize,
    pub elements_with_signatures: usize,
    pub longest_help_output: Option<LengthRecord>,
    pub shortest_help_output: Option<LengthRecord>,
}

impl SnapshotMetadata {
    fn from_snapshots(snapshots: &BTreeMap<String, HelpSnapshot>) -> Self {
        let mut meta = SnapshotMetadata::default();
        for (name, snapshot) in snapshots {
            let length = snapshot.metadata.output_length;
            meta.total_output_length += length;
            *meta
                .elements_by_type
                .entry(snapshot.element_type.as_str().to_string())
                .or_default() += 1;
            meta.elements_with_docstrings += usize::from(snapshot.metadata.contains_docstring);
            meta.elements_with_signatures += usize::from(snapshot.metadata.contains_signature);

            let record = || LengthRecord {
                element: name.clone(),
                length,
            };
            if meta.longest_help_output.as_ref().map_or(true, |l| length > l.length) {
                meta.longest_help_output = Some(record());
            }
            if meta.shortest_help_output.as_ref().map_or(true, |s| length < s.length) {
                meta.shortest_help_output = Some(record());
            }
        }
        if !snapshots.is_empty() {
            meta.average_output_length = meta.total_output_length as f64 / snapshots.len() as f64;
        }
        meta
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HelpSnapshotSet {
    pub package_name: String,
    pub capture_timestamp: String,
    pub total_elements: usize,
    pub captured_snapshots: usize,
    pub snapshots: BTreeMap<String, HelpSnapshot>,
    pub metadata: SnapshotMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpChangeKind {
    OutputLengthChanged,
    SignatureChanged,
    DocstringChanged,
    ModuleChanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange<T> {
    pub old: T,
    pub new: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHelpChange {
    pub element_name: String,
    pub changes_detected: Vec<HelpChangeKind>,
    pub old_hash: String,
    pub new_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_change: Option<ValueChange<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_change: Option<ValueChange<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring_length_change: Option<ValueChange<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_change: Option<ValueChange<String>>,
}

impl ElementHelpChange {
    fn between(old: &HelpSnapshot, new: &HelpSnapshot) -> Self {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<ValueChange<T>> {
            (old != new).then(|| ValueChange {
                old: old.clone(),
                new: new.clone(),
            })
        }

        let length_change = changed(&old.metadata.output_length, &new.metadata.output_length);
        let signature_change = changed(&old.signature, &new.signature);
        let docstring_length_change =
            (old.docstring_hash != new.docstring_hash).then(|| ValueChange {
                old: old.metadata.docstring_length,
                new: new.metadata.docstring_length,
            });
        let module_change = changed(&old.module, &new.module);

        let mut changes_detected = Vec::new();
        for (present, kind) in [
            (length_change.is_some(), HelpChangeKind::OutputLengthChanged),
            (signature_change.is_some(), HelpChangeKind::SignatureChanged),
            (docstring_length_change.is_some(), HelpChangeKind::DocstringChanged),
            (module_change.is_some(), HelpChangeKind::ModuleChanged),
        ] {
            if present {
                changes_detected.push(kind);
            }
        }

        Self {
            element_name: old.element_name.clone(),
            changes_detected,
            old_hash: old.help_hash.clone(),
            new_hash: new.help_hash.clone(),
            length_change,
            signature_change,
            docstring_length_change,
            module_change,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpChanges {
    pub added_elements: Vec<String>,
    pub removed_elements: Vec<String>,
    pub modified_elements: Vec<String>,
    pub unchanged_elements: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTypeCounts {
    pub signature_changes: usize,
    pub docstring_changes: usize,
    pub module_changes: usize,
    pub output_length_changes: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpComparisonSummary {
    pub total_elements_compared: usize,
    pub total_changes: usize,
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
    pub unchanged: usize,
    pub change_types: ChangeTypeCounts,
    /// Any removal or modified help page.
    pub has_breaking_changes: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpComparison {
    pub comparison_timestamp: String,
    pub old_snapshot_file: Option<PathBuf>,
    pub new_snapshot_file: Option<PathBuf>,
    pub old_snapshot_timestamp: String,
    pub new_snapshot_timestamp: String,
    pub changes: HelpChanges,
    pub detailed_changes: BTreeMap<String, ElementHelpChange>,
    pub summary: HelpComparisonSummary,
}

/// Diff two captures by element name and help hash.
pub fn compare_snapshot_sets(old: &HelpSnapshotSet, new: &HelpSnapshotSet) -> HelpComparison {
    let old_names: BTreeSet<&String> = old.snapshots.keys().collect();
    let new_names: BTreeSet<&String> = new.snapshots.keys().collect();

    let mut changes = HelpChanges {
        added_elements: new_names.difference(&old_names).map(|n| n.to_string()).collect(),
        removed_elements: old_names.difference(&new_names).map(|n| n.to_string()).collect(),
        ..HelpChanges::default()
    };
    let mut detailed_changes = BTreeMap::new();
    let mut counts = ChangeTypeCounts::default();

    for name in old_names.intersection(&new_names) {
        let (before, after) = (&old.snapshots[*name], &new.snapshots[*name]);
        if before.help_hash == after.help_hash {
            changes.unchanged_elements.push(name.to_string());
            continue;
        }
        let detail = ElementHelpChange::between(before, after);
        for kind in &detail.changes_detected {
            match kind {
                HelpChangeKind::SignatureChanged => counts.signature_changes += 1,
                HelpChangeKind::DocstringChanged => counts.docstring_changes += 1,
                HelpChangeKind::ModuleChanged => counts.module_changes += 1,
                HelpChangeKind::OutputLengthChanged => counts.output_length_changes += 1,
            }
        }
        changes.modified_elements.push(name.to_string());
        detailed_changes.insert(name.to_string(), detail);
    }

    let summary = HelpComparisonSummary {
        total_elements_compared: changes.unchanged_elements.len() + changes.modified_elements.len(),
        total_changes: changes.added_elements.len()
            + changes.removed_elements.len()
            + changes.modified_elements.len(),
        additions: changes.added_elements.len(),
        removals: changes.removed_elements.len(),
        modifications: changes.modified_elements.len(),
        unchanged: changes.unchanged_elements.len(),
        change_types: counts,
        has_breaking_changes: !changes.removed_elements.is_empty()
            || !changes.modified_elements.is_empty(),
    };

    HelpComparison {
        comparison_timestamp: now_iso(),
        old_snapshot_file: old.snapshot_file.clone(),
        new_snapshot_file: new.snapshot_file.clone(),
        old_snapshot_timestamp: old.capture_timestamp.clone(),
        new_snapshot_timestamp: new.capture_timestamp.clone(),
        changes,
        detailed_changes,
        summary,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelpValidationStatus {
    Passed,
    Failed,
    Skipped,
}

impl HelpValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpValidation {
    pub validation_timestamp: String,
    pub validation_status: HelpValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub current_snapshot_file: Option<PathBuf>,
    pub reference_snapshot_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<HelpComparison>,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Snapshotter
// ---------------------------------------------------------------------------

pub struct HelpSnapshotter {
    package: String,
    snapshots_dir: PathBuf,
}

impl HelpSnapshotter {
    pub fn new(package: &str, storage_root: &Path) -> Self {
        Self {
            package: package.to_string(),
            snapshots_dir: storage_root.join("help_snapshots"),
        }
    }

    pub fn from_config(config: &UltrathinkConfig, package: &str) -> Self {
        Self::new(package, config.storage_root())
    }

    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    /// Render, hash and save help pages for every public element.
    pub fn capture_help_snapshots(&self, api_data: &ApiData) -> UltrathinkResult<HelpSnapshotSet> {
        info!("Capturing help snapshots for package {}", self.package);
        let snapshots: BTreeMap<String, HelpSnapshot> = api_data
            .public_api
            .iter()
            .map(|(name, element)| {
                debug!("Captured help snapshot for {name}");
                (name.clone(), HelpSnapshot::capture(name, element))
            })
            .collect();

        let mut set = HelpSnapshotSet {
            package_name: self.package.clone(),
            capture_timestamp: now_iso(),
            total_elements: api_data.public_api.len(),
            captured_snapshots: snapshots.len(),
            metadata: SnapshotMetadata::from_snapshots(&snapshots),
            snapshots,
            snapshot_file: None,
        };

        let path = self.next_snapshot_path();
        write_sorted_json(&path, &set)?;
        info!(
            "Saved {}/{} help snapshots to {}",
            set.captured_snapshots,
            set.total_elements,
            path.display()
        );
        set.snapshot_file = Some(path);
        Ok(set)
    }

    fn next_snapshot_path(&self) -> PathBuf {
        let stamp = file_timestamp();
        let mut path = self.snapshots_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.snapshots_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}_{n}.json"));
            n += 1;
        }
        path
    }

    /// Most recently written capture; file name breaks modification-time ties.
    pub fn latest_snapshot_file(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.snapshots_dir).ok()?;
        entries
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
            })
            .filter_map(|e| Some((e.metadata().ok()?.modified().ok()?, e.path())))
            .max()
            .map(|(_, path)| path)
    }

    pub fn load_snapshots(&self, path: &Path) -> UltrathinkResult<HelpSnapshotSet> {
        let mut set: HelpSnapshotSet = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        set.snapshot_file = Some(path.to_path_buf());
        Ok(set)
    }

    pub fn compare_snapshots(
        &self,
        old_file: &Path,
        new_file: &Path,
    ) -> UltrathinkResult<HelpComparison> {
        info!(
            "Comparing help snapshots: {} vs {}",
            old_file.display(),
            new_file.display()
        );
        let old = self.load_snapshots(old_file)?;
        let comparison = compare_snapshot_sets(&old, &self.load_snapshots(new_file)?);
        info!(
            "Help snapshot comparison completed: {} changes detected",
            comparison.summary.modifications
        );
        Ok(comparison)
    }

    /// Capture the current help pages and compare them with `reference`, or
    /// with the latest capture made before this one.
    pub fn validate_current_snapshots(
        &self,
        api_data: &ApiData,
        reference: Option<&Path>,
    ) -> UltrathinkResult<HelpValidation> {
        info!("Validating current help snapshots");
        let reference = match reference {
            Some(path) => Some(path.to_path_buf()),
            None => self.latest_snapshot_file(),
        };
        let current = self.capture_help_snapshots(api_data)?;

        let mut validation = HelpValidation {
            validation_timestamp: now_iso(),
            validation_status: HelpValidationStatus::Skipped,
            reason: None,
            current_snapshot_file: current.snapshot_file.clone(),
            reference_snapshot_file: reference.clone(),
            comparison: None,
            recommendations: Vec::new(),
        };
        let Some(reference) = reference else {
            validation.reason = Some("No reference snapshot found for comparison".to_string());
            return Ok(validation);
        };

        let comparison = compare_snapshot_sets(&self.load_snapshots(&reference)?, &current);
        if comparison.summary.has_breaking_changes {
            validation.validation_status = HelpValidationStatus::Failed;
            validation
                .recommendations
                .push("Review help() output changes for breaking changes".to_string());
        } else {
            validation.validation_status = HelpValidationStatus::Passed;
        }
        if comparison.summary.modifications > 0 {
            validation
                .recommendations
                .push("Update documentation to reflect help() output changes".to_string());
        }
        validation.comparison = Some(comparison);

        info!(
            "Help snapshot validation completed: {}",
            validation.validation_status.as_str()
        );
        Ok(validation)
    }

    pub fn generate_snapshot_report(&self, set: &HelpSnapshotSet) -> String {
        generate_snapshot_report(set)
    }
}

/// `1234567` as `1,234,567`.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn generate_snapshot_report(set: &HelpSnapshotSet) -> String {
    let meta = &set.metadata;
    let mut md = Markdown::new();
    md.heading(1, "Help() Snapshot Report")
        .line(format!("**Package:** {}  ", set.package_name))
        .para(format!("**Capture Time:** {}", set.capture_timestamp));

    md.heading(2, "Summary")
        .line(format!("- **Total Elements:** {}", set.total_elements))
        .line(format!("- **Captured Snapshots:** {}", set.captured_snapshots))
        .blank();

    md.heading(2, "Snapshot Metadata")
        .line(format!(
            "- **Total Output Length:** {} characters",
            thousands(meta.total_output_length)
        ))
        .line(format!(
            "- **Average Output Length:** {:.0} characters",
            meta.average_output_length
        ))
        .line(format!("- **Elements with Docstrings:** {}", meta.elements_with_docstrings))
        .line(format!("- **Elements with Signatures:** {}", meta.elements_with_signatures));
    for (label, record) in [
        ("Longest", &meta.longest_help_output),
        ("Shortest", &meta.shortest_help_output),
    ] {
        if let Some(record) = record {
            md.line(format!(
                "- **{label} Help Output:** {} ({} characters)",
                record.element,
                thousands(record.length)
            ));
        }
    }
    md.blank();

    if !meta.elements_by_type.is_empty() {
        md.heading(2, "Elements by Type");
        for (kind, count) in &meta.elements_by_type {
            let mut title = kind.clone();
            if let Some(first) = title.get_mut(..1) {
                first.make_ascii_uppercase();
            }
            md.line(format!("- **{title}:** {count}"));
        }
        md.blank();
    }
    md.finish()
}
