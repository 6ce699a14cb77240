//! End-to-end documentation build.
//!
//! [`AutodocBuilder::build_complete_documentation`] chains analysis,
//! extraction, snapshotting, version tracking, change detection, stub
//! generation, summaries and index pages into one run. Stages after the
//! snapshot degrade to warnings or stage failures instead of aborting, so a
//! [`BuildResult`] is always produced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::UltrathinkConfig;
use crate::diffing::classifier::{ChangeClassifier, ClassifiedDiff};
use crate::diffing::differ::ApiDiffer;
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::generation::stubs::{safe_name, StubGenerator};
use crate::generation::Markdown;
use crate::introspection::extractor::extract_from_sources;
use crate::introspection::hasher::Sensitivity;
use crate::introspection::package::PackageSources;
use crate::models::{ApiData, ApiElement, ElementKind};
use crate::persist::{file_timestamp, now_iso, write_sorted_json};
use crate::store::tracker::VersionTracker;

/// Number of stub links listed on the top-level index page.
const INDEX_STUB_LINKS: usize = 10;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageResult {
    pub status: StageStatus,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StageResult {
    fn completed(details: Value) -> Self {
        Self {
            status: StageStatus::Completed,
            timestamp: now_iso(),
            details,
            error: None,
            reason: None,
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            timestamp: now_iso(),
            details: Value::Null,
            error: None,
            reason: Some(reason.into()),
        }
    }

    fn failed(err: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            timestamp: now_iso(),
            details: Value::Null,
            error: Some(err.into()),
            reason: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    InProgress,
    Completed,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Paths written during one build, grouped by artifact kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeneratedFiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_snapshot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_results: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub new_stubs: BTreeMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub all_stubs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub summary_docs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub index_files: BTreeMap<String, PathBuf>,
}

impl GeneratedFiles {
    /// Stub pages written in this build, new-element stubs first.
    pub fn stubs(&self) -> &BTreeMap<String, PathBuf> {
        if self.new_stubs.is_empty() {
            &self.all_stubs
        } else {
            &self.new_stubs
        }
    }

    pub fn count(&self) -> usize {
        usize::from(self.api_snapshot.is_some())
            + usize::from(self.comparison_results.is_some())
            + self.new_stubs.len()
            + self.all_stubs.len()
            + self.summary_docs.len()
            + self.index_files.len()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildResult {
    pub version: String,
    pub build_timestamp: String,
    pub package_name: String,
    pub build_stages: IndexMap<String, StageResult>,
    pub generated_files: GeneratedFiles,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub build_status: BuildStatus,
    pub build_duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_results_file: Option<PathBuf>,
}

impl BuildResult {
    fn new(version: &str, package_name: &str) -> Self {
        Self {
            version: version.to_string(),
            build_timestamp: now_iso(),
            package_name: package_name.to_string(),
            build_stages: IndexMap::new(),
            generated_files: GeneratedFiles::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            build_status: BuildStatus::InProgress,
            build_duration_seconds: 0.0,
            build_results_file: None,
        }
    }

    fn stage(&mut self, name: &str, result: StageResult) {
        self.build_stages.insert(name.to_string(), result);
    }

    pub fn succeeded(&self) -> bool {
        self.build_status == BuildStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct AutodocBuilder {
    package: String,
    source_dir: PathBuf,
    storage_root: PathBuf,
    differ: ApiDiffer,
    classifier: ChangeClassifier,
    stubs: StubGenerator,
    tracker: VersionTracker,
}

impl AutodocBuilder {
    pub fn new(
        package: &str,
        source_dir: &Path,
        storage_root: &Path,
        sensitivity: Sensitivity,
    ) -> UltrathinkResult<Self> {
        Ok(Self {
            package: package.to_string(),
            source_dir: source_dir.to_path_buf(),
            storage_root: storage_root.to_path_buf(),
            differ: ApiDiffer::new(storage_root, sensitivity)?,
            classifier: ChangeClassifier::new(),
            stubs: StubGenerator::new(storage_root),
            tracker: VersionTracker::new(storage_root)?,
        })
    }

    pub fn from_config(config: &UltrathinkConfig) -> UltrathinkResult<Self> {
        let package = config.package.name.as_deref().ok_or_else(|| {
            let msg = "[package].name is required for documentation builds";
            UltrathinkError::Config(msg.to_string())
        })?;
        let mut builder = Self::new(
            package,
            &config.package.source_directory,
            config.storage_root(),
            config.hashing.sensitivity,
        )?;
        builder.classifier = ChangeClassifier::from_config(config);
        Ok(builder)
    }

    fn docs_dir(&self) -> PathBuf {
        self.storage_root.join("generated_docs")
    }

    /// Run every build stage for `version`, diffing against `compare_with`
    /// when given. The result is persisted under `build_results/`.
    pub fn build_complete_documentation(
        &self,
        version: &str,
        compare_with: Option<&str>,
    ) -> BuildResult {
        let started = Instant::now();
        let mut result = BuildResult::new(version, &self.package);
        info!("Starting documentation build for {} v{version}", self.package);

        match self.run_stages(&mut result, version, compare_with) {
            Ok(()) => result.build_status = BuildStatus::Completed,
            Err(e) => {
                error!("Documentation build failed: {e}");
                result.errors.push(format!("Documentation build failed: {e}"));
                result.build_status = BuildStatus::Failed;
            }
        }
        result.build_duration_seconds = started.elapsed().as_secs_f64();

        let path = self
            .storage_root
            .join("build_results")
            .join(format!("build_results_{version}_{}.json", file_timestamp()));
        match write_sorted_json(&path, &result) {
            Ok(()) => {
                info!("Build results saved to {}", path.display());
                result.build_results_file = Some(path);
            }
            Err(e) => {
                warn!("Failed to save build results: {e}");
                result.warnings.push(format!("Failed to save build results: {e}"));
            }
        }

        info!(
            "Documentation build {} in {:.2}s",
            result.build_status.as_str(),
            result.build_duration_seconds
        );
        result
    }

    fn run_stages(
        &self,
        result: &mut BuildResult,
        version: &str,
        compare_with: Option<&str>,
    ) -> UltrathinkResult<()> {
        info!("Stage 1: package analysis");
        let sources = PackageSources::load(&self.source_dir, &self.package)?;
        let analysis = sources.analyze();
        let public_exports = analysis["package_info"]["all_exports"]
            .as_array()
            .map_or(0, Vec::len);
        result.stage(
            "package_analysis",
            StageResult::completed(json!({
                "total_modules": analysis["metadata"]["total_modules"],
                "public_api_elements": public_exports,
                "total_files": analysis["file_structure"]["python_files"],
            })),
        );

        info!("Stage 2: API extraction");
        let api_data = extract_from_sources(&sources);
        result.stage(
            "api_extraction",
            StageResult::completed(json!({
                "extracted_elements": api_data.public_api.len(),
                "signatures_extracted": api_data.signatures.len(),
                "type_hints_extracted": api_data.type_hints.len(),
            })),
        );

        info!("Stage 3: API snapshot");
        let snapshot_path = self.differ.create_api_snapshot(&api_data, version)?;
        result.stage(
            "snapshot_creation",
            StageResult::completed(json!({ "snapshot_file": snapshot_path.to_string_lossy() })),
        );
        result.generated_files.api_snapshot = Some(snapshot_path.clone());

        let snapshot_file = snapshot_path.to_string_lossy();
        match self.tracker.register_version(version, Some(&snapshot_file), None) {
            Ok(id) => result.stage(
                "version_registration",
                StageResult::completed(json!({ "version_id": id })),
            ),
            Err(e) => {
                warn!("Version registration skipped: {e}");
                result.warnings.push(format!("Version registration skipped: {e}"));
                result.stage("version_registration", StageResult::skipped(e.to_string()));
            }
        }

        match compare_with {
            Some(old_version) => self.detect_changes(result, &api_data, old_version, version),
            None => {
                info!("Stage 4: regenerating all stubs");
                let generated = self.stubs.regenerate_all_stubs(&api_data, false)?;
                result.stage(
                    "stub_generation",
                    StageResult::completed(json!({ "all_stubs_generated": generated.len() })),
                );
                result.generated_files.all_stubs = generated;
            }
        }

        info!("Stage 5: summary documentation");
        let summaries = self.write_summary_docs(result, &api_data, &analysis)?;
        result.stage(
            "summary_generation",
            StageResult::completed(json!({ "summary_files": summaries.len() })),
        );
        result.generated_files.summary_docs = summaries;

        info!("Stage 6: index pages");
        let stubs = result.generated_files.stubs().clone();
        let index_files = self.write_index_files(&api_data, version, &stubs)?;
        result.stage(
            "index_generation",
            StageResult::completed(json!({ "index_files": index_files.len() })),
        );
        result.generated_files.index_files = index_files;
        Ok(())
    }

    /// Diff, classify, record and stub the changes since `old_version`.
    /// Failures are recorded on the result rather than propagated.
    fn detect_changes(
        &self,
        result: &mut BuildResult,
        api_data: &ApiData,
        old_version: &str,
        version: &str,
    ) {
        info!("Stage 4: change detection against {old_version}");
        let classified = match self.classify(old_version, version) {
            Ok(classified) => classified,
            Err(e) => {
                error!("Change detection failed: {e}");
                result.errors.push(format!("Change detection failed: {e}"));
                result.stage("change_detection", StageResult::failed(e.to_string()));
                return;
            }
        };

        let summary = &classified.classified_changes.summary;
        result.stage(
            "change_detection",
            StageResult::completed(json!({
                "total_changes": summary.total_changes,
                "breaking_changes": summary.breaking_changes_count,
                "compatibility_impact": classified.compatibility_impact.as_str(),
            })),
        );

        match self
            .tracker
            .record_changes(old_version, version, classified.classified_changes.iter())
        {
            Ok(n) => info!("Recorded {n} changes in version tracker"),
            Err(e) => {
                warn!("Could not record changes: {e}");
                result.warnings.push(format!("Could not record changes: {e}"));
            }
        }

        let added = &classified.diff.signature_changes.added;
        if added.is_empty() {
            result.stage("stub_generation", StageResult::skipped("No new API elements"));
        } else {
            match self.stubs.generate_stubs_for_new_elements(added, api_data) {
                Ok(generated) => {
                    result.stage(
                        "stub_generation",
                        StageResult::completed(json!({ "new_stubs_generated": generated.len() })),
                    );
                    result.generated_files.new_stubs = generated;
                }
                Err(e) => {
                    result.errors.push(format!("Stub generation failed: {e}"));
                    result.stage("stub_generation", StageResult::failed(e.to_string()));
                }
            }
        }

        let path = self.storage_root.join("comparisons").join(format!(
            "comparison_{old_version}_to_{version}_{}.json",
            file_timestamp()
        ));
        match write_sorted_json(&path, &classified) {
            Ok(()) => result.generated_files.comparison_results = Some(path),
            Err(e) => {
                warn!("Failed to save comparison results: {e}");
                result.warnings.push(format!("Failed to save comparison results: {e}"));
            }
        }
    }

    fn classify(&self, old_version: &str, version: &str) -> UltrathinkResult<ClassifiedDiff> {
        let diff = self.differ.compare_versions(old_version, version)?;
        Ok(self.classifier.classify_changes(diff))
    }

    // -----------------------------------------------------------------------
    // Summary pages
    // -----------------------------------------------------------------------

    fn write_summary_docs(
        &self,
        result: &BuildResult,
        api_data: &ApiData,
        analysis: &Value,
    ) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        let dir = self.docs_dir().join("summaries");
        std::fs::create_dir_all(&dir)?;
        let version = &result.version;

        let pages = [
            ("package_overview", render_package_overview(&self.package, version, analysis)),
            ("api_summary", render_api_summary(&self.package, version, api_data)),
            ("build_report", render_build_report(result)),
        ];

        let mut written = BTreeMap::new();
        for (key, content) in pages {
            let path = dir.join(format!("{key}_{version}.md"));
            std::fs::write(&path, content)?;
            written.insert(key.to_string(), path);
        }
        Ok(written)
    }

    fn write_index_files(
        &self,
        api_data: &ApiData,
        version: &str,
        stubs: &BTreeMap<String, PathBuf>,
    ) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        let docs_dir = self.docs_dir();
        let api_dir = docs_dir.join("api");
        std::fs::create_dir_all(&api_dir)?;

        let api_index = api_dir.join("index.md");
        std::fs::write(&api_index, render_api_index(&self.package, version, api_data))?;

        let main_index = docs_dir.join("index.md");
        std::fs::write(&main_index, render_main_index(&self.package, version, stubs))?;

        Ok(BTreeMap::from([
            ("api_index".to_string(), api_index),
            ("main_index".to_string(), main_index),
        ]))
    }

    /// Rebuild only the index pages from a fresh extraction.
    pub fn update_index(&self) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        let sources = PackageSources::load(&self.source_dir, &self.package)?;
        let api_data = extract_from_sources(&sources);
        let version = match self.tracker.get_current_version()? {
            Some(record) => record.version_string,
            None => api_data.package_info.version.clone(),
        };
        let stubs = existing_stubs(self.stubs.reference_dir());
        let files = self.write_index_files(&api_data, &version, &stubs)?;
        info!("Updated {} index files", files.len());
        Ok(files)
    }
}

/// Stub pages already on disk, keyed by file stem.
fn existing_stubs(dir: &Path) -> BTreeMap<String, PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return BTreeMap::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|p| Some((p.file_stem()?.to_string_lossy().into_owned(), p.clone())))
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn plural_label(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Class => "Classes",
        ElementKind::Function => "Functions",
        ElementKind::Method => "Methods",
        ElementKind::Builtin => "Builtins",
        ElementKind::Module => "Modules",
        ElementKind::Callable => "Callables",
        ElementKind::Variable => "Variables",
    }
}

/// `api_extraction` -> `Api Extraction`.
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Elements grouped by kind, each group in name order.
fn group_by_kind(api_data: &ApiData) -> BTreeMap<ElementKind, Vec<(&String, &ApiElement)>> {
    let mut groups: BTreeMap<ElementKind, Vec<_>> = BTreeMap::new();
    for (name, element) in &api_data.public_api {
        groups.entry(element.kind).or_default().push((name, element));
    }
    for members in groups.values_mut() {
        members.sort_by(|a, b| a.0.cmp(b.0));
    }
    groups
}

fn first_line(doc: &str) -> &str {
    doc.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

fn render_package_overview(package: &str, version: &str, analysis: &Value) -> String {
    let info = &analysis["package_info"];
    let meta = &analysis["metadata"];
    let deps = &analysis["dependencies"];
    let count = |v: &Value| v.as_array().map_or(0, Vec::len);

    let mut md = Markdown::new();
    md.heading(1, format!("{package} Package Overview"))
        .line(format!("**Version:** {version}  "))
        .line(format!("**Generated:** {}  ", now_iso()))
        .para(format!(
            "**Location:** {}",
            info["package_dir"].as_str().unwrap_or("unknown")
        ));

    let doc = info["docstring"].as_str().unwrap_or("").trim();
    if !doc.is_empty() {
        md.heading(2, "Description").para(doc);
    }

    md.heading(2, "Statistics")
        .line(format!("- **Modules:** {}", meta["total_modules"]))
        .line(format!("- **Lines of code:** {}", meta["total_lines_of_code"]))
        .line(format!("- **Python files:** {}", analysis["file_structure"]["python_files"]))
        .line(format!("- **Public exports:** {}", count(&info["all_exports"])))
        .blank();

    if let Some(tree) = analysis["module_tree"].as_object() {
        md.heading(2, "Module Structure");
        for (name, module) in tree {
            md.line(format!(
                "- `{name}`: {} classes, {} functions",
                count(&module["classes"]),
                count(&module["functions"])
            ));
        }
        md.blank();
    }

    md.heading(2, "Dependencies");
    for (label, key) in [
        ("Standard library", "standard_library"),
        ("Third party", "third_party"),
        ("Internal", "internal"),
    ] {
        let names: Vec<&str> = deps[key]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if names.is_empty() {
            md.line(format!("- **{label}:** none"));
        } else {
            md.line(format!("- **{label}:** {}", names.join(", ")));
        }
    }
    md.blank().footer(None);
    md.finish()
}

fn render_api_summary(package: &str, version: &str, api_data: &ApiData) -> String {
    let groups = group_by_kind(api_data);
    let mut md = Markdown::new();
    md.heading(1, format!("API Summary - {package} v{version}"))
        .para(format!("**Total public elements:** {}", api_data.public_api.len()));

    md.heading(2, "Element Types")
        .line("| Type | Count |")
        .line("|------|-------|");
    for (kind, members) in &groups {
        md.line(format!("| {} | {} |", kind.as_str(), members.len()));
    }
    md.blank();

    for (kind, members) in &groups {
        md.heading(2, plural_label(*kind));
        for (name, element) in members {
            let summary = first_line(&element.doc);
            if summary.is_empty() {
                md.line(format!("- **{name}**"));
            } else {
                md.line(format!("- **{name}**: {summary}"));
            }
        }
        md.blank();
    }
    md.footer(None);
    md.finish()
}

fn render_build_report(result: &BuildResult) -> String {
    let mut md = Markdown::new();
    md.heading(1, format!("Build Report - {} v{}", result.package_name, result.version))
        .line(format!("**Build started:** {}  ", result.build_timestamp))
        .para(format!("**Stages run:** {}", result.build_stages.len()));

    md.heading(2, "Stages");
    for (name, stage) in &result.build_stages {
        let status = match stage.status {
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "failed",
        };
        let mut line = format!("- **{}**: {status}", title_case(name));
        if let Some(reason) = stage.reason.as_deref().or(stage.error.as_deref()) {
            line.push_str(&format!(" ({reason})"));
        }
        md.line(line);
    }
    md.blank();

    if !result.warnings.is_empty() {
        md.heading(2, "Warnings");
        for warning in &result.warnings {
            md.line(format!("- {warning}"));
        }
        md.blank();
    }
    if !result.errors.is_empty() {
        md.heading(2, "Errors");
        for err in &result.errors {
            md.line(format!("- {err}"));
        }
        md.blank();
    }
    md.footer(Some(&now_iso()));
    md.finish()
}

fn render_api_index(package: &str, version: &str, api_data: &ApiData) -> String {
    let mut md = Markdown::new();
    md.heading(1, format!("{package} API Reference"))
        .para(format!("Version {version}"));
    for (kind, members) in group_by_kind(api_data) {
        md.heading(2, plural_label(kind));
        for (name, element) in members {
            let link = format!("../api_reference/{}_{}.md", safe_name(name), kind.as_str());
            let summary = first_line(&element.doc);
            if summary.is_empty() {
                md.line(format!("- [{name}]({link})"));
            } else {
                md.line(format!("- [{name}]({link}): {summary}"));
            }
        }
        md.blank();
    }
    md.footer(Some(&now_iso()));
    md.finish()
}

fn render_main_index(package: &str, version: &str, stubs: &BTreeMap<String, PathBuf>) -> String {
    let mut md = Markdown::new();
    md.heading(1, format!("{package} Documentation"))
        .para(format!("**Current version:** {version}"));

    md.heading(2, "Contents")
        .line("- [API Reference](api/index.md)")
        .line(format!("- [Package Overview](summaries/package_overview_{version}.md)"))
        .line(format!("- [API Summary](summaries/api_summary_{version}.md)"))
        .line(format!("- [Build Report](summaries/build_report_{version}.md)"))
        .blank();

    if !stubs.is_empty() {
        md.heading(2, "Reference Pages");
        for (name, path) in stubs.iter().take(INDEX_STUB_LINKS) {
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            md.line(format!("- [{name}](api_reference/{file})"));
        }
        if stubs.len() > INDEX_STUB_LINKS {
            md.line(format!("- ... and {} more", stubs.len() - INDEX_STUB_LINKS));
        }
        md.blank();
    }
    md.footer(Some(&now_iso()));
    md.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn builder(root: &Path) -> AutodocBuilder {
        let (src, storage) = (root.join("src"), root.join("storage"));
        AutodocBuilder::new("demo", &src, &storage, Sensitivity::Strict).unwrap()
    }

    const V1: &str = concat!(
        "\"\"\"Demo package.\"\"\"\n__version__ = '1.0.0'\n\n",
        "def run(x: int) -> int:\n    \"\"\"Run it.\"\"\"\n    return x\n",
    );

    #[test]
    fn test_fresh_build_generates_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);

        let result = builder(dir.path()).build_complete_documentation("1.0.0", None);
        assert!(result.succeeded(), "errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert_eq!(result.build_stages["version_registration"].status, StageStatus::Completed);
        assert!(result.generated_files.all_stubs.contains_key("run"));
        assert_eq!(result.generated_files.summary_docs.len(), 3);

        let storage = dir.path().join("storage");
        assert!(storage.join("generated_docs/summaries/api_summary_1.0.0.md").exists());
        let api_index =
            std::fs::read_to_string(storage.join("generated_docs/api/index.md")).unwrap();
        assert!(api_index.contains("[run](../api_reference/run_function.md)"));
        assert!(result.build_results_file.as_ref().unwrap().exists());
    }

    #[test]
    fn test_comparison_build_stubs_only_new_elements() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);
        let b = builder(dir.path());
        assert!(b.build_complete_documentation("1.0.0", None).succeeded());

        write(
            dir.path(),
            "src/demo/__init__.py",
            &format!("{V1}\ndef extra():\n    \"\"\"Extra.\"\"\"\n"),
        );
        let result = b.build_complete_documentation("1.1.0", Some("1.0.0"));
        assert!(result.succeeded(), "errors: {:?}", result.errors);
        assert_eq!(result.build_stages["change_detection"].status, StageStatus::Completed);
        let new: Vec<&str> = result.generated_files.new_stubs.keys().map(String::as_str).collect();
        assert_eq!(new, vec!["extra"]);
        assert!(result.generated_files.comparison_results.is_some());

        let recorded = b.tracker.get_changes_between_versions("1.0.0", "1.1.0").unwrap();
        assert!(recorded.iter().any(|c| c.element_name == "extra"));
    }

    #[test]
    fn test_missing_baseline_is_a_stage_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);
        let result = builder(dir.path()).build_complete_documentation("1.0.0", Some("0.9.0"));

        assert!(result.succeeded());
        assert_eq!(result.build_stages["change_detection"].status, StageStatus::Failed);
        assert!(result.errors.iter().any(|e| e.contains("No snapshot found for version 0.9.0")));
        assert!(result.build_stages.contains_key("index_generation"));
    }

    #[test]
    fn test_duplicate_registration_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);
        let b = builder(dir.path());
        b.build_complete_documentation("1.0.0", None);
        let again = b.build_complete_documentation("1.0.0", None);

        assert!(again.succeeded());
        assert_eq!(again.build_stages["version_registration"].status, StageStatus::Skipped);
        assert_eq!(again.warnings.len(), 1);
    }

    #[test]
    fn test_missing_package_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let result = builder(dir.path()).build_complete_documentation("1.0.0", None);
        assert_eq!(result.build_status, BuildStatus::Failed);
        assert!(result.errors[0].contains("No module named 'demo'"));
    }

    #[test]
    fn test_update_index_uses_current_version() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);
        let b = builder(dir.path());
        b.build_complete_documentation("1.0.0", None);

        let files = b.update_index().unwrap();
        let main = std::fs::read_to_string(&files["main_index"]).unwrap();
        assert!(main.contains("**Current version:** 1.0.0"));
        assert!(main.contains("api_reference/run_function.md"));
    }

    #[test]
    fn test_update_index_prefers_tracked_version_over_package_version() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/demo/__init__.py", V1);
        let b = builder(dir.path());

        let files = b.update_index().unwrap();
        let main = std::fs::read_to_string(&files["main_index"]).unwrap();
        assert!(main.contains("**Current version:** 1.0.0"));

        b.tracker.register_version("2.0.0", None, None).unwrap();
        let files = b.update_index().unwrap();
        let main = std::fs::read_to_string(&files["main_index"]).unwrap();
        assert!(main.contains("**Current version:** 2.0.0"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("api_extraction"), "Api Extraction");
        assert_eq!(title_case("index"), "Index");
    }
}
