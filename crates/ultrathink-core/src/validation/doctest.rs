//! Doctest collection and execution.
//!
//! Examples are gathered from docstrings in the extracted API and from
//! ```` ```python ```` blocks in the generated markdown, then handed to a
//! [`DoctestRunner`] together with the module whose globals they run in:
//! the defining module for docstring examples, the package itself for
//! documentation blocks. The default [`PythonRunner`] shells out to the
//! configured interpreter with a per-test timeout.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::UltrathinkConfig;
use crate::errors::UltrathinkResult;
use crate::generation::Markdown;
use crate::models::ApiData;
use crate::persist::{file_timestamp, now_iso, write_sorted_json};

static PYTHON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```python\n(.*?)\n```").unwrap());

/// Blocks containing any of these are illustrations, not runnable code.
const SKIP_PATTERNS: &[&str] = &[
    "# TODO:",
    "# Example usage",
    "# Old (deprecated)",
    "# New (recommended)",
    "...",
];

const DOCTEST_FLAGS: &[&str] = &["ELLIPSIS", "NORMALIZE_WHITESPACE", "IGNORE_EXCEPTION_DETAIL"];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Checks a doctest file against the globals of an imported module.
/// argv: file, module, comma-separated option flags.
const DOCTEST_DRIVER: &str = r#"
import doctest, importlib, sys
path, module_name, flag_names = sys.argv[1:4]
module = importlib.import_module(module_name)
flags = 0
for name in filter(None, flag_names.split(",")):
    flags |= getattr(doctest, name)
with open(path, encoding="utf-8") as fh:
    text = fh.read()
test = doctest.DocTestParser().get_doctest(text, dict(vars(module)), module_name, path, 0)
runner = doctest.DocTestRunner(optionflags=flags)
runner.run(test)
sys.exit(1 if runner.failures else 0)
"#;

/// Runs a script with the package and the module's public names preloaded.
/// argv: file, module.
const SCRIPT_DRIVER: &str = r#"
import importlib, sys
path, module_name = sys.argv[1:3]
module = importlib.import_module(module_name)
top = module_name.partition(".")[0]
names = getattr(module, "__all__", [n for n in vars(module) if not n.startswith("_")])
globs = {"__name__": "__main__", "__file__": path, top: importlib.import_module(top)}
globs.update({n: getattr(module, n) for n in names if hasattr(module, n)})
with open(path, encoding="utf-8") as fh:
    code = compile(fh.read(), path, "exec")
exec(code, globs)
"#;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctestKind {
    /// `>>>` examples checked against their expected output.
    Doctest,
    /// Plain code that only has to run without raising.
    Script,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctestOrigin {
    Docstring,
    Documentation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectedTest {
    pub id: String,
    pub origin: DoctestOrigin,
    pub kind: DoctestKind,
    pub code: String,
    /// Module providing the globals; `None` means the package itself.
    pub module: Option<String>,
}

/// `>>>` examples from every element docstring, class members included.
pub fn collect_docstring_tests(api_data: &ApiData) -> Vec<CollectedTest> {
    let mut tests = Vec::new();
    let mut push = |id: String, doc: &str, module: &str| {
        if doc.contains(">>>") {
            tests.push(CollectedTest {
                id,
                origin: DoctestOrigin::Docstring,
                kind: DoctestKind::Doctest,
                code: doc.to_string(),
                module: (!module.is_empty()).then(|| module.to_string()),
            });
        }
    };

    for (name, element) in &api_data.public_api {
        push(name.clone(), &element.doc, &element.module);
        if let Some(info) = &element.class_info {
            for (member, m) in info
                .methods
                .iter()
                .chain(&info.class_methods)
                .chain(&info.static_methods)
                .chain(&info.properties)
                .chain(&info.descriptors)
            {
                if m.defined_in == element.name || m.defined_in.is_empty() {
                    push(format!("{name}.{member}"), &m.doc, &element.module);
                }
            }
        }
    }
    tests
}

/// Runnable python blocks from the markdown files under `docs_dir`.
pub fn collect_markdown_tests(docs_dir: &Path) -> Vec<CollectedTest> {
    let mut tests = Vec::new();
    if !docs_dir.exists() {
        return tests;
    }
    let files = WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "md"));

    for entry in files {
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {e}", entry.path().display());
                continue;
            }
        };
        let rel = entry
            .path()
            .strip_prefix(docs_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        tests.extend(markdown_blocks(&rel, &content));
    }
    tests
}

fn markdown_blocks(source: &str, content: &str) -> Vec<CollectedTest> {
    PYTHON_BLOCK
        .captures_iter(content)
        .enumerate()
        .filter_map(|(i, caps)| {
            let code = caps.get(1)?.as_str();
            let kind = if code.contains(">>>") {
                DoctestKind::Doctest
            } else if SKIP_PATTERNS.iter().any(|p| code.contains(p)) {
                debug!("Skipping illustrative block {source}:block_{i}");
                return None;
            } else {
                DoctestKind::Script
            };
            Some(CollectedTest {
                id: format!("{source}:block_{i}"),
                origin: DoctestOrigin::Documentation,
                kind,
                code: code.to_string(),
                module: None,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: TestStatus,
    pub output: String,
}

impl RunOutcome {
    pub fn new(status: TestStatus, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }
}

/// Executes one collected example in the namespace of `module`.
pub trait DoctestRunner {
    fn run(&self, kind: DoctestKind, code: &str, module: &str) -> RunOutcome;
}

/// Runs examples with an external Python interpreter.
///
/// The example is written to a temporary file and handed to a small driver
/// program. Doctests are checked with `doctest.DocTestRunner` against a copy
/// of the module's globals. Scripts are executed with the top-level package
/// and the module's public names already bound. The source directory is
/// prepended to `PYTHONPATH` so the package under test imports.
pub struct PythonRunner {
    python: String,
    source_dir: PathBuf,
    timeout: Duration,
}

impl PythonRunner {
    pub fn new(python: &str, source_dir: &Path, timeout: Duration) -> Self {
        Self {
            python: python.to_string(),
            source_dir: source_dir.to_path_buf(),
            timeout,
        }
    }

    pub fn from_config(config: &UltrathinkConfig) -> Self {
        Self::new(
            &config.validation.python_executable,
            &config.package.source_directory,
            Duration::from_secs(config.validation.doctest_timeout_secs),
        )
    }

    fn pythonpath(&self) -> String {
        let source = self.source_dir.to_string_lossy().into_owned();
        match std::env::var("PYTHONPATH") {
            Ok(existing) if !existing.is_empty() => format!("{source}:{existing}"),
            _ => source,
        }
    }

    fn execute(&self, kind: DoctestKind, code: &str, module: &str) -> std::io::Result<RunOutcome> {
        let suffix = match kind {
            DoctestKind::Doctest => ".txt",
            DoctestKind::Script => ".py",
        };
        let mut script = tempfile::Builder::new()
            .prefix("ultrathink_doctest_")
            .suffix(suffix)
            .tempfile()?;
        script.write_all(code.as_bytes())?;
        script.flush()?;

        let mut output = tempfile::tempfile()?;
        let mut cmd = Command::new(&self.python);
        match kind {
            DoctestKind::Doctest => {
                cmd.args(["-c", DOCTEST_DRIVER])
                    .arg(script.path())
                    .arg(module)
                    .arg(DOCTEST_FLAGS.join(","));
            }
            DoctestKind::Script => {
                cmd.args(["-c", SCRIPT_DRIVER]).arg(script.path()).arg(module);
            }
        }
        cmd.env("PYTHONPATH", self.pythonpath())
            .stdin(Stdio::null())
            .stdout(Stdio::from(output.try_clone()?))
            .stderr(Stdio::from(output.try_clone()?));

        let mut child = cmd.spawn()?;
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let mut captured = String::new();
        output.seek(SeekFrom::Start(0))?;
        output.read_to_string(&mut captured)?;

        Ok(match status {
            Some(s) if s.success() => RunOutcome::new(TestStatus::Passed, captured),
            Some(_) => RunOutcome::new(TestStatus::Failed, captured),
            None => RunOutcome::new(
                TestStatus::Failed,
                format!("Timed out after {}s\n{captured}", self.timeout.as_secs()),
            ),
        })
    }
}

impl DoctestRunner for PythonRunner {
    fn run(&self, kind: DoctestKind, code: &str, module: &str) -> RunOutcome {
        self.execute(kind, code, module).unwrap_or_else(|e| {
            RunOutcome::new(TestStatus::Error, format!("Failed to run {}: {e}", self.python))
        })
    }
}

// ---------------------------------------------------------------------------
// Validation result
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub origin: DoctestOrigin,
    pub kind: DoctestKind,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
    NoTests,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::NoTests => "no_tests",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DoctestSummary {
    /// Percentage of executed tests that passed, two decimals.
    pub success_rate: f64,
    pub docstring_tests: usize,
    pub documentation_tests: usize,
    pub validation_status: ValidationStatus,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DoctestValidation {
    pub package_name: String,
    pub validation_timestamp: String,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub error_tests: usize,
    pub skipped_tests: usize,
    pub results: Vec<TestResult>,
    pub summary: DoctestSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<PathBuf>,
}

impl DoctestValidation {
    /// Fraction of executed tests that passed, `None` when nothing ran.
    pub fn pass_rate(&self) -> Option<f64> {
        let executed = self.total_tests - self.skipped_tests;
        (executed > 0).then(|| self.passed_tests as f64 / executed as f64)
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

pub struct DoctestValidator {
    package: String,
    storage_root: PathBuf,
    runner: Box<dyn DoctestRunner>,
    execute: bool,
}

impl DoctestValidator {
    pub fn new(package: &str, storage_root: &Path, runner: Box<dyn DoctestRunner>) -> Self {
        Self {
            package: package.to_string(),
            storage_root: storage_root.to_path_buf(),
            runner,
            execute: true,
        }
    }

    pub fn from_config(config: &UltrathinkConfig, package: &str) -> Self {
        Self::new(package, config.storage_root(), Box::new(PythonRunner::from_config(config)))
            .with_execution(config.validation.run_doctests)
    }

    /// When disabled, tests are still collected but reported as skipped.
    pub fn with_execution(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    pub fn validate_package_doctests(
        &self,
        api_data: &ApiData,
    ) -> UltrathinkResult<DoctestValidation> {
        info!("Starting doctest validation for package {}", self.package);

        let mut collected = collect_docstring_tests(api_data);
        let docstring_tests = collected.len();
        collected.extend(collect_markdown_tests(&self.storage_root.join("generated_docs")));
        let documentation_tests = collected.len() - docstring_tests;

        let results: Vec<TestResult> = collected
            .into_iter()
            .map(|test| {
                let outcome = if self.execute {
                    let module = test.module.as_deref().unwrap_or(&self.package);
                    self.runner.run(test.kind, &test.code, module)
                } else {
                    RunOutcome::new(TestStatus::Skipped, "")
                };
                if outcome.status != TestStatus::Passed && outcome.status != TestStatus::Skipped {
                    debug!("Doctest {} {:?}", test.id, outcome.status);
                }
                TestResult {
                    id: test.id,
                    origin: test.origin,
                    kind: test.kind,
                    status: outcome.status,
                    output: outcome.output,
                }
            })
            .collect();

        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(TestStatus::Passed);
        let failed = count(TestStatus::Failed);
        let errors = count(TestStatus::Error);
        let skipped = count(TestStatus::Skipped);
        let total = results.len();
        let executed = total - skipped;

        let success_rate = if executed > 0 {
            (passed as f64 / executed as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        let validation_status = if executed == 0 {
            ValidationStatus::NoTests
        } else if failed + errors > 0 {
            ValidationStatus::Failed
        } else {
            ValidationStatus::Passed
        };

        let mut validation = DoctestValidation {
            package_name: self.package.clone(),
            validation_timestamp: now_iso(),
            total_tests: total,
            passed_tests: passed,
            failed_tests: failed,
            error_tests: errors,
            skipped_tests: skipped,
            results,
            summary: DoctestSummary {
                success_rate,
                docstring_tests,
                documentation_tests,
                validation_status,
                recommendations: Vec::new(),
            },
            result_file: None,
        };
        validation.summary.recommendations = recommendations(&validation);

        let path = self
            .storage_root
            .join("validation_cache")
            .join(format!("doctest_validation_{}.json", file_timestamp()));
        write_sorted_json(&path, &validation)?;
        info!("Saved doctest validation results to {}", path.display());
        validation.result_file = Some(path);

        info!(
            "Doctest validation {}: {passed}/{executed} passed",
            validation_status.as_str()
        );
        Ok(validation)
    }

    pub fn generate_validation_report(&self, validation: &DoctestValidation) -> String {
        generate_validation_report(validation)
    }
}

fn recommendations(v: &DoctestValidation) -> Vec<String> {
    let mut recs = Vec::new();
    if v.total_tests == 0 {
        recs.push("Add doctests to your code and documentation".to_string());
    } else if v.skipped_tests == v.total_tests {
        recs.push("Enable doctest execution to validate collected examples".to_string());
    }
    if v.failed_tests > 0 {
        recs.push(format!("Fix {} failing doctests", v.failed_tests));
    }
    if v.error_tests > 0 {
        recs.push(format!(
            "Investigate {} doctests that could not be executed",
            v.error_tests
        ));
    }
    if v.total_tests > v.skipped_tests && v.summary.success_rate < 90.0 {
        recs.push("Consider improving doctest coverage and quality".to_string());
    }
    if v.total_tests > 0 && v.summary.docstring_tests == 0 {
        recs.push("Add `>>>` examples to public docstrings".to_string());
    }
    recs
}

pub fn generate_validation_report(v: &DoctestValidation) -> String {
    let mut md = Markdown::new();
    md.heading(1, "Doctest Validation Report")
        .line(format!("**Package:** {}  ", v.package_name))
        .para(format!("**Validation Time:** {}", v.validation_timestamp));

    md.heading(2, "Summary")
        .line(format!("- **Total Tests:** {}", v.total_tests))
        .line(format!("- **Passed:** {}", v.passed_tests))
        .line(format!("- **Failed:** {}", v.failed_tests))
        .line(format!("- **Errors:** {}", v.error_tests))
        .line(format!("- **Skipped:** {}", v.skipped_tests))
        .line(format!("- **Success Rate:** {}%", v.summary.success_rate))
        .line(format!(
            "- **Status:** {}",
            v.summary.validation_status.as_str().to_uppercase()
        ))
        .blank();

    let problems: Vec<&TestResult> = v
        .results
        .iter()
        .filter(|r| matches!(r.status, TestStatus::Failed | TestStatus::Error))
        .collect();
    if !problems.is_empty() {
        md.heading(2, "Failures");
        for r in problems {
            md.line(format!("- ❌ **{}** ({:?})", r.id, r.status));
            let first = r.output.lines().find(|l| !l.trim().is_empty());
            if let Some(line) = first {
                md.line(format!("  - `{}`", line.trim()));
            }
        }
        md.blank();
    }

    if !v.summary.recommendations.is_empty() {
        md.heading(2, "Recommendations");
        for rec in &v.summary.recommendations {
            md.line(format!("- {rec}"));
        }
    }
    md.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiElement, ElementKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    type RunLog = Rc<RefCell<Vec<(DoctestKind, String)>>>;

    /// Fails any example containing `boom`.
    struct FakeRunner {
        seen: RunLog,
    }

    impl DoctestRunner for FakeRunner {
        fn run(&self, kind: DoctestKind, code: &str, module: &str) -> RunOutcome {
            self.seen.borrow_mut().push((kind, module.to_string()));
            if code.contains("boom") {
                RunOutcome::new(TestStatus::Failed, "Expected:\n    1\nGot:\n    2")
            } else {
                RunOutcome::new(TestStatus::Passed, "")
            }
        }
    }

    fn fake() -> Box<FakeRunner> {
        Box::new(FakeRunner {
            seen: RunLog::default(),
        })
    }

    fn api_with_docs(docs: &[(&str, &str)]) -> ApiData {
        let mut data = ApiData::default();
        for (name, doc) in docs {
            let mut e = ApiElement::new(name, ElementKind::Function, "demo");
            e.doc = doc.to_string();
            data.public_api.insert(name.to_string(), e);
        }
        data
    }

    #[test]
    fn test_markdown_block_classification() {
        let md = concat!(
            "# Page\n\n```python\n>>> 1 + 1\n2\n```\n\n",
            "```python\n# TODO: Add specific usage examples\n```\n\n",
            "```python\nprint('hi')\n```\n",
        );
        let tests = markdown_blocks("page.md", md);
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].id, "page.md:block_0");
        assert_eq!(tests[0].kind, DoctestKind::Doctest);
        assert_eq!(tests[1].id, "page.md:block_2");
        assert_eq!(tests[1].kind, DoctestKind::Script);
    }

    #[test]
    fn test_validation_counts_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("generated_docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("guide.md"), "```python\nx = 1\n```\n").unwrap();

        let data = api_with_docs(&[
            ("ok", "Add.\n\n>>> 1 + 1\n2\n"),
            ("bad", ">>> boom()\n1\n"),
            ("plain", "No examples."),
        ]);
        let v = DoctestValidator::new("demo", dir.path(), fake())
            .validate_package_doctests(&data)
            .unwrap();

        assert_eq!(v.total_tests, 3);
        assert_eq!(v.passed_tests, 2);
        assert_eq!(v.failed_tests, 1);
        assert_eq!(v.summary.docstring_tests, 2);
        assert_eq!(v.summary.documentation_tests, 1);
        assert_eq!(v.summary.validation_status, ValidationStatus::Failed);
        assert_eq!(v.summary.success_rate, 66.67);
        assert!(v.summary.recommendations.contains(&"Fix 1 failing doctests".to_string()));
        assert!(v.result_file.as_ref().unwrap().exists());

        let report = generate_validation_report(&v);
        assert!(report.contains("- ❌ **bad** (Failed)"));
        assert!(report.contains("**Status:** FAILED"));
    }

    #[test]
    fn test_disabled_execution_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let data = api_with_docs(&[("ok", ">>> 1\n1\n")]);
        let v = DoctestValidator::new("demo", dir.path(), fake())
            .with_execution(false)
            .validate_package_doctests(&data)
            .unwrap();

        assert_eq!(v.skipped_tests, 1);
        assert_eq!(v.pass_rate(), None);
        assert_eq!(v.summary.validation_status, ValidationStatus::NoTests);
    }

    #[test]
    fn test_no_tests() {
        let dir = tempfile::tempdir().unwrap();
        let v = DoctestValidator::new("demo", dir.path(), fake())
            .validate_package_doctests(&ApiData::default())
            .unwrap();
        assert_eq!(v.summary.validation_status, ValidationStatus::NoTests);
        assert_eq!(
            v.summary.recommendations,
            vec!["Add doctests to your code and documentation".to_string()]
        );
    }

    #[test]
    fn test_missing_interpreter_is_an_error() {
        let runner = PythonRunner::new(
            "/nonexistent/python-for-ultrathink",
            Path::new("."),
            Duration::from_secs(1),
        );
        let outcome = runner.run(DoctestKind::Script, "pass\n", "demo");
        assert_eq!(outcome.status, TestStatus::Error);
    }

    #[test]
    fn test_examples_run_in_their_module_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = api_with_docs(&[("add", ">>> add(1, 2)\n3\n")]);
        data.public_api.get_mut("add").unwrap().module = "demo.math".to_string();
        let docs = dir.path().join("generated_docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("guide.md"), "```python\nprint(add(2, 2))\n```\n").unwrap();

        let runner = fake();
        let seen = Rc::clone(&runner.seen);
        let v = DoctestValidator::new("demo", dir.path(), runner)
            .validate_package_doctests(&data)
            .unwrap();

        assert_eq!(v.passed_tests, 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                (DoctestKind::Doctest, "demo.math".to_string()),
                (DoctestKind::Script, "demo".to_string()),
            ]
        );
    }

    fn python3_available() -> bool {
        Command::new("python3")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    #[test]
    fn test_python_runner_sees_package_functions() {
        if !python3_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let pkg = src.join("demo");
        std::fs::create_dir_all(&pkg).unwrap();
        let init = "from .math import add\n\n__all__ = [\"add\"]\n";
        std::fs::write(pkg.join("__init__.py"), init).unwrap();
        std::fs::write(
            pkg.join("math.py"),
            concat!(
                "def _double(x):\n    return 2 * x\n\n\ndef add(a, b):\n",
                "    \"\"\"Add two numbers.\n\n    >>> add(1, 2)\n    3\n",
                "    >>> _double(add(1, 1))\n    4\n    \"\"\"\n    return a + b\n",
            ),
        )
        .unwrap();
        let docs = dir.path().join("storage").join("generated_docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("guide.md"),
            "```python\nassert add(2, 2) == 4\nassert demo.add(1, 1) == 2\n```\n",
        )
        .unwrap();

        let data = crate::introspection::ApiExtractor::new("demo", &src)
            .extract_complete_api()
            .unwrap();
        let runner = PythonRunner::new("python3", &src, Duration::from_secs(30));
        let v = DoctestValidator::new("demo", &dir.path().join("storage"), Box::new(runner))
            .validate_package_doctests(&data)
            .unwrap();

        let outputs: Vec<&str> = v.results.iter().map(|r| r.output.as_str()).collect();
        assert_eq!(v.total_tests, 2, "{outputs:?}");
        assert_eq!(v.passed_tests, 2, "{outputs:?}");
        assert_eq!(v.summary.validation_status, ValidationStatus::Passed);
    }

    #[test]
    fn test_python_runner_reports_wrong_output() {
        if !python3_available() {
            return;
        }
        let runner = PythonRunner::new("python3", Path::new("."), Duration::from_secs(30));
        let outcome = runner.run(DoctestKind::Doctest, ">>> len('abc')\n4\n", "os");
        assert_eq!(outcome.status, TestStatus::Failed);
        assert!(outcome.output.contains("Expected:"));
        let outcome = runner.run(DoctestKind::Doctest, ">>> sep\n'/'\n", "os");
        assert_eq!(outcome.status, TestStatus::Passed, "{}", outcome.output);
    }
}
