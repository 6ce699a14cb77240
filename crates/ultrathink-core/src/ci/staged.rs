//! Pre-commit check over the Python files staged in git.

use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::ci::gating::{CheckStatus, GateCheck, MIN_NEW_API_DOC_CHARS};
use crate::generation::Markdown;
use crate::introspection::parser::{scan_definitions, DefinitionKind};
use crate::persist::now_iso;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedApi {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DefinitionKind,
    pub file: String,
    pub line: usize,
    pub has_docstring: bool,
    pub docstring_length: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedStatus {
    Passed,
    Failed,
    Skipped,
}

impl StagedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StagedValidation {
    pub validation_timestamp: String,
    pub staged_files: Vec<String>,
    pub validation_steps: IndexMap<String, GateCheck>,
    pub overall_status: StagedStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct StagedFileChecker {
    project_root: PathBuf,
}

impl StagedFileChecker {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    /// Added, copied or modified `.py` files in the git index. Any git
    /// failure yields an empty list.
    pub fn staged_python_files(&self) -> Vec<String> {
        let output = Command::new("git")
            .args(["diff", "--cached", "--name-only", "--diff-filter=ACM"])
            .current_dir(&self.project_root)
            .output();
        match output {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
                .lines()
                .map(str::trim)
                .filter(|f| f.ends_with(".py"))
                .map(str::to_string)
                .collect(),
            Ok(out) => {
                warn!(
                    "git diff failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to get staged files: {e}");
                Vec::new()
            }
        }
    }

    /// Public class and function definitions in `files`, relative to the
    /// project root. Unreadable or missing files are skipped.
    pub fn analyze_files(&self, files: &[String]) -> Vec<StagedApi> {
        let mut apis = Vec::new();
        for file in files {
            let path = self.project_root.join(file);
            if !path.exists() {
                continue;
            }
            let sites = std::fs::read_to_string(&path)
                .map_err(Into::into)
                .and_then(|source| scan_definitions(&source));
            let sites = match sites {
                Ok(sites) => sites,
                Err(e) => {
                    warn!("Failed to analyze {file}: {e}");
                    continue;
                }
            };
            apis.extend(
                sites
                    .into_iter()
                    .filter(|s| !s.name.starts_with('_'))
                    .map(|s| {
                        let docstring_length =
                            s.docstring.as_deref().map_or(0, |d| d.trim().chars().count());
                        StagedApi {
                            name: s.name,
                            kind: s.kind,
                            file: file.clone(),
                            line: s.line,
                            has_docstring: s.docstring.is_some(),
                            docstring_length,
                        }
                    }),
            );
        }
        apis
    }

    /// Check `files`, or the git-staged Python files when `None`.
    pub fn run_staged_validation(&self, files: Option<Vec<String>>) -> StagedValidation {
        info!("Running pre-commit documentation validation");
        let staged_files: Vec<String> = files
            .unwrap_or_else(|| self.staged_python_files())
            .into_iter()
            .filter(|f| f.ends_with(".py"))
            .collect();

        let mut validation = StagedValidation {
            validation_timestamp: now_iso(),
            staged_files,
            validation_steps: IndexMap::new(),
            overall_status: StagedStatus::Skipped,
            errors: Vec::new(),
            warnings: Vec::new(),
        };
        if validation.staged_files.is_empty() {
            validation.warnings.push("No Python files staged for commit".to_string());
            return validation;
        }

        let apis = self.analyze_files(&validation.staged_files);
        validation
            .validation_steps
            .insert("new_api_check".to_string(), new_api_check(&apis));
        validation.validation_steps.insert(
            "completeness_check".to_string(),
            completeness_check(&apis, validation.staged_files.len()),
        );

        let failed: Vec<&str> = validation
            .validation_steps
            .iter()
            .filter(|(_, step)| step.status == CheckStatus::Failed)
            .map(|(name, _)| name.as_str())
            .collect();
        if failed.is_empty() {
            validation.overall_status = StagedStatus::Passed;
        } else {
            validation
                .errors
                .push(format!("Failed validation steps: {}", failed.join(", ")));
            validation.overall_status = StagedStatus::Failed;
        }
        for (name, step) in &validation.validation_steps {
            if step.status == CheckStatus::Warning {
                validation.warnings.push(format!("{name}: {}", step.message));
            }
        }

        info!(
            "Pre-commit validation completed: {}",
            validation.overall_status.as_str()
        );
        validation
    }
}

fn new_api_check(apis: &[StagedApi]) -> GateCheck {
    let undocumented: Vec<&StagedApi> = apis.iter().filter(|a| !a.has_docstring).collect();
    if undocumented.is_empty() {
        GateCheck::new(
            CheckStatus::Passed,
            format!("All {} new APIs are documented", apis.len()),
            json!({ "new_apis": apis }),
        )
    } else {
        GateCheck::new(
            CheckStatus::Failed,
            format!("Found {} undocumented APIs in staged files", undocumented.len()),
            json!({ "undocumented_apis": undocumented, "total_new_apis": apis.len() }),
        )
    }
}

fn completeness_check(apis: &[StagedApi], files_checked: usize) -> GateCheck {
    let issues: Vec<_> = apis
        .iter()
        .filter_map(|a| {
            let issue = if !a.has_docstring {
                "missing_docstring"
            } else if a.docstring_length < MIN_NEW_API_DOC_CHARS {
                "short_docstring"
            } else {
                return None;
            };
            Some(json!({ "type": issue, "element": a.name, "file": a.file, "line": a.line }))
        })
        .collect();

    if issues.is_empty() {
        GateCheck::new(
            CheckStatus::Passed,
            "Documentation completeness check passed",
            json!({ "files_checked": files_checked }),
        )
    } else {
        GateCheck::new(
            CheckStatus::Warning,
            format!("Documentation completeness issues found in {} cases", issues.len()),
            json!({ "issues": issues }),
        )
    }
}

pub fn generate_hook_report(validation: &StagedValidation) -> String {
    let emoji = match validation.overall_status {
        StagedStatus::Passed => "✅",
        StagedStatus::Failed => "❌",
        StagedStatus::Skipped => "⏭️",
    };
    let mut md = Markdown::new();
    md.heading(1, "Pre-commit Documentation Validation Report")
        .line(format!(
            "**Status:** {emoji} {}  ",
            validation.overall_status.as_str().to_uppercase()
        ))
        .line(format!("**Timestamp:** {}  ", validation.validation_timestamp))
        .para(format!("**Staged Files:** {}", validation.staged_files.len()));

    if !validation.validation_steps.is_empty() {
        md.heading(2, "Validation Steps");
        for (name, step) in &validation.validation_steps {
            md.heading(3, name.replace('_', " "))
                .line(format!("**Status:** {}  ", step.status.as_str().to_uppercase()))
                .para(format!("**Message:** {}", step.message));
        }
    }
    for (title, items) in [("Errors", &validation.errors), ("Warnings", &validation.warnings)] {
        if items.is_empty() {
            continue;
        }
        md.heading(2, title);
        for item in items {
            md.line(format!("- {item}"));
        }
        md.blank();
    }
    md.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_undocumented_public_definition_fails() {
        let dir = project(&[(
            "pkg/mod.py",
            concat!(
                "def documented():\n    \"\"\"A well documented helper function.\"\"\"\n\n",
                "def bare():\n    pass\n\n",
                "def _private():\n    pass\n",
            ),
        )]);
        let v = StagedFileChecker::new(dir.path())
            .run_staged_validation(Some(vec!["pkg/mod.py".to_string()]));

        assert_eq!(v.overall_status, StagedStatus::Failed);
        let step = &v.validation_steps["new_api_check"];
        assert_eq!(step.status, CheckStatus::Failed);
        assert_eq!(step.details["undocumented_apis"][0]["name"], "bare");
        assert_eq!(step.details["total_new_apis"], 2);
        assert_eq!(v.validation_steps["completeness_check"].status, CheckStatus::Warning);
        assert!(generate_hook_report(&v).contains("**Status:** ❌ FAILED"));
    }

    #[test]
    fn test_short_docstring_is_only_a_warning() {
        let dir = project(&[("a.py", "class Thing:\n    \"\"\"Short.\"\"\"\n")]);
        let v = StagedFileChecker::new(dir.path())
            .run_staged_validation(Some(vec!["a.py".to_string()]));

        assert_eq!(v.overall_status, StagedStatus::Passed);
        let issues = &v.validation_steps["completeness_check"].details["issues"];
        assert_eq!(issues[0]["type"], "short_docstring");
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn test_no_python_files_is_skipped() {
        let dir = project(&[]);
        let v = StagedFileChecker::new(dir.path())
            .run_staged_validation(Some(vec!["README.md".to_string()]));
        assert_eq!(v.overall_status, StagedStatus::Skipped);
        assert!(v.validation_steps.is_empty());
    }

    #[test]
    fn test_staged_files_outside_git_is_empty() {
        let dir = project(&[]);
        assert!(StagedFileChecker::new(dir.path()).staged_python_files().is_empty());
    }
}
