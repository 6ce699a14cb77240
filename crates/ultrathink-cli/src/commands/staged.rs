//! Check-staged-files command - pre-commit docstring check

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::ci::staged::generate_hook_report;
use ultrathink_core::ci::{StagedFileChecker, StagedStatus};

use super::{exit_code, failure, success, PackageContext};

pub fn run(ctx: &PackageContext, files: Vec<String>) -> Result<ExitCode> {
    tracing::info!("Checking staged files of {} for documentation issues", ctx.package);
    let files = (!files.is_empty()).then_some(files);
    run_in(Path::new("."), files)
}

/// Check `files`, or the git-staged Python files, relative to `project_root`.
pub fn run_in(project_root: &Path, files: Option<Vec<String>>) -> Result<ExitCode> {
    let validation = StagedFileChecker::new(project_root).run_staged_validation(files);
    tracing::debug!("{}", generate_hook_report(&validation));

    match validation.overall_status {
        StagedStatus::Failed => {
            failure("Staged files documentation check failed");
            for error in &validation.errors {
                println!("  Error: {error}");
            }
            if let Some(step) = validation.validation_steps.get("new_api_check") {
                if let Some(apis) = step.details["undocumented_apis"].as_array() {
                    for api in apis {
                        println!(
                            "  {}:{} {} has no docstring",
                            api["file"].as_str().unwrap_or_default(),
                            api["line"],
                            api["name"].as_str().unwrap_or_default()
                        );
                    }
                }
            }
        }
        StagedStatus::Passed => success("Staged files documentation check passed"),
        StagedStatus::Skipped => success("No Python files staged; nothing to check"),
    }
    for warning in &validation.warnings {
        println!("  Warning: {warning}");
    }
    Ok(exit_code(validation.overall_status != StagedStatus::Failed))
}
