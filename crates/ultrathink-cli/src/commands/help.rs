//! Validate-help command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::validation::{HelpSnapshotter, HelpValidationStatus};

use super::{exit_code, failure, success, PackageContext};

pub fn run(ctx: &PackageContext, reference: Option<&Path>) -> Result<ExitCode> {
    tracing::info!("Validating help() output for {}", ctx.package);
    let api = ctx.extract()?;
    let snapshotter = HelpSnapshotter::from_config(&ctx.config, &ctx.package);
    let validation = snapshotter.validate_current_snapshots(&api, reference)?;

    match validation.validation_status {
        HelpValidationStatus::Skipped => success(format!(
            "help() snapshot captured: {}",
            validation.reason.as_deref().unwrap_or("skipped")
        )),
        HelpValidationStatus::Passed => success("help() output unchanged"),
        HelpValidationStatus::Failed => failure("help() output changed"),
    }
    if let Some(comparison) = &validation.comparison {
        let changes = &comparison.changes;
        println!(
            "  added: {}, removed: {}, modified: {}",
            changes.added_elements.len(),
            changes.removed_elements.len(),
            changes.modified_elements.len()
        );
        for name in changes.removed_elements.iter().chain(&changes.modified_elements) {
            println!("  - {name}");
        }
    }
    for recommendation in &validation.recommendations {
        println!("  {recommendation}");
    }
    Ok(exit_code(validation.validation_status != HelpValidationStatus::Failed))
}
