//! Validate command - doctests plus documentation completeness

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use ultrathink_core::validation::{CompletenessChecker, DoctestValidator};

use super::{exit_code, failure, success, PackageContext};

pub fn run(ctx: &PackageContext, fail_on_incomplete: bool) -> Result<ExitCode> {
    tracing::info!("Validating documentation for package: {}", ctx.package);
    let api = ctx.extract()?;
    let threshold = ctx.config.validation.completeness_threshold;

    let doctests = DoctestValidator::from_config(&ctx.config, &ctx.package)
        .validate_package_doctests(&api)?;
    let completeness = CompletenessChecker::from_config(&ctx.config, &ctx.package)
        .check_documentation_completeness(&api, threshold)?;

    println!("\n{}", "📊 Validation Results:".bold());
    println!(
        "  Doctest Results: {}/{} passed ({} skipped)",
        doctests.passed_tests, doctests.total_tests, doctests.skipped_tests
    );
    println!("  Completeness: {:.1}%", completeness.completeness_percentage);

    let broken = doctests.failed_tests + doctests.error_tests;
    if broken > 0 {
        failure(format!("{broken} doctests failed"));
        return Ok(exit_code(false));
    }
    if fail_on_incomplete && !completeness.meets_threshold() {
        failure(format!(
            "Documentation completeness below threshold: {:.1}% < {:.1}%",
            completeness.completeness_percentage,
            threshold * 100.0
        ));
        return Ok(exit_code(false));
    }

    success("Validation passed!");
    Ok(exit_code(true))
}
