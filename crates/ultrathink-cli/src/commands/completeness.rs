//! Check-completeness command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::validation::completeness::generate_completeness_report;
use ultrathink_core::validation::CompletenessChecker;

use super::{exit_code, staged, PackageContext};

pub fn run(ctx: &PackageContext, threshold: Option<f64>, staged_only: bool) -> Result<ExitCode> {
    if staged_only {
        return staged::run_in(Path::new("."), None);
    }

    let threshold = threshold.unwrap_or(ctx.config.validation.completeness_threshold);
    tracing::info!("Checking documentation completeness for {}", ctx.package);
    let api = ctx.extract()?;
    let result = CompletenessChecker::from_config(&ctx.config, &ctx.package)
        .check_documentation_completeness(&api, threshold)?;

    println!("{}", generate_completeness_report(&result));
    Ok(exit_code(result.meets_threshold()))
}
