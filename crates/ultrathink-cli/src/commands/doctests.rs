//! Validate-doctests command

use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::validation::doctest::generate_validation_report;
use ultrathink_core::validation::DoctestValidator;

use super::{exit_code, PackageContext};

pub fn run(ctx: &PackageContext, execute: bool) -> Result<ExitCode> {
    tracing::info!("Validating doctests for {}", ctx.package);
    let api = ctx.extract()?;
    let validator = DoctestValidator::from_config(&ctx.config, &ctx.package)
        .with_execution(execute && ctx.config.validation.run_doctests);
    let result = validator.validate_package_doctests(&api)?;

    println!("{}", generate_validation_report(&result));
    Ok(exit_code(result.failed_tests + result.error_tests == 0))
}
