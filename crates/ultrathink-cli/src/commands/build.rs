//! Build and update-index commands

use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::generation::AutodocBuilder;

use super::{exit_code, failure, success, PackageContext};

pub fn run(ctx: &PackageContext, version: &str, compare_with: Option<&str>) -> Result<ExitCode> {
    tracing::info!("Building documentation for {} version {version}", ctx.package);
    let result = AutodocBuilder::from_config(&ctx.config)?
        .build_complete_documentation(version, compare_with);

    if result.succeeded() {
        success("Documentation build completed successfully!");
        println!("  Generated files: {}", result.generated_files.count());
        println!("  Build duration: {:.2} seconds", result.build_duration_seconds);
        for warning in &result.warnings {
            println!("  Warning: {warning}");
        }
    } else {
        failure("Documentation build failed!");
        for error in &result.errors {
            println!("  Error: {error}");
        }
    }
    if let Some(file) = &result.build_results_file {
        println!("  Build results: {}", file.display());
    }
    Ok(exit_code(result.succeeded()))
}

pub fn run_update_index(ctx: &PackageContext) -> Result<ExitCode> {
    tracing::info!("Updating documentation index for {}", ctx.package);
    let files = AutodocBuilder::from_config(&ctx.config)?.update_index()?;
    success("Documentation index updated");
    for (kind, path) in &files {
        println!("  {kind}: {}", path.display());
    }
    Ok(exit_code(true))
}
