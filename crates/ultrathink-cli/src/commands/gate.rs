//! Documentation gate commands: new-API check and the PR report

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use ultrathink_core::ci::gating::{generate_gate_report, CheckStatus, OverrideStatus};
use ultrathink_core::ci::{DocumentationGate, GateContext, GateStatus};

use super::{exit_code, failure, success, PackageContext};

pub fn run_new_apis(ctx: &PackageContext, base_version: &str) -> Result<ExitCode> {
    tracing::info!("Checking for new undocumented APIs in {} since {base_version}", ctx.package);
    let check =
        DocumentationGate::new(&ctx.package, &ctx.config).check_new_apis_since(base_version)?;

    if check.status == CheckStatus::Failed {
        failure(&check.message);
        if let Some(items) = check.details["undocumented_elements"].as_array() {
            for item in items {
                println!(
                    "  {} ({}, {} chars)",
                    item["element"].as_str().unwrap_or_default(),
                    item["type"].as_str().unwrap_or_default(),
                    item["docstring_length"]
                );
            }
        }
        return Ok(exit_code(false));
    }
    success(&check.message);
    Ok(exit_code(true))
}

pub fn run_pr_report(
    ctx: &PackageContext,
    context: &GateContext,
    override_request: Option<(String, String)>,
    output: &Path,
) -> Result<ExitCode> {
    tracing::info!("Generating PR documentation report for {}", ctx.package);
    let gate = DocumentationGate::new(&ctx.package, &ctx.config);
    let mut result = gate.evaluate_documentation_gate(context);

    if let Some((user, reason)) = override_request {
        if result.gate_status == GateStatus::Failed {
            let record = gate.apply_maintainer_override(&mut result, &user, &reason)?;
            match record.override_status {
                OverrideStatus::Applied => success(format!("Override applied by {user}")),
                OverrideStatus::Denied => failure(format!("Override denied: {}", record.message)),
            }
        } else {
            tracing::warn!("Gate is {}; override not needed", result.gate_status.as_str());
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, generate_gate_report(&result))?;

    let status = result.gate_status.as_str().to_uppercase();
    let status = if result.gate_status.is_open() { status.green() } else { status.red() };
    println!("Documentation gate: {status}");
    for issue in &result.blocking_issues {
        println!("  Blocking: {issue}");
    }
    success(format!("PR documentation report generated: {}", output.display()));
    Ok(exit_code(result.gate_status.is_open()))
}
