//! Diff command - compare two snapshotted versions

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use ultrathink_core::diffing::{suggest_version_bump, ApiDiffer, ChangeClassifier};
use ultrathink_core::store::VersionTracker;

use super::{exit_code, success, PackageContext};

pub fn run(
    ctx: &PackageContext,
    from: &str,
    to: &str,
    record: bool,
    json: bool,
) -> Result<ExitCode> {
    tracing::info!("Generating API diff for {}: {from} -> {to}", ctx.package);
    let diff = ApiDiffer::from_config(&ctx.config)?.compare_versions(from, to)?;
    let classified = ChangeClassifier::from_config(&ctx.config).classify_changes(diff);

    if json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
    } else {
        let summary = &classified.classified_changes.summary;
        let suggestion = suggest_version_bump(&classified.classified_changes, from);
        println!("\n{}", "📊 API Diff Summary:".bold());
        println!("  Total changes: {}", summary.total_changes);
        println!("  Breaking changes: {}", summary.breaking_changes_count);
        println!("  Compatibility: {}", classified.compatibility_impact);
        for (kind, count) in &summary.by_type {
            println!("    {kind}: {count}");
        }
        match (&suggestion.suggested_bump, &suggestion.suggested_version) {
            (Some(bump), Some(next)) => {
                println!("  Suggested bump: {} -> {} ({})", bump, next.cyan(), suggestion.reason)
            }
            (Some(bump), None) => println!("  Suggested bump: {bump} ({})", suggestion.reason),
            (None, _) => println!("  Suggested bump: none ({})", suggestion.reason),
        }
    }

    if record {
        let tracker = VersionTracker::from_config(&ctx.config)?;
        let count = tracker.record_changes(from, to, classified.classified_changes.iter())?;
        success(format!("Recorded {count} changes from {from} to {to}"));
    }
    Ok(exit_code(true))
}
