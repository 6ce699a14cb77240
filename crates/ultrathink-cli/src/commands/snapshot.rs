//! Snapshot command - capture the public API under a version label

use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::diffing::ApiDiffer;
use ultrathink_core::store::VersionTracker;

use super::{exit_code, success, PackageContext};

pub fn run(ctx: &PackageContext, version: &str, register: bool) -> Result<ExitCode> {
    tracing::info!("Creating API snapshot for {} version {version}", ctx.package);
    let api = ctx.extract()?;
    let snapshot_file = ApiDiffer::from_config(&ctx.config)?.create_api_snapshot(&api, version)?;
    success(format!("API snapshot created: {}", snapshot_file.display()));

    if register {
        let tracker = VersionTracker::from_config(&ctx.config)?;
        tracker.register_version(version, snapshot_file.to_str(), None)?;
        success(format!("Version {version} registered as current"));
    }
    Ok(exit_code(true))
}
