//! Setup command - default config file and storage layout

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::diffing::ApiDiffer;
use ultrathink_core::generation::StubGenerator;
use ultrathink_core::store::VersionTracker;
use ultrathink_core::UltrathinkConfig;

use super::{exit_code, success, PackageArgs};

pub fn run(config_path: &Path, pkg: &PackageArgs, force: bool) -> Result<ExitCode> {
    let config = if config_path.exists() && !force {
        tracing::info!("Keeping existing config at {}", config_path.display());
        UltrathinkConfig::load(config_path)?
    } else {
        let defaults = UltrathinkConfig::default();
        let ctx = pkg.resolve(&defaults)?;
        ctx.config.write(config_path)?;
        success(format!("Config written: {}", config_path.display()));
        ctx.config
    };

    // Each store creates its own directory on open.
    ApiDiffer::from_config(&config)?;
    VersionTracker::from_config(&config)?;
    std::fs::create_dir_all(StubGenerator::from_config(&config).reference_dir())?;

    success(format!(
        "Basic ultrathink setup completed (storage: {})",
        config.storage_root().display()
    ));
    Ok(exit_code(true))
}
