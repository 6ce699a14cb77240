//! Command implementations for the ultrathink CLI
//!
//! Each command module provides a `run` function returning the process exit
//! code: success, or failure when a check or build did not pass.

pub mod build;
pub mod completeness;
pub mod deprecations;
pub mod diff;
pub mod doctests;
pub mod gate;
pub mod help;
pub mod introspect;
pub mod setup;
pub mod snapshot;
pub mod staged;
pub mod stubs;
pub mod validate;
pub mod versions;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use ultrathink_core::introspection::ApiExtractor;
use ultrathink_core::models::ApiData;
use ultrathink_core::UltrathinkConfig;

/// Package selection shared by every package-level command.
#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    /// Package to operate on (defaults to [package].name in the config)
    #[arg(short, long, env = "ULTRATHINK_PACKAGE")]
    pub package: Option<String>,

    /// Directory containing the package (defaults to [package].source_directory)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,
}

/// The loaded config with the package selection applied.
pub struct PackageContext {
    pub package: String,
    pub config: UltrathinkConfig,
}

impl PackageArgs {
    pub fn resolve(&self, config: &UltrathinkConfig) -> Result<PackageContext> {
        let Some(package) = self.package.clone().or_else(|| config.package.name.clone()) else {
            bail!("no package given: pass --package or set [package].name in the config");
        };
        let mut config = config.clone();
        config.package.name = Some(package.clone());
        if let Some(dir) = &self.source_dir {
            config.package.source_directory = dir.clone();
        }
        Ok(PackageContext { package, config })
    }
}

impl PackageContext {
    pub fn extract(&self) -> Result<ApiData> {
        Ok(ApiExtractor::from_config(&self.config)?.extract_complete_api()?)
    }
}

pub fn success(msg: impl AsRef<str>) {
    println!("{} {}", "✅".green(), msg.as_ref());
}

pub fn failure(msg: impl AsRef<str>) {
    println!("{} {}", "❌".red(), msg.as_ref().red());
}

pub fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
