//! Versions command - the version tracker

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use ultrathink_core::diffing::BumpKind;
use ultrathink_core::store::VersionTracker;
use ultrathink_core::UltrathinkConfig;

use super::{exit_code, success};

#[derive(Subcommand, Debug)]
pub enum VersionsCommand {
    /// Register a version and mark it current
    Register {
        /// Version string (semver recommended)
        version: String,

        /// Snapshot file backing this version
        #[arg(long)]
        snapshot_file: Option<String>,

        /// Free-form release notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List registered versions, newest first
    List {
        /// Maximum number of versions to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Show the current version
    Current,

    /// Compute the next version after the current one
    Next {
        /// major, minor, patch or prerelease
        #[arg(long, default_value = "patch")]
        bump: BumpKind,
    },

    /// Show tracker statistics
    Stats,
}

pub fn run(config: &UltrathinkConfig, cmd: VersionsCommand) -> Result<ExitCode> {
    let tracker = VersionTracker::from_config(config)?;

    match cmd {
        VersionsCommand::Register {
            version,
            snapshot_file,
            notes,
        } => {
            let id =
                tracker.register_version(&version, snapshot_file.as_deref(), notes.as_deref())?;
            success(format!("Registered version {version} (id {id})"));
        }
        VersionsCommand::List { limit } => {
            let history = tracker.get_version_history(limit)?;
            if history.is_empty() {
                println!("No versions registered");
            }
            for record in history {
                let marker = if record.is_current { "*".green().bold() } else { " ".normal() };
                println!(
                    "{marker} {:<16} {}  {}",
                    record.version_string,
                    record.created_timestamp.dimmed(),
                    record.notes.unwrap_or_default()
                );
            }
        }
        VersionsCommand::Current => match tracker.get_current_version()? {
            Some(record) => println!("{}", record.version_string),
            None => {
                println!("No current version");
                return Ok(exit_code(false));
            }
        },
        VersionsCommand::Next { bump } => println!("{}", tracker.get_next_version(bump)?),
        VersionsCommand::Stats => {
            let stats = tracker.get_statistics()?;
            println!("{}", "Version tracking statistics".bold());
            println!("  {}: {}", "Versions".cyan(), stats.total_versions);
            println!("  {}: {}", "Changes".cyan(), stats.total_changes);
            println!("  {}: {}", "Deprecations".cyan(), stats.total_deprecations);
            println!("  {}: {}", "Recent (30 days)".cyan(), stats.recent_versions);
            println!(
                "  {}: {}",
                "Current".cyan(),
                stats.current_version.as_deref().unwrap_or("-")
            );
            println!(
                "  {}: {}",
                "Latest".cyan(),
                stats.latest_version.as_deref().unwrap_or("-")
            );
            for (severity, count) in &stats.changes_by_severity {
                println!("    {severity}: {count}");
            }
        }
    }
    Ok(exit_code(true))
}
