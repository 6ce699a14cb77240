//! ultrathink CLI - API documentation tooling for Python packages
//!
//! Extracts a package's public API, snapshots and diffs it between releases,
//! tracks versions and deprecations, and generates and validates the
//! reference documentation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ultrathink_core::config::{UltrathinkConfig, DEFAULT_CONFIG_PATH};

mod commands;

use commands::deprecations::DeprecationsCommand;
use commands::versions::VersionsCommand;
use commands::PackageArgs;

/// Parse and validate a fraction (must be between 0.0 and 1.0)
fn parse_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("value must be between 0.0 and 1.0, got {}", value));
    }
    Ok(value)
}

/// API documentation tooling for Python packages.
#[derive(Parser)]
#[command(name = "ultrathink")]
#[command(author, version)]
#[command(about = "API documentation tooling for Python packages")]
#[command(after_help = "Examples:
  ultrathink snapshot --package mypkg --version 1.0.0 --register
  ultrathink diff --package mypkg --from-version 1.0.0 --to-version 1.1.0
  ultrathink build --package mypkg --version 1.1.0 --compare-with 1.0.0
  ultrathink check-completeness --package mypkg --threshold 0.9")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    // ==================== Validation ====================
    /// Run doctests and the completeness check together
    Validate {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Fail when completeness is below the configured threshold
        #[arg(long)]
        fail_on_incomplete: bool,
    },

    /// Check documentation completeness of the public API
    CheckCompleteness {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Required completeness (0.0-1.0), defaults to the configured threshold
        #[arg(long, value_parser = parse_fraction)]
        threshold: Option<f64>,

        /// Only check the Python files staged in git
        #[arg(long)]
        staged_only: bool,
    },

    /// Execute doctests from docstrings and generated documentation
    ValidateDoctests {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Collect tests without executing them
        #[arg(long)]
        no_execute: bool,
    },

    /// Capture help() pages and compare them with the previous capture
    ValidateHelp {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Compare against this capture instead of the latest one
        #[arg(long)]
        reference: Option<PathBuf>,
    },

    // ==================== Snapshots & diffs ====================
    /// Capture the current public API as a versioned snapshot
    Snapshot {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Version label for the snapshot
        #[arg(long = "version", value_name = "VERSION")]
        release: String,

        /// Also register the version in the version tracker
        #[arg(long)]
        register: bool,
    },

    /// Diff two snapshotted versions and classify the changes
    Diff {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Older version
        #[arg(long)]
        from_version: String,

        /// Newer version
        #[arg(long)]
        to_version: String,

        /// Store the classified changes in the version tracker
        #[arg(long)]
        record: bool,

        /// Print the full classified diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print or save the extracted API data
    Introspect {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Output file for the API data (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    // ==================== Generation ====================
    /// Run every documentation build stage for a version
    Build {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Version being documented
        #[arg(long = "version", value_name = "VERSION")]
        release: String,

        /// Previous version to diff against
        #[arg(long)]
        compare_with: Option<String>,
    },

    /// Write reference pages for API elements
    GenerateStubs {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Only these elements (default: every public element)
        #[arg(long, num_args = 1..)]
        elements: Vec<String>,

        /// Overwrite existing pages
        #[arg(short, long)]
        force: bool,
    },

    /// Rebuild the documentation index pages
    UpdateIndex {
        #[command(flatten)]
        pkg: PackageArgs,
    },

    // ==================== CI ====================
    /// Fail when APIs added since a snapshotted version lack documentation
    CheckNewApis {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Snapshotted version to compare the working tree against
        #[arg(long)]
        base_version: String,
    },

    /// Check public definitions in staged Python files for docstrings
    CheckStagedFiles {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Check these files instead of asking git
        #[arg(num_args = 0..)]
        files: Vec<String>,
    },

    /// Evaluate the documentation gate and write a markdown report
    GeneratePrReport {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Base version of the comparison
        #[arg(long, requires = "head_version")]
        base_version: Option<String>,

        /// Head version of the comparison
        #[arg(long, requires = "base_version")]
        head_version: Option<String>,

        /// Pull request number recorded in the report
        #[arg(long)]
        pr_number: Option<u64>,

        /// Branch name recorded in the report
        #[arg(long)]
        branch: Option<String>,

        /// Maintainer overriding a failed gate
        #[arg(long, requires = "override_reason")]
        override_by: Option<String>,

        /// Justification for the override
        #[arg(long)]
        override_reason: Option<String>,

        /// Report file
        #[arg(short, long, default_value = "docs_report.md")]
        output: PathBuf,
    },

    /// Write a default config file and create the storage layout
    Setup {
        #[command(flatten)]
        pkg: PackageArgs,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    // ==================== Tracking ====================
    /// Manage registered versions
    #[command(subcommand)]
    Versions(VersionsCommand),

    /// Manage deprecations
    #[command(subcommand)]
    Deprecations(DeprecationsCommand),
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    // Loaded per command: setup runs before any config file exists.
    let config_path = cli.config;
    let config = || UltrathinkConfig::load(&config_path);

    match cli.command {
        Commands::Validate {
            pkg,
            fail_on_incomplete,
        } => commands::validate::run(&pkg.resolve(&config()?)?, fail_on_incomplete),
        Commands::CheckCompleteness {
            pkg,
            threshold,
            staged_only,
        } => commands::completeness::run(&pkg.resolve(&config()?)?, threshold, staged_only),
        Commands::ValidateDoctests { pkg, no_execute } => {
            commands::doctests::run(&pkg.resolve(&config()?)?, !no_execute)
        }
        Commands::ValidateHelp { pkg, reference } => {
            commands::help::run(&pkg.resolve(&config()?)?, reference.as_deref())
        }
        Commands::Snapshot {
            pkg,
            release,
            register,
        } => commands::snapshot::run(&pkg.resolve(&config()?)?, &release, register),
        Commands::Diff {
            pkg,
            from_version,
            to_version,
            record,
            json,
        } => commands::diff::run(
            &pkg.resolve(&config()?)?,
            &from_version,
            &to_version,
            record,
            json,
        ),
        Commands::Introspect { pkg, output } => {
            commands::introspect::run(&pkg.resolve(&config()?)?, output.as_deref())
        }
        Commands::Build {
            pkg,
            release,
            compare_with,
        } => commands::build::run(&pkg.resolve(&config()?)?, &release, compare_with.as_deref()),
        Commands::GenerateStubs {
            pkg,
            elements,
            force,
        } => commands::stubs::run(&pkg.resolve(&config()?)?, &elements, force),
        Commands::UpdateIndex { pkg } => {
            commands::build::run_update_index(&pkg.resolve(&config()?)?)
        }
        Commands::CheckNewApis { pkg, base_version } => {
            commands::gate::run_new_apis(&pkg.resolve(&config()?)?, &base_version)
        }
        Commands::CheckStagedFiles { pkg, files } => {
            commands::staged::run(&pkg.resolve(&config()?)?, files)
        }
        Commands::GeneratePrReport {
            pkg,
            base_version,
            head_version,
            pr_number,
            branch,
            override_by,
            override_reason,
            output,
        } => {
            let context = ultrathink_core::ci::GateContext {
                base_version,
                head_version,
                pr_number,
                branch,
            };
            let override_request = override_by.zip(override_reason);
            let ctx = pkg.resolve(&config()?)?;
            commands::gate::run_pr_report(&ctx, &context, override_request, &output)
        }
        Commands::Setup { pkg, force } => commands::setup::run(&config_path, &pkg, force),
        Commands::Versions(cmd) => commands::versions::run(&config()?, cmd),
        Commands::Deprecations(cmd) => commands::deprecations::run(&config()?, cmd),
    }
}
