//! Deprecations command - record, plan and document deprecations

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use ultrathink_core::diffing::{ApiDiffer, ChangeClassifier, ClassifiedDiff};
use ultrathink_core::generation::DeprecationManager;
use ultrathink_core::UltrathinkConfig;

use super::{exit_code, success};

#[derive(Subcommand, Debug)]
pub enum DeprecationsCommand {
    /// Record that an element is deprecated
    Add {
        /// Dotted or plain element name
        element: String,

        /// Registered version the deprecation starts in
        #[arg(long = "in", value_name = "VERSION")]
        deprecated_in: String,

        /// Registered version the element will be removed in
        #[arg(long)]
        removal_target: Option<String>,

        #[arg(long)]
        reason: Option<String>,

        /// Replacement users should migrate to
        #[arg(long)]
        alternative: Option<String>,
    },

    /// List deprecations, optionally only those active at a version
    List {
        #[arg(long)]
        current_version: Option<String>,
    },

    /// Find elements that should have gone through deprecation
    Candidates {
        #[arg(long)]
        from_version: String,

        #[arg(long)]
        to_version: String,
    },

    /// Write a deprecation plan for the candidates between two versions
    Plan {
        #[arg(long)]
        from_version: String,

        #[arg(long)]
        to_version: String,

        /// Removal version (default: next major)
        #[arg(long)]
        target_version: Option<String>,
    },

    /// Generate the deprecation summary, migration guide and timeline pages
    Docs,

    /// Deprecations whose removal target has been reached
    RemovalCandidates {
        #[arg(long)]
        current_version: String,
    },
}

fn classified(config: &UltrathinkConfig, from: &str, to: &str) -> Result<ClassifiedDiff> {
    let diff = ApiDiffer::from_config(config)?.compare_versions(from, to)?;
    Ok(ChangeClassifier::from_config(config).classify_changes(diff))
}

pub fn run(config: &UltrathinkConfig, cmd: DeprecationsCommand) -> Result<ExitCode> {
    let manager = DeprecationManager::from_config(config)?;

    match cmd {
        DeprecationsCommand::Add {
            element,
            deprecated_in,
            removal_target,
            reason,
            alternative,
        } => {
            manager.tracker().add_deprecation(
                &element,
                &deprecated_in,
                removal_target.as_deref(),
                reason.as_deref(),
                alternative.as_deref(),
            )?;
            success(format!("Deprecated {element} in {deprecated_in}"));
        }
        DeprecationsCommand::List { current_version } => {
            let deprecations = manager.get_active_deprecations(current_version.as_deref())?;
            if deprecations.is_empty() {
                println!("No deprecations recorded");
            }
            for dep in deprecations {
                println!(
                    "{} deprecated in {}, removal in {}",
                    dep.element_name.bold(),
                    dep.deprecated_in_version,
                    dep.removal_target_version.as_deref().unwrap_or("TBD")
                );
                if let Some(alternative) = dep.alternative {
                    println!("  use instead: {alternative}");
                }
            }
        }
        DeprecationsCommand::Candidates {
            from_version,
            to_version,
        } => {
            let diff = classified(config, &from_version, &to_version)?;
            let candidates = manager.analyze_deprecation_candidates(&diff, &to_version)?;
            if candidates.is_empty() {
                success("No deprecation candidates");
            }
            for candidate in &candidates {
                println!(
                    "{} [{}] {}",
                    candidate.element.bold(),
                    candidate.priority,
                    candidate.recommendation
                );
            }
        }
        DeprecationsCommand::Plan {
            from_version,
            to_version,
            target_version,
        } => {
            let diff = classified(config, &from_version, &to_version)?;
            let candidates = manager.analyze_deprecation_candidates(&diff, &to_version)?;
            let plan = manager.create_deprecation_plan(&candidates, target_version.as_deref())?;
            success(format!(
                "Deprecation plan {} targets removal in {} ({} deprecations, {} immediate actions)",
                plan.plan_id,
                plan.target_removal_version,
                plan.deprecations.len(),
                plan.immediate_actions.len()
            ));
            if let Some(file) = &plan.plan_file {
                println!("  Plan file: {file}");
            }
        }
        DeprecationsCommand::Docs => {
            let docs = manager.generate_deprecation_documentation()?;
            success(format!("Generated {} deprecation pages", docs.len()));
            for (kind, path) in &docs {
                println!("  {kind}: {}", path.display());
            }
        }
        DeprecationsCommand::RemovalCandidates { current_version } => {
            let candidates = manager.check_removal_candidates(&current_version)?;
            if candidates.is_empty() {
                println!("Nothing is due for removal in {current_version}");
            }
            for candidate in &candidates {
                println!(
                    "{} (deprecated in {}, target {})",
                    candidate.element.bold(),
                    candidate.deprecated_in,
                    candidate.removal_target
                );
            }
        }
    }
    Ok(exit_code(true))
}
