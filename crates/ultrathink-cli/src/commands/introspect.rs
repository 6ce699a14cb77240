//! Introspect command - dump the extracted API data as JSON

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::introspection::hasher::sort_keys;
use ultrathink_core::persist::write_sorted_json;

use super::{exit_code, success, PackageContext};

pub fn run(ctx: &PackageContext, output: Option<&Path>) -> Result<ExitCode> {
    tracing::info!("Introspecting package: {}", ctx.package);
    let api = ctx.extract()?;

    match output {
        Some(path) => {
            write_sorted_json(path, &api)?;
            success(format!("API data saved to: {}", path.display()));
        }
        None => {
            let sorted = sort_keys(&serde_json::to_value(&api)?);
            println!("{}", serde_json::to_string_pretty(&sorted)?);
        }
    }
    Ok(exit_code(true))
}
