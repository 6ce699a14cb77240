//! Generate-stubs command

use std::process::ExitCode;

use anyhow::Result;

use ultrathink_core::generation::StubGenerator;

use super::{exit_code, success, PackageContext};

pub fn run(ctx: &PackageContext, elements: &[String], force: bool) -> Result<ExitCode> {
    tracing::info!("Generating documentation stubs for {}", ctx.package);
    let api = ctx.extract()?;
    let generator = StubGenerator::from_config(&ctx.config);

    let generated = if elements.is_empty() {
        generator.regenerate_all_stubs(&api, force)?
    } else {
        generator.generate_stubs_for_new_elements(elements, &api)?
    };

    success(format!("Generated {} documentation stubs", generated.len()));
    for (element, path) in &generated {
        println!("  {element}: {}", path.display());
    }
    Ok(exit_code(true))
}
