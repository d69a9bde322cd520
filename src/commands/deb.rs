// src/commands/deb.rs

//! Deb command - stage, install and build a Debian package

use super::context::ProjectContext;
use super::install::{print_summary, run_pipeline};
use anyhow::{Context, Result};
use html5_packager::minify::Minifier;
use html5_packager::packaging::DebBuilder;

pub fn cmd_deb(ctx: &ProjectContext) -> Result<()> {
    let builder = DebBuilder::from_manifest(&ctx.manifest, &ctx.project_dir, ctx.runner());

    let www_dir = builder.prepare().context("Failed to stage package")?;

    let minifier = Minifier::from_name(
        "uglifyjs",
        &ctx.manifest.minifier_settings(ctx.java_override()),
    )?;
    let vcs = ctx.load_vcs_info();
    let report = run_pipeline(ctx, www_dir, minifier, &vcs)?;
    print_summary(&report);

    let package = builder.build().context("Failed to build Debian package")?;
    println!("Built {}", package.display());
    Ok(())
}
