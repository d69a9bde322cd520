// src/commands/install.rs

//! Install command - run the asset pipeline

use super::context::ProjectContext;
use anyhow::{Context, Result};
use html5_packager::install::{InstallReport, Installer};
use html5_packager::minify::Minifier;
use html5_packager::vcs::VcsInfo;
use std::path::PathBuf;

/// Install the client into `install_dir` using `minifier`
///
/// Both arguments fall back to the manifest defaults.
pub fn cmd_install(
    ctx: &ProjectContext,
    install_dir: Option<&str>,
    minifier: Option<&str>,
) -> Result<()> {
    let install_dir = ctx.resolve_install_dir(install_dir)?;
    let minifier_name = minifier.unwrap_or(ctx.manifest.install.minifier.as_str());
    let minifier = Minifier::from_name(
        minifier_name,
        &ctx.manifest.minifier_settings(ctx.java_override()),
    )?;

    let vcs = ctx.load_vcs_info();
    if vcs.is_empty() {
        println!("Warning: vcs info is missing");
    }

    let report = run_pipeline(ctx, install_dir.clone(), minifier, &vcs)?;
    println!("Installed client to {}", install_dir.display());
    print_summary(&report);
    Ok(())
}

/// Build the installer for `install_dir` and run it
pub(super) fn run_pipeline(
    ctx: &ProjectContext,
    install_dir: PathBuf,
    minifier: Minifier,
    vcs: &VcsInfo,
) -> Result<InstallReport> {
    let config = ctx.manifest.install_config(
        &ctx.project_dir,
        install_dir,
        minifier,
        ctx.tool_search_path(),
    );
    let source_dir = config.source_dir.clone();
    Installer::new(config, vcs)
        .run()
        .with_context(|| format!("Failed to install assets from {}", source_dir.display()))
}

pub(super) fn print_summary(report: &InstallReport) {
    println!(
        "  {} assets: {} minified, {} copied, {} symlinked",
        report.assets.len(),
        report.minified(),
        report.copied(),
        report.symlinked()
    );
    if let Some(background) = &report.background {
        println!("  background: {}", background.display());
    }
}
