// src/commands/sdist.rs

//! Sdist command - record VCS info and write the source archive

use super::context::ProjectContext;
use anyhow::{Context, Result};
use html5_packager::packaging::SourceArchive;
use tracing::warn;

pub fn cmd_sdist(ctx: &ProjectContext) -> Result<()> {
    let manifest = &ctx.manifest;

    let info = ctx.record_vcs_info()?;
    for (key, value) in info.entries() {
        println!("{}={}", key, value);
    }

    let mut archive = SourceArchive::new(&ctx.project_dir, manifest.release_name())
        .include_all(manifest.sdist.include.iter().cloned());

    let sidecar = manifest.vcs_sidecar(&ctx.project_dir);
    match sidecar.strip_prefix(&ctx.project_dir) {
        Ok(rel) => archive = archive.include(rel),
        Err(_) => warn!(
            "{} is outside the project directory, not archived",
            sidecar.display()
        ),
    }

    let output_dir = ctx.project_dir.join(&manifest.sdist.output_dir);
    let path = archive
        .write(&output_dir)
        .with_context(|| format!("Failed to write source archive to {}", output_dir.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}
