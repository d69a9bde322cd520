// src/packaging/deb.rs

//! Debian package assembly through `dpkg-deb`
//!
//! The staging tree is `<project>/<package>/`: the control files are copied
//! to `DEBIAN/` and the install pipeline populates the web root. After
//! `dpkg-deb --build` the staging tree is removed and the artifact is moved
//! to `<output_dir>/<package>-<version>.deb`, the version coming from the
//! first changelog line.

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::tool::{ToolInvocation, ToolRunner};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// `name (VERSION) dist; urgency=..`
static CHANGELOG_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\(([0-9\-\.]*)\).*").expect("changelog version pattern is valid")
});

/// Extract the version from a changelog header line
///
/// Returns an empty string when the line does not match.
pub fn parse_changelog_version(line: &str) -> String {
    CHANGELOG_VERSION
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Read the version from the first line of a changelog file
pub fn read_changelog_version(changelog: &Path) -> Result<String> {
    let content = fs::read_to_string(changelog).map_err(|e| {
        Error::IoError(format!("Failed to read {}: {}", changelog.display(), e))
    })?;
    let first = content.lines().next().unwrap_or("");
    Ok(parse_changelog_version(first))
}

/// Recursively copy a directory tree, following symlinks
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(|e| {
            Error::InvalidPath(format!("{}: {}", entry.path().display(), e))
        })?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::IoError(format!("Failed to copy {}: {}", entry.path().display(), e))
            })?;
        }
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    debug!("Removing stale {}", path.display());
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Builds a `.deb` from a staging tree
#[derive(Debug, Clone)]
pub struct DebBuilder {
    project_dir: PathBuf,
    package: String,
    control_dir: PathBuf,
    changelog: PathBuf,
    www_path: PathBuf,
    output_dir: PathBuf,
    dpkg_deb: PathBuf,
    runner: ToolRunner,
}

impl DebBuilder {
    /// Builder for the `[deb]` section; relative paths resolve against `project_dir`
    pub fn from_manifest(manifest: &Manifest, project_dir: &Path, runner: ToolRunner) -> Self {
        let deb = &manifest.deb;
        Self {
            project_dir: project_dir.to_path_buf(),
            package: deb.package.clone(),
            control_dir: project_dir.join(&deb.control_dir),
            changelog: project_dir.join(&deb.changelog),
            www_path: deb.www_path.clone(),
            output_dir: project_dir.join(&deb.output_dir),
            dpkg_deb: deb.dpkg_deb.clone(),
            runner,
        }
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.project_dir.join(&self.package)
    }

    /// Where `dpkg-deb` writes the package
    pub fn artifact(&self) -> PathBuf {
        self.project_dir.join(format!("{}.deb", self.package))
    }

    /// Web root inside the staging tree
    pub fn www_dir(&self) -> PathBuf {
        self.stage_dir().join(&self.www_path)
    }

    /// Reset the staging tree and copy the control files
    ///
    /// Returns the web root the install pipeline should target.
    pub fn prepare(&self) -> Result<PathBuf> {
        remove_path(&self.artifact())?;
        let stage = self.stage_dir();
        remove_path(&stage)?;

        if !self.control_dir.is_dir() {
            return Err(Error::PackagingFailed(format!(
                "Control directory not found: {}",
                self.control_dir.display()
            )));
        }
        fs::create_dir_all(&stage)?;
        copy_tree(&self.control_dir, &stage.join("DEBIAN"))?;
        info!("Staged {} in {}", self.package, stage.display());
        Ok(self.www_dir())
    }

    /// Run `dpkg-deb --build` and move the result into the output directory
    pub fn build(&self) -> Result<PathBuf> {
        let stage = self.stage_dir();
        let invocation = ToolInvocation::new(&self.dpkg_deb)
            .arg("--build")
            .arg(&self.package)
            .current_dir(&self.project_dir);

        let output = self
            .runner
            .run(&invocation)
            .map_err(|e| Error::PackagingFailed(e.to_string()))?;
        if !output.success() {
            output.log_failure(&invocation);
            return Err(Error::PackagingFailed(format!(
                "{} returned {}",
                invocation,
                output.status_display()
            )));
        }

        let artifact = self.artifact();
        if !artifact.exists() {
            return Err(Error::PackagingFailed(format!(
                "{} did not create {}",
                invocation,
                artifact.display()
            )));
        }

        fs::remove_dir_all(&stage)?;

        let version = read_changelog_version(&self.changelog)?;
        if version.is_empty() {
            debug!("No version found in {}", self.changelog.display());
        }

        fs::create_dir_all(&self.output_dir)?;
        let target = self
            .output_dir
            .join(format!("{}-{}.deb", self.package, version));
        fs::rename(&artifact, &target).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {}",
                artifact.display(),
                target.display(),
                e
            ))
        })?;

        info!("Built {}", target.display());
        Ok(target)
    }
}
