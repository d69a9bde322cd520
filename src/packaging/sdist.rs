// src/packaging/sdist.rs

//! Source archive (`<name>-<version>.tar.gz`)

use crate::error::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info};

/// A gzip-compressed tarball of selected project paths
///
/// Every entry lives below a `<release_name>/` directory.
#[derive(Debug, Clone)]
pub struct SourceArchive {
    project_dir: PathBuf,
    release_name: String,
    include: Vec<PathBuf>,
}

impl SourceArchive {
    pub fn new(project_dir: impl Into<PathBuf>, release_name: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            release_name: release_name.into(),
            include: Vec::new(),
        }
    }

    /// Add a path relative to the project directory
    pub fn include(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.include.contains(&path) {
            self.include.push(path);
        }
        self
    }

    pub fn include_all<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self = self.include(path);
        }
        self
    }

    /// File name of the archive
    pub fn file_name(&self) -> String {
        format!("{}.tar.gz", self.release_name)
    }

    /// Write the archive into `output_dir`, returning its path
    ///
    /// Included paths that do not exist are skipped.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", output_dir.display(), e))
        })?;
        let output_path = output_dir.join(self.file_name());

        let output_file = File::create(&output_path).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", output_path.display(), e))
        })?;
        let encoder = GzEncoder::new(output_file, Compression::default());
        let mut archive = Builder::new(encoder);
        archive.follow_symlinks(false);

        let prefix = Path::new(&self.release_name);
        let mut count = 0;
        for rel in &self.include {
            let source = self.project_dir.join(rel);
            let Ok(metadata) = fs::symlink_metadata(&source) else {
                debug!("Skipping missing {}", source.display());
                continue;
            };

            let name = prefix.join(rel);
            if metadata.is_dir() {
                archive.append_dir_all(&name, &source)?;
            } else {
                archive.append_path_with_name(&source, &name)?;
            }
            count += 1;
        }

        let encoder = archive.into_inner()?;
        encoder.finish()?;

        info!(
            "Wrote {} ({} top-level entries)",
            output_path.display(),
            count
        );
        Ok(output_path)
    }
}
