// src/install/mod.rs

//! Installer: the asset build pipeline
//!
//! Each discovered asset goes through exactly one path:
//!
//! 1. **Resolve**: if a system copy is configured and present, the
//!    destination becomes a symlink to it and the asset is done
//! 2. **Transform**: scripts and markup get version stamping and
//!    downleveling (into a temporary copy, only when something changed)
//! 3. **Minify** or **copy** into the destination
//! 4. **Compress**: `.gz`/`.br` sidecars for everything except images
//!
//! A final, independent step links a desktop background image.
//!
//! Assets are processed one at a time. Failures of external tools degrade
//! (copy instead of minify, missing sidecar); filesystem errors on the asset
//! being written abort the run.

mod config;

pub use config::{BackgroundConfig, InstallConfig, DEFAULT_BACKGROUND_NAME};

use crate::assets::{discover_assets, AssetEntry, FileType};
use crate::compression::{Compressor, Sidecars};
use crate::error::{Error, Result};
use crate::minify::{minify, InstallMethod};
use crate::symlink::{install_symlink, remove_existing};
use crate::tool::ToolRunner;
use crate::transform::Transformer;
use crate::vcs::VcsInfo;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Set the permissions used for installed files (rw-r--r--)
pub(crate) fn set_file_mode(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|e| {
            Error::IoError(format!("Failed to set permissions on {}: {}", path.display(), e))
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Create a destination directory (and parents) with mode 0755
fn create_dest_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e))
    })
}

/// Terminal state of one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// Linked to a system-installed copy
    Symlinked { target: PathBuf },
    Minified,
    Copied,
}

impl AssetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symlinked { .. } => "symlinked",
            Self::Minified => "minified",
            Self::Copied => "copied",
        }
    }
}

impl From<InstallMethod> for AssetOutcome {
    fn from(method: InstallMethod) -> Self {
        match method {
            InstallMethod::Minified => Self::Minified,
            InstallMethod::Copied => Self::Copied,
        }
    }
}

/// Result of installing one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAsset {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub file_type: FileType,
    pub outcome: AssetOutcome,
    /// Whether a rewritten temporary copy was used as input
    pub transformed: bool,
    pub sidecars: Sidecars,
}

/// Summary of a full pipeline run
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub assets: Vec<InstalledAsset>,
    /// Target of the background symlink, when one was created
    pub background: Option<PathBuf>,
}

impl InstallReport {
    pub fn symlinked(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Symlinked { .. }))
    }

    pub fn minified(&self) -> usize {
        self.count(|o| *o == AssetOutcome::Minified)
    }

    pub fn copied(&self) -> usize {
        self.count(|o| *o == AssetOutcome::Copied)
    }

    fn count(&self, pred: impl Fn(&AssetOutcome) -> bool) -> usize {
        self.assets.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Look up the record for a destination path
    pub fn find(&self, destination: &Path) -> Option<&InstalledAsset> {
        self.assets.iter().find(|a| a.destination == destination)
    }
}

/// The Installer: runs the pipeline for one source tree
pub struct Installer {
    config: InstallConfig,
    transformer: Transformer,
    compressor: Compressor,
    runner: ToolRunner,
}

impl Installer {
    /// Create an installer, locating compression tools on the configured path
    pub fn new(config: InstallConfig, vcs: &VcsInfo) -> Self {
        let runner = ToolRunner::with_optional_timeout(config.tool_timeout);
        let compressor = Compressor::detect(
            config.compression,
            &config.tool_search_path,
            &config.work_dir,
            runner,
        );
        Self::with_compressor(config, vcs, compressor)
    }

    /// Create an installer with an explicit compressor
    pub fn with_compressor(config: InstallConfig, vcs: &VcsInfo, compressor: Compressor) -> Self {
        let runner = ToolRunner::with_optional_timeout(config.tool_timeout);
        let transformer =
            Transformer::new(&config.stamp_file, vcs).with_temp_suffix(&config.temp_suffix);
        Self {
            config,
            transformer,
            compressor,
            runner,
        }
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Install every asset of the source tree, then the background link
    pub fn run(&self) -> Result<InstallReport> {
        if self.config.minifier.is_copy() {
            info!("copying client to '{}'", self.config.install_dir.display());
        } else {
            info!(
                "minifying client to '{}' using {}",
                self.config.install_dir.display(),
                self.config.minifier.name()
            );
        }

        let mut report = InstallReport::default();
        for asset in discover_assets(&self.config.source_dir)? {
            if self.config.is_temp_file(&asset.name()) {
                debug!("Skipping temporary file {}", asset.source.display());
                continue;
            }
            report.assets.push(self.install_asset(&asset)?);
        }

        report.background = self.install_background();

        info!(
            "Installed {} assets ({} minified, {} copied, {} symlinked)",
            report.assets.len(),
            report.minified(),
            report.copied(),
            report.symlinked()
        );
        Ok(report)
    }

    /// Run one asset through the pipeline
    pub fn install_asset(&self, asset: &AssetEntry) -> Result<InstalledAsset> {
        let destination = asset.destination(&self.config.install_dir);
        if let Some(parent) = destination.parent() {
            create_dest_dir(parent)?;
        }

        remove_existing(&destination)?;
        Compressor::clear_sidecars(&destination)?;

        let candidates = self.config.symlinks.candidates_for(&asset.name());
        if let Some(target) = install_symlink(candidates, &destination)? {
            return Ok(InstalledAsset {
                source: asset.source.clone(),
                destination,
                file_type: asset.file_type,
                outcome: AssetOutcome::Symlinked { target },
                transformed: false,
                sidecars: Sidecars::default(),
            });
        }

        let outcome;
        let transformed;
        {
            // The temporary copy, if any, is removed when `input` drops
            let input = self.transformer.transform(asset)?;
            transformed = input.is_rewritten();
            let method = minify(
                &self.config.minifier,
                &self.runner,
                input.path(),
                &destination,
                asset.file_type,
            )?;
            outcome = AssetOutcome::from(method);
        }

        let sidecars = self.compressor.compress(&destination, asset.file_type)?;

        Ok(InstalledAsset {
            source: asset.source.clone(),
            destination,
            file_type: asset.file_type,
            outcome,
            transformed,
            sidecars,
        })
    }

    /// Link the desktop background image, if a candidate exists
    ///
    /// Failures are ignored; the background is cosmetic.
    pub fn install_background(&self) -> Option<PathBuf> {
        let background = &self.config.background;
        if background.candidates.is_empty() {
            return None;
        }
        debug!("desktop background paths: {:?}", background.candidates);

        let destination = self.config.install_dir.join(&background.name);
        match install_symlink(&background.candidates, &destination) {
            Ok(target) => target,
            Err(e) => {
                debug!("Background not installed: {}", e);
                None
            }
        }
    }
}
