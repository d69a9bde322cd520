// src/compression/mod.rs
//! Pre-compressed sidecar generation
//!
//! Every installed asset except images gets a `<dest>.gz` sidecar and, when
//! a brotli tool is available, a `<dest>.br` sidecar, so a web server can
//! serve pre-compressed content. Both are produced by external tools:
//!
//! - `gzip -f -n -9 -k <dest>`: maximum level, no name/timestamp for
//!   reproducible output
//! - `brotli -k <dest>` for brotli 1.x and later, or
//!   `brotli --input <dest> --output <dest>.br` for older releases
//!
//! Compressor failures are logged and leave the sidecar absent; they never
//! abort a run.

use crate::assets::FileType;
use crate::error::{Error, Result};
use crate::install::set_file_mode;
use crate::tool::{find_tool, ToolInvocation, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Supported sidecar formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz)
    Gzip,
    /// Brotli compression (.br)
    Brotli,
}

impl CompressionFormat {
    pub const ALL: [CompressionFormat; 2] = [Self::Gzip, Self::Brotli];

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Brotli => ".br",
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Brotli => "brotli",
        }
    }

    /// Sidecar path for a destination file
    ///
    /// # Examples
    /// ```
    /// use html5_packager::compression::CompressionFormat;
    /// use std::path::{Path, PathBuf};
    ///
    /// assert_eq!(
    ///     CompressionFormat::Gzip.sidecar_path(Path::new("www/js/Client.js")),
    ///     PathBuf::from("www/js/Client.js.gz")
    /// );
    /// ```
    pub fn sidecar_path(&self, destination: &Path) -> PathBuf {
        let mut path = destination.as_os_str().to_os_string();
        path.push(self.extension());
        PathBuf::from(path)
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Leading major version number from `brotli --version` output
///
/// Accepts `brotli 1.0.9`, `1.1.0` or `v0.6.0` style strings.
pub fn parse_major_version(version: &str) -> Option<u32> {
    version.split_whitespace().find_map(|token| {
        let token = token.strip_prefix('v').unwrap_or(token);
        let major: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        if major.is_empty() {
            None
        } else {
            major.parse().ok()
        }
    })
}

/// A located brotli executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrotliTool {
    path: PathBuf,
    version: Option<String>,
}

impl BrotliTool {
    pub fn new(path: impl Into<PathBuf>, version: Option<String>) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    /// Find brotli on the search path and ask for its version
    pub fn detect(search_path: &[PathBuf], cwd: &Path, runner: &ToolRunner) -> Option<Self> {
        let path = find_tool("brotli", search_path, cwd)?;
        let version = match runner.run(&ToolInvocation::new(&path).arg("--version")) {
            Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
            Ok(out) => {
                debug!("brotli --version returned {}", out.status_display());
                None
            }
            Err(e) => {
                debug!("{}", e);
                None
            }
        };

        info!("brotli_cmd={}", path.display());
        if let Some(v) = &version {
            info!(" version {}", v);
        }
        Some(Self::new(path, version))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 1.x and later compress in place with `-k`
    pub fn supports_keep_flag(&self) -> bool {
        self.version
            .as_deref()
            .and_then(parse_major_version)
            .is_some_and(|major| major >= 1)
    }

    pub fn invocation(&self, destination: &Path) -> ToolInvocation {
        if self.supports_keep_flag() {
            ToolInvocation::new(&self.path).arg("-k").arg(destination)
        } else {
            ToolInvocation::new(&self.path)
                .arg("--input")
                .arg(destination)
                .arg("--output")
                .arg(CompressionFormat::Brotli.sidecar_path(destination))
        }
    }
}

/// Sidecars produced for one asset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecars {
    pub gzip: Option<PathBuf>,
    pub brotli: Option<PathBuf>,
}

impl Sidecars {
    pub fn is_empty(&self) -> bool {
        self.gzip.is_none() && self.brotli.is_none()
    }
}

/// Which compressors to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub gzip: bool,
    pub brotli: bool,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            gzip: true,
            brotli: true,
        }
    }
}

/// Produces `.gz` and `.br` sidecars with the located tools
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    gzip: Option<PathBuf>,
    brotli: Option<BrotliTool>,
    runner: ToolRunner,
}

impl Compressor {
    /// Compressor with no tools: produces no sidecars
    pub fn new(runner: ToolRunner) -> Self {
        Self {
            gzip: None,
            brotli: None,
            runner,
        }
    }

    pub fn with_gzip(mut self, path: impl Into<PathBuf>) -> Self {
        self.gzip = Some(path.into());
        self
    }

    pub fn with_brotli(mut self, tool: BrotliTool) -> Self {
        self.brotli = Some(tool);
        self
    }

    /// Locate the enabled tools on the search path
    pub fn detect(
        settings: CompressionSettings,
        search_path: &[PathBuf],
        cwd: &Path,
        runner: ToolRunner,
    ) -> Self {
        let mut compressor = Self::new(runner);
        if settings.gzip {
            match find_tool("gzip", search_path, cwd) {
                Some(path) => compressor.gzip = Some(path),
                None => warn!("gzip not found, .gz files will not be created"),
            }
        }
        if settings.brotli {
            compressor.brotli = BrotliTool::detect(search_path, cwd, &runner);
            if compressor.brotli.is_none() {
                info!("brotli not found, .br files will not be created");
            }
        }
        compressor
    }

    pub fn gzip(&self) -> Option<&Path> {
        self.gzip.as_deref()
    }

    pub fn brotli(&self) -> Option<&BrotliTool> {
        self.brotli.as_ref()
    }

    /// Remove both sidecars of a destination, if present
    pub fn clear_sidecars(destination: &Path) -> Result<()> {
        for format in CompressionFormat::ALL {
            let sidecar = format.sidecar_path(destination);
            if fs::symlink_metadata(&sidecar).is_ok() {
                fs::remove_file(&sidecar).map_err(|e| {
                    Error::IoError(format!("Failed to remove {}: {}", sidecar.display(), e))
                })?;
            }
        }
        Ok(())
    }

    /// Generate sidecars for an installed asset
    ///
    /// Images are skipped. Stale sidecars are always removed first, so the
    /// result reflects only this run.
    pub fn compress(&self, destination: &Path, file_type: FileType) -> Result<Sidecars> {
        let mut sidecars = Sidecars::default();
        if !file_type.is_compressible() {
            return Ok(sidecars);
        }
        Self::clear_sidecars(destination)?;

        if let Some(gzip) = &self.gzip {
            let invocation = ToolInvocation::new(gzip)
                .args(["-f", "-n", "-9", "-k"])
                .arg(destination);
            sidecars.gzip = self.run_compressor(CompressionFormat::Gzip, &invocation, destination)?;
        }

        if let Some(brotli) = &self.brotli {
            let invocation = brotli.invocation(destination);
            sidecars.brotli =
                self.run_compressor(CompressionFormat::Brotli, &invocation, destination)?;
        }

        Ok(sidecars)
    }

    fn run_compressor(
        &self,
        format: CompressionFormat,
        invocation: &ToolInvocation,
        destination: &Path,
    ) -> Result<Option<PathBuf>> {
        let sidecar = format.sidecar_path(destination);

        let succeeded = match self.runner.run(invocation) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!("{} error {} on {}", format, output.status_display(), invocation);
                output.log_failure(invocation);
                false
            }
            Err(e) => {
                warn!("{} error on {}: {}", format, invocation, e);
                false
            }
        };

        let exists = fs::symlink_metadata(&sidecar).is_ok();
        if !succeeded {
            if exists {
                // A failed run must not leave a partial sidecar behind
                fs::remove_file(&sidecar)?;
            }
            return Ok(None);
        }
        if !exists {
            warn!("{} did not create '{}'", format, sidecar.display());
            return Ok(None);
        }

        set_file_mode(&sidecar)?;
        debug!("Created {}", sidecar.display());
        Ok(Some(sidecar))
    }
}
