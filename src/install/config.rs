// src/install/config.rs

//! Configuration types for the install pipeline

use crate::compression::CompressionSettings;
use crate::minify::Minifier;
use crate::symlink::SymlinkCandidates;
use crate::transform::{DEFAULT_STAMP_FILE, DEFAULT_TEMP_SUFFIX};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file name of the desktop background link
pub const DEFAULT_BACKGROUND_NAME: &str = "background.png";

/// Desktop background symlink created after the asset walk
///
/// Purely cosmetic: when no candidate matches nothing is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundConfig {
    /// File name under the install root
    pub name: String,
    /// Ordered path patterns (literal or glob)
    pub candidates: Vec<String>,
}

impl BackgroundConfig {
    /// Conventional per-distribution default backgrounds
    pub fn system_defaults() -> Self {
        let candidates = if cfg!(unix) {
            vec![
                "/usr/share/backgrounds/images/default.png".to_string(),
                "/usr/share/backgrounds/images/*default*.png".to_string(),
                "/usr/share/backgrounds/*default*png".to_string(),
                "/usr/share/backgrounds/gnome/adwaita*.jpg".to_string(),
                "/usr/share/backgrounds/images/*jpg".to_string(),
            ]
        } else {
            Vec::new()
        };
        Self {
            name: DEFAULT_BACKGROUND_NAME.to_string(),
            candidates,
        }
    }

    pub fn none() -> Self {
        Self {
            name: DEFAULT_BACKGROUND_NAME.to_string(),
            candidates: Vec::new(),
        }
    }
}

/// Everything the [`Installer`](super::Installer) needs for one run
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Root of the client source tree
    pub source_dir: PathBuf,
    /// Root the assets are installed under
    pub install_dir: PathBuf,
    pub minifier: Minifier,
    pub compression: CompressionSettings,
    pub symlinks: SymlinkCandidates,
    pub background: BackgroundConfig,
    /// Base name of the script that receives VCS values
    pub stamp_file: String,
    /// Suffix of rewritten temporary copies
    pub temp_suffix: String,
    /// Directories searched for compression tools
    pub tool_search_path: Vec<PathBuf>,
    /// Directory relative search path entries are resolved against
    pub work_dir: PathBuf,
    /// Limit for each external tool run; `None` waits indefinitely
    pub tool_timeout: Option<Duration>,
}

impl InstallConfig {
    /// Configuration with built-in defaults and no tool search path
    pub fn new(source_dir: impl Into<PathBuf>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            install_dir: install_dir.into(),
            minifier: Minifier::Copy,
            compression: CompressionSettings::default(),
            symlinks: SymlinkCandidates::system_defaults(),
            background: BackgroundConfig::system_defaults(),
            stamp_file: DEFAULT_STAMP_FILE.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            tool_search_path: Vec::new(),
            work_dir: PathBuf::from("."),
            tool_timeout: None,
        }
    }

    pub fn with_minifier(mut self, minifier: Minifier) -> Self {
        self.minifier = minifier;
        self
    }

    pub fn with_compression(mut self, compression: CompressionSettings) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_symlinks(mut self, symlinks: SymlinkCandidates) -> Self {
        self.symlinks = symlinks;
        self
    }

    pub fn with_background(mut self, background: BackgroundConfig) -> Self {
        self.background = background;
        self
    }

    pub fn with_tool_search_path(mut self, paths: Vec<PathBuf>, work_dir: &Path) -> Self {
        self.tool_search_path = paths;
        self.work_dir = work_dir.to_path_buf();
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// True for files produced by the transformer, never installed
    pub fn is_temp_file(&self, base_name: &str) -> bool {
        !self.temp_suffix.is_empty() && base_name.ends_with(&self.temp_suffix)
    }
}
