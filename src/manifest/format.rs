// src/manifest/format.rs

//! Packager manifest format definitions
//!
//! The manifest is an optional `packager.toml` in the project directory.
//! Every field has a default, so an absent file or an empty table yields
//! the stock xpra-html5 layout.

use crate::compression::CompressionSettings;
use crate::install::{BackgroundConfig, InstallConfig, DEFAULT_BACKGROUND_NAME};
use crate::minify::{Minifier, MinifierSettings};
use crate::symlink::SymlinkCandidates;
use crate::transform::{DEFAULT_STAMP_FILE, DEFAULT_TEMP_SUFFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conventional manifest file name
pub const MANIFEST_FILE: &str = "packager.toml";

/// A complete packager manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Package metadata
    pub package: PackageSection,

    /// Install pipeline settings
    pub install: InstallSection,

    /// Minifier program locations
    pub minifier: MinifierSection,

    /// Version control metadata
    pub vcs: VcsSection,

    /// Source archive
    pub sdist: SdistSection,

    /// Debian package
    pub deb: DebSection,
}

/// `[package]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            name: "xpra-html5".to_string(),
            version: "4.1.1".to_string(),
        }
    }
}

/// `[install]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Client source tree, relative to the project directory
    pub source_dir: PathBuf,

    /// Installation prefix
    pub prefix: PathBuf,

    /// Web root below the prefix
    pub www_dir: PathBuf,

    /// Minifier name (`uglifyjs`, `yuicompressor` or `copy`)
    pub minifier: String,

    pub gzip: bool,
    pub brotli: bool,

    /// Script that receives the VCS values
    pub stamp_file: String,

    /// Limit for each external tool run, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,

    /// Suffix of rewritten temporary copies
    pub temp_suffix: String,

    /// Searched after PATH when locating tools
    pub extra_tool_paths: Vec<PathBuf>,

    /// Base name to system path patterns; replaces the defaults when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symlinks: Option<HashMap<String, Vec<String>>>,

    pub background: BackgroundSection,
}

impl Default for InstallSection {
    fn default() -> Self {
        let extra_tool_paths = if cfg!(unix) {
            vec![PathBuf::from("/usr/local/bin")]
        } else {
            Vec::new()
        };
        Self {
            source_dir: PathBuf::from("html5"),
            prefix: PathBuf::from("/usr"),
            www_dir: PathBuf::from("share/xpra/www"),
            minifier: Minifier::host_default_name().to_string(),
            gzip: true,
            brotli: true,
            stamp_file: DEFAULT_STAMP_FILE.to_string(),
            tool_timeout_secs: None,
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            extra_tool_paths,
            symlinks: None,
            background: BackgroundSection::default(),
        }
    }
}

/// `[install.background]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSection {
    pub name: String,
    /// Replaces the distribution defaults when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
}

impl Default for BackgroundSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_BACKGROUND_NAME.to_string(),
            candidates: None,
        }
    }
}

/// `[minifier]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifierSection {
    pub uglifyjs: PathBuf,
    pub yuicompressor: PathBuf,
    pub java: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yuicompressor_jar: Option<PathBuf>,
}

impl Default for MinifierSection {
    fn default() -> Self {
        let defaults = MinifierSettings::default();
        Self {
            uglifyjs: defaults.uglifyjs,
            yuicompressor: defaults.yuicompressor,
            java: defaults.java,
            yuicompressor_jar: defaults.yuicompressor_jar,
        }
    }
}

/// `[vcs]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsSection {
    /// Sidecar file, relative to the project directory
    pub sidecar: PathBuf,
    /// Branch whose revision is the first-parent commit count
    pub primary_branch: String,
    pub program: PathBuf,
}

impl Default for VcsSection {
    fn default() -> Self {
        Self {
            sidecar: PathBuf::from("vcs-info"),
            primary_branch: "master".to_string(),
            program: PathBuf::from("git"),
        }
    }
}

/// `[sdist]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SdistSection {
    /// Paths packed into the archive; missing entries are skipped
    pub include: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for SdistSection {
    fn default() -> Self {
        Self {
            include: ["html5", "packaging", "README.md", "LICENSE", MANIFEST_FILE]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            output_dir: PathBuf::from("dist"),
        }
    }
}

/// `[deb]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebSection {
    /// Package name; also the staging directory name
    pub package: String,
    /// Copied to `<stage>/DEBIAN`
    pub control_dir: PathBuf,
    /// First line carries the package version
    pub changelog: PathBuf,
    /// Web root inside the staging tree
    pub www_path: PathBuf,
    pub output_dir: PathBuf,
    pub dpkg_deb: PathBuf,
}

impl Default for DebSection {
    fn default() -> Self {
        Self {
            package: "xpra-html5".to_string(),
            control_dir: PathBuf::from("packaging/debian"),
            changelog: PathBuf::from("packaging/debian/changelog"),
            www_path: PathBuf::from("usr/share/xpra/www"),
            output_dir: PathBuf::from("dist"),
            dpkg_deb: PathBuf::from("dpkg-deb"),
        }
    }
}

impl Manifest {
    /// `<name>-<version>`, the source archive stem
    pub fn release_name(&self) -> String {
        format!("{}-{}", self.package.name, self.package.version)
    }

    /// Install root used when none is given on the command line
    pub fn default_install_dir(&self) -> PathBuf {
        self.install.prefix.join(&self.install.www_dir)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.install.tool_timeout_secs.map(Duration::from_secs)
    }

    /// Minifier locations; `java` overrides the manifest's java program
    pub fn minifier_settings(&self, java: Option<PathBuf>) -> MinifierSettings {
        MinifierSettings {
            uglifyjs: self.minifier.uglifyjs.clone(),
            yuicompressor: self.minifier.yuicompressor.clone(),
            java: java.unwrap_or_else(|| self.minifier.java.clone()),
            yuicompressor_jar: self.minifier.yuicompressor_jar.clone(),
        }
    }

    pub fn compression_settings(&self) -> CompressionSettings {
        CompressionSettings {
            gzip: self.install.gzip,
            brotli: self.install.brotli,
        }
    }

    pub fn symlink_candidates(&self) -> SymlinkCandidates {
        match &self.install.symlinks {
            Some(map) => SymlinkCandidates::from(map.clone()),
            None => SymlinkCandidates::system_defaults(),
        }
    }

    pub fn background(&self) -> BackgroundConfig {
        let section = &self.install.background;
        let candidates = match &section.candidates {
            Some(candidates) => candidates.clone(),
            None => BackgroundConfig::system_defaults().candidates,
        };
        BackgroundConfig {
            name: section.name.clone(),
            candidates,
        }
    }

    /// Build the pipeline configuration
    ///
    /// Relative manifest paths resolve against `project_dir`.
    pub fn install_config(
        &self,
        project_dir: &Path,
        install_dir: PathBuf,
        minifier: Minifier,
        tool_search_path: Vec<PathBuf>,
    ) -> InstallConfig {
        let mut config = InstallConfig::new(project_dir.join(&self.install.source_dir), install_dir)
            .with_minifier(minifier)
            .with_compression(self.compression_settings())
            .with_symlinks(self.symlink_candidates())
            .with_background(self.background())
            .with_tool_search_path(tool_search_path, project_dir)
            .with_tool_timeout(self.tool_timeout());
        config.stamp_file = self.install.stamp_file.clone();
        config.temp_suffix = self.install.temp_suffix.clone();
        config
    }

    pub fn vcs_sidecar(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vcs.sidecar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let manifest = Manifest::default();
        assert_eq!(manifest.release_name(), "xpra-html5-4.1.1");
        assert_eq!(
            manifest.default_install_dir(),
            PathBuf::from("/usr/share/xpra/www")
        );
        assert_eq!(manifest.vcs.primary_branch, "master");
        assert!(manifest.tool_timeout().is_none());
        assert_eq!(manifest.deb.www_path, PathBuf::from("usr/share/xpra/www"));
    }

    #[test]
    fn test_java_override() {
        let manifest = Manifest::default();
        assert_eq!(manifest.minifier_settings(None).java, PathBuf::from("java"));
        let settings = manifest.minifier_settings(Some(PathBuf::from("/opt/jdk/bin/java")));
        assert_eq!(settings.java, PathBuf::from("/opt/jdk/bin/java"));
    }

    #[test]
    fn test_symlink_override_replaces_defaults() {
        let mut manifest = Manifest::default();
        assert!(!manifest.symlink_candidates().candidates_for("jquery.js").is_empty());

        let mut map = HashMap::new();
        map.insert("lib.js".to_string(), vec!["/opt/lib.js".to_string()]);
        manifest.install.symlinks = Some(map);
        let candidates = manifest.symlink_candidates();
        assert!(candidates.candidates_for("jquery.js").is_empty());
        assert_eq!(candidates.candidates_for("lib.js"), ["/opt/lib.js".to_string()]);
    }

    #[test]
    fn test_install_config_resolves_source_dir() {
        let mut manifest = Manifest::default();
        manifest.install.tool_timeout_secs = Some(30);
        manifest.install.brotli = false;
        let config = manifest.install_config(
            Path::new("/src/project"),
            PathBuf::from("/tmp/www"),
            Minifier::Copy,
            vec![PathBuf::from("/usr/bin")],
        );
        assert_eq!(config.source_dir, PathBuf::from("/src/project/html5"));
        assert_eq!(config.work_dir, PathBuf::from("/src/project"));
        assert_eq!(config.tool_timeout, Some(Duration::from_secs(30)));
        assert!(!config.compression.brotli);
    }
}
