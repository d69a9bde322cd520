// src/manifest/parser.rs

//! Manifest file parsing

use crate::error::{Error, Result};
use crate::manifest::format::Manifest;
use std::path::Path;
use tracing::debug;

/// Parse a manifest from a TOML string
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid manifest: {}", e)))
}

/// Parse a manifest from a file
pub fn parse_manifest_file(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read manifest {}: {}", path.display(), e)))?;

    parse_manifest(&content)
}

/// Load a manifest, falling back to defaults when the file is absent
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    if !path.exists() {
        debug!("No manifest at {}, using defaults", path.display());
        return Ok(Manifest::default());
    }
    parse_manifest_file(path)
}

/// Validate a manifest, returning warnings for questionable settings
pub fn validate_manifest(manifest: &Manifest) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if manifest.package.name.is_empty() {
        return Err(Error::ConfigError("Package name cannot be empty".to_string()));
    }
    if manifest.package.version.is_empty() {
        return Err(Error::ConfigError("Package version cannot be empty".to_string()));
    }

    // Temporary copies must never overwrite their source
    if manifest.install.temp_suffix.is_empty() {
        return Err(Error::ConfigError("install.temp_suffix cannot be empty".to_string()));
    }
    if manifest.install.temp_suffix.contains(['/', '\\']) {
        return Err(Error::ConfigError(format!(
            "install.temp_suffix must not contain a path separator: {}",
            manifest.install.temp_suffix
        )));
    }

    if manifest.install.tool_timeout_secs == Some(0) {
        return Err(Error::ConfigError(
            "install.tool_timeout_secs must be positive".to_string(),
        ));
    }

    if manifest.deb.package.is_empty() {
        return Err(Error::ConfigError("deb.package cannot be empty".to_string()));
    }
    if manifest.deb.www_path.is_absolute() {
        return Err(Error::ConfigError(format!(
            "deb.www_path must be relative to the staging tree: {}",
            manifest.deb.www_path.display()
        )));
    }

    if manifest.install.stamp_file.is_empty() {
        warnings.push("No stamp_file set, version values will not be stamped".to_string());
    }
    if manifest.sdist.include.is_empty() {
        warnings.push("Source archive will only contain the vcs sidecar".to_string());
    }
    if let Some(symlinks) = &manifest.install.symlinks {
        for (name, patterns) in symlinks {
            if patterns.is_empty() {
                warnings.push(format!("Symlink entry {} has no candidates", name));
            }
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_manifest() {
        let manifest = parse_manifest("").unwrap();
        assert_eq!(manifest.package.name, "xpra-html5");
        assert_eq!(manifest.install.source_dir, PathBuf::from("html5"));
        assert!(validate_manifest(&manifest).unwrap().is_empty());
    }

    #[test]
    fn test_parse_full_manifest() {
        let content = r#"
[package]
name = "webclient"
version = "2.0"

[install]
source_dir = "client"
minifier = "copy"
brotli = false
tool_timeout_secs = 120

[install.symlinks]
"jquery.js" = ["/opt/js/jquery*.js"]

[install.background]
name = "bg.jpg"
candidates = []

[minifier]
yuicompressor_jar = "/opt/yui.jar"

[vcs]
primary_branch = "main"

[deb]
package = "webclient"
"#;
        let manifest = parse_manifest(content).unwrap();
        assert_eq!(manifest.release_name(), "webclient-2.0");
        assert_eq!(manifest.install.minifier, "copy");
        assert!(manifest.install.gzip);
        assert!(!manifest.install.brotli);
        assert_eq!(manifest.install.tool_timeout_secs, Some(120));
        assert_eq!(manifest.install.temp_suffix, ".tmp");
        assert_eq!(manifest.vcs.primary_branch, "main");
        assert_eq!(manifest.vcs.program, PathBuf::from("git"));
        assert_eq!(
            manifest.symlink_candidates().candidates_for("jquery.js"),
            ["/opt/js/jquery*.js".to_string()]
        );
        assert!(manifest.background().candidates.is_empty());
        assert_eq!(manifest.background().name, "bg.jpg");
        assert_eq!(manifest.deb.control_dir, PathBuf::from("packaging/debian"));
    }

    #[test]
    fn test_parse_invalid_manifest() {
        let result = parse_manifest("[install]\ngzip = \"yes\"\n");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_empty_temp_suffix() {
        let manifest = parse_manifest("[install]\ntemp_suffix = \"\"\n").unwrap();
        assert!(matches!(validate_manifest(&manifest), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let manifest = parse_manifest("[install]\ntool_timeout_secs = 0\n").unwrap();
        assert!(validate_manifest(&manifest).is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let manifest = parse_manifest(
            "[install]\nstamp_file = \"\"\n[install.symlinks]\n\"a.js\" = []\n",
        )
        .unwrap();
        let warnings = validate_manifest(&manifest).unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_load_missing_manifest_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let manifest = load_manifest(&dir.path().join("packager.toml")).unwrap();
        assert_eq!(manifest.sdist.output_dir, PathBuf::from("dist"));
    }

    #[test]
    fn test_load_manifest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packager.toml");
        std::fs::write(&path, "[package]\nversion = \"9.9\"\n").unwrap();
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.package.version, "9.9");
        assert_eq!(manifest.package.name, "xpra-html5");
    }
}
