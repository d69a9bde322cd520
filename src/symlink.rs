// src/symlink.rs

//! Replacing bundled assets with system-installed copies
//!
//! Distributions often ship their own, centrally updated copy of common
//! third-party scripts. When one of the configured candidate paths exists,
//! the destination becomes a symlink to it and the bundled copy is not
//! installed at all.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ordered candidate path patterns, keyed by asset base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymlinkCandidates {
    candidates: HashMap<String, Vec<String>>,
}

impl SymlinkCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distribution-managed copies of the bundled jQuery libraries
    pub fn system_defaults() -> Self {
        let mut set = Self::new();
        set.register(
            "jquery.js",
            [
                "/usr/share/javascript/jquery/jquery.js",
                "/usr/share/javascript/jquery/latest/jquery.js",
                "/usr/share/javascript/jquery/3/jquery.js",
            ],
        );
        set.register(
            "jquery-ui.js",
            [
                "/usr/share/javascript/jquery-ui/jquery-ui.js",
                "/usr/share/javascript/jquery-ui/latest/jquery-ui.js",
                "/usr/share/javascript/jquery-ui/3/jquery-ui.js",
            ],
        );
        set
    }

    /// Register (or replace) the candidates for a base name
    pub fn register<I, S>(&mut self, base_name: &str, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates.insert(
            base_name.to_string(),
            patterns.into_iter().map(Into::into).collect(),
        );
    }

    /// Candidates for a base name, empty when none are registered
    pub fn candidates_for(&self, base_name: &str) -> &[String] {
        self.candidates
            .get(base_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for SymlinkCandidates {
    fn from(candidates: HashMap<String, Vec<String>>) -> Self {
        Self { candidates }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Resolve one candidate pattern to an existing path
///
/// Glob patterns resolve to their first match; literal paths must exist.
pub fn resolve_pattern(pattern: &str) -> Option<PathBuf> {
    if is_glob(pattern) {
        match glob::glob(pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).find(|p| p.exists()),
            Err(e) => {
                warn!("Invalid symlink pattern {}: {}", pattern, e);
                None
            }
        }
    } else {
        let path = PathBuf::from(pattern);
        path.exists().then_some(path)
    }
}

/// First candidate, in priority order, that resolves to an existing path
pub fn resolve_candidate(patterns: &[String]) -> Option<PathBuf> {
    patterns.iter().find_map(|p| resolve_pattern(p))
}

/// Remove whatever is at `path`, including a dangling symlink
pub(crate) fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path)
            .map_err(|e| Error::IoError(format!("Failed to remove {}: {}", path.display(), e))),
        Err(_) => Ok(()),
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Link `destination` to the first existing candidate
///
/// Returns the link target, or `Ok(None)` with `destination` untouched when
/// no candidate resolves.
pub fn install_symlink(patterns: &[String], destination: &Path) -> Result<Option<PathBuf>> {
    let Some(target) = resolve_candidate(patterns) else {
        debug!("No symlink candidate found for {}", destination.display());
        return Ok(None);
    };

    remove_existing(destination)?;
    make_symlink(&target, destination).map_err(|e| {
        Error::IoError(format!(
            "Failed to symlink {} -> {}: {}",
            destination.display(),
            target.display(),
            e
        ))
    })?;

    info!("symlinked {} from {}", destination.display(), target.display());
    Ok(Some(target))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pattern(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_candidates_lookup() {
        let set = SymlinkCandidates::system_defaults();
        assert_eq!(set.candidates_for("jquery.js").len(), 3);
        assert!(set.candidates_for("Client.js").is_empty());
    }

    #[test]
    fn test_second_candidate_used_when_first_missing() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a/jquery.js");
        let b = dir.path().join("b/jquery.js");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&b, "b").unwrap();

        let dst = dir.path().join("jquery.js");
        let linked = install_symlink(&[pattern(&a), pattern(&b)], &dst).unwrap();
        assert_eq!(linked, Some(b.clone()));
        assert_eq!(fs::read_link(&dst).unwrap(), b);
    }

    #[test]
    fn test_first_candidate_has_priority() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let dst = dir.path().join("jquery.js");
        install_symlink(&[pattern(&a), pattern(&b)], &dst).unwrap();
        assert_eq!(fs::read_link(&dst).unwrap(), a);
    }

    #[test]
    fn test_no_candidate_leaves_destination_alone() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("jquery.js");
        fs::write(&dst, "bundled").unwrap();

        let linked = install_symlink(&[pattern(&dir.path().join("missing.js"))], &dst).unwrap();
        assert_eq!(linked, None);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "bundled");
    }

    #[test]
    fn test_glob_candidate() {
        let dir = TempDir::new().unwrap();
        let bg = dir.path().join("backgrounds");
        fs::create_dir_all(&bg).unwrap();
        fs::write(bg.join("fedora-default.png"), "png").unwrap();

        let glob_pattern = format!("{}/*default*.png", bg.display());
        assert_eq!(
            resolve_pattern(&glob_pattern),
            Some(bg.join("fedora-default.png"))
        );
        assert_eq!(resolve_pattern(&format!("{}/*.jpg", bg.display())), None);
    }

    #[test]
    fn test_replaces_existing_file_and_dangling_link() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("system.js");
        fs::write(&target, "system").unwrap();

        let dst = dir.path().join("jquery.js");
        std::os::unix::fs::symlink(dir.path().join("gone.js"), &dst).unwrap();

        install_symlink(&[pattern(&target)], &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "system");
    }
}
