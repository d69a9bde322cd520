// src/assets/mod.rs

//! Source asset discovery
//!
//! Walks the client source tree and groups files by their directory
//! relative to the tree root, so they can be placed under the same relative
//! directory in the install root.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Asset category, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// JavaScript sources (`.js`)
    Script,
    /// HTML pages
    Markup,
    /// Already-compressed image formats
    Image,
    /// Everything else (stylesheets, fonts, json, ...)
    Other,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" => Self::Script,
            "html" | "htm" => Self::Markup,
            "png" | "jpg" | "jpeg" | "gif" | "ico" | "webp" => Self::Image,
            _ => Self::Other,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Other)
    }

    /// Whether source rewriting applies
    pub fn is_transformable(&self) -> bool {
        matches!(self, Self::Script | Self::Markup)
    }

    /// Whether `.gz`/`.br` sidecars are produced
    pub fn is_compressible(&self) -> bool {
        !matches!(self, Self::Image)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Markup => "markup",
            Self::Image => "image",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Directory relative to the source root (empty for top-level files)
    pub relative_dir: PathBuf,
    /// Path of the source file
    pub source: PathBuf,
    pub file_type: FileType,
    /// File name without directory, not necessarily UTF-8
    pub base_name: OsString,
}

impl AssetEntry {
    pub fn new(relative_dir: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let base_name = source
            .file_name()
            .ok_or_else(|| {
                Error::InvalidPath(format!("Asset has no file name: {}", source.display()))
            })?
            .to_os_string();
        let file_type = FileType::from_path(&source);

        Ok(Self {
            relative_dir: relative_dir.into(),
            source,
            file_type,
            base_name,
        })
    }

    /// File name for symlink, stamp and temp-suffix matching
    ///
    /// Names that are not UTF-8 are converted lossily and so never match a
    /// configured name.
    pub fn name(&self) -> Cow<'_, str> {
        self.base_name.to_string_lossy()
    }

    /// Path relative to the source root
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.base_name)
    }

    /// Where this asset lands under an install root
    pub fn destination(&self, install_dir: &Path) -> PathBuf {
        install_dir.join(self.relative_path())
    }
}

/// Recursively enumerate a source tree
///
/// Returns relative directory -> files in that directory. Files keep
/// filesystem enumeration order within a directory; directories that only
/// contain subdirectories do not appear. Symlinked directories are not
/// followed.
pub fn discover(source_root: &Path) -> Result<BTreeMap<PathBuf, Vec<PathBuf>>> {
    if !source_root.is_dir() {
        return Err(Error::InvalidPath(format!(
            "Source directory not found: {}",
            source_root.display()
        )));
    }

    let mut tree: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(source_root).min_depth(1) {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_dir() || (entry.path_is_symlink() && path.is_dir()) {
            continue;
        }

        let relative_dir = path
            .parent()
            .and_then(|p| p.strip_prefix(source_root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tree.entry(relative_dir).or_default().push(path.to_path_buf());
    }

    Ok(tree)
}

/// [`discover`] flattened into [`AssetEntry`] values
pub fn discover_assets(source_root: &Path) -> Result<Vec<AssetEntry>> {
    let mut assets = Vec::new();
    for (relative_dir, files) in discover(source_root)? {
        for file in files {
            assets.push(AssetEntry::new(relative_dir.clone(), file)?);
        }
    }
    Ok(assets)
}
