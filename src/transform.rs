// src/transform.rs

//! Source rewriting for script and markup assets
//!
//! Two rewrites are applied before minification:
//!
//! - **Version stamping**: in one designated script, the zero-valued
//!   initializers for revision, local modifications and branch are replaced
//!   with live VCS values.
//! - **Downleveling**: `let`/`const` declarations that start a line
//!   (after indentation) become `var`, including `for (let ...` loop
//!   headers. Declarations anywhere else on a line are left alone.
//!
//! Content is handled as bytes so files in any encoding pass through
//! unchanged apart from the rewritten spans. The original source file is
//! never modified: rewritten content goes to a temporary sibling file.

use crate::assets::AssetEntry;
use crate::error::{Error, Result};
use crate::install::set_file_mode;
use crate::vcs::VcsInfo;
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Default name of the script carrying the version initializers
pub const DEFAULT_STAMP_FILE: &str = "Utilities.js";

/// Default suffix for rewritten temporary copies
pub const DEFAULT_TEMP_SUFFIX: &str = ".tmp";

static FOR_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)for\s*\(\s*(?:let|const)\s+").expect("for-declaration pattern is valid")
});

static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:let|const)\s+").expect("declaration pattern is valid")
});

static REVISION_INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"REVISION : 0,").expect("revision initializer pattern is valid")
});

static MODIFICATIONS_INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"LOCAL_MODIFICATIONS : 0,").expect("modifications initializer pattern is valid")
});

static BRANCH_INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"BRANCH : "master","#).expect("branch initializer pattern is valid")
});

/// Live values substituted into the designated script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStamp {
    pub revision: Option<u64>,
    pub local_modifications: Option<u64>,
    pub branch: Option<String>,
}

impl VersionStamp {
    pub fn from_vcs(info: &VcsInfo) -> Self {
        Self {
            revision: info.revision,
            local_modifications: info.local_modifications,
            branch: info.branch.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.revision.is_none() && self.local_modifications.is_none() && self.branch.is_none()
    }

    /// Replace the default initializers with the values that are present
    pub fn apply<'a>(&self, data: &'a [u8]) -> Cow<'a, [u8]> {
        let mut out = Cow::Borrowed(data);
        if let Some(rev) = self.revision {
            out = replace_all(out, &REVISION_INIT_RE, format!("REVISION : {},", rev).as_bytes());
        }
        if let Some(mods) = self.local_modifications {
            out = replace_all(
                out,
                &MODIFICATIONS_INIT_RE,
                format!("LOCAL_MODIFICATIONS : {},", mods).as_bytes(),
            );
        }
        if let Some(branch) = &self.branch {
            out = replace_all(
                out,
                &BRANCH_INIT_RE,
                format!("BRANCH : \"{}\",", branch).as_bytes(),
            );
        }
        out
    }
}

fn replace_all<'a>(data: Cow<'a, [u8]>, re: &Regex, replacement: &[u8]) -> Cow<'a, [u8]> {
    let replaced = match re.replace_all(&data, NoExpand(replacement)) {
        Cow::Owned(bytes) => Some(bytes),
        Cow::Borrowed(_) => None,
    };
    match replaced {
        Some(bytes) => Cow::Owned(bytes),
        None => data,
    }
}

/// Rewrite one line (without its terminator)
pub fn downlevel_line(line: &[u8]) -> Cow<'_, [u8]> {
    if let Cow::Owned(rewritten) = FOR_DECL_RE.replace(line, &b"${1}for(var "[..]) {
        return Cow::Owned(rewritten);
    }
    DECL_RE.replace(line, &b"${1}var "[..])
}

/// Rewrite line-anchored block-scoped declarations
///
/// Line terminators (`\n` or `\r\n`) are preserved exactly, so content
/// without matching declarations comes back borrowed and byte-identical.
pub fn downlevel(data: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut offset = 0;

    for chunk in data.split_inclusive(|&b| b == b'\n') {
        let body_len = chunk.len()
            - chunk.iter().rev().take_while(|&&b| b == b'\n' || b == b'\r').count();
        let (body, terminator) = chunk.split_at(body_len);

        match downlevel_line(body) {
            Cow::Owned(rewritten) => {
                let buf = out.get_or_insert_with(|| data[..offset].to_vec());
                buf.extend_from_slice(&rewritten);
                buf.extend_from_slice(terminator);
            }
            Cow::Borrowed(_) => {
                if let Some(buf) = out.as_mut() {
                    buf.extend_from_slice(chunk);
                }
            }
        }
        offset += chunk.len();
    }

    match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(data),
    }
}

/// Source file to feed into minification or copying
///
/// When the asset needed rewriting this owns a temporary sibling file that is
/// deleted on drop.
#[derive(Debug)]
pub struct TransformedSource {
    path: PathBuf,
    temporary: bool,
}

impl TransformedSource {
    fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            temporary: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the content differs from the original source file
    pub fn is_rewritten(&self) -> bool {
        self.temporary
    }
}

impl Drop for TransformedSource {
    fn drop(&mut self) {
        if self.temporary {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to remove temporary file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Rewrites assets according to the configured stamp target
#[derive(Debug, Clone)]
pub struct Transformer {
    stamp_file: String,
    stamp: Option<VersionStamp>,
    temp_suffix: String,
}

impl Transformer {
    pub fn new(stamp_file: &str, vcs: &VcsInfo) -> Self {
        let stamp = VersionStamp::from_vcs(vcs);
        Self {
            stamp_file: stamp_file.to_string(),
            stamp: (!stamp.is_empty()).then_some(stamp),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
        }
    }

    pub fn with_temp_suffix(mut self, suffix: &str) -> Self {
        self.temp_suffix = suffix.to_string();
        self
    }

    pub fn temp_suffix(&self) -> &str {
        &self.temp_suffix
    }

    /// Rewrite file content, returning `Cow::Borrowed` when nothing changed
    pub fn rewrite<'a>(&self, base_name: &str, data: &'a [u8]) -> Cow<'a, [u8]> {
        let stamped = match &self.stamp {
            Some(stamp) if base_name == self.stamp_file => {
                info!("adding vcs info to {}", base_name);
                stamp.apply(data)
            }
            _ => Cow::Borrowed(data),
        };

        match stamped {
            Cow::Borrowed(d) => downlevel(d),
            Cow::Owned(d) => Cow::Owned(downlevel(&d).into_owned()),
        }
    }

    /// Prepare an asset for installation
    ///
    /// Non-transformable assets and assets that need no rewrite use the
    /// original path. Otherwise the rewritten content is written to
    /// `<source><suffix>` with mode 0644.
    pub fn transform(&self, asset: &AssetEntry) -> Result<TransformedSource> {
        if !asset.file_type.is_transformable() {
            return Ok(TransformedSource::original(&asset.source));
        }

        let data = fs::read(&asset.source).map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", asset.source.display(), e))
        })?;

        let rewritten = match self.rewrite(&asset.name(), &data) {
            Cow::Borrowed(_) => {
                debug!("{} needs no rewriting", asset.source.display());
                return Ok(TransformedSource::original(&asset.source));
            }
            Cow::Owned(bytes) => bytes,
        };

        let mut temp = asset.source.clone().into_os_string();
        temp.push(&self.temp_suffix);
        let temp = PathBuf::from(temp);

        fs::write(&temp, &rewritten).map_err(|e| {
            Error::IoError(format!("Failed to write {}: {}", temp.display(), e))
        })?;
        // Guard before chmod so a failure below still cleans up
        let source = TransformedSource {
            path: temp,
            temporary: true,
        };
        set_file_mode(source.path())?;

        debug!("Rewrote {} into {}", asset.source.display(), source.path().display());
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UTILITIES: &str = "const Utilities = {\n\
        \tVERSION : \"5.0\",\n\
        \tREVISION : 0,\n\
        \tLOCAL_MODIFICATIONS : 0,\n\
        \tBRANCH : \"master\",\n\
        };\n";

    #[test]
    fn test_downlevel_anchored_let() {
        assert_eq!(&*downlevel(b"  let x = 1;"), b"  var x = 1;");
        assert_eq!(&*downlevel(b"const y = 2;"), b"var y = 2;");
        assert_eq!(&*downlevel(b"\tfor (let i = 0; i < n; i++) {"), b"\tfor(var i = 0; i < n; i++) {");
        assert_eq!(&*downlevel(b"for(const k in obj) {"), b"for(var k in obj) {");
    }

    #[test]
    fn test_downlevel_leaves_unanchored() {
        let line = b"foo(let, x)";
        assert!(matches!(downlevel(line), Cow::Borrowed(_)));
        assert!(matches!(downlevel(b"x = 1; let y = 2;"), Cow::Borrowed(_)));
        assert!(matches!(downlevel(b"letter = 'a';"), Cow::Borrowed(_)));
        assert!(matches!(downlevel(b"constant = 3;"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_downlevel_preserves_line_endings() {
        let input = b"a();\r\n  let b = 1;\r\nc();\n\nlet d;";
        assert_eq!(&*downlevel(input), &b"a();\r\n  var b = 1;\r\nc();\n\nvar d;"[..]);

        let untouched = b"a();\r\nb();\n";
        assert!(matches!(downlevel(untouched), Cow::Borrowed(_)));
    }

    #[test]
    fn test_stamp_applies_present_fields() {
        let stamp = VersionStamp {
            revision: Some(85),
            local_modifications: None,
            branch: Some("v5.0.x".to_string()),
        };
        let out = stamp.apply(UTILITIES.as_bytes());
        let text = String::from_utf8(out.into_owned()).unwrap();
        assert!(text.contains("REVISION : 85,"));
        assert!(text.contains("LOCAL_MODIFICATIONS : 0,"));
        assert!(text.contains("BRANCH : \"v5.0.x\","));
    }

    #[test]
    fn test_stamp_branch_is_inserted_verbatim() {
        let stamp = VersionStamp {
            revision: None,
            local_modifications: None,
            branch: Some("fix/$1-${x}".to_string()),
        };
        let out = stamp.apply(UTILITIES.as_bytes());
        let text = String::from_utf8(out.into_owned()).unwrap();
        assert!(text.contains("BRANCH : \"fix/$1-${x}\","));
        assert!(text.contains("REVISION : 0,"));
    }

    #[test]
    fn test_stamp_without_vcs_is_byte_identical() {
        let transformer = Transformer::new(DEFAULT_STAMP_FILE, &VcsInfo::default());
        let data = b"var Utilities = {\n\tREVISION : 0,\n\tBRANCH : \"master\",\n};\n";
        assert!(matches!(
            transformer.rewrite(DEFAULT_STAMP_FILE, data),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_stamp_only_targets_designated_file() {
        let info = VcsInfo {
            revision: Some(3),
            ..Default::default()
        };
        let transformer = Transformer::new(DEFAULT_STAMP_FILE, &info);
        let data = b"var X = {\n\tREVISION : 0,\n};\n";
        assert!(matches!(transformer.rewrite("Other.js", data), Cow::Borrowed(_)));
        assert_eq!(
            &*transformer.rewrite(DEFAULT_STAMP_FILE, data),
            &b"var X = {\n\tREVISION : 3,\n};\n"[..]
        );
    }

    #[test]
    fn test_transform_writes_and_cleans_temp_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("Utilities.js");
        fs::write(&src, UTILITIES).unwrap();
        let asset = AssetEntry::new("js", &src).unwrap();

        let info = VcsInfo {
            revision: Some(1234),
            local_modifications: Some(2),
            branch: Some("master".to_string()),
        };
        let transformer = Transformer::new(DEFAULT_STAMP_FILE, &info);

        let temp_path = {
            let out = transformer.transform(&asset).unwrap();
            assert!(out.is_rewritten());
            assert_eq!(out.path(), dir.path().join("Utilities.js.tmp"));
            let text = fs::read_to_string(out.path()).unwrap();
            assert!(text.starts_with("var Utilities = {"));
            assert!(text.contains("REVISION : 1234,"));
            assert!(text.contains("LOCAL_MODIFICATIONS : 2,"));
            out.path().to_path_buf()
        };

        assert!(!temp_path.exists());
        assert_eq!(fs::read_to_string(&src).unwrap(), UTILITIES);
    }

    #[test]
    fn test_transform_unchanged_uses_original() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("Plain.js");
        fs::write(&src, "var a = 1;\n").unwrap();
        let asset = AssetEntry::new("", &src).unwrap();

        let out = Transformer::new(DEFAULT_STAMP_FILE, &VcsInfo::default())
            .transform(&asset)
            .unwrap();
        assert!(!out.is_rewritten());
        assert_eq!(out.path(), src);
    }

    #[test]
    fn test_transform_skips_other_types() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("style.css");
        fs::write(&src, "let x = 1;\n").unwrap();
        let asset = AssetEntry::new("", &src).unwrap();

        let out = Transformer::new(DEFAULT_STAMP_FILE, &VcsInfo::default())
            .transform(&asset)
            .unwrap();
        assert!(!out.is_rewritten());
    }
}
