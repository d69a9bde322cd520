// src/vcs/mod.rs

//! VCS metadata: branch, revision and local modification count
//!
//! The metadata is produced in two phases that may run on different
//! machines:
//!
//! - **record** (source archive creation): git is queried and the result is
//!   written to a flat `KEY=VALUE` sidecar file
//! - **install**: the sidecar is loaded verbatim if it exists, otherwise the
//!   values are recomputed
//!
//! Once written, the sidecar is the source of truth until it is deleted or
//! re-recorded.

pub mod git;

pub use git::{
    BranchStrategy, GitCli, VcsProbe, VcsQuery, DEFAULT_BRANCH_STRATEGIES,
    count_local_modifications, parse_describe_distance,
};

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Schema version written as the first (comment) line of the sidecar
pub const SIDECAR_FORMAT_VERSION: u32 = 1;

const SIDECAR_HEADER_PREFIX: &str = "# vcs-info format ";

/// Keys that may appear in the sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VcsKey {
    Branch,
    Revision,
    LocalModifications,
}

impl VcsKey {
    pub const ALL: [VcsKey; 3] = [Self::Branch, Self::Revision, Self::LocalModifications];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BRANCH" => Some(Self::Branch),
            "REVISION" => Some(Self::Revision),
            "LOCAL_MODIFICATIONS" => Some(Self::LocalModifications),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Branch => "BRANCH",
            Self::Revision => "REVISION",
            Self::LocalModifications => "LOCAL_MODIFICATIONS",
        }
    }
}

impl fmt::Display for VcsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Possibly partial VCS metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsInfo {
    pub branch: Option<String>,
    pub revision: Option<u64>,
    pub local_modifications: Option<u64>,
}

impl VcsInfo {
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.revision.is_none() && self.local_modifications.is_none()
    }

    /// Value of a key rendered as it appears in the sidecar
    pub fn get(&self, key: VcsKey) -> Option<String> {
        match key {
            VcsKey::Branch => self.branch.clone(),
            VcsKey::Revision => self.revision.map(|v| v.to_string()),
            VcsKey::LocalModifications => self.local_modifications.map(|v| v.to_string()),
        }
    }

    /// Set a key from its sidecar representation
    pub fn set(&mut self, key: VcsKey, value: &str) -> Result<()> {
        let parse_count = |v: &str| {
            v.parse::<u64>().map_err(|e| {
                Error::ParseError(format!("Invalid {} value '{}': {}", key, v, e))
            })
        };
        match key {
            VcsKey::Branch => self.branch = Some(value.to_string()),
            VcsKey::Revision => self.revision = Some(parse_count(value)?),
            VcsKey::LocalModifications => self.local_modifications = Some(parse_count(value)?),
        }
        Ok(())
    }

    /// Present keys with their values, in key order
    pub fn entries(&self) -> Vec<(VcsKey, String)> {
        VcsKey::ALL
            .iter()
            .filter_map(|k| self.get(*k).map(|v| (*k, v)))
            .collect()
    }

    /// Render the sidecar file content
    pub fn to_sidecar(&self) -> String {
        let mut out = format!("{}{}\n", SIDECAR_HEADER_PREFIX, SIDECAR_FORMAT_VERSION);
        for (key, value) in self.entries() {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out
    }

    /// Parse sidecar content
    ///
    /// Comment lines, malformed lines, unknown keys and values that do not
    /// parse for their key are skipped. Keys never contain `=`, so a line
    /// splits at its first `=` and the value may hold more.
    pub fn parse_sidecar(content: &str) -> Self {
        let mut info = Self::default();
        for line in content.lines() {
            if let Some(version) = line.strip_prefix(SIDECAR_HEADER_PREFIX) {
                if version.trim() != SIDECAR_FORMAT_VERSION.to_string() {
                    warn!(
                        "Unexpected vcs-info format {} (expected {}), reading anyway",
                        version.trim(),
                        SIDECAR_FORMAT_VERSION
                    );
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!("Ignoring malformed vcs-info line: {:?}", line);
                continue;
            };
            let Some(key) = VcsKey::parse(key) else {
                debug!("Ignoring unknown vcs-info key: {}", key);
                continue;
            };
            if let Err(e) = info.set(key, value) {
                warn!("{}", e);
            }
        }
        info
    }
}

/// The sidecar file holding recorded VCS metadata
#[derive(Debug, Clone)]
pub struct VcsStore {
    path: PathBuf,
}

impl VcsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Query the VCS and persist the result
    pub fn record(&self, probe: &VcsProbe<'_>) -> Result<VcsInfo> {
        let info = probe.collect();
        self.save(&info)?;
        Ok(info)
    }

    /// Write the sidecar, replacing any previous content
    pub fn save(&self, info: &VcsInfo) -> Result<()> {
        fs::write(&self.path, info.to_sidecar()).map_err(|e| {
            Error::IoError(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        info!("Recorded vcs info to {}", self.path.display());
        Ok(())
    }

    /// Load the sidecar; a missing file yields empty metadata
    pub fn load(&self) -> Result<VcsInfo> {
        if !self.path.exists() {
            debug!("No vcs info at {}", self.path.display());
            return Ok(VcsInfo::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(VcsInfo::parse_sidecar(&content))
    }

    /// Install-phase lookup: reuse recorded values, else record afresh
    ///
    /// Never fails; problems degrade to missing fields.
    pub fn load_or_record(&self, probe: &VcsProbe<'_>) -> VcsInfo {
        match self.load() {
            Ok(info) if !info.is_empty() => return info,
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
        let info = probe.collect();
        if let Err(e) = self.save(&info) {
            warn!("vcs info not recorded: {}", e);
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::git::tests::FakeVcs;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_round_trip() {
        for key in VcsKey::ALL {
            assert_eq!(VcsKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(VcsKey::parse("branch"), None);
    }

    #[test]
    fn test_sidecar_format() {
        let info = VcsInfo {
            branch: Some("master".to_string()),
            revision: Some(1234),
            local_modifications: None,
        };
        assert_eq!(
            info.to_sidecar(),
            "# vcs-info format 1\nBRANCH=master\nREVISION=1234\n"
        );
    }

    #[test]
    fn test_parse_skips_comments_and_malformed_lines() {
        let content = "# written by hand\n\
            BRANCH=v5.0.x\n\
            garbage line\n\
            COLOUR=blue\n\
            REVISION=abc\n\
            LOCAL_MODIFICATIONS=4\n";
        let info = VcsInfo::parse_sidecar(content);
        assert_eq!(info.branch.as_deref(), Some("v5.0.x"));
        assert_eq!(info.revision, None);
        assert_eq!(info.local_modifications, Some(4));
    }

    #[test]
    fn test_round_trip_every_subset() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("vcs-info"));

        for branch in ["feature/x", "feature/a=b"] {
            for mask in 0..8u8 {
                let info = VcsInfo {
                    branch: (mask & 1 != 0).then(|| branch.to_string()),
                    revision: (mask & 2 != 0).then_some(85),
                    local_modifications: (mask & 4 != 0).then_some(3),
                };
                store.save(&info).unwrap();
                assert_eq!(store.load().unwrap(), info, "{} subset mask {}", branch, mask);
            }
        }
    }

    #[test]
    fn test_parse_value_with_equals() {
        let info = VcsInfo::parse_sidecar("BRANCH=feature/a=b\nREVISION=5\n");
        assert_eq!(info.branch.as_deref(), Some("feature/a=b"));
        assert_eq!(info.revision, Some(5));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("vcs-info"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_record_then_load() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("vcs-info"));
        let vcs = FakeVcs::default()
            .respond("branch --show-current", "v4.0.x\n")
            .respond("describe --always --tags", "v4.0.6-85-gf253d3f9d\n")
            .respond("status", "\tmodified:   x.js\n");
        let probe = VcsProbe::new(&vcs, "master");

        let recorded = store.record(&probe).unwrap();
        assert_eq!(recorded.revision, Some(85));
        assert_eq!(store.load().unwrap(), recorded);
    }

    #[test]
    fn test_load_or_record_prefers_sidecar() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("vcs-info"));
        std::fs::write(store.path(), "REVISION=7\n").unwrap();

        let vcs = FakeVcs::default()
            .respond("branch --show-current", "master\n")
            .respond("rev-list --count HEAD --first-parent", "999\n");
        let info = store.load_or_record(&VcsProbe::new(&vcs, "master"));
        assert_eq!(info.revision, Some(7));
        assert_eq!(info.branch, None);
    }

    #[test]
    fn test_load_or_record_without_sidecar() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("vcs-info"));
        let vcs = FakeVcs::default()
            .respond("branch --show-current", "master\n")
            .respond("rev-list --count HEAD --first-parent", "999\n");

        let info = store.load_or_record(&VcsProbe::new(&vcs, "master"));
        assert_eq!(info.revision, Some(999));
        assert!(store.path().exists());
    }

    #[test]
    fn test_load_or_record_unwritable_sidecar_queries_once() {
        let dir = TempDir::new().unwrap();
        let store = VcsStore::new(dir.path().join("missing/vcs-info"));
        let responses = |vcs: FakeVcs| {
            vcs.respond("branch --show-current", "master\n")
                .respond("rev-list --count HEAD --first-parent", "999\n")
        };

        let reference = responses(FakeVcs::default());
        VcsProbe::new(&reference, "master").collect();

        let vcs = responses(FakeVcs::default());
        let info = store.load_or_record(&VcsProbe::new(&vcs, "master"));
        assert_eq!(info.revision, Some(999));
        assert_eq!(info.branch.as_deref(), Some("master"));
        assert_eq!(vcs.queries(), reference.queries());
        assert!(!store.path().exists());
    }
}
