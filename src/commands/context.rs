// src/commands/context.rs

//! Project context shared by the command handlers
//!
//! This is the only place that reads process state (current directory,
//! `PATH`, `JAVA`); everything below receives explicit values.

use anyhow::{Context, Result};
use html5_packager::manifest::{load_manifest, validate_manifest, Manifest, MANIFEST_FILE};
use html5_packager::tool::{search_path, ToolRunner};
use html5_packager::vcs::{GitCli, VcsInfo, VcsProbe, VcsStore};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ProjectContext {
    pub project_dir: PathBuf,
    pub manifest: Manifest,
}

impl ProjectContext {
    /// Resolve the project directory and load its manifest
    pub fn load(config: Option<&Path>, project_dir: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to determine current directory")?;
        let project_dir = match project_dir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        let manifest_path = match config {
            Some(path) => path.to_path_buf(),
            None => project_dir.join(MANIFEST_FILE),
        };
        if config.is_some() && !manifest_path.exists() {
            anyhow::bail!("Manifest not found: {}", manifest_path.display());
        }

        let manifest = load_manifest(&manifest_path)
            .with_context(|| format!("Failed to load {}", manifest_path.display()))?;
        let warnings = validate_manifest(&manifest).context("Manifest validation failed")?;
        for warning in &warnings {
            println!("Warning: {}", warning);
        }

        debug!("Project directory: {}", project_dir.display());
        Ok(Self {
            project_dir,
            manifest,
        })
    }

    pub fn runner(&self) -> ToolRunner {
        ToolRunner::with_optional_timeout(self.manifest.tool_timeout())
    }

    /// `PATH` followed by the manifest's extra tool directories
    pub fn tool_search_path(&self) -> Vec<PathBuf> {
        let path_var = env::var_os("PATH");
        search_path(path_var.as_deref(), &self.manifest.install.extra_tool_paths)
    }

    /// Java program from the `JAVA` environment variable, if set
    pub fn java_override(&self) -> Option<PathBuf> {
        env::var_os("JAVA")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    pub fn git(&self) -> GitCli {
        GitCli::new(&self.manifest.vcs.program, &self.project_dir).with_runner(self.runner())
    }

    pub fn vcs_store(&self) -> VcsStore {
        VcsStore::new(self.manifest.vcs_sidecar(&self.project_dir))
    }

    /// Query git and rewrite the sidecar
    pub fn record_vcs_info(&self) -> Result<VcsInfo> {
        let git = self.git();
        let probe = VcsProbe::new(&git, &self.manifest.vcs.primary_branch);
        self.vcs_store()
            .record(&probe)
            .context("Failed to record vcs info")
    }

    /// Reuse the sidecar when it has values, otherwise record afresh
    pub fn load_vcs_info(&self) -> VcsInfo {
        let git = self.git();
        let probe = VcsProbe::new(&git, &self.manifest.vcs.primary_branch);
        self.vcs_store().load_or_record(&probe)
    }

    /// Install directory from the command line
    ///
    /// `None` means the manifest default; `.` means the current directory.
    pub fn resolve_install_dir(&self, arg: Option<&str>) -> Result<PathBuf> {
        match arg {
            None => Ok(self.manifest.default_install_dir()),
            Some(".") => env::current_dir().context("Failed to determine current directory"),
            Some(dir) => Ok(PathBuf::from(dir)),
        }
    }
}
