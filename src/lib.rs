// src/lib.rs

//! html5-packager
//!
//! Build pipeline for the xpra HTML5 client: records VCS metadata, stamps
//! it into the client scripts, minifies and compresses the assets into an
//! install tree, and produces source archives and Debian packages.
//!
//! # Architecture
//!
//! - `vcs`: branch/revision/modification scraping and the `vcs-info` sidecar
//! - `assets`: source tree discovery
//! - `symlink`: links to system-provided copies of bundled libraries
//! - `transform`: version stamping and `let`/`const` downleveling
//! - `minify` / `compression`: external minifiers and `.gz`/`.br` sidecars
//! - `install`: the per-asset pipeline driver
//! - `manifest` / `packaging`: `packager.toml`, sdist and deb assembly

pub mod assets;
pub mod compression;
mod error;
pub mod install;
pub mod manifest;
pub mod minify;
pub mod packaging;
pub mod symlink;
pub mod tool;
pub mod transform;
pub mod vcs;

pub use assets::{discover, discover_assets, AssetEntry, FileType};
pub use compression::{CompressionFormat, Compressor, Sidecars};
pub use error::{Error, Result};
pub use install::{AssetOutcome, InstallConfig, InstallReport, InstalledAsset, Installer};
pub use manifest::{load_manifest, Manifest};
pub use minify::{Minifier, MinifierSettings};
pub use symlink::SymlinkCandidates;
pub use tool::{ToolInvocation, ToolOutput, ToolRunner};
pub use transform::{Transformer, VersionStamp};
pub use vcs::{GitCli, VcsInfo, VcsKey, VcsProbe, VcsStore};
