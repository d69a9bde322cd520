// src/manifest/mod.rs

//! Packager manifest (`packager.toml`)

pub mod format;
pub mod parser;

pub use format::{
    BackgroundSection, DebSection, InstallSection, Manifest, MinifierSection, PackageSection,
    SdistSection, VcsSection, MANIFEST_FILE,
};
pub use parser::{load_manifest, parse_manifest, parse_manifest_file, validate_manifest};
