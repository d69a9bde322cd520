// src/packaging/mod.rs

//! Distribution artifacts: source archive and Debian package

pub mod deb;
pub mod sdist;

pub use deb::{parse_changelog_version, read_changelog_version, DebBuilder};
pub use sdist::SourceArchive;
