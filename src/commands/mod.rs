// src/commands/mod.rs
//! Command handlers for the html5-packager CLI

mod context;
mod deb;
mod install;
mod sdist;

pub use context::ProjectContext;
pub use deb::cmd_deb;
pub use install::cmd_install;
pub use sdist::cmd_sdist;
