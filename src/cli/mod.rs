// src/cli/mod.rs
//! CLI definitions for html5-packager
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `sdist` - Record VCS info and write the source archive
//! - `install` - Run the asset pipeline into an install directory
//! - `deb` - Build a Debian package with `dpkg-deb`

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "html5-packager")]
#[command(author = "Xpra HTML5 Contributors")]
#[command(version)]
#[command(about = "Build, install and package the xpra HTML5 client", long_about = None)]
pub struct Cli {
    /// Manifest file (default: <project-dir>/packager.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project directory (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record VCS info and write the source archive
    Sdist,

    /// Install the client, minifying scripts and creating compressed copies
    Install {
        /// Installation directory ("." for the current directory)
        install_dir: Option<String>,

        /// Minifier: uglifyjs, yuicompressor or copy
        minifier: Option<String>,
    },

    /// Build a Debian package in the output directory
    Deb,
}

impl Cli {
    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_positionals() {
        let cli = Cli::parse_from(["html5-packager", "install", ".", "copy"]);
        match cli.command {
            Some(Commands::Install {
                install_dir,
                minifier,
            }) => {
                assert_eq!(install_dir.as_deref(), Some("."));
                assert_eq!(minifier.as_deref(), Some("copy"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_install_rejects_extra_positionals() {
        let result = Cli::try_parse_from(["html5-packager", "install", "/tmp/www", "copy", "extra"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "html5-packager",
            "deb",
            "-vv",
            "--project-dir",
            "/src/client",
        ]);
        assert_eq!(cli.log_level(), "trace");
        assert_eq!(cli.project_dir, Some(PathBuf::from("/src/client")));
        assert!(matches!(cli.command, Some(Commands::Deb)));
    }
}
