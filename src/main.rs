// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::ProjectContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging; RUST_LOG wins over -v
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level())),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        std::process::exit(1);
    };

    let ctx = ProjectContext::load(cli.config.as_deref(), cli.project_dir.as_deref())?;

    match command {
        Commands::Sdist => commands::cmd_sdist(&ctx),
        Commands::Install {
            install_dir,
            minifier,
        } => commands::cmd_install(&ctx, install_dir.as_deref(), minifier.as_deref()),
        Commands::Deb => commands::cmd_deb(&ctx),
    }
}
