// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Global argument: manifest path
fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("PATH")
        .global(true)
        .help("Manifest file (default: <project-dir>/packager.toml)")
}

/// Global argument: project directory
fn project_dir_arg() -> Arg {
    Arg::new("project_dir")
        .long("project-dir")
        .value_name("DIR")
        .global(true)
        .help("Project directory (default: current directory)")
}

fn build_cli() -> Command {
    Command::new("html5-packager")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Xpra HTML5 Contributors")
        .about("Build, install and package the xpra HTML5 client")
        .subcommand_required(false)
        .arg(config_arg())
        .arg(project_dir_arg())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity"),
        )
        .subcommand(Command::new("sdist").about("Record VCS info and write the source archive"))
        .subcommand(
            Command::new("install")
                .about("Install the client, minifying scripts and creating compressed copies")
                .arg(
                    Arg::new("install_dir")
                        .help("Installation directory (\".\" for the current directory)"),
                )
                .arg(Arg::new("minifier").help("Minifier: uglifyjs, yuicompressor or copy")),
        )
        .subcommand(Command::new("deb").about("Build a Debian package in the output directory"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("html5-packager.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
