// src/minify.rs

//! Script minification with copy fallback
//!
//! Two external minifiers are supported, each with its own calling
//! convention:
//!
//! - `uglifyjs <in> -o <out> --compress`
//! - yuicompressor, either through `java -jar <jar>` or a `yuicompressor`
//!   wrapper: `<cmd> <in> --nomunge --line-break 400 --type js -o <out>`
//!
//! A minifier failure is never fatal for the run: the asset is copied
//! verbatim instead. Non-script assets are always copied.

use crate::assets::FileType;
use crate::error::{Error, Result};
use crate::install::set_file_mode;
use crate::tool::{ToolInvocation, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Minifier name that disables minification
pub const COPY: &str = "copy";

/// Where to find the minifier programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifierSettings {
    pub uglifyjs: PathBuf,
    pub yuicompressor: PathBuf,
    pub java: PathBuf,
    /// When set, yuicompressor runs as `java -jar <jar>`
    pub yuicompressor_jar: Option<PathBuf>,
}

impl Default for MinifierSettings {
    fn default() -> Self {
        Self {
            uglifyjs: PathBuf::from("uglifyjs"),
            yuicompressor: PathBuf::from("yuicompressor"),
            java: PathBuf::from("java"),
            yuicompressor_jar: None,
        }
    }
}

/// Configured minification backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Minifier {
    /// Copy everything verbatim
    Copy,
    UglifyJs { program: PathBuf },
    YuiCompressor { program: PathBuf, jar: Option<PathBuf> },
}

impl Minifier {
    /// Select a backend by name
    ///
    /// An empty name or `copy` disables minification. Unknown names are a
    /// configuration error.
    pub fn from_name(name: &str, settings: &MinifierSettings) -> Result<Self> {
        match name {
            "" | COPY => Ok(Self::Copy),
            "uglifyjs" => Ok(Self::UglifyJs {
                program: settings.uglifyjs.clone(),
            }),
            "yuicompressor" => Ok(match &settings.yuicompressor_jar {
                Some(jar) => Self::YuiCompressor {
                    program: settings.java.clone(),
                    jar: Some(jar.clone()),
                },
                None => Self::YuiCompressor {
                    program: settings.yuicompressor.clone(),
                    jar: None,
                },
            }),
            other => Err(Error::UnsupportedMinifier(other.to_string())),
        }
    }

    /// Default minifier name for the host platform
    pub fn host_default_name() -> &'static str {
        if cfg!(windows) {
            "yuicompressor"
        } else {
            "uglifyjs"
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy => COPY,
            Self::UglifyJs { .. } => "uglifyjs",
            Self::YuiCompressor { .. } => "yuicompressor",
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy)
    }

    /// Command line minifying `input` into `output`
    pub fn invocation(&self, input: &Path, output: &Path) -> Option<ToolInvocation> {
        match self {
            Self::Copy => None,
            Self::UglifyJs { program } => Some(
                ToolInvocation::new(program)
                    .arg(input)
                    .arg("-o")
                    .arg(output)
                    .arg("--compress"),
            ),
            Self::YuiCompressor { program, jar } => {
                let mut inv = ToolInvocation::new(program);
                if let Some(jar) = jar {
                    inv = inv.arg("-jar").arg(jar);
                }
                Some(
                    inv.arg(input)
                        .args(["--nomunge", "--line-break", "400", "--type", "js", "-o"])
                        .arg(output),
                )
            }
        }
    }
}

/// How an asset's content reached its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    Minified,
    Copied,
}

fn copy_verbatim(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).map_err(|e| {
        Error::IoError(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        ))
    })?;
    Ok(())
}

/// Write `source` to `destination`, minifying scripts when configured
///
/// The destination always ends up with mode 0644.
pub fn minify(
    minifier: &Minifier,
    runner: &ToolRunner,
    source: &Path,
    destination: &Path,
    file_type: FileType,
) -> Result<InstallMethod> {
    let invocation = match (file_type, minifier.invocation(source, destination)) {
        (FileType::Script, Some(inv)) => inv,
        _ => {
            copy_verbatim(source, destination)?;
            set_file_mode(destination)?;
            info!("copied {}", destination.display());
            return Ok(InstallMethod::Copied);
        }
    };

    let succeeded = match runner.run(&invocation) {
        Ok(output) if output.success() => true,
        Ok(output) => {
            error!(
                "Failed to minify '{}': {} returned {}",
                source.display(),
                invocation,
                output.status_display()
            );
            output.log_failure(&invocation);
            false
        }
        Err(e) => {
            error!("Failed to minify '{}': {}", source.display(), e);
            false
        }
    };

    let method = if succeeded && destination.exists() {
        info!("minified {}", destination.display());
        InstallMethod::Minified
    } else {
        if succeeded {
            error!("{} did not create {}", invocation, destination.display());
        }
        copy_verbatim(source, destination)?;
        info!("copied {} (minifier fallback)", destination.display());
        InstallMethod::Copied
    };

    set_file_mode(destination)?;
    Ok(method)
}
