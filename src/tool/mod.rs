// src/tool/mod.rs

//! External tool invocation
//!
//! Every external program the packager drives (git, minifiers, gzip, brotli,
//! dpkg-deb) goes through [`ToolRunner`]. Key properties:
//!
//! - stdin is nullified so a tool waiting for input cannot hang the run
//! - stdout and stderr are drained on helper threads, so chatty tools never
//!   block on a full pipe
//! - an optional timeout; expiry kills the child and is reported through
//!   [`ToolOutput::timed_out`], which callers treat like a nonzero exit.
//!   Output captured before the kill is kept.
//!
//! Tool lookup is done against an explicit search path rather than the
//! ambient `PATH`, so callers (and tests) decide where tools come from.

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the tool from the given working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished (or abandoned) tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal or on timeout
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ToolOutput {
    /// True only for a clean zero exit within the time limit
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    /// Human readable exit status for log lines
    pub fn status_display(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            match self.code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }

    /// First line of stdout, if any
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().next()
    }

    /// Log captured output of a failed run at warn level
    pub fn log_failure(&self, invocation: &ToolInvocation) {
        warn!("{} failed: {}", invocation, self.status_display());
        if !self.stdout.trim().is_empty() {
            warn!("stdout={}", self.stdout.trim_end());
        }
        if !self.stderr.trim().is_empty() {
            warn!("stderr={}", self.stderr.trim_end());
        }
    }
}

/// How long readers get to reach EOF after a timed-out child is killed
const READER_GRACE: Duration = Duration::from_millis(200);

/// Runs [`ToolInvocation`]s synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolRunner {
    timeout: Option<Duration>,
}

impl ToolRunner {
    /// Runner that waits for tools without a time limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a timeout applied to every run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_optional_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run a tool to completion, capturing its output
    ///
    /// Returns `Err` only when the process could not be started at all.
    pub fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        debug!("Running: {}", invocation);

        let mut child = command
            .spawn()
            .map_err(|e| Error::CommandFailed(format!("Failed to spawn {}: {}", invocation, e)))?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // A grandchild may still hold the pipes open, so readers
                    // are not joined; take what they have so far.
                    let deadline = Instant::now() + READER_GRACE;
                    for capture in [&stdout, &stderr].into_iter().flatten() {
                        capture.settle(deadline);
                    }
                    return Ok(ToolOutput {
                        code: None,
                        stdout: snapshot(stdout.as_ref()),
                        stderr: snapshot(stderr.as_ref()),
                        timed_out: true,
                    });
                }
            },
            None => child.wait()?,
        };

        Ok(ToolOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
            timed_out: false,
        })
    }
}

/// Output of one pipe, filled by a reader thread
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl Capture {
    /// Wait until the reader hits EOF or `deadline` passes
    fn settle(&self, deadline: Instant) {
        while !self.reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Capture {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let reader = thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(&chunk[..n]),
            }
        }
    });
    Capture { buf, reader }
}

fn collect(capture: Option<Capture>) -> String {
    let Some(capture) = capture else {
        return String::new();
    };
    let Capture { buf, reader } = capture;
    let _ = reader.join();
    let buf = buf.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&buf).into_owned()
}

fn snapshot(capture: Option<&Capture>) -> String {
    capture.map(Capture::contents).unwrap_or_default()
}

/// Build a tool search path from a `PATH`-style value plus extra directories
///
/// Extra directories are appended after the `PATH` entries and skipped when
/// already present.
pub fn search_path(path_var: Option<&OsStr>, extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = path_var
        .map(|v| std::env::split_paths(v).collect())
        .unwrap_or_default();
    for dir in extra {
        if !paths.contains(dir) {
            paths.push(dir.clone());
        }
    }
    paths
}

/// Locate an executable by name on an explicit search path
///
/// Uses the platform's executable naming (a trailing `.exe` on Windows).
pub fn find_tool(name: &str, search_path: &[PathBuf], cwd: &Path) -> Option<PathBuf> {
    if search_path.is_empty() {
        return None;
    }
    let joined = std::env::join_paths(search_path).ok()?;
    match which::which_in(name, Some(joined), cwd) {
        Ok(path) => {
            debug!("Found {} at {}", name, path.display());
            Some(path)
        }
        Err(e) => {
            debug!("{} not found on search path: {}", name, e);
            None
        }
    }
}
