// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default initializers as they appear in the client's Utilities.js
pub const UTILITIES_JS: &str = "const Utilities = {\n\
    \tVERSION : \"4.1\",\n\
    \tREVISION : 0,\n\
    \tLOCAL_MODIFICATIONS : 0,\n\
    \tBRANCH : \"master\",\n\
    };\n";

/// A throwaway project: `html5/` client tree, `bin/` fake tools, `system/`
/// stand-ins for distribution-managed files.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    /// Create a project with a small client tree
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let project = Self { dir };

        project.write("html5/index.html", "<html>\n<script src=\"js/Client.js\"></script>\n</html>\n");
        project.write("html5/connect.html", "<html></html>\n");
        project.write("html5/js/Utilities.js", UTILITIES_JS);
        project.write(
            "html5/js/Client.js",
            "function go() {\n  let a = 1;\n  for (const k in a) {}\n}\n",
        );
        project.write("html5/js/lib/jquery.js", "/* bundled jquery */\n");
        project.write("html5/css/client.css", "body { margin: 0; }\n");
        project.write("html5/favicon.png", "\u{89}PNG");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path().join("html5")
    }

    pub fn install_dir(&self) -> PathBuf {
        self.path().join("www")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Write a file relative to the project root, creating parents
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Number of regular files and symlinks below the client tree
    pub fn source_file_count(&self) -> usize {
        walkdir::WalkDir::new(self.source_dir())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .count()
    }

    /// All paths below the install root ending in `suffix`, relative and sorted
    pub fn installed_with_suffix(&self, suffix: &str) -> Vec<PathBuf> {
        let root = self.install_dir();
        let mut found: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
            .map(|e| e.path().strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        found.sort();
        found
    }

    /// Files anywhere in the client tree ending in `suffix`
    pub fn source_files_with_suffix(&self, suffix: &str) -> Vec<PathBuf> {
        walkdir::WalkDir::new(self.source_dir())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
            .map(|e| e.path().to_path_buf())
            .collect()
    }
}

/// Install an executable shell script under `dir`
#[cfg(unix)]
pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// `gzip -f -n -9 -k <file>`: copies the last argument to `<file>.gz`
#[cfg(unix)]
pub fn fake_gzip(dir: &Path) -> PathBuf {
    write_tool(dir, "gzip", "for last; do :; done\ncp \"$last\" \"$last.gz\"")
}

/// Modern brotli: `--version` reports 1.0.9, `-k <file>` writes `<file>.br`
#[cfg(unix)]
pub fn fake_brotli(dir: &Path) -> PathBuf {
    write_tool(
        dir,
        "brotli",
        "if [ \"$1\" = \"--version\" ]; then echo \"brotli 1.0.9\"; exit 0; fi\ncp \"$2\" \"$2.br\"",
    )
}

/// `uglifyjs <in> -o <out> --compress`: prefixes a marker and copies
#[cfg(unix)]
pub fn fake_uglifyjs(dir: &Path) -> PathBuf {
    write_tool(dir, "uglifyjs", "{ echo '/*min*/'; cat \"$1\"; } > \"$3\"")
}
