//! Locates the runnable entry point inside a downloaded version
//! directory.
//!
//! A build may ship an `updaemon.json` hint naming its executable; absent
//! that, the directory is scanned for a file whose stem matches the
//! service name (exact match preferred over substring).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const APP_HINTS_FILE: &str = "updaemon.json";

/// Optional hints a published build can carry for updaemon.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppHints {
    /// Relative path to the executable within the version directory.
    executable_path: Option<String>,
}

pub trait ExecFinder: Send + Sync {
    fn find(&self, directory: &Path, service_name: &str) -> Option<PathBuf>;
}

pub struct ExecutableDetector;

impl ExecFinder for ExecutableDetector {
    fn find(&self, directory: &Path, service_name: &str) -> Option<PathBuf> {
        if !directory.is_dir() {
            return None;
        }

        if let Some(hinted) = from_hints(directory) {
            return Some(hinted);
        }

        let mut files = Vec::new();
        collect_files(directory, &mut files);
        files.sort();

        let wanted = service_name.to_lowercase();
        let stem = |path: &Path| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        };

        if let Some(exact) = files
            .iter()
            .find(|f| stem(f) == wanted && is_executable(f))
        {
            return Some(exact.clone());
        }

        files
            .iter()
            .find(|f| stem(f).contains(&wanted) && is_executable(f))
            .cloned()
    }
}

fn from_hints(directory: &Path) -> Option<PathBuf> {
    let hints_path = directory.join(APP_HINTS_FILE);
    let json = fs::read_to_string(&hints_path).ok()?;
    let hints: AppHints = match serde_json::from_str(&json) {
        Ok(hints) => hints,
        Err(err) => {
            // A broken hints file falls back to scanning.
            tracing::warn!(path = %hints_path.display(), %err, "ignoring unparseable hints file");
            return None;
        }
    };

    let candidate = directory.join(hints.executable_path?);
    if candidate.is_file() && is_executable(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn honors_hints_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("bin/server"), 0o755);
        fs::write(
            dir.path().join(APP_HINTS_FILE),
            r#"{"executablePath": "bin/server"}"#,
        )
        .unwrap();

        let found = ExecutableDetector.find(dir.path(), "my-api").unwrap();
        assert_eq!(found, dir.path().join("bin/server"));
    }

    #[test]
    fn hints_naming_missing_file_fall_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("my-api"), 0o755);
        fs::write(
            dir.path().join(APP_HINTS_FILE),
            r#"{"executablePath": "gone"}"#,
        )
        .unwrap();

        let found = ExecutableDetector.find(dir.path(), "my-api").unwrap();
        assert_eq!(found, dir.path().join("my-api"));
    }

    #[test]
    fn exact_stem_match_beats_partial() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("my-api-helper"), 0o755);
        write_file(&dir.path().join("my-api"), 0o755);

        let found = ExecutableDetector.find(dir.path(), "my-api").unwrap();
        assert_eq!(found, dir.path().join("my-api"));
    }

    #[test]
    fn partial_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("MyApi-linux-x64"), 0o755);

        let found = ExecutableDetector.find(dir.path(), "myapi").unwrap();
        assert_eq!(found, dir.path().join("MyApi-linux-x64"));
    }

    #[test]
    fn searches_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("release/bin/my-api"), 0o755);

        let found = ExecutableDetector.find(dir.path(), "my-api").unwrap();
        assert_eq!(found, dir.path().join("release/bin/my-api"));
    }

    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("my-api"), 0o644);

        assert!(ExecutableDetector.find(dir.path(), "my-api").is_none());
    }

    #[test]
    fn missing_directory_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ExecutableDetector
            .find(&dir.path().join("nope"), "my-api")
            .is_none());
    }
}
