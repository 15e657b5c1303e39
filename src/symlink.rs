//! The `current` link: one symbolic indirection per service identifying
//! the live build.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpdaemonError};

pub trait SymlinkStore: Send + Sync {
    /// Repoints `link` at `target` atomically. Refuses to replace a path
    /// that exists but is not a symlink.
    fn create_or_update(&self, link: &Path, target: &Path) -> Result<()>;

    fn read_target(&self, link: &Path) -> Option<PathBuf>;

    fn is_symlink(&self, path: &Path) -> bool;
}

pub struct SymlinkManager;

impl SymlinkStore for SymlinkManager {
    fn create_or_update(&self, link: &Path, target: &Path) -> Result<()> {
        if fs::symlink_metadata(link).is_ok() && !self.is_symlink(link) {
            return Err(UpdaemonError::NotASymlink(link.to_path_buf()));
        }

        // Create beside the link and rename over it, so readers see
        // either the old target or the new one, never a missing link.
        let staged = staging_path(link);
        if fs::symlink_metadata(&staged).is_ok() {
            fs::remove_file(&staged)?;
        }
        std::os::unix::fs::symlink(target, &staged)?;
        fs::rename(&staged, link)?;
        Ok(())
    }

    fn read_target(&self, link: &Path) -> Option<PathBuf> {
        fs::read_link(link).ok()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
    }
}

fn staging_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "link".to_string());
    link.with_file_name(format!(".{name}.staged"))
}
