//! All-or-nothing artifact publication.
//!
//! Artifacts are written next to their destination with a `.partial`
//! suffix and renamed into place only once every one of them is complete.
//! Files already at a destination are set aside with a `.previous` suffix
//! during the commit, and restored if any later rename fails, so a failed
//! commit leaves the previous run's artifacts exactly as they were.
//! Dropping a [`Staging`] without committing removes whatever was staged.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Staging {
    files: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

impl Staging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a staging path for `target` and creates its parent directory.
    pub fn stage(&mut self, target: &Path) -> io::Result<PathBuf> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let partial = sibling(target, ".partial");
        self.files.push((partial.clone(), target.to_path_buf()));
        Ok(partial)
    }

    /// Moves every staged file onto its destination, or none of them.
    pub fn commit(mut self) -> io::Result<Vec<PathBuf>> {
        for (_, target) in &self.files {
            if fs::symlink_metadata(target).is_ok_and(|m| m.is_dir()) {
                return Err(io::Error::other(format!(
                    "artifact target {} is a directory",
                    target.display()
                )));
            }
        }

        let mut done: Vec<Published> = Vec::with_capacity(self.files.len());
        for (partial, target) in &self.files {
            match publish(partial, target) {
                Ok(published) => done.push(published),
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "Publishing failed, restoring previous artifacts");
                    for published in done.iter().rev() {
                        published.roll_back();
                    }
                    return Err(e);
                }
            }
        }

        for published in &done {
            published.discard_backup();
        }
        self.committed = true;
        Ok(done.into_iter().map(|p| p.target).collect())
    }
}

/// A staged file that has been renamed onto its destination.
struct Published {
    target: PathBuf,
    backup: Option<PathBuf>,
}

impl Published {
    /// Removes the new file and puts the previous one, if any, back.
    fn roll_back(&self) {
        if let Err(e) = fs::remove_file(&self.target) {
            warn!(path = %self.target.display(), error = %e, "Failed to withdraw artifact");
        }
        if let Some(backup) = &self.backup {
            if let Err(e) = fs::rename(backup, &self.target) {
                warn!(path = %backup.display(), error = %e, "Failed to restore previous artifact");
            }
        }
    }

    fn discard_backup(&self) {
        if let Some(backup) = &self.backup {
            if let Err(e) = fs::remove_file(backup) {
                warn!(path = %backup.display(), error = %e, "Failed to remove previous artifact");
            }
        }
    }
}

/// Renames `partial` onto `target`, setting any existing `target` aside
/// first. On failure the existing file is back in place.
fn publish(partial: &Path, target: &Path) -> io::Result<Published> {
    let backup = if fs::symlink_metadata(target).is_ok() {
        let backup = sibling(target, ".previous");
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(partial, target) {
        if let Some(backup) = &backup {
            if let Err(restore) = fs::rename(backup, target) {
                warn!(path = %backup.display(), error = %restore, "Failed to restore previous artifact");
            }
        }
        return Err(e);
    }

    debug!(path = %target.display(), "Artifact published");
    Ok(Published {
        target: target.to_path_buf(),
        backup,
    })
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(suffix);
    target.with_file_name(name)
}

impl Drop for Staging {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (partial, _) in &self.files {
            match fs::remove_file(partial) {
                Ok(()) => debug!(path = %partial.display(), "Removed staged artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %partial.display(), error = %e, "Failed to remove staged artifact"),
            }
        }
    }
}
