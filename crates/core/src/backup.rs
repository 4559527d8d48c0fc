use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::warn;

use crate::{
    atomic::parent_dir,
    retry::RetryPolicy,
};

pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Creates timestamped copies of the target file in its own directory and
/// rotates the oldest copies beyond the retention limit.
#[derive(Clone, Debug)]
pub struct BackupManager {
    marker: String,
    max_backups: usize,
    retry: RetryPolicy,
}

impl BackupManager {
    pub fn new(marker: impl Into<String>, max_backups: usize, retry: RetryPolicy) -> Self {
        Self {
            marker: marker.into(),
            max_backups,
            retry,
        }
    }

    /// Copies the target's full byte content to `<base><marker><timestamp>`
    /// beside it, then rotates old backups. Rotation is best-effort and never
    /// fails the call. A backup taken within the same second as an earlier
    /// one overwrites that earlier copy.
    pub fn create_backup(&self, target: &Path) -> io::Result<PathBuf> {
        let backup_path = self.backup_path(target, Local::now())?;
        self.retry
            .run(|| fs::copy(target, &backup_path).map(|_| ()))?;
        self.rotate(target);
        Ok(backup_path)
    }

    /// Returns the matching backup with the greatest modification time, or
    /// `None` when no backup exists beside the target.
    pub fn latest_backup(&self, target: &Path) -> io::Result<Option<PathBuf>> {
        let mut backups = self.list_backups(target)?;
        Ok(backups.pop().map(|entry| entry.path()))
    }

    fn backup_path(&self, target: &Path, at: DateTime<Local>) -> io::Result<PathBuf> {
        let base = file_name_of(target)?;
        Ok(target.with_file_name(format!(
            "{base}{}{}",
            self.marker,
            at.format(BACKUP_TIMESTAMP_FORMAT)
        )))
    }

    /// Matching entries sorted by modification time ascending. Entries whose
    /// mtime cannot be read sort first; same-second ties keep the listing
    /// order of the underlying directory.
    fn list_backups(&self, target: &Path) -> io::Result<Vec<fs::DirEntry>> {
        let parent = parent_dir(target);
        let prefix = format!("{}{}", file_name_of(target)?, self.marker);

        let mut backups: Vec<_> = fs::read_dir(parent)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .collect();

        backups.sort_by_key(|entry| entry.metadata().and_then(|meta| meta.modified()).ok());
        Ok(backups)
    }

    fn rotate(&self, target: &Path) {
        let backups = match self.list_backups(target) {
            Ok(backups) => backups,
            Err(err) => {
                warn!(error = %err, target = %target.display(), "skipping backup rotation");
                return;
            }
        };

        if backups.len() <= self.max_backups {
            return;
        }

        let excess = backups.len() - self.max_backups;
        for entry in backups.into_iter().take(excess) {
            if let Err(err) = fs::remove_file(entry.path()) {
                warn!(
                    error = %err,
                    path = %entry.path().display(),
                    "failed removing old backup"
                );
            }
        }
    }
}

fn file_name_of(target: &Path) -> io::Result<String> {
    target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path has no filename: {}", target.display()),
            )
        })
}
