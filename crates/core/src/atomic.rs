use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::retry::RetryPolicy;

/// Installs new content by staging it in the target's directory and swapping
/// it in with a single rename, so observers of the target path only ever see
/// the prior content or the complete new content.
#[derive(Clone, Debug)]
pub struct AtomicReplacer {
    retry: RetryPolicy,
}

enum StagingSource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

impl AtomicReplacer {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Writes `content` to the target atomically. The whole write-then-rename
    /// unit retries as one: a failed rename re-stages fresh content rather
    /// than resuming a partial write.
    pub fn replace_content(&self, target: &Path, content: &[u8]) -> io::Result<()> {
        self.retry
            .run(|| stage_and_rename(target, &StagingSource::Bytes(content)))
    }

    /// Same contract, but the staged content is byte-copied from `source`.
    /// Used by restore-from-backup.
    pub fn replace_from_file(&self, target: &Path, source: &Path) -> io::Result<()> {
        self.retry
            .run(|| stage_and_rename(target, &StagingSource::File(source)))
    }
}

fn stage_and_rename(target: &Path, source: &StagingSource<'_>) -> io::Result<()> {
    let parent = parent_dir(target);
    let file_name = target.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path has no filename: {}", target.display()),
        )
    })?;

    let staging = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        nanos_now()
    ));

    let result = write_staging(&staging, source).and_then(|()| fs::rename(&staging, target));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn write_staging(staging: &Path, source: &StagingSource<'_>) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(staging)?;

    match source {
        StagingSource::Bytes(bytes) => file.write_all(bytes)?,
        StagingSource::File(path) => {
            let mut src = fs::File::open(path)?;
            io::copy(&mut src, &mut file)?;
        }
    }

    file.sync_all()
}

pub(crate) fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn nanos_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}
