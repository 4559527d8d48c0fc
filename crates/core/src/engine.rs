use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    atomic::{nanos_now, parent_dir, AtomicReplacer},
    backup::BackupManager,
    config::EngineConfig,
    error::EngineError,
    platform::PlatformOps,
    retry::RetryPolicy,
};

#[derive(Clone, Debug)]
pub struct ApplyReport {
    pub target: PathBuf,
    pub backup: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RevertReport {
    pub target: PathBuf,
    pub backup: PathBuf,
}

/// Orchestrates a safe mutation of the hosts file: resolve the real path,
/// verify writability, clear protective attributes, snapshot the current
/// state, then atomically install the new content. One logical operation at
/// a time per target; correctness under external writers comes from the
/// rename's atomicity plus the retry loop.
pub struct MutationEngine<P: PlatformOps> {
    platform: P,
    backups: BackupManager,
    replacer: AtomicReplacer,
}

impl<P: PlatformOps> MutationEngine<P> {
    pub fn new(config: EngineConfig, platform: P) -> Self {
        let retry = RetryPolicy::new(config.retry_attempts, config.retry_base_delay);
        Self {
            platform,
            backups: BackupManager::new(config.backup_marker, config.max_backups, retry.clone()),
            replacer: AtomicReplacer::new(retry),
        }
    }

    pub fn apply(&self, content: &str, target: &Path) -> Result<ApplyReport, EngineError> {
        if content.is_empty() {
            return Err(EngineError::InputMissing);
        }
        if target.as_os_str().is_empty() {
            return Err(EngineError::PathMissing);
        }

        let real = self.platform.resolve_real_path(target);
        if !real.exists() {
            return Err(EngineError::TargetNotFound(real));
        }

        ensure_writable(&real)?;
        self.platform.clear_protective_attributes(&real);

        let backup = self
            .backups
            .create_backup(&real)
            .map_err(|err| EngineError::WriteFailed {
                path: real.clone(),
                source: err,
            })?;

        self.replacer
            .replace_content(&real, content.as_bytes())
            .map_err(|err| EngineError::from_write_error(&real, err))?;

        info!(target = %real.display(), backup = %backup.display(), "installed new hosts content");
        Ok(ApplyReport {
            target: real,
            backup,
        })
    }

    pub fn revert(&self, target: &Path) -> Result<RevertReport, EngineError> {
        if target.as_os_str().is_empty() {
            return Err(EngineError::PathMissing);
        }

        let real = self.platform.resolve_real_path(target);

        // Target absence is detected through the backup lookup: a missing
        // directory simply has no backups.
        let latest = match self.backups.latest_backup(&real) {
            Ok(Some(path)) => path,
            Ok(None) => return Err(EngineError::NoBackupAvailable(real)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::NoBackupAvailable(real))
            }
            Err(err) => return Err(EngineError::from_write_error(&real, err)),
        };

        ensure_writable(&real)?;
        self.platform.clear_protective_attributes(&real);

        self.replacer
            .replace_from_file(&real, &latest)
            .map_err(|err| EngineError::from_write_error(&real, err))?;

        info!(target = %real.display(), backup = %latest.display(), "restored hosts content from backup");
        Ok(RevertReport {
            target: real,
            backup: latest,
        })
    }
}

/// The containing directory must exist and accept a throwaway probe file.
fn ensure_writable(target: &Path) -> Result<(), EngineError> {
    let dir = parent_dir(target);
    if !dir.is_dir() {
        return Err(EngineError::DirectoryMissing(dir));
    }

    let probe = dir.join(format!(".hostsmith-probe-{}", nanos_now()));
    match fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&probe)
    {
        Ok(file) => {
            drop(file);
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            Err(EngineError::PermissionDenied { path: dir, source: err })
        }
        Err(err) => Err(EngineError::WriteFailed {
            path: dir,
            source: err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::platform::PortableOps;

    fn temp_dir(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("hostsmith-core-{name}-{}", nanos_now()));
        fs::create_dir_all(&path).expect("temp dir creation should work");
        path
    }

    fn engine(max_backups: usize) -> MutationEngine<PortableOps> {
        let config = EngineConfig::default()
            .with_retry(3, Duration::from_millis(1))
            .with_max_backups(max_backups);
        MutationEngine::new(config, PortableOps)
    }

    fn count_backups(root: &Path) -> usize {
        fs::read_dir(root)
            .expect("read_dir should work")
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("hosts.backup_")
            })
            .count()
    }

    #[test]
    fn apply_round_trips_and_snapshots_prior_content() {
        let root = temp_dir("engine-apply");
        let target = root.join("hosts");
        fs::write(&target, "1.2.3.4 a.test\n").expect("seed write should work");

        let report = engine(10)
            .apply("5.6.7.8 b.test\n", &target)
            .expect("apply should work");

        assert_eq!(
            fs::read_to_string(&report.target).expect("read target"),
            "5.6.7.8 b.test\n"
        );
        assert_eq!(count_backups(&root), 1);
        assert_eq!(
            fs::read_to_string(&report.backup).expect("read backup"),
            "1.2.3.4 a.test\n"
        );
    }

    #[test]
    fn revert_is_the_inverse_of_apply() {
        let root = temp_dir("engine-revert");
        let target = root.join("hosts");
        fs::write(&target, "1.2.3.4 a.test\n").expect("seed write should work");
        let eng = engine(10);

        let applied = eng
            .apply("5.6.7.8 b.test\n", &target)
            .expect("apply should work");
        let reverted = eng.revert(&target).expect("revert should work");

        assert_eq!(
            fs::read_to_string(&target).expect("read after revert"),
            "1.2.3.4 a.test\n"
        );
        assert_eq!(reverted.backup, applied.backup);
        // The consumed backup stays on disk.
        assert!(applied.backup.exists());
    }

    #[test]
    fn empty_content_is_input_missing() {
        let root = temp_dir("engine-empty-content");
        let target = root.join("hosts");
        fs::write(&target, "seed").expect("seed write should work");

        let err = engine(10)
            .apply("", &target)
            .expect_err("empty content should fail");
        assert!(matches!(err, EngineError::InputMissing));
        assert_eq!(fs::read(&target).expect("target untouched"), b"seed");
    }

    #[test]
    fn empty_path_is_path_missing() {
        let err = engine(10)
            .apply("content\n", Path::new(""))
            .expect_err("empty path should fail");
        assert!(matches!(err, EngineError::PathMissing));

        let err = engine(10)
            .revert(Path::new(""))
            .expect_err("empty path should fail");
        assert!(matches!(err, EngineError::PathMissing));
    }

    #[test]
    fn missing_target_is_target_not_found() {
        let root = temp_dir("engine-no-target");
        let err = engine(10)
            .apply("content\n", &root.join("hosts"))
            .expect_err("missing target should fail");
        assert!(matches!(err, EngineError::TargetNotFound(_)));
    }

    #[test]
    fn revert_without_backups_leaves_target_untouched() {
        let root = temp_dir("engine-no-backup");
        let target = root.join("hosts");
        fs::write(&target, "original").expect("seed write should work");

        let err = engine(10)
            .revert(&target)
            .expect_err("revert should fail without backups");
        assert!(matches!(err, EngineError::NoBackupAvailable(_)));
        assert_eq!(fs::read(&target).expect("target untouched"), b"original");
    }

    #[test]
    fn revert_in_missing_directory_reports_no_backup() {
        let root = temp_dir("engine-no-dir");
        let err = engine(10)
            .revert(&root.join("absent").join("hosts"))
            .expect_err("missing directory should fail");
        assert!(matches!(err, EngineError::NoBackupAvailable(_)));
    }

    #[test]
    fn retention_window_survives_repeated_applies() {
        let root = temp_dir("engine-retention");
        let target = root.join("hosts");
        fs::write(&target, "v0\n").expect("seed write should work");
        let eng = engine(2);

        eng.apply("v1\n", &target).expect("apply v1");
        thread::sleep(Duration::from_millis(1100));
        eng.apply("v2\n", &target).expect("apply v2");
        thread::sleep(Duration::from_millis(1100));
        eng.apply("v3\n", &target).expect("apply v3");

        // Three applies with retention 2: only the two newest prior states
        // survive as backups.
        assert_eq!(count_backups(&root), 2);
        let survivors: Vec<_> = fs::read_dir(&root)
            .expect("read_dir should work")
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("hosts.backup_")
            })
            .map(|entry| fs::read_to_string(entry.path()).expect("read survivor"))
            .collect();
        assert!(survivors.contains(&"v1\n".to_string()));
        assert!(survivors.contains(&"v2\n".to_string()));
        assert!(!survivors.contains(&"v0\n".to_string()));
    }

    #[test]
    fn revert_restores_most_recent_snapshot() {
        let root = temp_dir("engine-latest-wins");
        let target = root.join("hosts");
        fs::write(&target, "v0\n").expect("seed write should work");
        let eng = engine(10);

        eng.apply("v1\n", &target).expect("apply v1");
        thread::sleep(Duration::from_millis(1100));
        eng.apply("v2\n", &target).expect("apply v2");

        eng.revert(&target).expect("revert should work");
        // The newest backup holds the content v2 replaced, which was v1.
        assert_eq!(
            fs::read_to_string(&target).expect("read after revert"),
            "v1\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let root = temp_dir("engine-perm");
        let target = root.join("hosts");
        fs::write(&target, "seed").expect("seed write should work");
        fs::set_permissions(&root, fs::Permissions::from_mode(0o500))
            .expect("set read-only dir should work");

        // Privileged runners bypass directory modes; nothing to assert then.
        if fs::write(root.join("probe-check"), b"x").is_ok() {
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700))
                .expect("restore writable dir should work");
            return;
        }

        let err = engine(10).apply("content\n", &target);

        fs::set_permissions(&root, fs::Permissions::from_mode(0o700))
            .expect("restore writable dir should work");

        assert!(err.expect_err("probe should fail").is_permission());
    }
}
