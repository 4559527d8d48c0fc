use std::time::Duration;

pub const DEFAULT_BACKUP_MARKER: &str = ".backup_";

/// Tuning knobs for the mutation engine. Passed explicitly into
/// [`crate::engine::MutationEngine::new`] rather than living in process-wide
/// state, so parallel tests can run with independent settings.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub max_backups: usize,
    pub backup_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 6,
            retry_base_delay: Duration::from_millis(250),
            max_backups: 10,
            backup_marker: DEFAULT_BACKUP_MARKER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_backup_marker(mut self, marker: impl Into<String>) -> Self {
        self.backup_marker = marker.into();
        self
    }
}
