use serde::{Deserialize, Serialize};

use crate::{
    download::DownloadError,
    engine::{ApplyReport, RevertReport},
    error::EngineError,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeTag {
    Success,
    Error,
}

/// The caller-facing operation contract: a human-readable message plus a tag
/// the UI/CLI layer branches on. Every failure path converts into this pair;
/// nothing panics across the boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub message: String,
    pub tag: OutcomeTag,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tag: OutcomeTag::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tag: OutcomeTag::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.tag == OutcomeTag::Success
    }
}

pub fn apply_outcome(result: &Result<ApplyReport, EngineError>) -> Outcome {
    match result {
        Ok(report) => Outcome::success(format!(
            "Installed new content at {}\nBackup created: {}",
            report.target.display(),
            report.backup.display()
        )),
        Err(err) => Outcome::error(render_engine_error(err)),
    }
}

pub fn revert_outcome(result: &Result<RevertReport, EngineError>) -> Outcome {
    match result {
        Ok(report) => {
            let backup_name = report
                .backup
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| report.backup.display().to_string());
            Outcome::success(format!(
                "Restored {} from {backup_name}.",
                report.target.display()
            ))
        }
        Err(err) => Outcome::error(render_engine_error(err)),
    }
}

pub fn download_outcome(url: &str, result: &Result<String, DownloadError>) -> Outcome {
    match result {
        Ok(text) => {
            let lines = text.split('\n').count();
            Outcome::success(format!("Downloaded {lines} lines from {url} and staged them."))
        }
        Err(err) => Outcome::error(format!("Download failed: {err}")),
    }
}

fn render_engine_error(err: &EngineError) -> String {
    match err {
        EngineError::InputMissing => {
            "No downloaded content staged. Download a hosts list first.".to_string()
        }
        EngineError::PermissionDenied { path, .. } => format!(
            "Permission denied while writing {}.\n\
             The file may be briefly locked by another process (antivirus, indexer, sync agent), \
             or this program is not elevated.\n\
             Run as Administrator/root, or allow-list this program in your security software, \
             then try again.",
            path.display()
        ),
        EngineError::NoBackupAvailable(path) => format!(
            "No backup found beside {} (nothing was ever applied, or the backups were removed).",
            path.display()
        ),
        other => format!("Error: {other}"),
    }
}
