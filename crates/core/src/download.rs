use std::time::Duration;

use tracing::debug;

const USER_AGENT: &str = concat!("hostsmith/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Failure classes of the download collaborator. The engine consumes only
/// the success path's content; the caller layer branches on these.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid url {0:?}: must start with http:// or https://")]
    InvalidUrl(String),

    #[error("http error ({status}) fetching {url}")]
    Http { url: String, status: u16 },

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("unexpected download failure for {url}: {detail}")]
    Unexpected { url: String, detail: String },
}

/// Fetches a hosts blob as text, with carriage returns stripped so the
/// content arrives newline-normalized, ready for the mutation engine.
pub fn fetch_hosts_text(url: &str) -> Result<String, DownloadError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(DownloadError::InvalidUrl(url.to_string()));
    }

    let agent = ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build();

    match agent.get(url).call() {
        Ok(response) => {
            let text = response
                .into_string()
                .map_err(|err| DownloadError::Unexpected {
                    url: url.to_string(),
                    detail: err.to_string(),
                })?;
            let normalized = text.replace('\r', "");
            debug!(url, bytes = normalized.len(), "downloaded hosts content");
            Ok(normalized)
        }
        Err(ureq::Error::Status(status, _)) => Err(DownloadError::Http {
            url: url.to_string(),
            status,
        }),
        Err(err) => Err(DownloadError::Network {
            url: url.to_string(),
            source: Box::new(err),
        }),
    }
}
