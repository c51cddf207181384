use qcprice_core::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("fast path returned no usable data for {url}")]
    NoUsableData { url: String },

    #[error("browser error: {reason}")]
    Browser { reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {secs}s loading {url}")]
    Timeout { url: String, secs: u64 },

    #[error("could not fetch {url} after {attempts} attempt(s): {reason}")]
    FetchFailure {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// Errors that leave the shared browser in an unknown state. The session
    /// is torn down when one of these surfaces so the next call relaunches it.
    ///
    /// A hard timeout counts: the render it abandoned keeps running on its
    /// blocking thread with its own tab and browser handle, and must not
    /// share Chrome with the retry.
    #[must_use]
    pub fn poisons_session(&self) -> bool {
        matches!(
            self,
            ScraperError::Browser { .. } | ScraperError::Timeout { .. }
        )
    }
}

/// Rejections surfaced to callers of the single-item tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("unsupported platform for URL {url}")]
    UnsupportedPlatform { url: String },

    #[error("product {url} is already tracked")]
    RepositoryConflict { url: String },

    #[error("failed to scrape product data from {url}")]
    ScrapeFailed { url: String },

    #[error("product {id} is not tracked")]
    ProductNotFound { id: i64 },

    #[error("a product name or search query is required")]
    EmptyQuery,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TrackerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { source_url } => {
                TrackerError::RepositoryConflict { url: source_url }
            }
            RepositoryError::NotFound { id } => TrackerError::ProductNotFound { id },
            other @ RepositoryError::Backend(_) => TrackerError::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_conflict_maps_to_tracker_conflict() {
        let err: TrackerError = RepositoryError::Conflict {
            source_url: "https://blinkit.com/prn/x/prid/1".to_owned(),
        }
        .into();
        assert!(
            matches!(err, TrackerError::RepositoryConflict { ref url } if url.ends_with("/prid/1")),
            "got: {err:?}"
        );
    }

    #[test]
    fn repository_not_found_maps_to_product_not_found() {
        let err: TrackerError = RepositoryError::NotFound { id: 9 }.into();
        assert!(matches!(err, TrackerError::ProductNotFound { id: 9 }));
    }

    #[test]
    fn browser_and_hard_timeout_errors_poison_the_session() {
        assert!(ScraperError::Browser {
            reason: "crashed".to_owned()
        }
        .poisons_session());
        assert!(ScraperError::Timeout {
            url: "https://blinkit.com".to_owned(),
            secs: 40
        }
        .poisons_session());
        assert!(!ScraperError::Navigation {
            url: "https://blinkit.com".to_owned(),
            reason: "timeout".to_owned()
        }
        .poisons_session());
    }
}
