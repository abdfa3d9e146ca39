//! Tagged result of a fetch.

use crate::error::FetchError;
use crate::models::Setting;

/// Result of one `fetch`: items, a valid "nothing found", or a failure
/// tagged by whether a later attempt may succeed.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Items(Vec<Setting>),
    /// 404 or 416.
    Empty,
    /// Transient failure after the retry budget ran out.
    Retryable(FetchError),
    /// Protocol violation, configuration error, or unexpected status.
    Fatal(FetchError),
}

impl FetchOutcome {
    /// Collapse to a `Result`, treating `Empty` as no items.
    pub fn into_result(self) -> Result<Vec<Setting>, FetchError> {
        match self {
            FetchOutcome::Items(items) => Ok(items),
            FetchOutcome::Empty => Ok(Vec::new()),
            FetchOutcome::Retryable(err) | FetchOutcome::Fatal(err) => Err(err),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Retryable(_) | FetchOutcome::Fatal(_))
    }

    /// Etag of the first item, `""` when there is none.
    ///
    /// Only meaningful for successful outcomes; failures also yield `None`.
    pub fn first_etag(&self) -> Option<String> {
        match self {
            FetchOutcome::Items(items) => Some(
                items
                    .first()
                    .and_then(|s| s.etag.clone())
                    .unwrap_or_default(),
            ),
            FetchOutcome::Empty => Some(String::new()),
            _ => None,
        }
    }
}
