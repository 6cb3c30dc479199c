use std::fmt::Display;

use rentwatch_core::SearchId;

use crate::store::StoreError;

/// A source URL that contributed nothing to a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_url: String,
    pub error: String,
}

impl SourceFailure {
    pub fn new(source_url: &str, error: impl Display) -> Self {
        Self {
            source_url: source_url.to_string(),
            error: error.to_string(),
        }
    }
}

/// Errors that end a discovery run or an enrichment invocation.
///
/// Upstream, malformed-response and delivery failures on a single listing or
/// destination are handled where they occur and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("search {0} not found")]
    ConfigNotFound(SearchId),
    #[error("every source of search {search_id} failed ({} failure(s))", .failures.len())]
    AllSourcesFailed {
        search_id: SearchId,
        failures: Vec<SourceFailure>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
