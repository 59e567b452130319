use commit_insights_developer_platforms::errors::Error as PlatformError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

#[derive(Error, Debug)]
pub enum CommitInsightsError {
    #[error("Commit history unavailable: {0}")]
    CommitHistoryUnavailable(String),

    #[error("Invalid ingestion source: {0}")]
    InvalidIngestion(String),

    #[error("Malformed timestamp '{value}' on file '{file_name}' in commit {commit_hash}")]
    MalformedTimestamp {
        commit_hash: String,
        file_name: String,
        value: String,
    },

    #[error("Failed to write '{path}': {message}")]
    PersistenceFailed { path: String, message: String },

    #[error("Failed to render the report: {0}")]
    RenderFailed(String),
}

impl From<PlatformError> for CommitInsightsError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::CommitHistoryUnavailable(reason) => {
                CommitInsightsError::CommitHistoryUnavailable(reason)
            }
            PlatformError::PayloadError(reason) => CommitInsightsError::InvalidIngestion(reason),
            other => CommitInsightsError::CommitHistoryUnavailable(other.to_string()),
        }
    }
}
