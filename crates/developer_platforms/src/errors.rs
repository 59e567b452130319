#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for developer platform operations.
///
/// This enum represents the failures that can occur when talking to the CI
/// platform, the version control system or when reading webhook payloads.
/// The execution lookup errors (`ExecutionNotFound`, `TransportError` and
/// `DecodeError`) are recoverable for callers: report generation falls back to
/// configured commit identifiers. `CommitHistoryUnavailable` is fatal.
///
/// # Examples
///
/// ```rust
/// use commit_insights_developer_platforms::errors::Error;
///
/// let not_found = Error::ExecutionNotFound;
/// assert_eq!(not_found.to_string(), "No matching pipeline execution found");
///
/// let transport = Error::TransportError("connection refused".to_string());
/// assert!(transport.is_execution_lookup_failure());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No pipeline execution matched the query filters.
    ///
    /// The CI platform answered successfully but the result page was empty,
    /// for instance because no execution with the requested status exists
    /// yet for the branch.
    #[error("No matching pipeline execution found")]
    ExecutionNotFound,

    /// The request to the CI platform could not be completed.
    ///
    /// Covers connection failures as well as non-success HTTP status codes.
    /// The string parameter contains the underlying reason.
    #[error("Failed to reach the CI platform: {0}")]
    TransportError(String),

    /// The CI platform answered with a body that could not be decoded.
    #[error("Failed to decode the CI platform response: {0}")]
    DecodeError(String),

    /// The commit history between two revisions could not be listed.
    ///
    /// This happens when the version control command cannot be started, when
    /// one of the revisions does not resolve, or when its output cannot be
    /// read.
    #[error("Commit history unavailable: {0}")]
    CommitHistoryUnavailable(String),

    /// A webhook payload did not contain the expected push information.
    #[error("Invalid webhook payload: {0}")]
    PayloadError(String),
}

impl Error {
    /// Returns `true` for the errors produced by an execution lookup.
    ///
    /// These are never fatal to report generation.
    pub fn is_execution_lookup_failure(&self) -> bool {
        matches!(
            self,
            Error::ExecutionNotFound | Error::TransportError(_) | Error::DecodeError(_)
        )
    }
}
