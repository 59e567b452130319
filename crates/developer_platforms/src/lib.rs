use async_trait::async_trait;

pub mod bitbucket;

pub mod errors;

pub mod git;

pub mod harness;

pub mod models;
use errors::Error;
use models::{CommitRange, CommitRecord, ExecutionQuery, ExecutionSummary};

/// Trait for locating pipeline executions on a CI platform (e.g., Harness).
///
/// Implementations search the executions of a pipeline using the supplied
/// filters and return the most recent match.
///
/// # Example Implementation
///
/// ```rust,no_run
/// use commit_insights_developer_platforms::{ExecutionLocator, errors::Error, models::{ExecutionQuery, ExecutionSummary}};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct StaticLocator {
///     summary: Option<ExecutionSummary>,
/// }
///
/// #[async_trait]
/// impl ExecutionLocator for StaticLocator {
///     async fn find_latest_execution(
///         &self,
///         _query: &ExecutionQuery,
///     ) -> Result<ExecutionSummary, Error> {
///         self.summary.clone().ok_or(Error::ExecutionNotFound)
///     }
/// }
/// ```
#[async_trait]
pub trait ExecutionLocator: Sync + Send {
    /// Finds the most recent execution matching the query.
    ///
    /// # Arguments
    ///
    /// * `query` - The pipeline identifiers, status filter and CI properties to match
    ///
    /// # Returns
    ///
    /// A `Result` containing the execution summary, or one of
    /// `Error::ExecutionNotFound`, `Error::TransportError` or `Error::DecodeError`.
    async fn find_latest_execution(&self, query: &ExecutionQuery)
        -> Result<ExecutionSummary, Error>;
}

/// Trait for listing the commits between two revisions.
///
/// Implementations return commits grouped per commit, with the file changes of
/// each commit grouped within it. No ordering beyond that grouping is promised.
#[async_trait]
pub trait CommitHistoryProvider: Sync + Send {
    /// Lists the commits in the given range together with their file changes.
    ///
    /// # Arguments
    ///
    /// * `range` - The old and new revision bounding the history
    ///
    /// # Returns
    ///
    /// A `Result` containing the commits, or `Error::CommitHistoryUnavailable`
    /// when either revision cannot be resolved.
    async fn list_commits(&self, range: &CommitRange) -> Result<Vec<CommitRecord>, Error>;
}
