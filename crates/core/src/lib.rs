//! # Commit Insights Core
//!
//! Turns the commit history between two revisions into a report of the files
//! that changed and the people who changed them.
//!
//! A report run:
//! - resolves the commit range, from the last matching pipeline execution or
//!   from a push webhook payload
//! - lists the commits in that range
//! - flattens them into one row per changed file ([`aggregate`])
//! - sorts the rows and attaches run metadata ([`report`])
//! - renders an HTML document with inlined styles ([`render`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use commit_insights_core::{CommitInsights, IngestionSource, ReportRequest};
//! use commit_insights_core::time::RunClock;
//! use commit_insights_developer_platforms::ExecutionLocator;
//! use commit_insights_developer_platforms::errors::Error;
//! use commit_insights_developer_platforms::git::GitCli;
//! use commit_insights_developer_platforms::models::{ExecutionQuery, ExecutionSummary};
//!
//! #[derive(Debug)]
//! struct NoExecutions;
//!
//! #[async_trait]
//! impl ExecutionLocator for NoExecutions {
//!     async fn find_latest_execution(
//!         &self,
//!         _query: &ExecutionQuery,
//!     ) -> Result<ExecutionSummary, Error> {
//!         Err(Error::ExecutionNotFound)
//!     }
//! }
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let insights = CommitInsights::new(NoExecutions, GitCli::new("."));
//!
//!     let request = ReportRequest {
//!         source: IngestionSource::Pipeline(ExecutionQuery::default()),
//!         fallback_commit: "abc123".to_string(),
//!         ..Default::default()
//!     };
//!
//!     // Lists only commit abc123, as no execution is ever found
//!     let report = insights.generate(&request, &RunClock::system()).await?;
//!     println!("{} changes", report.model.entries.len());
//!     Ok(())
//! }
//!
//! fn main() {}
//! ```

use commit_insights_developer_platforms::bitbucket::parse_push_payload;
use commit_insights_developer_platforms::models::{
    CommitRange, ExecutionQuery, ExecutionSummary, PushPayload,
};
use commit_insights_developer_platforms::{CommitHistoryProvider, ExecutionLocator};
use tracing::{debug, error, info, instrument, warn};

pub mod aggregate;
use aggregate::aggregate;

pub mod errors;
use errors::CommitInsightsError;

pub mod export;

pub mod ordered_set;

pub mod render;
use render::render_report;

pub mod report;
use report::{ReportInputs, ReportModel};

pub mod time;
use time::RunClock;

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Where the commit range of a report comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionSource {
    /// The commits of the latest pipeline execution matching the query
    Pipeline(ExecutionQuery),

    /// The old and new head of a push webhook
    Payload(PushPayload),
}

impl IngestionSource {
    /// Reads the commit range from a raw push webhook payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIngestion` when the payload cannot be decoded or names
    /// no new commit.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CommitInsightsError> {
        let push = parse_push_payload(payload)?;
        Ok(IngestionSource::Payload(push))
    }
}

impl Default for IngestionSource {
    fn default() -> Self {
        IngestionSource::Pipeline(ExecutionQuery::default())
    }
}

/// Everything a report run needs besides its collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequest {
    pub source: IngestionSource,

    /// Commit used for both range bounds when no execution can be found
    pub fallback_commit: String,

    pub repo_name: String,
    pub branch: String,
    pub trigger_type: String,
    pub pipeline_url: String,

    /// Build creation time in epoch seconds
    pub build_created: Option<i64>,
}

/// The commit range of a run and the execution it came from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub range: CommitRange,
    pub execution: Option<ExecutionSummary>,
}

/// The outcome of a report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub range: CommitRange,
    pub model: ReportModel,

    /// The rendered document with inlined styles
    pub html: String,
}

/// Generates commit insight reports.
///
/// Holds the collaborators used to find the commit range and to read the
/// commit history. Each call to [`CommitInsights::generate`] runs its stages
/// one after another.
#[derive(Debug)]
pub struct CommitInsights<L: ExecutionLocator, H: CommitHistoryProvider> {
    locator: L,
    history: H,
}

impl<L: ExecutionLocator, H: CommitHistoryProvider> CommitInsights<L, H> {
    pub fn new(locator: L, history: H) -> Self {
        Self { locator, history }
    }

    /// Determines the commit range for a run.
    ///
    /// For a pipeline source the range covers everything committed after the
    /// newest commit of the latest matching execution, up to the checked out
    /// commit. Execution commits are listed newest first, so that is the
    /// execution's first commit. An execution without commits, a missing
    /// execution or a failed lookup all give a range of just
    /// `fallback_commit`; the failure is logged and never returned.
    ///
    /// For a payload source the range is taken from the payload.
    #[instrument(skip(self, source))]
    pub async fn resolve_range(
        &self,
        source: &IngestionSource,
        fallback_commit: &str,
    ) -> ResolvedRange {
        let query = match source {
            IngestionSource::Payload(push) => {
                info!(
                    old_commit = push.old_commit.as_str(),
                    new_commit = push.new_commit.as_str(),
                    branch = push.branch.as_str(),
                    "Using commit range from push payload"
                );
                return ResolvedRange {
                    range: CommitRange::new(push.old_commit.clone(), push.new_commit.clone()),
                    execution: None,
                };
            }
            IngestionSource::Pipeline(query) => query,
        };

        info!(
            pipeline = query.pipeline_id.as_str(),
            branch = query.branch.as_str(),
            statuses = ?query.status_list,
            "Searching for the latest pipeline execution"
        );

        match self.locator.find_latest_execution(query).await {
            Ok(execution) => {
                let range = match execution.first_commit() {
                    Some(newest) => CommitRange::to_head(newest),
                    None => {
                        warn!(
                            execution = execution.plan_execution_id.as_str(),
                            fallback_commit = fallback_commit,
                            "Pipeline execution lists no commits, using the fallback commit"
                        );
                        CommitRange::single(fallback_commit)
                    }
                };
                info!(
                    execution = execution.plan_execution_id.as_str(),
                    name = execution.name.as_str(),
                    status = execution.status.as_str(),
                    duration = execution.duration.as_str(),
                    stages = execution.stage_count,
                    first_commit = execution.first_commit().unwrap_or_default(),
                    last_commit = execution.last_commit().unwrap_or_default(),
                    old = range.old.as_str(),
                    new = range.new.as_str(),
                    "Resolved commit range from pipeline execution"
                );
                ResolvedRange {
                    range,
                    execution: Some(execution),
                }
            }
            Err(e) if !e.is_execution_lookup_failure() => {
                error!(
                    error = %e,
                    fallback_commit = fallback_commit,
                    "Unexpected error from the execution locator, using the fallback commit"
                );
                ResolvedRange {
                    range: CommitRange::single(fallback_commit),
                    execution: None,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback_commit = fallback_commit,
                    "Pipeline execution lookup failed, using the fallback commit"
                );
                ResolvedRange {
                    range: CommitRange::single(fallback_commit),
                    execution: None,
                }
            }
        }
    }

    /// Runs a full report: range resolution, history listing, aggregation,
    /// model building and rendering.
    ///
    /// # Errors
    ///
    /// - `CommitHistoryUnavailable` when the history cannot be listed
    /// - `MalformedTimestamp` when a commit carries a non-numeric author time
    /// - `RenderFailed` when the document cannot be rendered
    #[instrument(skip(self, request, clock), fields(repository = request.repo_name.as_str()))]
    pub async fn generate(
        &self,
        request: &ReportRequest,
        clock: &RunClock,
    ) -> Result<GeneratedReport, CommitInsightsError> {
        let resolved = self
            .resolve_range(&request.source, &request.fallback_commit)
            .await;

        let commits = self
            .history
            .list_commits(&resolved.range)
            .await
            .map_err(|e| {
                error!(
                    old = resolved.range.old.as_str(),
                    new = resolved.range.new.as_str(),
                    error = %e,
                    "Failed to list commit history"
                );
                CommitInsightsError::from(e)
            })?;
        debug!(commits = commits.len(), "Listed commit history");

        let aggregation = aggregate(&commits)?;

        let branch = match &request.source {
            IngestionSource::Payload(push) if !push.branch.is_empty() => push.branch.clone(),
            _ => request.branch.clone(),
        };
        let repo_name = match &request.source {
            IngestionSource::Payload(push) if request.repo_name.is_empty() => {
                push.repo_name.clone()
            }
            _ => request.repo_name.clone(),
        };
        let (pipeline_name, pipeline_status) = resolved
            .execution
            .as_ref()
            .map(|e| (e.name.clone(), e.status.clone()))
            .unwrap_or_default();

        let inputs = ReportInputs {
            repo_name,
            branch,
            trigger_type: request.trigger_type.clone(),
            pipeline_name,
            pipeline_status,
            pipeline_url: request.pipeline_url.clone(),
            build_created: request.build_created,
        };

        let model = ReportModel::build(inputs, aggregation, clock);
        let html = render_report(&model)?;

        info!(
            changes = model.entries.len(),
            committers = model.committers_display().as_str(),
            "Generated commit insights report"
        );

        Ok(GeneratedReport {
            range: resolved.range,
            model,
            html,
        })
    }
}
