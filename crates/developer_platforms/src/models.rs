//! # Models
//!
//! This module contains the data models exchanged with the developer platforms
//! used by Commit Insights.
//!
//! These models represent commits and their file changes as read from version
//! control, pipeline executions as reported by the CI platform, and push
//! information taken from webhook payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// The kind of change a commit made to a file.
///
/// Version control reports changes with a short status code. The three codes
/// that the report highlights are mapped onto their own variants; every other
/// code (renames, copies, type changes, ...) is kept verbatim.
///
/// # Examples
///
/// ```
/// use commit_insights_developer_platforms::models::ChangeKind;
///
/// assert_eq!(ChangeKind::from_status_code("A"), ChangeKind::Added);
/// assert_eq!(ChangeKind::from_status_code("R100").label(), "R100");
/// assert_eq!(ChangeKind::Deleted.css_class(), Some("red"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The file was added
    Added,
    /// The file was modified
    Modified,
    /// The file was deleted
    Deleted,
    /// Any other status, carrying the raw status text
    Other(String),
}

impl ChangeKind {
    /// Builds a change kind from a version control status code.
    pub fn from_status_code(code: &str) -> Self {
        match code {
            "A" => ChangeKind::Added,
            "M" => ChangeKind::Modified,
            "D" => ChangeKind::Deleted,
            other => ChangeKind::Other(other.to_string()),
        }
    }

    /// The human readable status label shown in the report.
    ///
    /// Unknown kinds pass their raw status text through unchanged.
    pub fn label(&self) -> &str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Other(raw) => raw,
        }
    }

    /// The classification tag used to highlight the row, if any.
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            ChangeKind::Added => Some("green"),
            ChangeKind::Modified => Some("orange"),
            ChangeKind::Deleted => Some("red"),
            ChangeKind::Other(_) => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path of the file, relative to the repository root
    pub path: String,

    /// What the commit did to the file
    pub kind: ChangeKind,
}

/// The author of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub username: String,
}

/// The committer of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// A commit as read from the commit history provider.
///
/// Timestamps are kept exactly as the provider supplied them (epoch seconds as
/// text). Parsing them is the responsibility of the consumer so that a
/// malformed value can be reported against the commit that carried it.
///
/// # Examples
///
/// ```
/// use commit_insights_developer_platforms::models::{
///     Author, ChangeKind, CommitRecord, Committer, FileChange,
/// };
///
/// let commit = CommitRecord {
///     hash: "e7c79ef9".to_string(),
///     parent_hashes: vec![],
///     ref_names: vec!["main".to_string()],
///     author: Author {
///         name: "Alice".to_string(),
///         email: "alice@example.com".to_string(),
///         username: "alice".to_string(),
///     },
///     committer: Committer {
///         name: "Alice".to_string(),
///         email: "alice@example.com".to_string(),
///     },
///     author_time: "1694299436".to_string(),
///     commit_time: "1694299436".to_string(),
///     title: "docs: add readme".to_string(),
///     body: String::new(),
///     changes: vec![FileChange {
///         path: "README.md".to_string(),
///         kind: ChangeKind::Added,
///     }],
/// };
///
/// assert_eq!(commit.changes.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub parent_hashes: Vec<String>,
    pub ref_names: Vec<String>,
    pub author: Author,
    pub committer: Committer,

    /// Author time in epoch seconds, as supplied by the provider
    pub author_time: String,

    /// Commit time in epoch seconds, as supplied by the provider
    pub commit_time: String,

    /// First line of the commit message
    pub title: String,

    /// Remainder of the commit message
    pub body: String,

    /// Files touched by the commit, in provider order
    pub changes: Vec<FileChange>,
}

/// Revision name of the checked out commit.
pub const HEAD_REVISION: &str = "HEAD";

/// The two revisions that bound a commit history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRange {
    pub old: String,
    pub new: String,
}

impl CommitRange {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// A range where both bounds are the same revision.
    pub fn single(commit: impl Into<String>) -> Self {
        let commit = commit.into();
        Self {
            old: commit.clone(),
            new: commit,
        }
    }

    /// Everything committed after `old` up to the checked out commit.
    pub fn to_head(old: impl Into<String>) -> Self {
        Self::new(old, HEAD_REVISION)
    }

    pub fn is_single_commit(&self) -> bool {
        self.old == self.new
    }
}

/// Parameters that identify the pipeline executions to search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionQuery {
    pub account_id: String,
    pub org_id: String,
    pub project_id: String,
    pub pipeline_id: String,
    pub stage_id: String,

    /// Execution statuses to accept, e.g. `["Success", "Aborted"]`
    pub status_list: Vec<String>,

    pub repo_name: String,
    pub branch: String,

    /// Build type as reported by the CI system (`push`, `pull_request`, ...)
    pub build_type: String,
}

/// A step within a pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: String,
}

/// A stage of a pipeline execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub module: String,
    pub status: String,
    pub steps: Vec<Step>,
}

/// Summary of the most recent pipeline execution matching a query.
///
/// # Examples
///
/// ```
/// use commit_insights_developer_platforms::models::ExecutionSummary;
///
/// let summary = ExecutionSummary {
///     commit_ids: vec!["newest".to_string(), "oldest".to_string()],
///     ..Default::default()
/// };
///
/// assert_eq!(summary.first_commit(), Some("newest"));
/// assert_eq!(summary.last_commit(), Some("oldest"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub plan_execution_id: String,
    pub name: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Human readable duration, e.g. `"3 minutes"`
    pub duration: String,

    /// Total number of stages in the execution
    pub stage_count: u32,

    /// Number of stages that finished, successfully or not
    pub completed_stage_count: u32,

    pub stages: Vec<Stage>,

    /// Commits built by the execution, in platform order
    pub commit_ids: Vec<String>,
}

impl ExecutionSummary {
    pub fn first_commit(&self) -> Option<&str> {
        self.commit_ids.first().map(String::as_str)
    }

    pub fn last_commit(&self) -> Option<&str> {
        self.commit_ids.last().map(String::as_str)
    }
}

/// Push information extracted from a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub old_commit: String,
    pub new_commit: String,
    pub branch: String,
    pub repo_name: String,
    pub is_private: bool,
}
