//! Flattens commit history into change rows.

use chrono::{DateTime, Utc};
use commit_insights_developer_platforms::models::{ChangeKind, CommitRecord};
use tracing::{debug, error, instrument};

use crate::{errors::CommitInsightsError, ordered_set::OrderedSet, time::parse_epoch};

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;

/// One file touched by one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub file_name: String,
    pub kind: ChangeKind,

    /// Display name of the commit author
    pub committer: String,

    /// Never populated by the current history provider
    pub reviewer: Option<String>,

    pub commit_hash: String,
    pub title: String,

    /// Author time exactly as the provider supplied it
    pub raw_time: String,

    pub authored_at: DateTime<Utc>,
}

impl ChangeRow {
    pub fn status(&self) -> &str {
        self.kind.label()
    }

    pub fn status_class(&self) -> Option<&'static str> {
        self.kind.css_class()
    }
}

/// The result of flattening a commit history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// One row per commit and file change, in input order
    pub rows: Vec<ChangeRow>,

    /// Author names in first-seen order
    pub committer_names: OrderedSet,

    /// Author emails in first-seen order
    pub committer_emails: OrderedSet,

    /// Committer names in first-seen order
    pub participants: OrderedSet,
}

/// Flattens the commits into change rows and collects the people involved.
///
/// Commits are visited in input order and, within a commit, file changes in the
/// order the provider listed them.
///
/// # Errors
///
/// Returns `CommitInsightsError::MalformedTimestamp` when the author time of a
/// commit with file changes is not an integer number of seconds. No rows are
/// returned in that case.
///
/// # Examples
///
/// ```
/// use commit_insights_core::aggregate::aggregate;
/// use commit_insights_developer_platforms::models::{
///     Author, ChangeKind, CommitRecord, Committer, FileChange,
/// };
///
/// let commit = CommitRecord {
///     hash: "aaa111".to_string(),
///     parent_hashes: vec![],
///     ref_names: vec![],
///     author: Author { name: "Alice".to_string(), email: "alice@example.com".to_string(), username: "alice".to_string() },
///     committer: Committer { name: "Alice".to_string(), email: "alice@example.com".to_string() },
///     author_time: "1694299436".to_string(),
///     commit_time: "1694299436".to_string(),
///     title: "docs: add readme".to_string(),
///     body: String::new(),
///     changes: vec![FileChange { path: "README.md".to_string(), kind: ChangeKind::Added }],
/// };
///
/// let aggregation = aggregate(&[commit]).unwrap();
/// assert_eq!(aggregation.rows.len(), 1);
/// assert_eq!(aggregation.rows[0].status(), "Added");
/// assert_eq!(aggregation.committer_names.to_vec(), vec!["Alice"]);
/// ```
#[instrument(skip(commits), fields(commits = commits.len()))]
pub fn aggregate(commits: &[CommitRecord]) -> Result<Aggregation, CommitInsightsError> {
    let mut aggregation = Aggregation::default();

    for commit in commits {
        aggregation.committer_emails.insert(commit.author.email.as_str());
        aggregation.committer_names.insert(commit.author.name.as_str());
        aggregation.participants.insert(commit.committer.name.as_str());

        for change in &commit.changes {
            let authored_at = parse_epoch(&commit.author_time).ok_or_else(|| {
                error!(
                    commit = commit.hash.as_str(),
                    file = change.path.as_str(),
                    value = commit.author_time.as_str(),
                    "Commit has a malformed author time"
                );
                CommitInsightsError::MalformedTimestamp {
                    commit_hash: commit.hash.clone(),
                    file_name: change.path.clone(),
                    value: commit.author_time.clone(),
                }
            })?;

            aggregation.rows.push(ChangeRow {
                file_name: change.path.clone(),
                kind: change.kind.clone(),
                committer: commit.author.name.clone(),
                reviewer: None,
                commit_hash: commit.hash.clone(),
                title: commit.title.clone(),
                raw_time: commit.author_time.clone(),
                authored_at,
            });
        }
    }

    debug!(
        rows = aggregation.rows.len(),
        committers = aggregation.committer_names.len(),
        "Aggregated commit history"
    );

    Ok(aggregation)
}
