//! Bitbucket push webhook payloads.
//!
//! Only the first entry of `push.changes` is considered, which is the branch
//! update that triggered the build.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{errors::Error, models::PushPayload};

#[cfg(test)]
#[path = "bitbucket_tests.rs"]
mod tests;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PushEvent {
    push: Push,
    repository: Repository,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Push {
    changes: Vec<PushChange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PushChange {
    old: Option<RefState>,
    new: Option<RefState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefState {
    name: Option<String>,
    target: Option<Target>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Target {
    hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Repository {
    name: Option<String>,
    is_private: Option<bool>,
}

fn target_hash(state: &Option<RefState>) -> Option<String> {
    state
        .as_ref()
        .and_then(|s| s.target.as_ref())
        .and_then(|t| t.hash.clone())
        .filter(|hash| !hash.is_empty())
}

/// Extracts the commit range, branch and repository from a push payload.
///
/// A push that creates a branch has no previous state; the range then starts
/// and ends at the new head.
///
/// # Errors
///
/// Returns `Error::PayloadError` when the payload is not valid JSON, has no
/// change entry, or the change has no new commit.
///
/// # Examples
///
/// ```
/// use commit_insights_developer_platforms::bitbucket::parse_push_payload;
///
/// let payload = br#"{
///     "push": { "changes": [{
///         "old": { "name": "main", "target": { "hash": "aaa111" } },
///         "new": { "name": "main", "target": { "hash": "bbb222" } }
///     }] },
///     "repository": { "name": "sonarqube-scanner", "is_private": true }
/// }"#;
///
/// let push = parse_push_payload(payload).unwrap();
/// assert_eq!(push.old_commit, "aaa111");
/// assert_eq!(push.new_commit, "bbb222");
/// assert_eq!(push.branch, "main");
/// ```
#[instrument(skip(payload), fields(bytes = payload.len()))]
pub fn parse_push_payload(payload: &[u8]) -> Result<PushPayload, Error> {
    let event: PushEvent = serde_json::from_slice(payload)
        .map_err(|e| Error::PayloadError(format!("failed to parse payload: {}", e)))?;

    let change = event
        .push
        .changes
        .first()
        .ok_or_else(|| Error::PayloadError("payload contains no push changes".to_string()))?;

    let new_commit = target_hash(&change.new)
        .ok_or_else(|| Error::PayloadError("push change has no new commit".to_string()))?;
    let old_commit = target_hash(&change.old).unwrap_or_else(|| new_commit.clone());

    let branch = change
        .new
        .as_ref()
        .and_then(|s| s.name.clone())
        .unwrap_or_default();

    let push = PushPayload {
        old_commit,
        new_commit,
        branch,
        repo_name: event.repository.name.unwrap_or_default(),
        is_private: event.repository.is_private.unwrap_or_default(),
    };

    debug!(
        old_commit = push.old_commit.as_str(),
        new_commit = push.new_commit.as_str(),
        branch = push.branch.as_str(),
        repository = push.repo_name.as_str(),
        is_private = push.is_private,
        "Parsed push payload"
    );

    Ok(push)
}
