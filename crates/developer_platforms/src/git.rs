//! Commit history read from a local git checkout.
//!
//! The history is read with a single `git log --name-status` invocation using a
//! delimiter separated pretty format, so that every commit and the files it
//! touched come back in one pass.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

use crate::{
    errors::Error,
    models::{Author, ChangeKind, CommitRange, CommitRecord, Committer, FileChange},
    CommitHistoryProvider,
};

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';

/// Pretty format: hash, parents, ref names, author name, author email, author
/// time, committer name, committer email, commit time, subject, body. The
/// trailing separator splits the body from the name-status lines.
const LOG_FORMAT: &str = "%x1e%H%x1f%P%x1f%D%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%ce%x1f%ct%x1f%s%x1f%b%x1f";

/// Number of pretty format fields plus the trailing file list.
const RECORD_PARTS: usize = 12;

/// Reads commit history by running the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn log_arguments(range: &CommitRange) -> Vec<String> {
        let mut args = vec![
            "-c".to_string(),
            "core.quotepath=false".to_string(),
            "log".to_string(),
            "--no-color".to_string(),
            "--name-status".to_string(),
            format!("--format={}", LOG_FORMAT),
        ];

        if range.is_single_commit() {
            args.push("-1".to_string());
            args.push(range.new.clone());
        } else {
            args.push(format!("{}..{}", range.old, range.new));
        }

        args.push("--".to_string());
        args
    }
}

#[async_trait]
impl CommitHistoryProvider for GitCli {
    #[instrument(skip(self), fields(repo_dir = %self.repo_dir.display()))]
    async fn list_commits(&self, range: &CommitRange) -> Result<Vec<CommitRecord>, Error> {
        let args = Self::log_arguments(range);
        debug!(?args, "Running git log");

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to start git");
                Error::CommitHistoryUnavailable(format!("git log execution failed: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                old = range.old.as_str(),
                new = range.new.as_str(),
                stderr = stderr.as_str(),
                "git log failed"
            );
            return Err(Error::CommitHistoryUnavailable(format!(
                "git log failed: {}",
                stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let commits = parse_log_output(&stdout)?;

        info!(
            old = range.old.as_str(),
            new = range.new.as_str(),
            commits = commits.len(),
            "Read commit history"
        );

        Ok(commits)
    }
}

/// Parses the output of `git log` produced with [`LOG_FORMAT`] and `--name-status`.
pub(crate) fn parse_log_output(output: &str) -> Result<Vec<CommitRecord>, Error> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitRecord, Error> {
    let parts: Vec<&str> = record.splitn(RECORD_PARTS, FIELD_SEPARATOR).collect();
    if parts.len() != RECORD_PARTS {
        return Err(Error::CommitHistoryUnavailable(format!(
            "unexpected git log record with {} fields",
            parts.len()
        )));
    }

    let author_email = parts[4].to_string();
    Ok(CommitRecord {
        hash: parts[0].trim().to_string(),
        parent_hashes: parts[1].split_whitespace().map(str::to_string).collect(),
        ref_names: parts[2]
            .split(", ")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        author: Author {
            name: parts[3].to_string(),
            username: username_from_email(&author_email),
            email: author_email,
        },
        committer: Committer {
            name: parts[6].to_string(),
            email: parts[7].to_string(),
        },
        author_time: parts[5].to_string(),
        commit_time: parts[8].to_string(),
        title: parts[9].to_string(),
        body: parts[10].trim_end().to_string(),
        changes: parse_name_status(parts[11]),
    })
}

/// Parses `--name-status` lines such as `M\tsrc/lib.rs` or `R100\told\tnew`.
/// Renames and copies report their destination path.
fn parse_name_status(block: &str) -> Vec<FileChange> {
    block
        .lines()
        .filter_map(|line| {
            let mut columns = line.split('\t');
            let code = columns.next()?.trim();
            let path = columns.last()?;
            if code.is_empty() || path.is_empty() {
                return None;
            }
            Some(FileChange {
                path: path.to_string(),
                kind: ChangeKind::from_status_code(code),
            })
        })
        .collect()
}

fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}
