use crate::{
    errors::CommitInsightsError, time::RunClock, CommitInsights, IngestionSource, ReportRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use std::process::Command as StdCommand;
use std::sync::{Arc, Mutex};
use tokio::test;

use crate::test_support::{commit, two_commit_history};
use commit_insights_developer_platforms::errors::Error;
use commit_insights_developer_platforms::git::GitCli;
use commit_insights_developer_platforms::models::{
    CommitRange, CommitRecord, ExecutionQuery, ExecutionSummary, PushPayload, HEAD_REVISION,
};
use commit_insights_developer_platforms::{CommitHistoryProvider, ExecutionLocator};

#[derive(Debug, Clone, Copy)]
enum LookupOutcome {
    Found,
    FoundWithoutCommits,
    NotFound,
    TransportFailure,
    DecodeFailure,
}

#[derive(Debug)]
struct MockLocator {
    outcome: LookupOutcome,
    queries: Arc<Mutex<Vec<ExecutionQuery>>>,
}

impl MockLocator {
    fn new(outcome: LookupOutcome) -> Self {
        Self {
            outcome,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ExecutionLocator for MockLocator {
    async fn find_latest_execution(
        &self,
        query: &ExecutionQuery,
    ) -> Result<ExecutionSummary, Error> {
        self.queries.lock().unwrap().push(query.clone());
        match self.outcome {
            LookupOutcome::Found => Ok(ExecutionSummary {
                plan_execution_id: "plan-42".to_string(),
                name: "Build Pipeline".to_string(),
                status: "Success".to_string(),
                commit_ids: vec!["bbb222".to_string(), "aaa111".to_string()],
                ..Default::default()
            }),
            LookupOutcome::FoundWithoutCommits => Ok(ExecutionSummary {
                name: "Build Pipeline".to_string(),
                status: "Success".to_string(),
                ..Default::default()
            }),
            LookupOutcome::NotFound => Err(Error::ExecutionNotFound),
            LookupOutcome::TransportFailure => {
                Err(Error::TransportError("connection refused".to_string()))
            }
            LookupOutcome::DecodeFailure => Err(Error::DecodeError("bad json".to_string())),
        }
    }
}

#[derive(Debug)]
struct MockHistory {
    commits: Vec<CommitRecord>,
    fail: bool,
    ranges: Arc<Mutex<Vec<CommitRange>>>,
}

impl MockHistory {
    fn new(commits: Vec<CommitRecord>) -> Self {
        Self {
            commits,
            fail: false,
            ranges: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

#[async_trait]
impl CommitHistoryProvider for MockHistory {
    async fn list_commits(&self, range: &CommitRange) -> Result<Vec<CommitRecord>, Error> {
        self.ranges.lock().unwrap().push(range.clone());
        if self.fail {
            Err(Error::CommitHistoryUnavailable(
                "unknown revision".to_string(),
            ))
        } else {
            Ok(self.commits.clone())
        }
    }
}

fn clock() -> RunClock {
    RunClock::fixed(
        DateTime::from_timestamp(1695366000, 0).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

fn pipeline_request() -> ReportRequest {
    ReportRequest {
        source: IngestionSource::Pipeline(ExecutionQuery {
            pipeline_id: "build_pipeline".to_string(),
            branch: "main".to_string(),
            status_list: vec!["Success".to_string()],
            ..Default::default()
        }),
        fallback_commit: "abc123".to_string(),
        repo_name: "sonarqube-scanner".to_string(),
        branch: "main".to_string(),
        trigger_type: "push".to_string(),
        pipeline_url: "https://app.harness.io/executions/plan-42".to_string(),
        build_created: Some(1694299436),
    }
}

#[test]
async fn test_generate_end_to_end_from_pipeline_execution() {
    let history = MockHistory::new(two_commit_history());
    let ranges = history.ranges.clone();
    let locator = MockLocator::new(LookupOutcome::Found);
    let queries = locator.queries.clone();
    let insights = CommitInsights::new(locator, history);

    let report = insights
        .generate(&pipeline_request(), &clock())
        .await
        .expect("report should be generated");

    assert_eq!(
        *ranges.lock().unwrap(),
        vec![CommitRange::new("bbb222", HEAD_REVISION)]
    );
    assert_eq!(queries.lock().unwrap()[0].pipeline_id, "build_pipeline");
    assert_eq!(report.range, CommitRange::to_head("bbb222"));

    let rows: Vec<(&str, &str, Option<&str>, &str)> = report
        .model
        .entries
        .iter()
        .map(|e| {
            (
                e.change.file_name.as_str(),
                e.change.status(),
                e.change.status_class(),
                e.change.committer.as_str(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("main.go", "Modified", Some("orange"), "Bob"),
            ("util.go", "Deleted", Some("red"), "Bob"),
            ("README.md", "Added", Some("green"), "Alice"),
        ]
    );
    assert_eq!(report.model.committers, vec!["Alice", "Bob"]);
    assert_eq!(report.model.pipeline_name, "Build Pipeline");
    assert_eq!(report.model.pipeline_status, "Success");
    assert_eq!(report.model.build_created, "09/09/2023 10:43:56 PM +0000");
    assert!(report.html.contains("util.go"));
    assert!(!report.html.contains("<style"));
}

#[test]
async fn test_generate_falls_back_to_configured_commit_when_not_found() {
    let history = MockHistory::new(vec![commit(
        "abc123",
        "Alice",
        "1694299436",
        &[("M", "main.go")],
    )]);
    let ranges = history.ranges.clone();
    let insights = CommitInsights::new(MockLocator::new(LookupOutcome::NotFound), history);

    let report = insights
        .generate(&pipeline_request(), &clock())
        .await
        .expect("lookup failure is not fatal");

    let requested = ranges.lock().unwrap();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].old, "abc123");
    assert_eq!(requested[0].new, "abc123");
    assert_eq!(report.model.pipeline_name, "");
    assert_eq!(report.model.pipeline_status, "");
    assert_eq!(report.model.entries.len(), 1);
}

#[test]
async fn test_resolve_range_falls_back_on_any_lookup_failure() {
    for outcome in [
        LookupOutcome::NotFound,
        LookupOutcome::TransportFailure,
        LookupOutcome::DecodeFailure,
    ] {
        let insights = CommitInsights::new(MockLocator::new(outcome), MockHistory::new(vec![]));

        let resolved = insights
            .resolve_range(&pipeline_request().source, "abc123")
            .await;

        assert_eq!(resolved.range, CommitRange::single("abc123"), "{:?}", outcome);
        assert_eq!(resolved.execution, None);
    }
}

#[test]
async fn test_resolve_range_uses_fallback_when_execution_lists_no_commits() {
    let insights = CommitInsights::new(
        MockLocator::new(LookupOutcome::FoundWithoutCommits),
        MockHistory::new(vec![]),
    );

    let resolved = insights
        .resolve_range(&pipeline_request().source, "abc123")
        .await;

    assert_eq!(resolved.range, CommitRange::single("abc123"));
    assert_eq!(
        resolved.execution.map(|e| e.name),
        Some("Build Pipeline".to_string())
    );
}

#[test]
async fn test_generate_from_payload_uses_payload_range_and_branch() {
    let history = MockHistory::new(two_commit_history());
    let ranges = history.ranges.clone();
    let locator = MockLocator::new(LookupOutcome::Found);
    let queries = locator.queries.clone();
    let insights = CommitInsights::new(locator, history);

    let request = ReportRequest {
        source: IngestionSource::Payload(PushPayload {
            old_commit: "old000".to_string(),
            new_commit: "new999".to_string(),
            branch: "feature/report".to_string(),
            repo_name: "payload-repo".to_string(),
            is_private: true,
        }),
        repo_name: String::new(),
        ..pipeline_request()
    };

    let report = insights
        .generate(&request, &clock())
        .await
        .expect("report should be generated");

    assert!(queries.lock().unwrap().is_empty());
    assert_eq!(
        *ranges.lock().unwrap(),
        vec![CommitRange::new("old000", "new999")]
    );
    assert_eq!(report.model.branch, "feature/report");
    assert_eq!(report.model.repo_name, "payload-repo");
    assert_eq!(report.model.pipeline_name, "");
}

#[test]
async fn test_generate_fails_when_history_is_unavailable() {
    let insights = CommitInsights::new(
        MockLocator::new(LookupOutcome::Found),
        MockHistory::failing(),
    );

    let result = insights.generate(&pipeline_request(), &clock()).await;

    match result {
        Err(CommitInsightsError::CommitHistoryUnavailable(reason)) => {
            assert!(reason.contains("unknown revision"))
        }
        other => panic!("expected history failure, got {:?}", other),
    }
}

#[test]
async fn test_generate_fails_on_malformed_timestamp() {
    let history = MockHistory::new(vec![commit(
        "bad",
        "Bob",
        "not-a-number",
        &[("M", "main.go")],
    )]);
    let insights = CommitInsights::new(MockLocator::new(LookupOutcome::Found), history);

    let result = insights.generate(&pipeline_request(), &clock()).await;

    assert!(matches!(
        result,
        Err(CommitInsightsError::MalformedTimestamp { .. })
    ));
}

#[test]
async fn test_generate_with_empty_history_renders_empty_report() {
    let insights = CommitInsights::new(
        MockLocator::new(LookupOutcome::Found),
        MockHistory::new(vec![]),
    );

    let report = insights
        .generate(&pipeline_request(), &clock())
        .await
        .expect("empty history is valid");

    assert!(report.model.entries.is_empty());
    assert_eq!(report.model.committers_display(), "");
    assert!(report.html.contains("Committer/Reviewer"));
}

#[derive(Debug)]
struct FixedLocator {
    commit_ids: Vec<String>,
}

#[async_trait]
impl ExecutionLocator for FixedLocator {
    async fn find_latest_execution(
        &self,
        _query: &ExecutionQuery,
    ) -> Result<ExecutionSummary, Error> {
        Ok(ExecutionSummary {
            name: "Build Pipeline".to_string(),
            status: "Success".to_string(),
            commit_ids: self.commit_ids.clone(),
            ..Default::default()
        })
    }
}

fn git_available() -> bool {
    StdCommand::new("git").arg("--version").output().is_ok()
}

fn run_git(root: &Path, args: &[&str], epoch: &str) -> String {
    let date = format!("@{} +0000", epoch);
    let output = StdCommand::new("git")
        .arg("-C")
        .arg(root)
        .args([
            "-c",
            "user.name=Alice",
            "-c",
            "user.email=alice@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit_file(root: &Path, file: &str, epoch: &str) -> String {
    std::fs::write(root.join(file), file).expect("write file");
    run_git(root, &["add", "-A"], epoch);
    run_git(root, &["commit", "-q", "-m", file], epoch);
    run_git(root, &["rev-parse", "HEAD"], epoch)
}

#[test]
async fn test_generate_lists_commits_after_last_execution_from_git() {
    if !git_available() {
        return;
    }

    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    run_git(root, &["init", "-q"], "1694299000");
    let first = commit_file(root, "README.md", "1694299100");
    let second = commit_file(root, "main.go", "1694299200");
    commit_file(root, "util.go", "1694299300");
    commit_file(root, "Makefile", "1694299400");

    let locator = FixedLocator {
        commit_ids: vec![second.clone(), first],
    };
    let insights = CommitInsights::new(locator, GitCli::new(root));

    let report = insights
        .generate(&pipeline_request(), &clock())
        .await
        .expect("report should be generated");

    assert_eq!(report.range, CommitRange::to_head(second));
    let files: Vec<&str> = report
        .model
        .entries
        .iter()
        .map(|e| e.change.file_name.as_str())
        .collect();
    assert_eq!(files, vec!["Makefile", "util.go"]);
    assert_eq!(report.model.committers, vec!["Alice"]);
}

#[test]
async fn test_generate_with_single_commit_fallback_reads_that_commit_from_git() {
    if !git_available() {
        return;
    }

    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();
    run_git(root, &["init", "-q"], "1694299000");
    commit_file(root, "README.md", "1694299100");
    let head = commit_file(root, "main.go", "1694299200");

    let insights = CommitInsights::new(
        MockLocator::new(LookupOutcome::NotFound),
        GitCli::new(root),
    );
    let request = ReportRequest {
        fallback_commit: head,
        ..pipeline_request()
    };

    let report = insights
        .generate(&request, &clock())
        .await
        .expect("report should be generated");

    assert_eq!(report.model.entries.len(), 1);
    assert_eq!(report.model.entries[0].change.file_name, "main.go");
}

#[test]
async fn test_ingestion_source_from_payload() {
    let payload = br#"{
        "push": { "changes": [{
            "old": { "name": "main", "target": { "hash": "old000" } },
            "new": { "name": "main", "target": { "hash": "new999" } }
        }] },
        "repository": { "name": "sonarqube-scanner" }
    }"#;

    let source = IngestionSource::from_payload(payload).expect("payload should parse");

    match source {
        IngestionSource::Payload(push) => {
            assert_eq!(push.old_commit, "old000");
            assert_eq!(push.new_commit, "new999");
        }
        other => panic!("expected payload source, got {:?}", other),
    }
}

#[test]
async fn test_ingestion_source_from_invalid_payload_is_invalid_ingestion() {
    let result = IngestionSource::from_payload(br#"{ "push": { "changes": [] } }"#);

    match result {
        Err(CommitInsightsError::InvalidIngestion(reason)) => {
            assert!(reason.contains("no push changes"))
        }
        other => panic!("expected invalid ingestion, got {:?}", other),
    }
}
