use super::*;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use commit_insights_developer_platforms::errors::Error;
use commit_insights_developer_platforms::models::{
    Author, ChangeKind, CommitRange, CommitRecord, Committer, ExecutionQuery, ExecutionSummary,
    FileChange,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Debug)]
struct NotFoundLocator;

#[async_trait]
impl ExecutionLocator for NotFoundLocator {
    async fn find_latest_execution(
        &self,
        _query: &ExecutionQuery,
    ) -> Result<ExecutionSummary, Error> {
        Err(Error::ExecutionNotFound)
    }
}

#[derive(Debug, Default)]
struct StaticHistory {
    fail: bool,
    ranges: Arc<Mutex<Vec<CommitRange>>>,
}

#[async_trait]
impl CommitHistoryProvider for StaticHistory {
    async fn list_commits(&self, range: &CommitRange) -> Result<Vec<CommitRecord>, Error> {
        self.ranges.lock().unwrap().push(range.clone());
        if self.fail {
            return Err(Error::CommitHistoryUnavailable("bad revision".to_string()));
        }
        Ok(vec![CommitRecord {
            hash: "abc123".to_string(),
            parent_hashes: vec![],
            ref_names: vec![],
            author: Author {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
            },
            committer: Committer {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            author_time: "1694299436".to_string(),
            commit_time: "1694299436".to_string(),
            title: "docs: add readme".to_string(),
            body: String::new(),
            changes: vec![FileChange {
                path: "README.md".to_string(),
                kind: ChangeKind::Added,
            }],
        }])
    }
}

fn clock() -> RunClock {
    RunClock::fixed(
        DateTime::from_timestamp(1695366000, 0).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

fn settings(root: &Path) -> PluginSettings {
    PluginSettings {
        query: ExecutionQuery {
            repo_name: "sonarqube-scanner".to_string(),
            branch: "main".to_string(),
            build_type: "push".to_string(),
            status_list: vec!["Success".to_string()],
            ..Default::default()
        },
        ingestion: IngestionType::Pipeline,
        commit_id: "abc123".to_string(),
        harness_secret: String::new(),
        harness_base_url: "http://127.0.0.1:1".to_string(),
        pipeline_url: "https://app.harness.io/executions/plan-42".to_string(),
        build_created: Some(1694299436),
        env_file: Some(root.join("harness").join("output.env")),
        report_path: root.join("report.html"),
        payload_path: root.join("payload.json"),
        repo_dir: PathBuf::from("."),
    }
}

#[tokio::test]
async fn test_run_writes_report_and_variables() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());
    let history = StaticHistory::default();
    let ranges = history.ranges.clone();

    run(&settings, NotFoundLocator, history, &clock())
        .await
        .expect("run should succeed");

    assert_eq!(*ranges.lock().unwrap(), vec![CommitRange::single("abc123")]);

    let html = std::fs::read_to_string(&settings.report_path).unwrap();
    assert!(html.contains("README.md"));
    assert!(!html.contains("<style"));

    let env = std::fs::read_to_string(settings.env_file.as_ref().unwrap()).unwrap();
    assert!(env.contains("REPO_NAME=\"sonarqube-scanner\"\n"));
    assert!(env.contains("BRANCH_NAME=\"main\"\n"));
    assert!(env.contains("COMMITTERS=\"Alice\"\n"));
    assert!(env.contains("PIPE_BUILD_CREATED=\"09/09/2023 10:43:56 PM +0000\"\n"));
    let report_line = env
        .lines()
        .find(|line| line.starts_with("REPORT="))
        .expect("REPORT variable");
    assert!(report_line.contains("README.md"));
}

#[tokio::test]
async fn test_run_succeeds_when_variables_cannot_be_written() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    let settings = PluginSettings {
        env_file: Some(blocker.join("output.env")),
        ..settings(dir.path())
    };

    run(&settings, NotFoundLocator, StaticHistory::default(), &clock())
        .await
        .expect("env file failure is only a warning");

    assert!(settings.report_path.exists());
}

#[tokio::test]
async fn test_run_fails_when_report_cannot_be_written() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    let settings = PluginSettings {
        report_path: blocker.join("report.html"),
        ..settings(dir.path())
    };

    let result = run(&settings, NotFoundLocator, StaticHistory::default(), &clock()).await;

    assert!(matches!(result, Err(CliError::ReportFailed(_))));
}

#[tokio::test]
async fn test_run_fails_when_history_is_unavailable() {
    let dir = tempdir().unwrap();
    let settings = settings(dir.path());
    let history = StaticHistory {
        fail: true,
        ..Default::default()
    };

    let result = run(&settings, NotFoundLocator, history, &clock()).await;

    match result {
        Err(err) => assert_eq!(err.exit_code(), 6),
        Ok(()) => panic!("expected history failure"),
    }
    assert!(!settings.report_path.exists());
}

#[tokio::test]
async fn test_run_reads_range_from_payload() {
    let dir = tempdir().unwrap();
    let settings = PluginSettings {
        ingestion: IngestionType::Payload,
        ..settings(dir.path())
    };
    std::fs::write(
        &settings.payload_path,
        r#"{
            "push": { "changes": [{
                "old": { "name": "main", "target": { "hash": "old000" } },
                "new": { "name": "feature/x", "target": { "hash": "new999" } }
            }] },
            "repository": { "name": "sonarqube-scanner", "is_private": true }
        }"#,
    )
    .unwrap();
    let history = StaticHistory::default();
    let ranges = history.ranges.clone();

    run(&settings, NotFoundLocator, history, &clock())
        .await
        .expect("run should succeed");

    assert_eq!(
        *ranges.lock().unwrap(),
        vec![CommitRange::new("old000", "new999")]
    );
    let env = std::fs::read_to_string(settings.env_file.as_ref().unwrap()).unwrap();
    assert!(env.contains("BRANCH_NAME=\"feature/x\"\n"));
}

#[tokio::test]
async fn test_run_with_missing_payload_file_fails() {
    let dir = tempdir().unwrap();
    let settings = PluginSettings {
        ingestion: IngestionType::Payload,
        ..settings(dir.path())
    };

    let result = run(&settings, NotFoundLocator, StaticHistory::default(), &clock()).await;

    match result {
        Err(CliError::Other(message)) => assert!(message.contains("payload")),
        other => panic!("expected payload read failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_with_invalid_payload_is_invalid_arguments() {
    let dir = tempdir().unwrap();
    let settings = PluginSettings {
        ingestion: IngestionType::Payload,
        ..settings(dir.path())
    };
    std::fs::write(&settings.payload_path, r#"{ "push": { "changes": [] } }"#).unwrap();

    let result = run(&settings, NotFoundLocator, StaticHistory::default(), &clock()).await;

    match result {
        Err(err @ CliError::InvalidArguments(_)) => {
            assert!(err.to_string().contains("Invalid ingestion source"));
            assert_eq!(err.exit_code(), 5);
        }
        other => panic!("expected invalid ingestion, got {:?}", other),
    }
}
