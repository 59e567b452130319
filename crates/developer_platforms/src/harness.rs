//! Harness CI execution lookup.
//!
//! Endpoint used:
//!   * POST /pipeline/api/pipelines/execution/summary
//!
//! The response is a large, loosely specified document. Only the fields needed
//! to summarise an execution are decoded and every one of them is optional.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    errors::Error,
    models::{ExecutionQuery, ExecutionSummary, Stage, Step},
    ExecutionLocator,
};

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;

/// Base URL of the hosted Harness platform.
pub const DEFAULT_HARNESS_BASE_URL: &str = "https://app.harness.io";

const EXECUTION_SUMMARY_PATH: &str = "/pipeline/api/pipelines/execution/summary";

/// Layout node group that marks a pipeline stage.
const STAGE_NODE_GROUP: &str = "STAGE";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExecutionSummaryResponse {
    #[serde(deserialize_with = "null_as_default")]
    data: ResponseData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseData {
    #[serde(deserialize_with = "null_as_default")]
    content: Vec<ExecutionContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExecutionContent {
    #[serde(deserialize_with = "null_as_default")]
    plan_execution_id: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    status: String,
    #[serde(deserialize_with = "null_as_default")]
    start_ts: i64,
    #[serde(deserialize_with = "null_as_default")]
    end_ts: i64,
    #[serde(deserialize_with = "null_as_default")]
    successful_stages_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    failed_stages_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    total_stages_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    starting_node_id: String,
    #[serde(deserialize_with = "null_as_default")]
    layout_node_map: HashMap<String, LayoutNode>,
    #[serde(deserialize_with = "null_as_default")]
    module_info: ModuleInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleInfo {
    #[serde(deserialize_with = "null_as_default")]
    ci: CiModuleInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CiModuleInfo {
    #[serde(rename = "ciExecutionInfoDTO", deserialize_with = "null_as_default")]
    ci_execution_info: CiExecutionInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CiExecutionInfo {
    #[serde(deserialize_with = "null_as_default")]
    branch: BranchInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BranchInfo {
    #[serde(deserialize_with = "null_as_default")]
    commits: Vec<CommitReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommitReference {
    #[serde(deserialize_with = "null_as_default")]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LayoutNode {
    #[serde(deserialize_with = "null_as_default")]
    node_group: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    status: String,
    #[serde(deserialize_with = "null_as_default")]
    module: String,
    #[serde(deserialize_with = "null_as_default")]
    edge_layout_list: EdgeLayout,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EdgeLayout {
    #[serde(deserialize_with = "null_as_default")]
    current_node_children: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    next_ids: Vec<String>,
}

/// Maps the build type reported by the CI runner onto the Harness filter value.
fn harness_build_type(build_type: &str) -> &str {
    match build_type {
        "push" => "branch",
        "pull_request" => "PR",
        other => other,
    }
}

/// Renders a duration given in milliseconds the way the report shows it.
fn format_duration(millis: i64) -> String {
    let seconds = millis.max(0) as f64 / 1000.0;
    if seconds < 60.0 {
        format!("{:.0} seconds", seconds)
    } else if seconds < 3600.0 {
        format!("{:.0} minutes", seconds / 60.0)
    } else {
        let whole_minutes = (seconds / 60.0) as i64;
        format!("{} hours {} minutes", whole_minutes / 60, whole_minutes % 60)
    }
}

fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// Orders the layout nodes by following the execution graph from its starting
/// node, then keeps the stages. Nodes that cannot be reached that way are
/// appended in identifier order.
fn collect_stages(nodes: &HashMap<String, LayoutNode>, starting_node_id: &str) -> Vec<Stage> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<&str> = Vec::new();

    let mut cursor = Some(starting_node_id);
    while let Some(id) = cursor {
        let Some((key, node)) = nodes.get_key_value(id) else {
            break;
        };
        if !visited.insert(key.as_str()) {
            break;
        }
        ordered.push(key.as_str());
        cursor = node.edge_layout_list.next_ids.first().map(String::as_str);
    }

    let mut remaining: Vec<&str> = nodes
        .keys()
        .map(String::as_str)
        .filter(|id| !visited.contains(id))
        .collect();
    remaining.sort_unstable();
    ordered.extend(remaining);

    ordered
        .into_iter()
        .filter_map(|id| nodes.get(id))
        .filter(|node| node.node_group == STAGE_NODE_GROUP)
        .map(|node| Stage {
            name: node.name.clone(),
            module: node.module.clone(),
            status: node.status.clone(),
            steps: node
                .edge_layout_list
                .current_node_children
                .iter()
                .filter_map(|child| nodes.get(child))
                .map(|child| Step {
                    name: child.name.clone(),
                    status: child.status.clone(),
                })
                .collect(),
        })
        .collect()
}

fn summarize_execution(content: ExecutionContent) -> ExecutionSummary {
    let stages = collect_stages(&content.layout_node_map, &content.starting_node_id);
    let commit_ids = content
        .module_info
        .ci
        .ci_execution_info
        .branch
        .commits
        .into_iter()
        .map(|c| c.id)
        .filter(|id| !id.is_empty())
        .collect();

    ExecutionSummary {
        plan_execution_id: content.plan_execution_id,
        name: content.name,
        status: content.status,
        started_at: timestamp_from_millis(content.start_ts),
        ended_at: timestamp_from_millis(content.end_ts),
        duration: format_duration(content.end_ts.saturating_sub(content.start_ts)),
        stage_count: content.total_stages_count,
        completed_stage_count: content
            .successful_stages_count
            .saturating_add(content.failed_stages_count),
        stages,
        commit_ids,
    }
}

/// Client for the Harness pipeline execution API.
#[derive(Clone)]
pub struct HarnessClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HarnessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HarnessClient {
    /// Creates a client for the given Harness instance.
    ///
    /// # Arguments
    ///
    /// * `http` - A shared HTTP client
    /// * `base_url` - The Harness base URL, e.g. [`DEFAULT_HARNESS_BASE_URL`]
    /// * `api_key` - An access token with permission to read pipeline executions
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into();
        debug!(base_url = base_url.as_str(), "Creating Harness client");
        Self {
            http,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn summary_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            EXECUTION_SUMMARY_PATH
        )
    }
}

#[async_trait]
impl ExecutionLocator for HarnessClient {
    #[instrument(skip(self))]
    async fn find_latest_execution(
        &self,
        query: &ExecutionQuery,
    ) -> Result<ExecutionSummary, Error> {
        let url = self.summary_url();
        let body = json!({
            "status": query.status_list,
            "moduleProperties": {
                "ci": {
                    "buildType": harness_build_type(&query.build_type),
                    "branch": query.branch,
                    "repoName": query.repo_name,
                }
            },
            "filterType": "PipelineExecution",
        });
        debug!(url = url.as_str(), filter = %body, "Searching pipeline executions");

        let response = self
            .http
            .post(&url)
            .query(&[
                ("page", "0"),
                ("size", "1"),
                ("accountIdentifier", query.account_id.as_str()),
                ("orgIdentifier", query.org_id.as_str()),
                ("projectIdentifier", query.project_id.as_str()),
                ("pipelineIdentifier", query.pipeline_id.as_str()),
            ])
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(url = url.as_str(), error = %e, "Failed to send execution search");
                Error::TransportError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                url = url.as_str(),
                status = status.as_u16(),
                "Harness rejected the execution search"
            );
            return Err(Error::TransportError(format!("HTTP status {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::TransportError(e.to_string()))?;
        let parsed: ExecutionSummaryResponse =
            serde_json::from_str(&text).map_err(|e| Error::DecodeError(e.to_string()))?;

        let content = parsed
            .data
            .content
            .into_iter()
            .next()
            .ok_or(Error::ExecutionNotFound)?;

        let summary = summarize_execution(content);
        info!(
            plan_execution_id = summary.plan_execution_id.as_str(),
            pipeline = summary.name.as_str(),
            status = summary.status.as_str(),
            duration = summary.duration.as_str(),
            stages = summary.stage_count,
            commits = summary.commit_ids.len(),
            "Found pipeline execution"
        );
        for stage in &summary.stages {
            debug!(
                stage = stage.name.as_str(),
                module = stage.module.as_str(),
                status = stage.status.as_str(),
                steps = stage.steps.len(),
                "Execution stage"
            );
        }

        Ok(summary)
    }
}
