use std::path::Path;

use anyhow::Context;
use commit_insights_core::export::{report_variables, write_env_file, write_report};
use commit_insights_core::time::RunClock;
use commit_insights_core::{CommitInsights, IngestionSource, ReportRequest};
use commit_insights_developer_platforms::git::GitCli;
use commit_insights_developer_platforms::harness::HarnessClient;
use commit_insights_developer_platforms::{CommitHistoryProvider, ExecutionLocator};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{
    default_config_path, AppConfig, GenerateArgs, IngestionType, PluginSettings,
};
use crate::errors::CliError;

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;

/// Execute the generate command
#[instrument(skip(args))]
pub async fn execute(args: GenerateArgs) -> Result<(), CliError> {
    let config = AppConfig::load_or_default(args.config.as_deref(), &default_config_path())?;
    let settings = PluginSettings::resolve(&args, &config, |key| std::env::var(key).ok())?;

    let locator = HarnessClient::new(
        reqwest::Client::new(),
        settings.harness_base_url.clone(),
        settings.harness_secret.clone(),
    );
    let history = GitCli::new(settings.repo_dir.clone());

    run(&settings, locator, history, &RunClock::system()).await
}

async fn read_payload(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read webhook payload from {}", path.display()))
}

/// Builds the report request for the configured ingestion type.
async fn build_request(settings: &PluginSettings) -> Result<ReportRequest, CliError> {
    let source = match settings.ingestion {
        IngestionType::Pipeline => IngestionSource::Pipeline(settings.query.clone()),
        IngestionType::Payload => {
            let payload = read_payload(&settings.payload_path).await?;
            let source = IngestionSource::from_payload(&payload)?;
            if let IngestionSource::Payload(push) = &source {
                info!(
                    repository = push.repo_name.as_str(),
                    is_private = push.is_private,
                    "Read push payload"
                );
            }
            source
        }
    };

    Ok(ReportRequest {
        source,
        fallback_commit: settings.commit_id.clone(),
        repo_name: settings.query.repo_name.clone(),
        branch: settings.query.branch.clone(),
        trigger_type: settings.query.build_type.clone(),
        pipeline_url: settings.pipeline_url.clone(),
        build_created: settings.build_created,
    })
}

/// Generates the report and writes its outputs.
///
/// The HTML report must be written for the run to succeed. The environment
/// file is best effort: failing to write it is logged and ignored.
pub async fn run<L, H>(
    settings: &PluginSettings,
    locator: L,
    history: H,
    clock: &RunClock,
) -> Result<(), CliError>
where
    L: ExecutionLocator,
    H: CommitHistoryProvider,
{
    info!(
        account = settings.query.account_id.as_str(),
        org = settings.query.org_id.as_str(),
        project = settings.query.project_id.as_str(),
        pipeline = settings.query.pipeline_id.as_str(),
        stage = settings.query.stage_id.as_str(),
        repository = settings.query.repo_name.as_str(),
        branch = settings.query.branch.as_str(),
        build_type = settings.query.build_type.as_str(),
        ingestion = ?settings.ingestion,
        "Generating commit insights"
    );

    let request = build_request(settings).await?;
    let insights = CommitInsights::new(locator, history);

    let report = insights.generate(&request, clock).await.map_err(|e| {
        error!(error = %e, "Failed to generate the report");
        CliError::from(e)
    })?;

    write_report(&settings.report_path, &report.html).await?;
    info!(
        path = %settings.report_path.display(),
        first_commit = report.range.old.as_str(),
        last_commit = report.range.new.as_str(),
        changes = report.model.entries.len(),
        "Commit insights report saved"
    );

    match &settings.env_file {
        Some(path) => {
            let vars = report_variables(&report.model, &report.html);
            if let Err(e) = write_env_file(path, &vars).await {
                warn!(error = %e, "Failed to write the report variables");
            }
        }
        None => debug!("No output file configured, skipping report variables"),
    }

    Ok(())
}
