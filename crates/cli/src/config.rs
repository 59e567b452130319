//! Settings resolution for a report run.
//!
//! Values come from command line flags first, then from the environment
//! variables set by the CI system or the plugin configuration, then from an
//! optional TOML file and finally from built-in defaults.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Args;
use commit_insights_developer_platforms::harness::DEFAULT_HARNESS_BASE_URL;
use commit_insights_developer_platforms::models::ExecutionQuery;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::CliError;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = ".commit-insights.toml";

pub const DEFAULT_REPORT_PATH: &str = "report.html";
pub const DEFAULT_PAYLOAD_PATH: &str = "bitbucket/payload-bitbucket-harness.json";
pub const DEFAULT_STATUS_LIST: &str = "Success";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Arguments for the generate command. Every flag is optional and falls back
/// to the CI environment.
#[derive(Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    /// Harness account identifier
    #[arg(long)]
    pub account_id: Option<String>,

    /// Harness organization identifier
    #[arg(long)]
    pub org_id: Option<String>,

    /// Harness project identifier
    #[arg(long)]
    pub project_id: Option<String>,

    /// Harness pipeline identifier
    #[arg(long)]
    pub pipeline_id: Option<String>,

    /// Harness stage identifier
    #[arg(long)]
    pub stage_id: Option<String>,

    /// Comma separated execution statuses to search for
    #[arg(long)]
    pub status_list: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Branch name
    #[arg(long)]
    pub branch: Option<String>,

    /// Build type, e.g. push or pull_request
    #[arg(long)]
    pub build_type: Option<String>,

    /// Where the commit range comes from: pipeline or payload
    #[arg(long)]
    pub ingestion_type: Option<String>,

    /// Commit used when no pipeline execution can be found
    #[arg(long)]
    pub commit_id: Option<String>,

    /// Harness API key
    #[arg(long)]
    pub harness_secret: Option<String>,

    /// Link to the current pipeline execution
    #[arg(long)]
    pub pipeline_url: Option<String>,

    /// Build creation time in epoch seconds
    #[arg(long)]
    pub build_created: Option<String>,

    /// Environment file the report variables are written to
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Alternate config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Contents of the optional configuration file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub harness: HarnessConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "HarnessConfig::default_base_url")]
    pub base_url: String,
}

impl HarnessConfig {
    fn default_base_url() -> String {
        DEFAULT_HARNESS_BASE_URL.to_string()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: HarnessConfig::default_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Where the HTML report is written
    #[serde(default = "ReportConfig::default_path")]
    pub path: PathBuf,

    /// Webhook payload read when ingesting from a payload
    #[serde(default = "ReportConfig::default_payload_path")]
    pub payload_path: PathBuf,
}

impl ReportConfig {
    fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_REPORT_PATH)
    }

    fn default_payload_path() -> PathBuf {
        PathBuf::from(DEFAULT_PAYLOAD_PATH)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: ReportConfig::default_path(),
            payload_path: ReportConfig::default_payload_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Checkout the commit history is read from
    #[serde(default = "RepositoryConfig::default_directory")]
    pub directory: PathBuf,
}

impl RepositoryConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            directory: RepositoryConfig::default_directory(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the specified file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(CliError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CliError::ConfigError(format!("Failed to read configuration file: {}", e))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            CliError::ConfigError(format!("Failed to parse configuration file: {}", e))
        })?;

        Ok(config)
    }

    /// Loads the explicitly requested file, or the default file when it is
    /// present. Without either the built-in defaults are used.
    pub fn load_or_default(explicit: Option<&Path>, default_path: &Path) -> Result<Self, CliError> {
        match explicit {
            Some(path) => Self::load(path),
            None if default_path.exists() => Self::load(default_path),
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Get the path to the default configuration file
pub fn default_config_path() -> PathBuf {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    current_dir.join(DEFAULT_CONFIG_FILENAME)
}

/// How the commit range of a run is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionType {
    Pipeline,
    Payload,
}

impl std::str::FromStr for IngestionType {
    type Err = CliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pipeline" => Ok(IngestionType::Pipeline),
            "payload" => Ok(IngestionType::Payload),
            other => Err(CliError::InvalidArguments(format!(
                "Unsupported ingestion type '{}', expected 'pipeline' or 'payload'",
                other
            ))),
        }
    }
}

/// Fully resolved settings for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    pub query: ExecutionQuery,
    pub ingestion: IngestionType,
    pub commit_id: String,
    pub harness_secret: String,
    pub harness_base_url: String,
    pub pipeline_url: String,
    pub build_created: Option<i64>,

    /// Environment file for the report variables, if the CI system asked for one
    pub env_file: Option<PathBuf>,

    pub report_path: PathBuf,
    pub payload_path: PathBuf,
    pub repo_dir: PathBuf,
}

/// Picks the first non-empty value: the flag, then each environment variable
/// in order.
fn pick<F>(flag: &Option<String>, keys: &[&str], env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    flag.iter()
        .cloned()
        .chain(keys.iter().filter_map(|key| env(key)))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn value<F>(flag: &Option<String>, keys: &[&str], env: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    pick(flag, keys, env).unwrap_or_default()
}

fn parse_status_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|status| !status.is_empty())
        .map(str::to_string)
        .collect()
}

impl PluginSettings {
    /// Resolves the settings of a run.
    ///
    /// `env` looks up an environment variable; it is injected so the
    /// resolution can be exercised without touching the process environment.
    pub fn resolve<F>(args: &GenerateArgs, config: &AppConfig, env: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let status_list = parse_status_list(
            &pick(&args.status_list, &["PLUGIN_STATUS_LIST"], &env)
                .unwrap_or_else(|| DEFAULT_STATUS_LIST.to_string()),
        );
        if status_list.is_empty() {
            return Err(CliError::InvalidArguments(
                "The status list does not contain any status".to_string(),
            ));
        }

        let ingestion: IngestionType = pick(&args.ingestion_type, &["PLUGIN_INGESTION_TYPE"], &env)
            .unwrap_or_else(|| "pipeline".to_string())
            .parse()?;

        let query = ExecutionQuery {
            account_id: value(&args.account_id, &["HARNESS_ACCOUNT_ID", "PLUGIN_ACC_ID"], &env),
            org_id: value(&args.org_id, &["HARNESS_ORG_ID", "PLUGIN_ORG_ID"], &env),
            project_id: value(&args.project_id, &["HARNESS_PROJECT_ID", "PLUGIN_PROJECT_ID"], &env),
            pipeline_id: value(&args.pipeline_id, &["HARNESS_PIPELINE_ID", "PLUGIN_PIPELINE_ID"], &env),
            stage_id: value(&args.stage_id, &["HARNESS_STAGE_ID", "PLUGIN_STAGE_ID"], &env),
            status_list,
            repo_name: value(&args.repo_name, &["DRONE_REPO_NAME", "PLUGIN_REPO_NAME"], &env),
            branch: value(&args.branch, &["CI_COMMIT_BRANCH", "PLUGIN_BRANCH"], &env),
            build_type: value(&args.build_type, &["DRONE_BUILD_EVENT", "PLUGIN_BUILD_TYPE"], &env),
        };

        let build_created = match pick(&args.build_created, &["CI_BUILD_CREATED"], &env) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(epoch) => Some(epoch),
                Err(_) => {
                    warn!(value = raw.as_str(), "Ignoring build creation time that is not an epoch");
                    None
                }
            },
            None => {
                info!("No build creation time supplied, using the current time");
                None
            }
        };

        let env_file = args
            .output
            .clone()
            .or_else(|| pick(&None, &["DRONE_OUTPUT"], &env).map(PathBuf::from));

        let settings = Self {
            query,
            ingestion,
            commit_id: value(&args.commit_id, &["CI_COMMIT_SHA", "PLUGIN_COMMIT_ID"], &env),
            harness_secret: value(&args.harness_secret, &["PLUGIN_HARNESS_SECRET"], &env),
            harness_base_url: config.harness.base_url.clone(),
            pipeline_url: value(&args.pipeline_url, &["CI_BUILD_LINK", "PLUGIN_HARNESS_PIPE_EXECUTION_URL"], &env),
            build_created,
            env_file,
            report_path: config.report.path.clone(),
            payload_path: config.report.payload_path.clone(),
            repo_dir: config.repository.directory.clone(),
        };

        if settings.ingestion == IngestionType::Pipeline {
            if settings.harness_secret.is_empty() {
                warn!("No Harness API key configured, the execution lookup will likely fail");
            }
            if settings.commit_id.is_empty() {
                warn!("No fallback commit configured");
            }
        }

        Ok(settings)
    }
}
