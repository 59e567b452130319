//! Report persistence: the HTML document and the environment file consumed by
//! later CI steps.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error, info, instrument};

use crate::{errors::CommitInsightsError, render::minify, report::ReportModel};

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;

pub const REPO_NAME: &str = "REPO_NAME";
pub const BRANCH_NAME: &str = "BRANCH_NAME";
pub const TRIGGER_TYPE: &str = "TRIGGER_TYPE";
pub const COMMITTERS: &str = "COMMITTERS";
pub const COMMITTERS_EMAIL: &str = "COMMITTERS_EMAIL";
pub const PIPE_NAME: &str = "PIPE_NAME";
pub const PIPE_STATUS: &str = "PIPE_STATUS";
pub const PIPE_URL: &str = "PIPE_URL";
pub const PIPE_BUILD_CREATED: &str = "PIPE_BUILD_CREATED";
pub const REPORT: &str = "REPORT";

/// Builds the exported key/value pairs for a rendered report.
///
/// The report HTML is minified onto a single line.
pub fn report_variables(model: &ReportModel, html: &str) -> BTreeMap<String, String> {
    [
        (REPO_NAME, model.repo_name.clone()),
        (BRANCH_NAME, model.branch.clone()),
        (TRIGGER_TYPE, model.trigger_type.clone()),
        (COMMITTERS, model.committers_display()),
        (COMMITTERS_EMAIL, model.committer_emails_display()),
        (PIPE_NAME, model.pipeline_name.clone()),
        (PIPE_STATUS, model.pipeline_status.clone()),
        (PIPE_URL, model.pipeline_url.clone()),
        (PIPE_BUILD_CREATED, model.build_created.clone()),
        (REPORT, minify(html)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

/// Formats variables as environment file lines, sorted by key.
///
/// Integer values are written bare. Everything else is double quoted with
/// `\`, `"`, `$`, `` ` `` and `!` escaped and line breaks written as `\n` or
/// `\r`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use commit_insights_core::export::format_env;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("COUNT".to_string(), "3".to_string());
/// vars.insert("NAME".to_string(), "say \"hi\"".to_string());
///
/// assert_eq!(format_env(&vars), "COUNT=3\nNAME=\"say \\\"hi\\\"\"\n");
/// ```
pub fn format_env(vars: &BTreeMap<String, String>) -> String {
    vars.iter()
        .map(|(key, value)| {
            if value.parse::<i64>().is_ok() {
                format!("{}={}\n", key, value)
            } else {
                format!("{}=\"{}\"\n", key, escape_env_value(value))
            }
        })
        .collect()
}

fn escape_env_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' | '`' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

async fn ensure_parent_dir(path: &Path) -> Result<(), CommitInsightsError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| persistence_error(dir, e))
        }
        _ => Ok(()),
    }
}

fn persistence_error(path: &Path, error: std::io::Error) -> CommitInsightsError {
    error!(path = %path.display(), error = %error, "Failed to write report output");
    CommitInsightsError::PersistenceFailed {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Writes the variables to an environment file, creating parent directories
/// as needed and replacing any previous content.
#[instrument(skip(vars), fields(path = %path.display(), variables = vars.len()))]
pub async fn write_env_file(
    path: &Path,
    vars: &BTreeMap<String, String>,
) -> Result<(), CommitInsightsError> {
    ensure_parent_dir(path).await?;
    tokio::fs::write(path, format_env(vars))
        .await
        .map_err(|e| persistence_error(path, e))?;

    info!(path = %path.display(), "Wrote report variables");
    Ok(())
}

/// Writes the rendered report document.
#[instrument(skip(html), fields(path = %path.display(), bytes = html.len()))]
pub async fn write_report(path: &Path, html: &str) -> Result<(), CommitInsightsError> {
    ensure_parent_dir(path).await?;
    tokio::fs::write(path, html)
        .await
        .map_err(|e| persistence_error(path, e))?;

    debug!(path = %path.display(), "Wrote report");
    Ok(())
}
