use commit_insights_core::errors::CommitInsightsError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The commit history between the resolved revisions could not be read
    #[error("Commit history unavailable: {0}")]
    HistoryUnavailable(String),

    /// The report could not be built, rendered or written
    #[error("Report generation failed: {0}")]
    ReportFailed(String),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Other(format!("{:#}", err))
    }
}

impl From<CommitInsightsError> for CliError {
    fn from(err: CommitInsightsError) -> Self {
        match err {
            CommitInsightsError::CommitHistoryUnavailable(_) => {
                CliError::HistoryUnavailable(err.to_string())
            }
            CommitInsightsError::InvalidIngestion(_) => CliError::InvalidArguments(err.to_string()),
            CommitInsightsError::MalformedTimestamp { .. }
            | CommitInsightsError::PersistenceFailed { .. }
            | CommitInsightsError::RenderFailed(_) => CliError::ReportFailed(err.to_string()),
        }
    }
}

impl std::process::Termination for CliError {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.exit_code())
    }
}

impl CliError {
    /// The process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ConfigError(_) => 2,
            CliError::InvalidArguments(_) => 5,
            CliError::HistoryUnavailable(_) => 6,
            CliError::ReportFailed(_) => 7,
            CliError::Other(_) => 1,
        }
    }
}
