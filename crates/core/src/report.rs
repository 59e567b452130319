//! Assembles the report model from aggregated changes and run metadata.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::{
    aggregate::{Aggregation, ChangeRow},
    time::{format_row_time, RunClock},
};

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Separator used when committer lists are shown as text.
pub const LIST_SEPARATOR: &str = ", ";

/// Run metadata shown alongside the change table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportInputs {
    pub repo_name: String,
    pub branch: String,

    /// How the build was triggered, e.g. `push` or `pull_request`
    pub trigger_type: String,

    pub pipeline_name: String,
    pub pipeline_status: String,
    pub pipeline_url: String,

    /// Build creation time in epoch seconds, if the CI system supplied one
    pub build_created: Option<i64>,
}

/// A change row together with its time on the run offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub change: ChangeRow,
    pub local_time: DateTime<FixedOffset>,
}

impl ReportEntry {
    pub fn display_time(&self) -> String {
        format_row_time(&self.local_time)
    }
}

/// Everything needed to render a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportModel {
    pub repo_name: String,
    pub branch: String,
    pub trigger_type: String,

    /// Distinct author names in first-seen order
    pub committers: Vec<String>,

    /// Distinct author emails in first-seen order
    pub committer_emails: Vec<String>,

    pub pipeline_name: String,
    pub pipeline_status: String,
    pub pipeline_url: String,

    /// Build creation time, formatted on the run offset
    pub build_created: String,

    /// Changes ordered most recent first
    pub entries: Vec<ReportEntry>,
}

impl ReportModel {
    /// Builds the model for one run.
    ///
    /// Every row time is moved onto the offset of `clock`, then rows are sorted
    /// by that time, most recent first. Rows with equal times keep their
    /// aggregation order, so the files of one commit stay together.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, FixedOffset};
    /// use commit_insights_core::aggregate::Aggregation;
    /// use commit_insights_core::report::{ReportInputs, ReportModel};
    /// use commit_insights_core::time::RunClock;
    ///
    /// let clock = RunClock::fixed(
    ///     DateTime::from_timestamp(1695366000, 0).unwrap(),
    ///     FixedOffset::east_opt(0).unwrap(),
    /// );
    /// let inputs = ReportInputs {
    ///     repo_name: "sonarqube-scanner".to_string(),
    ///     ..Default::default()
    /// };
    ///
    /// let model = ReportModel::build(inputs, Aggregation::default(), &clock);
    /// assert!(model.entries.is_empty());
    /// assert_eq!(model.committers_display(), "");
    /// ```
    pub fn build(inputs: ReportInputs, aggregation: Aggregation, clock: &RunClock) -> Self {
        let mut entries: Vec<ReportEntry> = aggregation
            .rows
            .into_iter()
            .map(|change| ReportEntry {
                local_time: clock.normalize(change.authored_at),
                change,
            })
            .collect();

        // sort_by is stable
        entries.sort_by(|a, b| b.local_time.cmp(&a.local_time));

        debug!(
            entries = entries.len(),
            offset = %clock.offset(),
            "Built report model"
        );

        Self {
            repo_name: inputs.repo_name,
            branch: inputs.branch,
            trigger_type: inputs.trigger_type,
            committers: aggregation.committer_names.to_vec(),
            committer_emails: aggregation.committer_emails.to_vec(),
            pipeline_name: inputs.pipeline_name,
            pipeline_status: inputs.pipeline_status,
            pipeline_url: inputs.pipeline_url,
            build_created: clock.format_build_created(inputs.build_created),
            entries,
        }
    }

    pub fn committers_display(&self) -> String {
        self.committers.join(LIST_SEPARATOR)
    }

    pub fn committer_emails_display(&self) -> String {
        self.committer_emails.join(LIST_SEPARATOR)
    }
}
