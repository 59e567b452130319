//! HTML rendering of a report model.
//!
//! The document is composed with an embedded stylesheet, which is then inlined
//! into `style` attributes. The final document has no `<style>` block.

use indoc::formatdoc;
use tracing::{error, instrument};

use crate::{errors::CommitInsightsError, report::ReportEntry, report::ReportModel};

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;

pub const REPORT_TITLE: &str = "Commit Insights Report";

const DOCTYPE: &str = "<!DOCTYPE html>";

const STYLESHEET: &str = r#"
body {
    font-family: Arial, sans-serif;
    margin: 0;
    background-color: #f0f0f0;
    display: flex;
    flex-direction: column;
    align-items: center;
}
.header {
    background-color: #00ABE3;
    color: white;
    padding: 20px;
    text-align: center;
    font-size: 20px;
    border-radius: 10px 10px 0 0;
    margin: -20px -20px 20px -20px;
}
.super-container {
    background-color: #fff;
    border-radius: 10px;
    box-shadow: 0 0 10px rgba(0,0,0,0.1);
    overflow-x: auto;
    overflow-y: auto;
    max-width: 90%;
    max-height: 90vh;
    margin: 10px 20px;
    padding: 20px;
    height: fit-content;
}
.section {
    background-color: #fff;
    border-radius: 10px;
    box-shadow: 0 0 10px rgba(0,0,0,0.1);
    overflow-x: auto;
    overflow-y: auto;
    max-width: 90%;
    max-height: 100vh;
    margin: 10px 20px;
    padding: 20px;
}
.green {
    background-color: rgba(40, 167, 69, 0.3);
}
.red {
    background-color: rgba(203, 36, 49, 0.3);
}
.orange {
    background-color: rgba(255, 165, 0, 0.3);
}
table {
    width: 100%;
    border-collapse: collapse;
    margin-bottom: 20px;
    border: 1px solid #ccc;
}
th, td {
    border: 1px solid #ccc;
    padding: 8px;
    text-align: left;
}
th {
    background-color: #f8f8f8;
}
"#;

/// Renders the report as a standalone HTML document with inlined styles.
///
/// # Errors
///
/// Returns `CommitInsightsError::RenderFailed` when the stylesheet cannot be
/// inlined.
#[instrument(skip(model), fields(entries = model.entries.len()))]
pub fn render_report(model: &ReportModel) -> Result<String, CommitInsightsError> {
    let document = compose_document(model);
    css_inline::inline(&document).map_err(|e| {
        error!(error = %e, "Failed to inline report styles");
        CommitInsightsError::RenderFailed(e.to_string())
    })
}

/// Composes the report document with its stylesheet still embedded.
pub fn compose_document(model: &ReportModel) -> String {
    let rows: String = model.entries.iter().map(render_row).collect();

    formatdoc! {r#"
        {doctype}
        <html>
        <head>
        <meta charset="utf-8">
        <title>{title}</title>
        <style>{css}</style>
        </head>
        <body>
        <div class="super-container">
        	<div class="header">{title}</div>
        	<div class="section">
        		<strong>Repository Name:</strong> {repo}<br>
        		<strong>Branch Name:</strong> {branch}<br>
        		<strong>Trigger Type:</strong> {trigger}
        	</div>
        	<div class="section">
        		<strong>Committers:</strong> {committers}
        	</div>
        	<div class="section">
        		<strong>Pipeline Name:</strong> {pipe_name}<br>
        		<strong>Pipeline Status:</strong> {pipe_status}<br>
        		<strong>Pipeline Build Started:</strong> {pipe_created}<br>
        		<strong>Pipeline URL:</strong> <a href="{pipe_url}">Harness Execution Link</a>
        	</div>
        	<div class="section">
        		<strong>File Changes:</strong>
        		<table>
        			<tr>
        				<th>Committer/Reviewer</th>
        				<th>Status</th>
        				<th>File Name</th>
        				<th>Commit Hash</th>
        				<th>Title</th>
        				<th>Date</th>
        			</tr>
        {rows}		</table>
        	</div>
        </div>
        </body>
        </html>
        "#,
        doctype = DOCTYPE,
        title = REPORT_TITLE,
        css = STYLESHEET,
        repo = html_escape(&model.repo_name),
        branch = html_escape(&model.branch),
        trigger = html_escape(&model.trigger_type),
        committers = html_escape(&model.committers_display()),
        pipe_name = html_escape(&model.pipeline_name),
        pipe_status = html_escape(&model.pipeline_status),
        pipe_created = html_escape(&model.build_created),
        pipe_url = html_escape(&model.pipeline_url),
        rows = rows,
    }
}

fn render_row(entry: &ReportEntry) -> String {
    let change = &entry.change;
    let class = change
        .status_class()
        .map(|c| format!(" class=\"{}\"", c))
        .unwrap_or_default();
    let people = match change.reviewer.as_deref() {
        Some(reviewer) if !reviewer.is_empty() => format!("{} / {}", change.committer, reviewer),
        _ => change.committer.clone(),
    };

    format!(
        "\t\t\t<tr{class}>\n\t\t\t\t<td>{people}</td>\n\t\t\t\t<td>{status}</td>\n\t\t\t\t<td>{file}</td>\n\t\t\t\t<td>{hash}</td>\n\t\t\t\t<td>{title}</td>\n\t\t\t\t<td>{time}</td>\n\t\t\t</tr>\n",
        class = class,
        people = html_escape(&people),
        status = html_escape(change.status()),
        file = html_escape(&change.file_name),
        hash = html_escape(&change.commit_hash),
        title = html_escape(&change.title),
        time = html_escape(&entry.display_time()),
    )
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Collapses a rendered report onto a single line for export.
///
/// Newlines and tabs are removed, as is the document type declaration.
pub fn minify(html: &str) -> String {
    html.replace(['\n', '\r', '\t'], "").replace(DOCTYPE, "")
}
