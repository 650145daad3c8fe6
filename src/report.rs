//! Run report generation in JSON and HTML formats.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::backup::{RunResult, RunStatus};
use crate::types::{FilePair, SkippedFile};

/// Default report location for a run against `destination`
pub fn default_report_path(destination: &Path) -> PathBuf {
    destination
        .join("reports")
        .join(format!("report-{}.html", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Writes run reports next to each other: `<name>.html` and `<name>.json`
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    json: bool,
    html: bool,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            json: true,
            html: true,
        }
    }
}

impl ReportGenerator {
    pub fn new(json: bool, html: bool) -> Self {
        Self { json, html }
    }

    /// Write the enabled formats for `result`. `path` is the HTML report path; the
    /// JSON report uses the same stem. Returns the files written.
    pub async fn write(&self, result: &RunResult, path: &Path) -> Result<Vec<PathBuf>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create report directory {:?}", parent))?;
        }

        let mut written = Vec::new();

        if self.html {
            let html_path = path.with_extension("html");
            fs::write(&html_path, render_html(result))
                .await
                .with_context(|| format!("Failed to write HTML report {:?}", html_path))?;
            written.push(html_path);
        }

        if self.json {
            let json_path = path.with_extension("json");
            let json = serde_json::to_string_pretty(result)?;
            fs::write(&json_path, json)
                .await
                .with_context(|| format!("Failed to write JSON report {:?}", json_path))?;
            written.push(json_path);
        }

        Ok(written)
    }
}

/// Render a self-contained HTML page for `result`
pub fn render_html(result: &RunResult) -> String {
    let status = match result.status {
        RunStatus::Completed => "Completed",
        RunStatus::Interrupted => "Interrupted",
    };
    let errors = result.error_messages();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Backup Report - {started}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 20px; background-color: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; border-radius: 8px; padding: 30px; }}
        .title {{ color: #007acc; margin: 0; }}
        .stats-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 16px; margin: 24px 0; }}
        .stat-card {{ background: #f8f9fa; border: 1px solid #e9ecef; border-radius: 6px; padding: 16px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007acc; }}
        .stat-label {{ color: #666; font-size: 14px; }}
        .interrupted {{ color: #c0392b; font-weight: bold; }}
        table {{ border-collapse: collapse; width: 100%; margin-bottom: 24px; }}
        th, td {{ text-align: left; padding: 6px 8px; border-bottom: 1px solid #e9ecef; font-family: monospace; font-size: 13px; }}
        th {{ background: #f8f9fa; font-family: inherit; }}
    </style>
</head>
<body>
    <div class="container">
        <h1 class="title">Backup Report</h1>
        <p class="{status_class}">Status: {status}</p>
        <p>Started {started} &middot; took {elapsed:.1}s &middot; <code>{source}</code> &rarr; <code>{destination}</code></p>

        <div class="stats-grid">
            <div class="stat-card"><div class="stat-value">{copied}</div><div class="stat-label">Copied</div></div>
            <div class="stat-card"><div class="stat-value">{duplicates}</div><div class="stat-label">Duplicates</div></div>
            <div class="stat-card"><div class="stat-value">{skipped}</div><div class="stat-label">Skipped</div></div>
            <div class="stat-card"><div class="stat-value">{error_count}</div><div class="stat-label">Errors</div></div>
            <div class="stat-card"><div class="stat-value">{found}</div><div class="stat-label">Total Found</div></div>
            <div class="stat-card"><div class="stat-value">{bytes}</div><div class="stat-label">Copied Size</div></div>
        </div>

        <h2>Copied Files ({copied})</h2>
        {copied_table}
        <h2>Duplicates ({duplicates})</h2>
        {duplicate_table}
        <h2>Skipped Files ({skipped})</h2>
        {skipped_table}
        <h2>Errors ({error_count})</h2>
        {error_list}
    </div>
</body>
</html>"#,
        started = result.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        status_class = if result.is_interrupted() { "interrupted" } else { "" },
        status = status,
        elapsed = result.elapsed.as_secs_f64(),
        source = escape(&result.source.display().to_string()),
        destination = escape(&result.destination.display().to_string()),
        copied = result.copied.len(),
        duplicates = result.duplicates.len(),
        skipped = result.skipped.len(),
        error_count = errors.len(),
        found = result.total_found,
        bytes = format_bytes(result.bytes_copied),
        copied_table = pair_table(&result.copied, "Destination"),
        duplicate_table = pair_table(&result.duplicates, "Existing copy"),
        skipped_table = skipped_table(&result.skipped),
        error_list = error_list(&errors),
    )
}

fn pair_table(pairs: &[FilePair], second: &str) -> String {
    if pairs.is_empty() {
        return "<p>None</p>".to_string();
    }
    let rows: String = pairs
        .iter()
        .map(|pair| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(&pair.source.display().to_string()),
                escape(&pair.destination.display().to_string())
            )
        })
        .collect();
    format!("<table><tr><th>Source</th><th>{}</th></tr>\n{}</table>", second, rows)
}

fn skipped_table(skipped: &[SkippedFile]) -> String {
    if skipped.is_empty() {
        return "<p>None</p>".to_string();
    }
    let rows: String = skipped
        .iter()
        .map(|entry| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(&entry.path.display().to_string()),
                escape(&entry.reason.to_string())
            )
        })
        .collect();
    format!("<table><tr><th>File</th><th>Reason</th></tr>\n{}</table>", rows)
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return "<p>None</p>".to_string();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>\n", escape(e)))
        .collect();
    format!("<ul>\n{}</ul>", items)
}

/// Escape text for HTML element and attribute content
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
