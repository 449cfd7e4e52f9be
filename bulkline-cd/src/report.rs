//! Run artifacts: outcome journal and report rendering
//!
//! The journal is the durable per-run record: one `phone,status` row
//! appended as each contact resolves, so a crash mid-run keeps every
//! completed row. The HTML report is rendered once from the aggregated
//! outcomes after the loop ends; it is best-effort — the numeric summary
//! returned to the caller is the authoritative result.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dispatch::outcome::{DispatchOutcome, DispatchSummary};
use crate::error::Result;

/// Append-per-contact CSV journal (`phone,status` rows)
pub struct OutcomeJournal {
    path: PathBuf,
}

impl OutcomeJournal {
    /// Create the journal file with its header row
    pub fn create(dir: &Path, campaign_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("outcomes-{}.csv", campaign_id));
        std::fs::write(&path, "phone,status\n")?;
        Ok(Self { path })
    }

    /// Append one resolved contact. Called from the dispatch loop right
    /// after the contact reaches a terminal status.
    pub fn append(&self, outcome: &DispatchOutcome) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{},{}", outcome.number, outcome.status.as_str())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render the human-readable report: summary header plus one row per
/// contact in dispatch order
pub fn render_html_report(
    campaign_id: Uuid,
    message: &str,
    summary: &DispatchSummary,
    outcomes: &[DispatchOutcome],
    generated_at: DateTime<Utc>,
) -> String {
    let mut rows = String::new();
    for outcome in outcomes {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&outcome.number),
            outcome.status.as_str(),
            outcome.attempts,
            escape(outcome.last_error.as_deref().unwrap_or("")),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Campaign report {id}</title></head>
<body>
<h1>Campaign report</h1>
<p><b>Campaign:</b> {id}<br>
<b>Generated:</b> {generated}<br>
<b>Message:</b> {message}</p>
<p><b>Total:</b> {total} &middot; <b>Sent:</b> {sent} &middot; <b>Invalid:</b> {invalid}
&middot; <b>Not on channel:</b> {not_on_channel} &middot; <b>File errors:</b> {file_error}
&middot; <b>Errors:</b> {error}{cancelled}</p>
<table border="1" cellspacing="0" cellpadding="4">
<tr><th>Contact</th><th>Status</th><th>Attempts</th><th>Last error</th></tr>
{rows}</table>
</body>
</html>
"#,
        id = campaign_id,
        generated = generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        message = escape(message),
        total = summary.total,
        sent = summary.sent,
        invalid = summary.invalid,
        not_on_channel = summary.not_on_channel,
        file_error = summary.file_error,
        error = summary.error,
        cancelled = if summary.cancelled {
            " &middot; <b>run cancelled</b>"
        } else {
            ""
        },
        rows = rows,
    )
}

/// Write the rendered report next to the journal, returning its path
pub fn write_html_report(
    dir: &Path,
    campaign_id: Uuid,
    message: &str,
    summary: &DispatchSummary,
    outcomes: &[DispatchOutcome],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("report-{}.html", campaign_id));
    let html = render_html_report(campaign_id, message, summary, outcomes, Utc::now());
    std::fs::write(&path, html)?;
    Ok(path)
}

/// Render, persist, and record the report for a finished run.
///
/// Best-effort: any failure is logged and yields `None`; the dispatch
/// summary already held by the caller stays authoritative.
pub async fn persist_report(
    store: &dyn crate::storage::ArtifactStore,
    db: &sqlx::SqlitePool,
    artifact_dir: &Path,
    campaign_id: Uuid,
    owner_id: &str,
    message: &str,
    summary: &DispatchSummary,
    outcomes: &[DispatchOutcome],
) -> Option<String> {
    let html_path =
        match write_html_report(artifact_dir, campaign_id, message, summary, outcomes) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Report rendering failed for {}: {}", campaign_id, e);
                return None;
            }
        };

    let report_ref = match store.upload(&html_path, "reports", "report").await {
        Ok(reference) => reference,
        Err(e) => {
            tracing::error!("Report upload failed for {}: {}", campaign_id, e);
            return None;
        }
    };

    if let Err(e) =
        crate::db::reports::create_report(db, campaign_id, owner_id, message, &report_ref).await
    {
        tracing::error!("Report record creation failed for {}: {}", campaign_id, e);
        return None;
    }

    Some(report_ref)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
