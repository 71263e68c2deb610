use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::anomalies::Assignment;
use crate::events::AnomalyKind;
use crate::fleet::HostProfile;

const BANNER: &str =
    "================================================================================";
const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Everything the human-readable summary needs about a finished run.
pub struct RunSummary {
    pub run_id: String,
    pub seed: Option<u64>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub fleet_size: usize,
    pub total_events: usize,
    pub normal_events: usize,
    pub anomaly_counts: BTreeMap<AnomalyKind, usize>,
    pub assignments: Vec<Assignment>,
    pub cluster_hosts: Vec<HostProfile>,
    pub events_path: PathBuf,
    pub checksum: Option<String>,
}

impl RunSummary {
    pub fn anomalous_events(&self) -> usize {
        self.total_events - self.normal_events
    }
}

/// Write the plain-text run report alongside the dataset. Analysts read
/// this before loading the events, so it carries everything needed to
/// verify the injection plan without parsing JSON.
pub async fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let report = render(summary);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create summary directory")?;
        }
    }
    tokio::fs::write(path, report)
        .await
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    info!("Wrote run summary to {}", path.display());
    Ok(())
}

fn render(summary: &RunSummary) -> String {
    let mut out = String::new();
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    let _ = writeln!(out, "{}", BANNER);
    let _ = writeln!(out, "DNS EVENT GENERATION SUMMARY");
    let _ = writeln!(out, "{}", BANNER);
    let _ = writeln!(out);
    let _ = writeln!(out, "Run ID: {}", summary.run_id);
    let _ = writeln!(out, "Generated on: {}", host);
    let _ = writeln!(
        out,
        "Time range: {} to {}",
        summary.period_start.format("%Y-%m-%d %H:%M:%S"),
        summary.period_end.format("%Y-%m-%d %H:%M:%S")
    );
    match summary.seed {
        Some(seed) => {
            let _ = writeln!(out, "Random seed: {}", seed);
        }
        None => {
            let _ = writeln!(out, "Random seed: (from entropy)");
        }
    }
    let _ = writeln!(out, "Fleet size: {} hosts", summary.fleet_size);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total events: {}", summary.total_events);
    let _ = writeln!(out, "Normal events: {}", summary.normal_events);
    let _ = writeln!(out, "Anomalous events: {}", summary.anomalous_events());
    let _ = writeln!(out);

    let _ = writeln!(out, "EVENT COUNTS BY ANOMALY TYPE");
    let _ = writeln!(out, "{}", RULE);
    for (kind, count) in &summary.anomaly_counts {
        let _ = writeln!(out, "{}: {}", kind, count);
        let _ = writeln!(out, "  {}", kind.description());
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "ANOMALOUS HOSTS");
    let _ = writeln!(out, "{}", RULE);
    for assignment in &summary.assignments {
        let _ = writeln!(
            out,
            "{} ({}, {}): {} via {}",
            assignment.host.hostname,
            assignment.host.ip,
            assignment.host.department,
            assignment.kind,
            assignment.domain
        );
    }
    if !summary.cluster_hosts.is_empty() {
        let members: Vec<&str> = summary
            .cluster_hosts
            .iter()
            .map(|h| h.hostname.as_str())
            .collect();
        let _ = writeln!(
            out,
            "Behavioral cluster members: {}",
            members.join(", ")
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "DETECTION COVERAGE");
    let _ = writeln!(out, "{}", RULE);
    for kind in summary.anomaly_counts.keys() {
        let _ = writeln!(out, "{} -> `{}`", kind, kind.detection_macro());
        let _ = writeln!(out, "  {}", kind.detection_method());
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Output file: {}", summary.events_path.display());
    if let Some(checksum) = &summary.checksum {
        let _ = writeln!(out, "SHA-256: {}", checksum);
    }
    let _ = writeln!(out, "{}", BANNER);

    out
}
