use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::info;

use crate::anomalies::AnomalyManager;
use crate::baseline::BaselineGenerator;
use crate::config::Config;
use crate::fleet::generate_fleet;
use crate::output::{self, EventSink, GzipJsonLinesSink, JsonLinesSink};
use crate::report::{self, RunSummary};

/// Drives a full generation run: fleet, baseline, anomaly injection,
/// merge and sort, output, report.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let period_end = Utc::now()
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .context("Failed to truncate period end to the hour")?;
        self.run_until(period_end).await
    }

    /// Run with a fixed period end at an hour boundary. With a seed in the
    /// config this makes the whole dataset reproducible. Baseline traffic
    /// stays inside the period; a long anomaly series scheduled near the
    /// end can spill past it.
    pub async fn run_until(&self, period_end: DateTime<Utc>) -> Result<RunSummary> {
        let run_id = self
            .config
            .generator
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!("Starting generation run {}", run_id);

        let seed = self.config.generator.seed;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let period_start = period_end - Duration::days(self.config.generator.period_days);

        let hosts = generate_fleet(&self.config.fleet, &mut rng)?;
        info!("Generated fleet of {} hosts", hosts.len());

        let baseline = BaselineGenerator::new(&self.config.fleet);
        let budget = (self.config.generator.max_events as f64
            * self.config.generator.baseline_fraction) as usize;
        let (mut events, baseline_counts) =
            baseline.generate(&mut rng, &hosts, period_start, period_end, budget);
        let normal_events = events.len();

        let manager = AnomalyManager::new(self.config.anomalies.clone());
        let plan = manager.plan(&mut rng, &hosts, &baseline_counts);
        let injected = manager.generate_all(
            &mut rng,
            &baseline,
            &plan,
            period_start,
            self.config.generator.period_days,
        )?;
        events.extend(injected);

        // Consumers replay the file in order, so the merge must be sorted
        events.sort_by_key(|event| event.timestamp);
        info!("Merged and sorted {} total events", events.len());

        let mut anomaly_counts: BTreeMap<_, usize> = BTreeMap::new();
        for event in &events {
            if let Some(kind) = event.anomaly_type {
                *anomaly_counts.entry(kind).or_insert(0) += 1;
            }
        }

        let sink: Box<dyn EventSink> = if self.config.output.compress {
            Box::new(GzipJsonLinesSink::new(&self.config.output.events_path))
        } else {
            Box::new(JsonLinesSink::new(&self.config.output.events_path))
        };
        let stats = sink.write_events(&events).await?;

        let checksum = if self.config.output.checksum {
            Some(output::sha256_file(&stats.path).await?)
        } else {
            None
        };

        let summary = RunSummary {
            run_id,
            seed,
            period_start,
            period_end,
            fleet_size: hosts.len(),
            total_events: events.len(),
            normal_events,
            anomaly_counts,
            assignments: plan.assignments.clone(),
            cluster_hosts: plan.cluster_hosts.clone(),
            events_path: stats.path.clone(),
            checksum,
        };
        report::write_summary(&self.config.output.summary_path, &summary).await?;

        info!(
            "Run {} complete: {} events ({} anomalous)",
            summary.run_id,
            summary.total_events,
            summary.anomalous_events()
        );
        Ok(summary)
    }
}
