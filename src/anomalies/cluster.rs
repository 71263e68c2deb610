use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::ClusterConfig;
use crate::events::{AnomalyKind, DnsEvent, RecordType, ReplyCode};
use crate::fleet::HostProfile;
use crate::utils;

/// Behavioral cluster: several hosts querying the same domain on the same
/// cadence with the same record type, so feature-space clustering groups
/// them away from the rest of the fleet.
pub struct ClusterGenerator {
    config: ClusterConfig,
}

impl ClusterGenerator {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        hosts: &[HostProfile],
        domain: &str,
        start: DateTime<Utc>,
    ) -> Vec<DnsEvent> {
        // The shared behavior is what clusters: one record type and one
        // interval across every member host.
        let record_type = if rng.gen_bool(0.5) {
            RecordType::A
        } else {
            RecordType::Txt
        };
        let interval_minutes = rng.gen_range(15..=25);

        debug!(
            "Injecting cluster of {} hosts against {} ({} every {}m)",
            hosts.len(),
            domain,
            record_type,
            interval_minutes
        );

        let mut events =
            Vec::with_capacity(hosts.len() * self.config.events_per_host);
        for host in hosts {
            for i in 0..self.config.events_per_host {
                let timestamp = start
                    + Duration::minutes((i as i64) * interval_minutes)
                    + Duration::seconds(rng.gen_range(-60..=60));

                let mut event = baseline.normal_event(rng, host, timestamp);
                event.set_query(format!(
                    "node{}-{}.{}",
                    i % 5,
                    rng.gen_range(100..1000),
                    domain
                ));
                event.set_record_type(record_type);

                match record_type {
                    RecordType::A => {
                        if event.reply_code == ReplyCode::NoError {
                            event.answer = Some(format!(
                                "45.95.{}.{}",
                                rng.gen_range(1..=5),
                                rng.gen_range(10..=200)
                            ));
                        }
                    }
                    _ => {
                        let payload_len = rng.gen_range(20..=30);
                        let payload = format!(
                            "cmd={}",
                            utils::random_string(
                                rng,
                                payload_len,
                                utils::ENCODED_PAYLOAD_CHARS
                            )
                        );
                        event.answer = Some(format!("\"{}\"", payload));
                        event.txt_content = Some(payload);
                    }
                }

                event.cluster_id = Some(1);
                event.label(AnomalyKind::BehavioralCluster);
                events.push(event);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fleet::generate_fleet;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_cluster_hosts_share_behavior() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(23);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();
        let baseline = BaselineGenerator::new(&config.fleet);
        let start = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();

        let cluster_config = config.anomalies.cluster.clone();
        let members = &hosts[..cluster_config.cluster_size];
        let generator = ClusterGenerator::new(cluster_config.clone());
        let events = generator.generate(&mut rng, &baseline, members, "evil-c2-server.com", start);

        assert_eq!(
            events.len(),
            cluster_config.cluster_size * cluster_config.events_per_host
        );

        let record_types: HashSet<_> = events.iter().map(|e| e.record_type).collect();
        assert_eq!(record_types.len(), 1, "whole cluster uses one record type");

        let sources: HashSet<_> = events.iter().map(|e| e.host.clone()).collect();
        assert_eq!(sources.len(), cluster_config.cluster_size);

        for event in &events {
            assert_eq!(event.cluster_id, Some(1));
            assert_eq!(event.parent_domain, "evil-c2-server.com");
            assert_eq!(event.anomaly_type, Some(AnomalyKind::BehavioralCluster));
        }
    }

    #[test]
    fn test_cluster_cadence_jitter_is_symmetric() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(47);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();
        let baseline = BaselineGenerator::new(&config.fleet);
        let start = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();

        let generator = ClusterGenerator::new(config.anomalies.cluster.clone());
        let events = generator.generate(&mut rng, &baseline, &hosts[..1], "data-exfil.org", start);

        // Recover the shared cadence from the mean gap, then check every
        // event sits within a minute either side of its slot
        let seconds: Vec<i64> = events
            .iter()
            .map(|e| (e.timestamp - start).num_seconds())
            .collect();
        let span = seconds[seconds.len() - 1] - seconds[0];
        let mean_gap = span / (seconds.len() as i64 - 1);
        let interval = ((mean_gap + 30) / 60) * 60;
        assert!((900..=1500).contains(&interval), "interval {}", interval);

        let residuals: Vec<i64> = seconds
            .iter()
            .enumerate()
            .map(|(i, s)| s - (i as i64) * interval)
            .collect();
        assert!(residuals.iter().all(|r| (-60..=60).contains(r)));
        assert!(residuals.iter().any(|r| *r < 0), "jitter never runs early");
        assert!(residuals.iter().any(|r| *r > 0), "jitter never runs late");
    }
}
