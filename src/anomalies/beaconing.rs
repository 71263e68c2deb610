use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::BeaconingConfig;
use crate::events::{AnomalyKind, DnsEvent, RecordType, ReplyCode};
use crate::fleet::HostProfile;

/// Beaconing: queries to one domain on a fixed interval with only a couple
/// of seconds of jitter, so the gap between consecutive queries is nearly
/// constant over thousands of events.
pub struct BeaconingGenerator {
    config: BeaconingConfig,
}

impl BeaconingGenerator {
    pub fn new(config: BeaconingConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        host: &HostProfile,
        domain: &str,
        start: DateTime<Utc>,
    ) -> Vec<DnsEvent> {
        debug!(
            "Injecting {} beacon events for {} against {} every {}m",
            self.config.num_events, host.hostname, domain, self.config.interval_minutes
        );

        let interval_seconds = self.config.interval_minutes as f64 * 60.0;
        let mut events = Vec::with_capacity(self.config.num_events);
        for i in 0..self.config.num_events {
            let jitter = rng.gen_range(-self.config.jitter_seconds..=self.config.jitter_seconds);
            let offset_ms = (i as f64 * interval_seconds + jitter) * 1000.0;
            let timestamp = start + Duration::milliseconds(offset_ms as i64);

            let mut event = baseline.normal_event(rng, host, timestamp);
            event.set_query(format!("beacon-{:04}.{}", i, domain));

            let record_type = if rng.gen_bool(0.95) {
                RecordType::A
            } else {
                RecordType::Txt
            };
            event.set_record_type(record_type);
            if record_type == RecordType::A && event.reply_code == ReplyCode::NoError {
                event.answer = Some(format!(
                    "93.184.{}.{}",
                    rng.gen_range(1..=5),
                    rng.gen_range(1..=254)
                ));
            }

            event.gap = Some(interval_seconds + jitter);
            event.label(AnomalyKind::Beaconing);
            events.push(event);
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

    #[test]
    fn test_beacon_cadence() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(11);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();
        let baseline = BaselineGenerator::new(&config.fleet);
        let start = Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap();

        let beacon_config = config.anomalies.beaconing.clone();
        let generator = BeaconingGenerator::new(beacon_config.clone());
        let events = generator.generate(&mut rng, &baseline, &hosts[0], "fakeupdates.xyz", start);

        assert_eq!(events.len(), beacon_config.num_events);

        let interval = beacon_config.interval_minutes * 60;
        for pair in events.windows(2) {
            let gap = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            let drift = (gap - interval).abs() as f64;
            assert!(
                drift <= 2.0 * beacon_config.jitter_seconds + 1.0,
                "gap {} drifted too far from interval {}",
                gap,
                interval
            );
        }

        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.query, format!("beacon-{:04}.fakeupdates.xyz", i));
            assert_eq!(event.anomaly_type, Some(AnomalyKind::Beaconing));
            assert!(event.gap.is_some());
        }
    }
}
