use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::QueryLengthConfig;
use crate::domains::{self, Entropy};
use crate::events::{AnomalyKind, DnsEvent, RecordType};
use crate::fleet::HostProfile;

/// Query length anomaly: queries whose full string length far exceeds
/// anything benign traffic produces, a plain exfiltration tell.
pub struct QueryLengthGenerator {
    config: QueryLengthConfig,
}

impl QueryLengthGenerator {
    pub fn new(config: QueryLengthConfig) -> Self {
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
            "Injecting {} long-query events for {} against {}",
            self.config.num_events, host.hostname, domain
        );

        let mut events = Vec::with_capacity(self.config.num_events);
        for _ in 0..self.config.num_events {
            let timestamp = start
                + Duration::hours(rng.gen_range(0..self.config.spread_hours.max(1)))
                + Duration::minutes(rng.gen_range(0..60))
                + Duration::seconds(rng.gen_range(0..60));

            let mut query = domains::subdomain_query(rng, domain, Entropy::Extreme);
            while query.len() < self.config.min_length {
                query = domains::subdomain_query(rng, domain, Entropy::Extreme);
            }

            let mut event = baseline.normal_event(rng, host, timestamp);
            event.set_query(query);
            event.query_length = Some(event.query.len());

            let record_type = if rng.gen_bool(0.8) {
                RecordType::A
            } else {
                RecordType::Txt
            };
            event.set_record_type(record_type);
            event.label(AnomalyKind::QueryLengthAnomaly);
            events.push(event);
        }
        events
    }
}
