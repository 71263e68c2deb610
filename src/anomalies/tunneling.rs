use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::TunnelingConfig;
use crate::domains::{self, Entropy};
use crate::events::{AnomalyKind, DnsEvent, RecordType};
use crate::fleet::HostProfile;

/// C2 tunneling: a burst of high-entropy subdomain lookups against one
/// malicious domain, packed into a short window so the hourly query count
/// for the host spikes far above its baseline.
pub struct TunnelingGenerator {
    config: TunnelingConfig,
}

impl TunnelingGenerator {
    pub fn new(config: TunnelingConfig) -> Self {
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
            "Injecting {} tunneling events for {} against {}",
            self.config.num_events, host.hostname, domain
        );

        let mut events = Vec::with_capacity(self.config.num_events);
        for _ in 0..self.config.num_events {
            let timestamp = start
                + Duration::hours(rng.gen_range(0..self.config.window_hours.max(1)))
                + Duration::minutes(rng.gen_range(0..60))
                + Duration::seconds(rng.gen_range(0..60));

            let mut event = baseline.normal_event(rng, host, timestamp);
            event.set_query(domains::subdomain_query(rng, domain, Entropy::High));

            let record_type = if rng.gen_bool(0.7) {
                RecordType::A
            } else if rng.gen_bool(0.5) {
                RecordType::Aaaa
            } else {
                RecordType::Txt
            };
            event.set_record_type(record_type);
            event.label(AnomalyKind::C2Tunneling);
            events.push(event);
        }
        events
    }
}
