use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::ShadowingConfig;
use crate::domains::TOP_DOMAINS;
use crate::events::{AnomalyKind, DnsEvent, RecordType, ReplyCode};
use crate::fleet::HostProfile;
use crate::utils;

// Shadowed subdomains resolve to hosting ranges unrelated to the parent's
// real infrastructure.
const SHADOW_IP_PREFIXES: [&str; 4] = ["185.220.", "45.95.", "91.219.", "103.15."];

/// Domain shadowing: hundreds of distinct subdomains under one legitimate
/// parent domain, far beyond the subdomain diversity benign traffic shows.
pub struct ShadowingGenerator {
    config: ShadowingConfig,
}

impl ShadowingGenerator {
    pub fn new(config: ShadowingConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        host: &HostProfile,
        start: DateTime<Utc>,
    ) -> Vec<DnsEvent> {
        // Shadowing abuses a reputable parent, not an attacker-registered one
        let parent = TOP_DOMAINS[..10].choose(rng).copied().unwrap_or("google.com");
        debug!(
            "Injecting {} shadowing events for {} under {}",
            self.config.num_events, host.hostname, parent
        );

        let mut events = Vec::with_capacity(self.config.num_events);
        for i in 0..self.config.num_events {
            let timestamp = start
                + Duration::hours(rng.gen_range(0..self.config.spread_hours.max(1)))
                + Duration::minutes(rng.gen_range(0..60))
                + Duration::seconds(rng.gen_range(0..60));

            let label_len = rng.gen_range(8..=15);
            let label = format!(
                "x{}-{}",
                i % self.config.unique_subdomains.max(1),
                utils::random_string(rng, label_len, utils::DNS_LABEL_CHARS)
            );

            let mut event = baseline.normal_event(rng, host, timestamp);
            event.set_query(format!("{}.{}", label, parent));
            event.set_record_type(RecordType::A);
            if event.reply_code == ReplyCode::NoError {
                let prefix = SHADOW_IP_PREFIXES.choose(rng).copied().unwrap_or("185.220.");
                event.answer = Some(format!(
                    "{}{}.{}",
                    prefix,
                    rng.gen_range(0..=255),
                    rng.gen_range(1..=255)
                ));
            }
            event.label(AnomalyKind::DomainShadowing);
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
    use std::collections::HashSet;

    #[test]
    fn test_shadowing_subdomain_diversity() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(19);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();
        let baseline = BaselineGenerator::new(&config.fleet);
        let start = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();

        let shadow_config = config.anomalies.shadowing.clone();
        let generator = ShadowingGenerator::new(shadow_config.clone());
        let events = generator.generate(&mut rng, &baseline, &hosts[0], start);

        assert_eq!(events.len(), shadow_config.num_events);

        let parents: HashSet<_> = events.iter().map(|e| e.parent_domain.clone()).collect();
        assert_eq!(parents.len(), 1, "all events share one parent domain");

        let subdomains: HashSet<_> = events.iter().map(|e| e.subdomain.clone()).collect();
        assert!(subdomains.len() > shadow_config.unique_subdomains / 2);

        for event in &events {
            assert_eq!(event.record_type, RecordType::A);
            assert_eq!(event.anomaly_type, Some(AnomalyKind::DomainShadowing));
        }
    }
}
