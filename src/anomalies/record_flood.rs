use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::baseline::BaselineGenerator;
use crate::config::{RecordFloodConfig, TxtFloodConfig};
use crate::domains::{self, Entropy};
use crate::events::{AnomalyKind, DnsEvent, RecordType, ReplyCode, Transport};
use crate::fleet::HostProfile;
use crate::utils;

const PAYLOAD_PREFIXES: [&str; 5] = ["cmd=", "exec=", "run=", "data=", ""];

const HINFO_TARGETS: [&str; 7] = ["mail", "vpn", "remote", "admin", "internal", "db", "auth"];

/// TXT record flood: a volume of TXT lookups whose answers carry encoded
/// payloads, the classic TXT exfiltration shape.
pub struct TxtFloodGenerator {
    config: TxtFloodConfig,
}

impl TxtFloodGenerator {
    pub fn new(config: TxtFloodConfig) -> Self {
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
            "Injecting {} TXT flood events for {} against {}",
            self.config.num_events, host.hostname, domain
        );

        let mut events = Vec::with_capacity(self.config.num_events);
        for _ in 0..self.config.num_events {
            let timestamp = spread_timestamp(rng, start, self.config.spread_hours);

            let mut event = baseline.normal_event(rng, host, timestamp);
            event.set_query(domains::subdomain_query(rng, domain, Entropy::High));
            event.set_record_type(RecordType::Txt);

            let prefix = PAYLOAD_PREFIXES.choose(rng).copied().unwrap_or("");
            let content_length = rng
                .gen_range(self.config.min_content_length..=self.config.max_content_length);
            let payload = format!(
                "{}{}",
                prefix,
                utils::random_string(rng, content_length, utils::ENCODED_PAYLOAD_CHARS)
            );
            event.answer = Some(format!("\"{}\"", payload));
            event.txt_content = Some(payload);

            event.label(AnomalyKind::TxtRecordAnomaly);
            events.push(event);
        }
        events
    }
}

/// ANY, HINFO and AXFR floods share a shape: an unusual record type hammered
/// by one host, differing only in query construction and reply behavior.
pub struct RecordFloodGenerator {
    config: RecordFloodConfig,
    record_type: RecordType,
    kind: AnomalyKind,
}

impl RecordFloodGenerator {
    pub fn any_flood(config: RecordFloodConfig) -> Self {
        Self {
            config,
            record_type: RecordType::Any,
            kind: AnomalyKind::AnyRecordAnomaly,
        }
    }

    pub fn hinfo_flood(config: RecordFloodConfig) -> Self {
        Self {
            config,
            record_type: RecordType::Hinfo,
            kind: AnomalyKind::HinfoRecordAnomaly,
        }
    }

    pub fn axfr_flood(config: RecordFloodConfig) -> Self {
        Self {
            config,
            record_type: RecordType::Axfr,
            kind: AnomalyKind::AxfrRecordAnomaly,
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        host: &HostProfile,
        start: DateTime<Utc>,
    ) -> Vec<DnsEvent> {
        debug!(
            "Injecting {} {} flood events for {}",
            self.config.num_events, self.record_type, host.hostname
        );

        let mut events = Vec::with_capacity(self.config.num_events);
        for _ in 0..self.config.num_events {
            let timestamp = spread_timestamp(rng, start, self.config.spread_hours);

            let mut event = baseline.normal_event(rng, host, timestamp);
            let target = domains::weighted_top_domain(rng);

            match self.record_type {
                RecordType::Hinfo => {
                    let prefix = HINFO_TARGETS.choose(rng).copied().unwrap_or("mail");
                    event.set_query(format!("{}.{}", prefix, target));
                    event.answer = None;
                }
                RecordType::Axfr => {
                    // Zone transfers run over TCP and are normally refused
                    event.set_query(format!("ns1.{}", target));
                    event.transport = Transport::Tcp;
                    if rng.gen_bool(0.95) {
                        event.reply_code = ReplyCode::Refused;
                        event.answer = None;
                    } else {
                        event.reply_code = ReplyCode::NoError;
                        event.answer = Some("Zone transfer data".to_string());
                    }
                    event.action = event.reply_code.action().to_string();
                }
                _ => {
                    event.set_query(target.to_string());
                    if event.reply_code == ReplyCode::NoError {
                        event.answer = Some("Multiple records returned".to_string());
                    }
                }
            }

            event.set_record_type(self.record_type);
            event.label(self.kind);
            events.push(event);
        }
        events
    }
}

fn spread_timestamp<R: Rng + ?Sized>(
    rng: &mut R,
    start: DateTime<Utc>,
    spread_hours: i64,
) -> DateTime<Utc> {
    start
        + Duration::hours(rng.gen_range(0..spread_hours.max(1)))
        + Duration::minutes(rng.gen_range(0..60))
        + Duration::seconds(rng.gen_range(0..60))
}
