use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::info;

use crate::config::FleetConfig;
use crate::domains::{self, Entropy};
use crate::events::{DnsEvent, RecordType, ReplyCode, Transport};
use crate::fleet::{HostProfile, OsType};
use crate::timeline;

// Record type mix for benign traffic, weights scaled x100. TXT and ANY are
// kept rare so the record-type anomalies stand out against the floor.
const RECORD_TYPE_WEIGHTS: [(RecordType, u32); 8] = [
    (RecordType::A, 8000),
    (RecordType::Aaaa, 1500),
    (RecordType::Mx, 200),
    (RecordType::Txt, 50),
    (RecordType::Cname, 200),
    (RecordType::Ns, 30),
    (RecordType::Ptr, 20),
    (RecordType::Any, 1),
];

const REPLY_CODE_WEIGHTS: [(ReplyCode, u32); 4] = [
    (ReplyCode::NoError, 9750),
    (ReplyCode::NxDomain, 200),
    (ReplyCode::ServFail, 40),
    (ReplyCode::Refused, 10),
];

const SERVER_APPS: [(&str, u32); 5] = [
    ("system_service", 60),
    ("dns_service", 15),
    ("web_service", 10),
    ("database", 10),
    ("scheduled_task", 5),
];

const WORKSTATION_APPS: [(&str, u32); 6] = [
    ("browser", 70),
    ("email_client", 10),
    ("os_update", 8),
    ("antivirus", 5),
    ("office_app", 5),
    ("chat_app", 2),
];

/// Synthesizes benign DNS traffic for the whole fleet.
pub struct BaselineGenerator {
    dns_servers: Vec<String>,
}

impl BaselineGenerator {
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            dns_servers: config.dns_servers.clone(),
        }
    }

    /// Generate baseline activity for every host across the time period,
    /// following the daily and weekly activity curves. Stops early when the
    /// baseline event budget is reached. Returns the events plus a per-host
    /// tally used later for anomaly host selection.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        hosts: &[HostProfile],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_events: usize,
    ) -> (Vec<DnsEvent>, HashMap<String, u64>) {
        let duration_hours = (end - start).num_hours();
        info!(
            "Generating baseline activity for {} hosts over {} hours",
            hosts.len(),
            duration_hours
        );

        let mut events = Vec::new();
        let mut host_event_counts: HashMap<String, u64> = HashMap::new();

        for hour_offset in 0..duration_hours {
            let current_hour = start + Duration::hours(hour_offset);
            let multiplier = timeline::activity_multiplier(current_hour);

            for host in hosts {
                let queries_this_hour = timeline::queries_for_hour(rng, host, multiplier);

                for _ in 0..queries_this_hour {
                    if events.len() >= max_events {
                        info!("Reached baseline event budget ({})", max_events);
                        return (events, host_event_counts);
                    }

                    let timestamp = timeline::random_time_in_hour(rng, current_hour);
                    events.push(self.normal_event(rng, host, timestamp));
                    *host_event_counts.entry(host.hostname.clone()).or_insert(0) += 1;
                }
            }
        }

        info!("Generated {} baseline events", events.len());
        (events, host_event_counts)
    }

    /// Build one benign DNS event for `host` at `timestamp`. Anomaly
    /// generators start from this and override the fields that make the
    /// pattern, so baseline realism carries over into anomalous traffic.
    pub fn normal_event<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        host: &HostProfile,
        timestamp: DateTime<Utc>,
    ) -> DnsEvent {
        let domain = domains::weighted_top_domain(rng);

        // Servers mostly resolve bare domains; workstations browse around
        let direct_probability = if host.is_server() { 0.9 } else { 0.7 };
        let query = if rng.gen_bool(direct_probability) {
            domain.to_string()
        } else {
            domains::subdomain_query(rng, domain, Entropy::Normal)
        };

        let record_type = RECORD_TYPE_WEIGHTS
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(record_type, _)| *record_type)
            .unwrap_or(RecordType::A);

        let reply_code = REPLY_CODE_WEIGHTS
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(reply_code, _)| *reply_code)
            .unwrap_or(ReplyCode::NoError);

        let answer = if reply_code == ReplyCode::NoError {
            Some(self.synthesize_answer(rng, record_type, domain))
        } else {
            None
        };

        let dns_server = self
            .dns_servers
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "10.0.0.1".to_string());

        let apps: &[(&str, u32)] = if host.is_server() {
            &SERVER_APPS
        } else {
            &WORKSTATION_APPS
        };
        let app = apps
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(app, _)| *app)
            .unwrap_or("browser");

        let transport = if rng.gen_bool(0.95) {
            Transport::Udp
        } else {
            Transport::Tcp
        };

        let (parent_domain, subdomain) = domains::split_query(&query);

        DnsEvent {
            timestamp,
            source: "dns".to_string(),
            sourcetype: "dns".to_string(),
            host: host.hostname.clone(),
            eventtype: "dns".to_string(),
            src: host.ip.to_string(),
            src_host: host.hostname.clone(),
            dest_port: 53,
            dest: dns_server,
            record_type,
            query_type: record_type,
            query,
            answer,
            message_type: "QUERY".to_string(),
            reply_code,
            action: reply_code.action().to_string(),
            app: app.to_string(),
            user: format!(
                "user_{}_{}",
                host.department.to_lowercase(),
                rng.gen_range(1..=50)
            ),
            response_time: rng.gen_range(0.001..0.05),
            transport,
            vendor_product: host.os.vendor_product().to_string(),
            department: host.department.clone(),
            parent_domain,
            subdomain,
            anomaly_type: None,
            anomaly_description: None,
            gap: None,
            query_length: None,
            txt_content: None,
            cluster_id: None,
        }
    }

    fn synthesize_answer<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        record_type: RecordType,
        domain: &str,
    ) -> String {
        match record_type {
            RecordType::A => format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=255),
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
                rng.gen_range(1..=255)
            ),
            RecordType::Aaaa => format!("2001:db8::{:x}", rng.gen_range(1..10000)),
            RecordType::Mx => format!(
                "{} mail{}.{}",
                rng.gen_range(10..=30),
                rng.gen_range(1..=5),
                domain
            ),
            RecordType::Cname => format!("cdn{}.{}", rng.gen_range(1..=10), domain),
            RecordType::Txt => format!("v=spf1 include:{} ~all", domain),
            RecordType::Ns => format!("ns{}.{}", rng.gen_range(1..=5), domain),
            RecordType::Ptr => {
                let prefix = ["mail", "www", "ftp"].choose(rng).copied().unwrap_or("www");
                format!("{}.{}", prefix, domain)
            }
            _ => "Multiple records returned".to_string(),
        }
    }
}
