use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use tracing::info;

use crate::baseline::BaselineGenerator;
use crate::config::AnomaliesConfig;
use crate::domains;
use crate::events::{AnomalyKind, DnsEvent};
use crate::fleet::HostProfile;
use crate::timeline;

use super::beaconing::BeaconingGenerator;
use super::cluster::ClusterGenerator;
use super::query_length::QueryLengthGenerator;
use super::record_flood::{RecordFloodGenerator, TxtFloodGenerator};
use super::shadowing::ShadowingGenerator;
use super::tunneling::TunnelingGenerator;

// Patterns assigned before the others. They produce the fewest events, so
// on small runs they would otherwise be the first to miss out on a host.
const CRITICAL_KINDS: [AnomalyKind; 3] = [
    AnomalyKind::HinfoRecordAnomaly,
    AnomalyKind::AxfrRecordAnomaly,
    AnomalyKind::AnyRecordAnomaly,
];

/// One single-host anomaly pattern, dispatched without trait objects.
pub enum AnomalyInstance {
    Tunneling(TunnelingGenerator),
    Beaconing(BeaconingGenerator),
    TxtFlood(TxtFloodGenerator),
    AnyFlood(RecordFloodGenerator),
    HinfoFlood(RecordFloodGenerator),
    AxfrFlood(RecordFloodGenerator),
    QueryLength(QueryLengthGenerator),
    Shadowing(ShadowingGenerator),
}

impl AnomalyInstance {
    fn build(config: &AnomaliesConfig, kind: AnomalyKind) -> Option<Self> {
        match kind {
            AnomalyKind::C2Tunneling if config.tunneling.enabled => Some(
                AnomalyInstance::Tunneling(TunnelingGenerator::new(config.tunneling.clone())),
            ),
            AnomalyKind::Beaconing if config.beaconing.enabled => Some(
                AnomalyInstance::Beaconing(BeaconingGenerator::new(config.beaconing.clone())),
            ),
            AnomalyKind::TxtRecordAnomaly if config.txt_flood.enabled => Some(
                AnomalyInstance::TxtFlood(TxtFloodGenerator::new(config.txt_flood.clone())),
            ),
            AnomalyKind::AnyRecordAnomaly if config.any_flood.enabled => Some(
                AnomalyInstance::AnyFlood(RecordFloodGenerator::any_flood(
                    config.any_flood.clone(),
                )),
            ),
            AnomalyKind::HinfoRecordAnomaly if config.hinfo_flood.enabled => Some(
                AnomalyInstance::HinfoFlood(RecordFloodGenerator::hinfo_flood(
                    config.hinfo_flood.clone(),
                )),
            ),
            AnomalyKind::AxfrRecordAnomaly if config.axfr_flood.enabled => Some(
                AnomalyInstance::AxfrFlood(RecordFloodGenerator::axfr_flood(
                    config.axfr_flood.clone(),
                )),
            ),
            AnomalyKind::QueryLengthAnomaly if config.query_length.enabled => Some(
                AnomalyInstance::QueryLength(QueryLengthGenerator::new(
                    config.query_length.clone(),
                )),
            ),
            AnomalyKind::DomainShadowing if config.shadowing.enabled => Some(
                AnomalyInstance::Shadowing(ShadowingGenerator::new(config.shadowing.clone())),
            ),
            _ => None,
        }
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        host: &HostProfile,
        domain: &str,
        start: DateTime<Utc>,
    ) -> Vec<DnsEvent> {
        match self {
            AnomalyInstance::Tunneling(g) => g.generate(rng, baseline, host, domain, start),
            AnomalyInstance::Beaconing(g) => g.generate(rng, baseline, host, domain, start),
            AnomalyInstance::TxtFlood(g) => g.generate(rng, baseline, host, domain, start),
            AnomalyInstance::AnyFlood(g) => g.generate(rng, baseline, host, start),
            AnomalyInstance::HinfoFlood(g) => g.generate(rng, baseline, host, start),
            AnomalyInstance::AxfrFlood(g) => g.generate(rng, baseline, host, start),
            AnomalyInstance::QueryLength(g) => g.generate(rng, baseline, host, domain, start),
            AnomalyInstance::Shadowing(g) => g.generate(rng, baseline, host, start),
        }
    }
}

/// A single pattern assignment: which host runs which pattern against
/// which attacker domain.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub host: HostProfile,
    pub kind: AnomalyKind,
    pub domain: String,
}

/// The full injection plan for one run.
pub struct AnomalyPlan {
    pub assignments: Vec<Assignment>,
    pub cluster_hosts: Vec<HostProfile>,
}

/// Plans which hosts get which anomaly pattern and runs the generators.
pub struct AnomalyManager {
    config: AnomaliesConfig,
}

impl AnomalyManager {
    pub fn new(config: AnomaliesConfig) -> Self {
        Self { config }
    }

    /// Pick the busiest hosts from the baseline tallies and hand each one
    /// a pattern, critical patterns first. Hosts left over after every
    /// enabled pattern has an owner seed the behavioral cluster, padded to
    /// cluster size from the top of the list when the leftovers are short.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        hosts: &[HostProfile],
        baseline_counts: &HashMap<String, u64>,
    ) -> AnomalyPlan {
        let mut ranked: Vec<&HostProfile> = hosts.iter().collect();
        ranked.sort_by(|a, b| {
            let count_a = baseline_counts.get(&a.hostname).copied().unwrap_or(0);
            let count_b = baseline_counts.get(&b.hostname).copied().unwrap_or(0);
            count_b.cmp(&count_a).then(a.hostname.cmp(&b.hostname))
        });
        let candidates: Vec<&HostProfile> =
            ranked.iter().take(self.config.anomaly_hosts).copied().collect();

        let mut kinds: Vec<AnomalyKind> = CRITICAL_KINDS
            .iter()
            .copied()
            .chain(AnomalyKind::ALL.iter().copied().filter(|k| {
                *k != AnomalyKind::BehavioralCluster && !CRITICAL_KINDS.contains(k)
            }))
            .filter(|kind| AnomalyInstance::build(&self.config, *kind).is_some())
            .collect();
        kinds.truncate(candidates.len());

        let mut assignments = Vec::with_capacity(kinds.len());
        for (host, kind) in candidates.iter().zip(kinds.iter()) {
            let domain = self.domain_for(rng, *kind);
            info!(
                "Assigned {} to {} via {}",
                kind, host.hostname, domain
            );
            assignments.push(Assignment {
                host: (*host).clone(),
                kind: *kind,
                domain,
            });
        }

        let mut cluster_hosts: Vec<HostProfile> = candidates
            .iter()
            .skip(assignments.len())
            .map(|h| (*h).clone())
            .collect();
        if self.config.cluster.enabled {
            // Pad with the next-busiest hosts that have no pattern yet
            let mut top_up = ranked.iter().skip(self.config.anomaly_hosts);
            while cluster_hosts.len() < self.config.cluster.cluster_size {
                match top_up.next() {
                    Some(host) => cluster_hosts.push((*host).clone()),
                    None => break,
                }
            }
        } else {
            cluster_hosts.clear();
        }

        AnomalyPlan {
            assignments,
            cluster_hosts,
        }
    }

    /// Run every planned pattern, each starting at its own weekday
    /// business hour inside the period.
    pub fn generate_all<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &BaselineGenerator,
        plan: &AnomalyPlan,
        period_start: DateTime<Utc>,
        period_days: i64,
    ) -> Result<Vec<DnsEvent>> {
        let mut events = Vec::new();

        for assignment in &plan.assignments {
            let instance = match AnomalyInstance::build(&self.config, assignment.kind) {
                Some(instance) => instance,
                None => continue,
            };
            let start = timeline::business_hour_start(rng, period_start, period_days)?;
            let batch =
                instance.generate(rng, baseline, &assignment.host, &assignment.domain, start);
            info!(
                "Generated {} {} events for {}",
                batch.len(),
                assignment.kind,
                assignment.host.hostname
            );
            events.extend(batch);
        }

        if self.config.cluster.enabled && !plan.cluster_hosts.is_empty() {
            let generator = ClusterGenerator::new(self.config.cluster.clone());
            let domain = domains::random_malicious_domain(rng);
            let start = timeline::business_hour_start(rng, period_start, period_days)?;
            let batch = generator.generate(rng, baseline, &plan.cluster_hosts, domain, start);
            info!(
                "Generated {} cluster events across {} hosts",
                batch.len(),
                plan.cluster_hosts.len()
            );
            events.extend(batch);
        }

        Ok(events)
    }

    /// Each pattern has a signature attacker domain so detections can be
    /// eyeballed by domain alone; patterns without one draw at random.
    fn domain_for<R: Rng + ?Sized>(&self, rng: &mut R, kind: AnomalyKind) -> String {
        match kind {
            AnomalyKind::C2Tunneling => "malware-payload.net".to_string(),
            AnomalyKind::Beaconing => "fakeupdates.xyz".to_string(),
            AnomalyKind::TxtRecordAnomaly => "steal-credentials.net".to_string(),
            AnomalyKind::AnyRecordAnomaly => "cryptominer.biz".to_string(),
            AnomalyKind::HinfoRecordAnomaly => "ransomware-delivery.co".to_string(),
            AnomalyKind::AxfrRecordAnomaly => "data-exfil.org".to_string(),
            AnomalyKind::QueryLengthAnomaly => "evil-c2-server.com".to_string(),
            AnomalyKind::DomainShadowing => "command-cntr.info".to_string(),
            AnomalyKind::BehavioralCluster => domains::random_malicious_domain(rng).to_string(),
        }
    }
}
