use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// One synthetic DNS query event in the Splunk CIM Network Resolution shape.
///
/// Field names and ordering match what the downstream detection rules index,
/// so renames here are breaking changes for the consumers of the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsEvent {
    #[serde(with = "event_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub sourcetype: String,
    pub host: String,
    pub eventtype: String,

    // CIM fields for DNS
    pub src: String,
    pub src_host: String,
    pub dest_port: u16,
    pub dest: String,
    pub record_type: RecordType,
    pub query_type: RecordType,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub message_type: String,
    pub reply_code: ReplyCode,
    pub action: String,
    pub app: String,
    pub user: String,
    pub response_time: f64,
    pub transport: Transport,
    pub vendor_product: String,
    pub department: String,

    // Parent domain and subdomain split out for SIEM-side aggregation
    pub parent_domain: String,
    pub subdomain: String,

    // Label fields, present only on injected anomaly events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_type: Option<AnomalyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
}

impl DnsEvent {
    /// Replace the query string, keeping the derived parent_domain and
    /// subdomain fields in agreement with it.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        let (parent, sub) = crate::domains::split_query(&query);
        self.parent_domain = parent;
        self.subdomain = sub;
        self.query = query;
    }

    /// Set the record type, mirroring it into the CIM query_type copy.
    pub fn set_record_type(&mut self, record_type: RecordType) {
        self.record_type = record_type;
        self.query_type = record_type;
    }

    /// Mark this event as part of an injected anomaly pattern.
    pub fn label(&mut self, kind: AnomalyKind) {
        self.anomaly_type = Some(kind);
        self.anomaly_description = Some(kind.description().to_string());
    }

    pub fn is_anomalous(&self) -> bool {
        self.anomaly_type.is_some()
    }
}

/// Timestamp format the original dataset shipped with: ISO date/time with
/// six fractional digits and no zone suffix.
pub mod event_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map_err(serde::de::Error::custom)?;
        Ok(naive.and_utc())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "MX")]
    Mx,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "PTR")]
    Ptr,
    #[serde(rename = "ANY")]
    Any,
    #[serde(rename = "HINFO")]
    Hinfo,
    #[serde(rename = "AXFR")]
    Axfr,
    #[serde(rename = "SPF")]
    Spf,
    #[serde(rename = "SRV")]
    Srv,
    #[serde(rename = "DNSKEY")]
    Dnskey,
    #[serde(rename = "NSEC")]
    Nsec,
    #[serde(rename = "NSEC3")]
    Nsec3,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Any => "ANY",
            RecordType::Hinfo => "HINFO",
            RecordType::Axfr => "AXFR",
            RecordType::Spf => "SPF",
            RecordType::Srv => "SRV",
            RecordType::Dnskey => "DNSKEY",
            RecordType::Nsec => "NSEC",
            RecordType::Nsec3 => "NSEC3",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyCode {
    #[serde(rename = "NOERROR")]
    NoError,
    #[serde(rename = "NXDOMAIN")]
    NxDomain,
    #[serde(rename = "SERVFAIL")]
    ServFail,
    #[serde(rename = "REFUSED")]
    Refused,
}

impl ReplyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyCode::NoError => "NOERROR",
            ReplyCode::NxDomain => "NXDOMAIN",
            ReplyCode::ServFail => "SERVFAIL",
            ReplyCode::Refused => "REFUSED",
        }
    }

    /// CIM action field derived from the resolution outcome.
    pub fn action(&self) -> &'static str {
        match self {
            ReplyCode::NoError => "resolved",
            _ => "queried",
        }
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    Udp,
    Tcp,
}

/// The menu of injected anomaly patterns, one per detection rule the dataset
/// is meant to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyKind {
    #[serde(rename = "C2_TUNNELING")]
    C2Tunneling,
    #[serde(rename = "BEACONING")]
    Beaconing,
    #[serde(rename = "TXT_RECORD_ANOMALY")]
    TxtRecordAnomaly,
    #[serde(rename = "ANY_RECORD_ANOMALY")]
    AnyRecordAnomaly,
    #[serde(rename = "HINFO_RECORD_ANOMALY")]
    HinfoRecordAnomaly,
    #[serde(rename = "AXFR_RECORD_ANOMALY")]
    AxfrRecordAnomaly,
    #[serde(rename = "QUERY_LENGTH_ANOMALY")]
    QueryLengthAnomaly,
    #[serde(rename = "DOMAIN_SHADOWING")]
    DomainShadowing,
    #[serde(rename = "BEHAVIORAL_CLUSTER")]
    BehavioralCluster,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 9] = [
        AnomalyKind::C2Tunneling,
        AnomalyKind::Beaconing,
        AnomalyKind::TxtRecordAnomaly,
        AnomalyKind::AnyRecordAnomaly,
        AnomalyKind::HinfoRecordAnomaly,
        AnomalyKind::AxfrRecordAnomaly,
        AnomalyKind::QueryLengthAnomaly,
        AnomalyKind::DomainShadowing,
        AnomalyKind::BehavioralCluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::C2Tunneling => "C2_TUNNELING",
            AnomalyKind::Beaconing => "BEACONING",
            AnomalyKind::TxtRecordAnomaly => "TXT_RECORD_ANOMALY",
            AnomalyKind::AnyRecordAnomaly => "ANY_RECORD_ANOMALY",
            AnomalyKind::HinfoRecordAnomaly => "HINFO_RECORD_ANOMALY",
            AnomalyKind::AxfrRecordAnomaly => "AXFR_RECORD_ANOMALY",
            AnomalyKind::QueryLengthAnomaly => "QUERY_LENGTH_ANOMALY",
            AnomalyKind::DomainShadowing => "DOMAIN_SHADOWING",
            AnomalyKind::BehavioralCluster => "BEHAVIORAL_CLUSTER",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnomalyKind::C2Tunneling => {
                "High volume DNS queries from single host within short time period"
            }
            AnomalyKind::Beaconing => {
                "Periodic DNS queries at regular intervals with minimal time variation"
            }
            AnomalyKind::TxtRecordAnomaly => {
                "Unusual volume of TXT record queries with encoded content"
            }
            AnomalyKind::AnyRecordAnomaly => {
                "Unusual volume of ANY record queries indicating potential reconnaissance"
            }
            AnomalyKind::HinfoRecordAnomaly => {
                "Unusual HINFO record queries for system information gathering"
            }
            AnomalyKind::AxfrRecordAnomaly => "Zone transfer attempts using AXFR queries",
            AnomalyKind::QueryLengthAnomaly => {
                "Abnormally long DNS query strings indicating potential data exfiltration"
            }
            AnomalyKind::DomainShadowing => {
                "Excessive unique subdomains for a single parent domain"
            }
            AnomalyKind::BehavioralCluster => {
                "Multiple hosts exhibiting synchronized suspicious DNS behavior"
            }
        }
    }

    /// Name of the SIEM detection macro this pattern is meant to trigger.
    pub fn detection_macro(&self) -> &'static str {
        match self {
            AnomalyKind::C2Tunneling => "dns_c2_tunneling_detection",
            AnomalyKind::Beaconing => "dns_beaconing_detection",
            AnomalyKind::TxtRecordAnomaly => "dns_txt_record_detection",
            AnomalyKind::AnyRecordAnomaly => "dns_any_record_detection",
            AnomalyKind::HinfoRecordAnomaly => "dns_hinfo_record_detection",
            AnomalyKind::AxfrRecordAnomaly => "dns_axfr_record_detection",
            AnomalyKind::QueryLengthAnomaly => "dns_query_length_detection",
            AnomalyKind::DomainShadowing => "dns_domain_shadowing_detection",
            AnomalyKind::BehavioralCluster => "dns_behavioral_clustering_detection",
        }
    }

    pub fn detection_method(&self) -> &'static str {
        match self {
            AnomalyKind::C2Tunneling => {
                "Uses density function to find hourly query count outliers by src"
            }
            AnomalyKind::Beaconing => {
                "Analyzes consistency of time gaps between queries to same domain"
            }
            AnomalyKind::TxtRecordAnomaly => "Identifies outliers in TXT record usage by host",
            AnomalyKind::AnyRecordAnomaly => "Identifies outliers in ANY record usage by host",
            AnomalyKind::HinfoRecordAnomaly => "Identifies outliers in HINFO record usage by host",
            AnomalyKind::AxfrRecordAnomaly => "Identifies outliers in AXFR record usage by host",
            AnomalyKind::QueryLengthAnomaly => {
                "Identifies outliers in query string length by host"
            }
            AnomalyKind::DomainShadowing => {
                "Measures distinct subdomain count by parent domain and identifies outliers"
            }
            AnomalyKind::BehavioralCluster => {
                "Uses KMeans clustering on multiple DNS behavior features"
            }
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
