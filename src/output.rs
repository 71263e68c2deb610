use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::events::DnsEvent;
use crate::utils;

#[derive(Debug, Clone)]
pub struct SinkStats {
    pub events_written: usize,
    pub bytes_written: u64,
    pub path: PathBuf,
}

/// Destination for the finished event stream. The pipeline only ever talks
/// to this trait, so new sinks slot in without touching generation code.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn write_events(&self, events: &[DnsEvent]) -> Result<SinkStats>;
    fn name(&self) -> &'static str;
}

/// Plain newline-delimited JSON, one event per line.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn write_events(&self, events: &[DnsEvent]) -> Result<SinkStats> {
        let buffer = encode_events(events)?;
        let bytes_written = buffer.len() as u64;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create output directory")?;
            }
        }
        tokio::fs::write(&self.path, buffer)
            .await
            .with_context(|| format!("Failed to write events to {}", self.path.display()))?;

        info!(
            "Wrote {} events to {} ({})",
            events.len(),
            self.path.display(),
            utils::format_bytes(bytes_written)
        );

        Ok(SinkStats {
            events_written: events.len(),
            bytes_written,
            path: self.path.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "json_lines"
    }
}

/// Gzip-compressed NDJSON for runs large enough that the raw file hurts.
pub struct GzipJsonLinesSink {
    path: PathBuf,
}

impl GzipJsonLinesSink {
    /// `path` is the logical output path; the sink appends `.gz`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut path: PathBuf = path.into();
        let mut name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "events.json".to_string());
        name.push_str(".gz");
        path.set_file_name(name);
        Self { path }
    }
}

#[async_trait]
impl EventSink for GzipJsonLinesSink {
    async fn write_events(&self, events: &[DnsEvent]) -> Result<SinkStats> {
        let buffer = encode_events(events)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&buffer)
            .context("Failed to compress events")?;
        let compressed = encoder.finish().context("Failed to finish compression")?;
        let bytes_written = compressed.len() as u64;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create output directory")?;
            }
        }
        tokio::fs::write(&self.path, compressed)
            .await
            .with_context(|| format!("Failed to write events to {}", self.path.display()))?;

        info!(
            "Wrote {} events to {} ({} compressed from {})",
            events.len(),
            self.path.display(),
            utils::format_bytes(bytes_written),
            utils::format_bytes(buffer.len() as u64)
        );

        Ok(SinkStats {
            events_written: events.len(),
            bytes_written,
            path: self.path.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "gzip_json_lines"
    }
}

fn encode_events(events: &[DnsEvent]) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(events.len() * 512);
    for event in events {
        serde_json::to_writer(&mut buffer, event).context("Failed to serialize event")?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// SHA-256 of a finished output file, for the summary report.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {} for checksum", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AnomalyKind, RecordType};
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn sample_events() -> Vec<DnsEvent> {
        use crate::config::Config;
        use crate::baseline::BaselineGenerator;
        use crate::fleet::generate_fleet;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(5);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();
        let baseline = BaselineGenerator::new(&config.fleet);
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();

        let mut events: Vec<DnsEvent> = (0..10)
            .map(|_| baseline.normal_event(&mut rng, &hosts[0], timestamp))
            .collect();
        events[0].label(AnomalyKind::C2Tunneling);
        events
    }

    #[tokio::test]
    async fn test_json_lines_sink_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let events = sample_events();

        let sink = JsonLinesSink::new(&path);
        let stats = sink.write_events(&events).await.unwrap();
        assert_eq!(stats.events_written, events.len());
        assert_eq!(stats.path, path);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), events.len());

        let first: DnsEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.anomaly_type, Some(AnomalyKind::C2Tunneling));
        let second: DnsEvent = serde_json::from_str(lines[1]).unwrap();
        assert!(second.anomaly_type.is_none());
        assert!(matches!(
            second.record_type,
            RecordType::A
                | RecordType::Aaaa
                | RecordType::Mx
                | RecordType::Txt
                | RecordType::Cname
                | RecordType::Ns
                | RecordType::Ptr
                | RecordType::Any
        ));
    }

    #[tokio::test]
    async fn test_gzip_sink_adds_suffix_and_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let events = sample_events();

        let sink = GzipJsonLinesSink::new(&path);
        let stats = sink.write_events(&events).await.unwrap();
        assert_eq!(stats.path, dir.path().join("events.json.gz"));

        let compressed = std::fs::read(&stats.path).unwrap();
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded.lines().count(), events.len());
    }

    #[tokio::test]
    async fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, b"hello\n").unwrap();

        let digest = sha256_file(&path).await.unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }
}
