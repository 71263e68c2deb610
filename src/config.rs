use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use std::path::{Path, PathBuf};

use ipnetwork::Ipv4Network;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub fleet: FleetConfig,
    pub anomalies: AnomaliesConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub run_id: Option<String>,
    pub max_events: usize,
    pub period_days: i64,
    pub baseline_fraction: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub linux_percentage: u8,
    pub dns_servers: Vec<String>,
    pub departments: Vec<DepartmentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    pub name: String,
    pub subnet: String,
    pub host_count: usize,
    pub query_rate_min: u32,
    pub query_rate_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomaliesConfig {
    pub anomaly_hosts: usize,
    pub tunneling: TunnelingConfig,
    pub beaconing: BeaconingConfig,
    pub txt_flood: TxtFloodConfig,
    pub any_flood: RecordFloodConfig,
    pub hinfo_flood: RecordFloodConfig,
    pub axfr_flood: RecordFloodConfig,
    pub query_length: QueryLengthConfig,
    pub shadowing: ShadowingConfig,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelingConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub window_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconingConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub interval_minutes: i64,
    pub jitter_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxtFloodConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub spread_hours: i64,
    pub min_content_length: usize,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFloodConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub spread_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLengthConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub spread_hours: i64,
    pub min_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowingConfig {
    pub enabled: bool,
    pub num_events: usize,
    pub spread_hours: i64,
    pub unique_subdomains: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub enabled: bool,
    pub cluster_size: usize,
    pub events_per_host: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub events_path: PathBuf,
    pub summary_path: PathBuf,
    pub compress: bool,
    pub checksum: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: PathBuf,
    pub max_file_size_mb: u64,
    pub max_files: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file(Path::new("."))?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit config file, then apply `DNS_SYNTH_*`
    /// environment overrides. Nested keys use a double underscore,
    /// e.g. `DNS_SYNTH_GENERATOR__MAX_EVENTS=1000`.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(config_path.to_path_buf()))
            .add_source(
                config::Environment::with_prefix("DNS_SYNTH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Set defaults and validate
        config.set_defaults();
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(base: &Path) -> Result<PathBuf> {
        let possible_paths = vec![
            base.join("config.yaml"),
            base.join("config.yml"),
            PathBuf::from("/etc/dns-synth/config.yaml"),
            PathBuf::from("/usr/local/etc/dns-synth/config.yaml"),
        ];

        for path in possible_paths {
            if path.exists() {
                return Ok(path);
            }
        }

        // Create default config if none found
        let default_config = Self::default();
        let config_content = serde_yaml::to_string(&default_config)
            .context("Failed to serialize default config")?;

        let path = base.join("config.yaml");
        std::fs::write(&path, config_content)
            .context("Failed to write default config")?;

        Ok(path)
    }

    fn set_defaults(&mut self) {
        if self.generator.run_id.is_none() {
            self.generator.run_id = Some(uuid::Uuid::new_v4().to_string());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generator.max_events == 0 {
            anyhow::bail!("Max events must be greater than 0");
        }

        if self.generator.period_days <= 0 {
            anyhow::bail!("Period must be at least one day");
        }

        if self.generator.baseline_fraction <= 0.0 || self.generator.baseline_fraction > 1.0 {
            anyhow::bail!("Baseline fraction must be in (0, 1]");
        }

        if self.fleet.departments.is_empty() {
            anyhow::bail!("At least one department must be configured");
        }

        if self.fleet.dns_servers.is_empty() {
            anyhow::bail!("At least one DNS server must be configured");
        }

        let mut total_hosts = 0;
        for dept in &self.fleet.departments {
            let subnet: Ipv4Network = dept.subnet.parse().with_context(|| {
                format!("Invalid subnet '{}' for department {}", dept.subnet, dept.name)
            })?;

            // The network address is not usable for a host
            let usable = (subnet.size() as usize).saturating_sub(1);
            if dept.host_count > usable {
                anyhow::bail!(
                    "Department {} wants {} hosts but subnet {} only has {} usable addresses",
                    dept.name,
                    dept.host_count,
                    dept.subnet,
                    usable
                );
            }

            if dept.query_rate_min == 0 || dept.query_rate_min > dept.query_rate_max {
                anyhow::bail!("Invalid query rate range for department {}", dept.name);
            }

            total_hosts += dept.host_count;
        }

        if self.anomalies.anomaly_hosts > total_hosts {
            anyhow::bail!(
                "Cannot select {} anomaly hosts from a fleet of {}",
                self.anomalies.anomaly_hosts,
                total_hosts
            );
        }

        if let Some(parent) = self.output.events_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create output directory")?;
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig {
                run_id: None,
                max_events: 500_000,
                period_days: 30,
                baseline_fraction: 0.75,
                seed: None,
            },
            fleet: FleetConfig {
                linux_percentage: 20,
                dns_servers: vec![
                    "10.0.0.1".to_string(),
                    "10.0.0.2".to_string(),
                    "10.0.0.3".to_string(),
                ],
                departments: vec![
                    DepartmentConfig {
                        name: "IT".to_string(),
                        subnet: "10.1.1.0/24".to_string(),
                        host_count: 15,
                        query_rate_min: 10,
                        query_rate_max: 50,
                    },
                    DepartmentConfig {
                        name: "Engineering".to_string(),
                        subnet: "10.1.2.0/24".to_string(),
                        host_count: 25,
                        query_rate_min: 8,
                        query_rate_max: 40,
                    },
                    DepartmentConfig {
                        name: "Sales".to_string(),
                        subnet: "10.1.3.0/24".to_string(),
                        host_count: 20,
                        query_rate_min: 5,
                        query_rate_max: 25,
                    },
                    DepartmentConfig {
                        name: "Marketing".to_string(),
                        subnet: "10.1.4.0/24".to_string(),
                        host_count: 15,
                        query_rate_min: 5,
                        query_rate_max: 25,
                    },
                    DepartmentConfig {
                        name: "Finance".to_string(),
                        subnet: "10.1.5.0/24".to_string(),
                        host_count: 10,
                        query_rate_min: 3,
                        query_rate_max: 15,
                    },
                    DepartmentConfig {
                        name: "HR".to_string(),
                        subnet: "10.1.6.0/24".to_string(),
                        host_count: 5,
                        query_rate_min: 2,
                        query_rate_max: 10,
                    },
                    DepartmentConfig {
                        name: "Servers".to_string(),
                        subnet: "10.2.0.0/24".to_string(),
                        host_count: 10,
                        query_rate_min: 20,
                        query_rate_max: 80,
                    },
                ],
            },
            anomalies: AnomaliesConfig {
                anomaly_hosts: 10,
                tunneling: TunnelingConfig {
                    enabled: true,
                    num_events: 5000,
                    window_hours: 1,
                },
                beaconing: BeaconingConfig {
                    enabled: true,
                    num_events: 2000,
                    interval_minutes: 5,
                    jitter_seconds: 2.0,
                },
                txt_flood: TxtFloodConfig {
                    enabled: true,
                    num_events: 1000,
                    spread_hours: 3,
                    min_content_length: 100,
                    max_content_length: 300,
                },
                any_flood: RecordFloodConfig {
                    enabled: true,
                    num_events: 800,
                    spread_hours: 4,
                },
                hinfo_flood: RecordFloodConfig {
                    enabled: true,
                    num_events: 600,
                    spread_hours: 3,
                },
                axfr_flood: RecordFloodConfig {
                    enabled: true,
                    num_events: 500,
                    spread_hours: 2,
                },
                query_length: QueryLengthConfig {
                    enabled: true,
                    num_events: 1500,
                    spread_hours: 5,
                    min_length: 200,
                },
                shadowing: ShadowingConfig {
                    enabled: true,
                    num_events: 2000,
                    spread_hours: 8,
                    unique_subdomains: 500,
                },
                cluster: ClusterConfig {
                    enabled: true,
                    cluster_size: 3,
                    events_per_host: 1000,
                },
            },
            output: OutputConfig {
                events_path: PathBuf::from("dns_events.json"),
                summary_path: PathBuf::from("dns_events_summary.txt"),
                compress: false,
                checksum: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: PathBuf::from("./logs/dns-synth.log"),
                max_file_size_mb: 100,
                max_files: 10,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_fleet_size() {
        let config = Config::default();
        let total: usize = config
            .fleet
            .departments
            .iter()
            .map(|d| d.host_count)
            .sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_invalid_subnet_rejected() {
        let mut config = Config::default();
        config.fleet.departments[0].subnet = "not-a-subnet".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_department_rejected() {
        let mut config = Config::default();
        config.fleet.departments[0].host_count = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_anomaly_hosts_bounded_by_fleet() {
        let mut config = Config::default();
        config.anomalies.anomaly_hosts = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_events_rejected() {
        let mut config = Config::default();
        config.generator.max_events = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_materialized_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::find_config_file(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("config.yaml"));
        assert!(path.exists());

        let loaded = Config::load_from(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(loaded.generator.period_days, defaults.generator.period_days);
        assert_eq!(
            loaded.fleet.departments.len(),
            defaults.fleet.departments.len()
        );
        assert_eq!(loaded.anomalies.anomaly_hosts, defaults.anomalies.anomaly_hosts);
        // set_defaults fills the run id on load
        assert!(loaded.generator.run_id.is_some());
    }

    #[test]
    fn test_existing_config_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config.yml");
        let contents = serde_yaml::to_string(&Config::default()).unwrap();
        std::fs::write(&existing, contents).unwrap();

        let path = Config::find_config_file(dir.path()).unwrap();
        assert_eq!(path, existing);
        assert!(!dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::find_config_file(dir.path()).unwrap();

        std::env::set_var("DNS_SYNTH_GENERATOR__MAX_EVENTS", "1234");
        let loaded = Config::load_from(&path);
        std::env::remove_var("DNS_SYNTH_GENERATOR__MAX_EVENTS");

        assert_eq!(loaded.unwrap().generator.max_events, 1234);
    }
}
