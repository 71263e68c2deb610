use anyhow::{Context, Result};
use ipnetwork::Ipv4Network;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::info;

use crate::config::FleetConfig;

/// First names used for workstation hostnames.
const COMMON_NAMES: [&str; 97] = [
    "john", "david", "michael", "james", "robert", "william", "joseph", "thomas", "charles",
    "mary", "patricia", "jennifer", "linda", "elizabeth", "barbara", "susan", "jessica", "sarah",
    "karen", "lisa", "nancy", "betty", "margaret", "sandra", "ashley", "kimberly", "emily",
    "donna", "michelle", "carol", "amanda", "melissa", "deborah", "stephanie", "rebecca", "laura",
    "helen", "sharon", "cynthia", "kathleen", "amy", "anna", "angela", "ruth", "brenda", "pamela",
    "nicole", "katherine", "samantha", "christine", "emma", "catherine", "rachel", "carolyn",
    "janet", "maria", "heather", "diane", "julie", "joyce", "victoria", "kelly", "christina",
    "lauren", "joan", "evelyn", "olivia", "megan", "cheryl", "martha", "andrea", "hannah",
    "richard", "daniel", "paul", "mark", "donald", "george", "kenneth", "steven", "edward",
    "brian", "ronald", "anthony", "kevin", "jason", "matthew", "gary", "timothy", "jose", "larry",
    "jeffrey", "frank", "scott", "eric", "stephen", "andrew",
];

const WINDOWS_OS_VERSIONS: [&str; 7] =
    ["win10", "win11", "win7", "winxp", "win2k19", "win2k16", "win2k12"];

const LINUX_DISTRIBUTIONS: [&str; 8] =
    ["ubuntu", "fedora", "debian", "centos", "rhel", "suse", "arch", "kali"];

const DEVICE_TYPES: [&str; 7] = ["laptop", "desktop", "wks", "pc", "tablet", "server", "vm"];

const SERVER_ROLES: [&str; 5] = ["srv", "app", "db", "web", "api"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    Linux,
}

impl OsType {
    /// DNS client stack the SIEM sees for this OS.
    pub fn vendor_product(&self) -> &'static str {
        match self {
            OsType::Windows => "Microsoft DNS",
            OsType::Linux => "BIND",
        }
    }
}

/// One fabricated internal machine and its traffic profile.
#[derive(Debug, Clone)]
pub struct HostProfile {
    pub ip: Ipv4Addr,
    pub hostname: String,
    pub os: OsType,
    pub department: String,
    /// Baseline queries per hour at peak activity.
    pub query_rate: u32,
    pub user_name: String,
}

impl HostProfile {
    pub fn is_server(&self) -> bool {
        self.department == "Servers"
    }
}

/// Fabricate the internal host population from the department table.
pub fn generate_fleet<R: Rng + ?Sized>(config: &FleetConfig, rng: &mut R) -> Result<Vec<HostProfile>> {
    let mut hosts = Vec::new();
    let mut taken_hostnames = HashSet::new();

    for dept in &config.departments {
        let subnet: Ipv4Network = dept
            .subnet
            .parse()
            .with_context(|| format!("Invalid subnet for department {}", dept.name))?;

        // Skip the network address; hand out addresses in order
        let addresses: Vec<Ipv4Addr> = subnet.iter().skip(1).take(dept.host_count).collect();

        for ip in addresses {
            let name = COMMON_NAMES.choose(rng).copied().unwrap_or("john");
            let is_server_dept = dept.name == "Servers";

            let os = if is_server_dept {
                // Server racks lean heavily Linux
                if rng.gen_bool(0.8) {
                    OsType::Linux
                } else {
                    OsType::Windows
                }
            } else if rng.gen_bool(f64::from(config.linux_percentage) / 100.0) {
                OsType::Linux
            } else {
                OsType::Windows
            };

            let base_hostname = if is_server_dept {
                let role = SERVER_ROLES.choose(rng).copied().unwrap_or("srv");
                format!("{}-{}.internal", role, rng.gen_range(100..1000))
            } else {
                match os {
                    OsType::Windows => {
                        let version = WINDOWS_OS_VERSIONS.choose(rng).copied().unwrap_or("win10");
                        if rng.gen_bool(0.5) {
                            format!("{}-{}-{}", name, version, dept.name.to_lowercase())
                        } else {
                            format!("{}-{}", name, version)
                        }
                    }
                    OsType::Linux => {
                        if rng.gen_bool(0.3) {
                            let device = DEVICE_TYPES.choose(rng).copied().unwrap_or("laptop");
                            format!("{}-{}-{}", dept.name.to_lowercase(), device, name)
                        } else {
                            let distro =
                                LINUX_DISTRIBUTIONS.choose(rng).copied().unwrap_or("ubuntu");
                            format!("{}-{}", name, distro)
                        }
                    }
                }
            };

            // Per-host event tallies are keyed by hostname, so collisions
            // from repeated first names must be broken up
            let mut hostname = base_hostname.clone();
            let mut suffix = 2;
            while !taken_hostnames.insert(hostname.clone()) {
                hostname = format!("{}-{}", base_hostname, suffix);
                suffix += 1;
            }

            let base_rate = rng.gen_range(dept.query_rate_min..=dept.query_rate_max);
            let individual_multiplier = rng.gen_range(0.7..1.3);
            let query_rate = ((f64::from(base_rate) * individual_multiplier) as u32).max(1);

            hosts.push(HostProfile {
                ip,
                hostname,
                os,
                department: dept.name.clone(),
                query_rate,
                user_name: name.to_string(),
            });
        }
    }

    info!(
        "Generated {} hosts across {} departments",
        hosts.len(),
        config.departments.len()
    );

    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fleet_matches_department_table() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(42);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();

        assert_eq!(hosts.len(), 100);
        for dept in &config.fleet.departments {
            let count = hosts.iter().filter(|h| h.department == dept.name).count();
            assert_eq!(count, dept.host_count, "department {}", dept.name);
        }
    }

    #[test]
    fn test_hosts_live_in_their_subnet() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(1);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();

        for dept in &config.fleet.departments {
            let subnet: Ipv4Network = dept.subnet.parse().unwrap();
            for host in hosts.iter().filter(|h| h.department == dept.name) {
                assert!(subnet.contains(host.ip), "{} not in {}", host.ip, subnet);
            }
        }
    }

    #[test]
    fn test_hostnames_are_unique() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(99);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();

        let unique: HashSet<&str> = hosts.iter().map(|h| h.hostname.as_str()).collect();
        assert_eq!(unique.len(), hosts.len());
    }

    #[test]
    fn test_server_hostnames_use_internal_suffix() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(5);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();

        for host in hosts.iter().filter(|h| h.is_server()) {
            assert!(
                host.hostname.contains(".internal"),
                "server hostname: {}",
                host.hostname
            );
        }
    }

    #[test]
    fn test_query_rates_positive_and_bounded() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(7);
        let hosts = generate_fleet(&config.fleet, &mut rng).unwrap();

        for host in &hosts {
            let dept = config
                .fleet
                .departments
                .iter()
                .find(|d| d.name == host.department)
                .unwrap();
            assert!(host.query_rate >= 1);
            // Rate range plus the +30% individual variance ceiling
            let upper = (f64::from(dept.query_rate_max) * 1.3).ceil() as u32;
            assert!(host.query_rate <= upper);
        }
    }

    #[test]
    fn test_seeded_fleet_is_reproducible() {
        let config = Config::default();
        let mut rng_a = StdRng::seed_from_u64(1234);
        let mut rng_b = StdRng::seed_from_u64(1234);
        let fleet_a = generate_fleet(&config.fleet, &mut rng_a).unwrap();
        let fleet_b = generate_fleet(&config.fleet, &mut rng_b).unwrap();

        let names_a: Vec<&str> = fleet_a.iter().map(|h| h.hostname.as_str()).collect();
        let names_b: Vec<&str> = fleet_b.iter().map(|h| h.hostname.as_str()).collect();
        assert_eq!(names_a, names_b);
    }
}
