use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use std::sync::OnceLock;

use crate::utils::{random_string, DNS_LABEL_CHARS};

/// Popular destinations an enterprise fleet resolves all day, most
/// frequently queried first.
pub const TOP_DOMAINS: [&str; 24] = [
    "google.com",
    "microsoft.com",
    "amazon.com",
    "facebook.com",
    "apple.com",
    "netflix.com",
    "salesforce.com",
    "zoom.us",
    "office365.com",
    "github.com",
    "slack.com",
    "linkedin.com",
    "dropbox.com",
    "tableau.com",
    "adobe.com",
    "akamai.net",
    "cloudflare.com",
    "fastly.net",
    "adobe.io",
    "windows.net",
    "digicert.com",
    "azurewebsites.net",
    "shopify.com",
    "adobedtm.com",
];

const TOP_DOMAIN_WEIGHTS: [u32; 24] = [
    100, 90, 85, 80, 75, 70, 65, 60, 55, 50, 45, 40, 35, 30, 25, 20, 15, 10, 5, 5, 5, 5, 5, 5,
];

/// Fake malicious infrastructure the anomaly generators query.
pub const MALICIOUS_DOMAINS: [&str; 12] = [
    "evil-c2-server.com",
    "malware-payload.net",
    "data-exfil.org",
    "cryptominer.biz",
    "fakeupdates.xyz",
    "command-cntr.info",
    "ransomware-delivery.co",
    "steal-credentials.net",
    "backdoor-access.org",
    "trojan-updates.com",
    "malicious-cdn.net",
    "exploit-kit.xyz",
];

const COMMON_SUBDOMAIN_LABELS: [&str; 19] = [
    "www", "mail", "ftp", "smtp", "pop", "api", "cdn", "dev", "test", "prod", "stage", "uat",
    "auth", "login", "secure", "shop", "store", "blog", "docs",
];

/// How random the synthesized subdomain labels look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entropy {
    /// Short, mostly dictionary labels, as in benign traffic.
    Normal,
    /// Several long random labels, as in C2 and shadowing traffic.
    High,
    /// Very long random labels, as in data exfiltration over DNS.
    Extreme,
}

fn top_domain_index() -> &'static WeightedIndex<u32> {
    static INDEX: OnceLock<WeightedIndex<u32>> = OnceLock::new();
    INDEX.get_or_init(|| {
        WeightedIndex::new(TOP_DOMAIN_WEIGHTS).expect("static domain weights are valid")
    })
}

/// Pick a popular domain following the observed frequency distribution.
pub fn weighted_top_domain<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    TOP_DOMAINS[top_domain_index().sample(rng)]
}

pub fn random_malicious_domain<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MALICIOUS_DOMAINS
        .choose(rng)
        .copied()
        .unwrap_or(MALICIOUS_DOMAINS[0])
}

/// Build a subdomain query under `domain` with the given entropy profile.
pub fn subdomain_query<R: Rng + ?Sized>(rng: &mut R, domain: &str, entropy: Entropy) -> String {
    let label_count = match entropy {
        Entropy::Normal => rng.gen_range(1..=2),
        Entropy::High => rng.gen_range(3..=6),
        Entropy::Extreme => rng.gen_range(5..=15),
    };

    let mut labels = Vec::with_capacity(label_count + 1);
    for _ in 0..label_count {
        let label = match entropy {
            Entropy::Normal => {
                if rng.gen_bool(0.8) {
                    COMMON_SUBDOMAIN_LABELS
                        .choose(rng)
                        .copied()
                        .unwrap_or("www")
                        .to_string()
                } else {
                    let len = rng.gen_range(3..=6);
                    random_string(rng, len, DNS_LABEL_CHARS)
                }
            }
            Entropy::High => {
                let len = rng.gen_range(10..=15);
                random_string(rng, len, DNS_LABEL_CHARS)
            }
            Entropy::Extreme => {
                let len = rng.gen_range(40..=60);
                random_string(rng, len, DNS_LABEL_CHARS)
            }
        };
        labels.push(label);
    }

    labels.push(domain.to_string());
    labels.join(".")
}

/// Split a query into (parent_domain, subdomain) the way the SIEM rules
/// aggregate it: parent is the last two labels, subdomain is the rest.
pub fn split_query(query: &str) -> (String, String) {
    let labels: Vec<&str> = query.split('.').collect();
    if labels.len() <= 1 {
        return (query.to_string(), String::new());
    }

    let parent = labels[labels.len() - 2..].join(".");
    let sub = if labels.len() > 2 {
        labels[..labels.len() - 2].join(".")
    } else {
        String::new()
    };
    (parent, sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::shannon_entropy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_weighted_top_domain_prefers_head() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut head_hits = 0;
        for _ in 0..2000 {
            let domain = weighted_top_domain(&mut rng);
            if TOP_DOMAINS[..5].contains(&domain) {
                head_hits += 1;
            }
        }
        // The five heaviest domains carry ~40% of the weight
        assert!(head_hits > 500, "head hits: {}", head_hits);
    }

    #[test]
    fn test_subdomain_query_stays_under_domain() {
        let mut rng = StdRng::seed_from_u64(3);
        for entropy in [Entropy::Normal, Entropy::High, Entropy::Extreme] {
            let query = subdomain_query(&mut rng, "example.com", entropy);
            assert!(query.ends_with(".example.com"), "query: {}", query);
        }
    }

    #[test]
    fn test_extreme_entropy_is_long_and_random() {
        let mut rng = StdRng::seed_from_u64(5);
        let query = subdomain_query(&mut rng, "data-exfil.org", Entropy::Extreme);
        assert!(query.len() > 200, "len: {}", query.len());

        let first_label = query.split('.').next().unwrap();
        assert!(shannon_entropy(first_label) > 3.0);
    }

    #[test]
    fn test_normal_entropy_is_short() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let query = subdomain_query(&mut rng, "google.com", Entropy::Normal);
            let sub_labels = query.split('.').count() - 2;
            assert!((1..=2).contains(&sub_labels));
        }
    }

    #[test]
    fn test_split_query() {
        assert_eq!(
            split_query("www.google.com"),
            ("google.com".to_string(), "www".to_string())
        );
        assert_eq!(
            split_query("a.b.c.example.com"),
            ("example.com".to_string(), "a.b.c".to_string())
        );
        assert_eq!(
            split_query("zoom.us"),
            ("zoom.us".to_string(), String::new())
        );
        assert_eq!(
            split_query("localhost"),
            ("localhost".to_string(), String::new())
        );
    }
}
