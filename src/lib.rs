// DNS Synth Library
pub mod config;
pub mod pipeline;
pub mod events;
pub mod fleet;
pub mod domains;
pub mod timeline;
pub mod baseline;
pub mod output;
pub mod report;
pub mod utils;

// Modules with submodules
pub mod anomalies {
    pub mod tunneling;
    pub mod beaconing;
    pub mod record_flood;
    pub mod query_length;
    pub mod shadowing;
    pub mod cluster;

    // Re-export the manager and related types
    mod manager;
    pub use manager::*;
}
