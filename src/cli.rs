//! CLI for this application
//!
use url::Url;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("TERN_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("TERN_HTTP_LISTEN_PORT"),
        help = "Port to bind the Tern HTTP server to"
    )]
    pub listen_port: u16,

    // Bucket settings: shared capacity
    #[clap(
        long,
        default_value = "100",
        env("TERN_BUCKET_CAPACITY"),
        help = "Token bucket capacity (the shared cluster-wide budget)"
    )]
    pub bucket_capacity: u64,

    // Bucket settings: refill rate
    #[clap(
        long,
        default_value = "1",
        env("TERN_REFILL_RATE"),
        help = "Whole tokens refilled per second"
    )]
    pub refill_rate: u32,

    // Gossip interval between sync rounds
    #[clap(
        long,
        default_value = "5000",
        env("TERN_GOSSIP_INTERVAL_MS"),
        help = "Milliseconds between gossip rounds"
    )]
    pub gossip_interval_ms: u64,

    // Per-peer push timeout
    #[clap(
        long,
        default_value = "2000",
        env("TERN_PUSH_TIMEOUT_MS"),
        help = "Per-peer push timeout in milliseconds"
    )]
    pub push_timeout_ms: u64,

    // Static peer set
    #[clap(
        long,
        env("TERN_PEERS"),
        value_delimiter = ',',
        help = "Peer base URLs (e.g., http://node1:8710,http://node2:8710). If empty, runs without gossip."
    )]
    pub peers: Vec<Url>,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            bucket: settings::BucketSettings {
                capacity: self.bucket_capacity,
                refill_rate: self.refill_rate,
            },
            gossip_interval_ms: self.gossip_interval_ms,
            push_timeout_ms: self.push_timeout_ms,
            peers: self.peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["tern"]);
        let settings = cli.into_settings();
        assert_eq!(settings.listen_port, settings::STANDARD_PORT_HTTP);
        assert_eq!(settings.bucket.capacity, 100);
        assert_eq!(settings.bucket.refill_rate, 1);
        assert!(settings.peers.is_empty());
    }

    #[test]
    fn peers_split_on_commas() {
        let cli = Cli::parse_from([
            "tern",
            "--peers",
            "http://node1:8710,http://node2:8710",
        ]);
        let settings = cli.into_settings();
        assert_eq!(settings.peers.len(), 2);
        assert_eq!(settings.peers[0].as_str(), "http://node1:8710/");
    }
}
