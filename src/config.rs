use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::cache::keys::{CANDIDATE_IDS_TTL, DEFAULT_CANDIDATE_CAPACITY};

pub const DEFAULT_COOLDOWN_MINS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub candidate_cache_capacity: usize,
    pub candidate_cache_ttl: Duration,
    pub default_cooldown_mins: u64,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(5000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let candidate_cache_capacity = env_parse::<usize>("CANDIDATE_CACHE_CAPACITY")
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CANDIDATE_CAPACITY);

        let candidate_cache_ttl = env_parse::<u64>("CANDIDATE_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(CANDIDATE_IDS_TTL);

        let default_cooldown_mins =
            env_parse::<u64>("DEFAULT_COOLDOWN_MINS").unwrap_or(DEFAULT_COOLDOWN_MINS);

        let seed_demo_data = env_bool("SEED_DEMO_DATA").unwrap_or(true);

        Self {
            host,
            port,
            log_level,
            candidate_cache_capacity,
            candidate_cache_ttl,
            default_cooldown_mins,
            seed_demo_data,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn default_cooldown(&self) -> Duration {
        Duration::from_secs(self.default_cooldown_mins.saturating_mul(60))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            log_level: "info".to_string(),
            candidate_cache_capacity: DEFAULT_CANDIDATE_CAPACITY,
            candidate_cache_ttl: CANDIDATE_IDS_TTL,
            default_cooldown_mins: DEFAULT_COOLDOWN_MINS,
            seed_demo_data: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

pub fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
