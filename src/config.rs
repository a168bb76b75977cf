use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: Option<String>,
    pub seed_topics: bool,
    /// JSON file replacing the built-in prerequisite table.
    pub prerequisite_graph_path: Option<PathBuf>,
    pub cold_start_topic: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            jwt_secret: None,
            seed_topics: true,
            prerequisite_graph_path: None,
            cold_start_topic: "Arrays".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let jwt_secret = non_empty_env("JWT_SECRET");
        let seed_topics = env_bool("SEED_TOPICS").unwrap_or(defaults.seed_topics);
        let prerequisite_graph_path = non_empty_env("PREREQUISITE_GRAPH_PATH").map(PathBuf::from);
        let cold_start_topic =
            non_empty_env("COLD_START_TOPIC").unwrap_or(defaults.cold_start_topic);

        Self {
            host,
            port,
            log_level,
            jwt_secret,
            seed_topics,
            prerequisite_graph_path,
            cold_start_topic,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
