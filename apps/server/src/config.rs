use std::net::SocketAddr;

use anyhow::Context;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8088";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `formdesk.db`.
    pub data_dir: String,
    pub listen_addr: SocketAddr,
    /// Cloud sync is disabled when unset.
    pub cloud_api_url: Option<String>,
    pub cloud_token: Option<String>,
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let listen_addr = env_value(&lookup, "FORMDESK_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid FORMDESK_LISTEN_ADDR '{}'", listen_addr))?;

        Ok(Self {
            data_dir: env_value(&lookup, "FORMDESK_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            listen_addr,
            cloud_api_url: env_value(&lookup, "FORMDESK_CLOUD_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            cloud_token: env_value(&lookup, "FORMDESK_CLOUD_TOKEN"),
        })
    }
}
