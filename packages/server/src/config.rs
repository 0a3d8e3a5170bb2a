//! Server configuration from environment variables.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Extra provider descriptor file, merged after the builtin set
    pub providers_file: Option<String>,
    /// SOCKS5h proxy for `.onion` probes
    pub socks_proxy: Option<String>,
    pub hibp_api_key: Option<String>,
    /// Global outbound concurrency cap
    pub concurrency: usize,
    /// External face-restoration endpoint
    pub face_restore_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("PORT is not a valid port number")?,
            Err(_) => 8080,
        };
        let concurrency = match std::env::var("SCAN_CONCURRENCY") {
            Ok(raw) => raw
                .parse()
                .context("SCAN_CONCURRENCY is not a valid integer")?,
            Err(_) => 6,
        };

        Ok(Self {
            port,
            providers_file: std::env::var("PROVIDERS_FILE").ok(),
            socks_proxy: std::env::var("SOCKS_PROXY").ok(),
            hibp_api_key: std::env::var("HIBP_API_KEY").ok(),
            concurrency,
            face_restore_url: std::env::var("FACE_RESTORE_URL").ok(),
        })
    }
}
