use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::http::HttpVersion;

static CONFIG: OnceLock<ServerConfig> = OnceLock::new();

/// Settings of the local edge emulator.
///
/// Only process-wide, read-only settings live here. Anything that belongs to
/// one request travels in an [`EdgeEnv`](crate::edge::EdgeEnv).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub buffer_size: usize,

    pub http_version: HttpVersion,
    pub max_path_size: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,

    #[serde(deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub write_timeout: Duration,

    pub static_files_root: String,

    pub server_name: String,

    /// Reported to the adapter as the connection's `secure` flag, for
    /// deployments behind a TLS terminator.
    pub secure: bool,

    /// Query key that asks for AMP output, e.g. `/p/1.html?amp=1`.
    pub amp_query_param: String,

    /// Path prefixes served as cached routes; responses on them must not
    /// set cookies.
    pub cached_paths: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            buffer_size: 4096,

            http_version: HttpVersion::V1_1,
            max_path_size: 1024,
            max_header_size: 8192,
            max_body_size: 1024 * 1024, // 1 MB

            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),

            static_files_root: "./static".to_string(),

            server_name: "storefront-edge/0.1".to_string(),

            secure: false,
            amp_query_param: "amp".to_string(),
            cached_paths: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("fail to read {}: {}, falling back to default config", path, err);
                return ServerConfig::default();
            }
        };

        match Self::from_toml(&content) {
            Ok(server_config) => server_config,
            Err(err) => {
                warn!(
                    "fail to deserialize config file {}: {}, falling back to default config",
                    path, err
                );
                ServerConfig::default()
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ServerConfig>(content)
    }

    pub fn is_cached_path(&self, path: &str) -> bool {
        self.cached_paths
            .iter()
            .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
    }

    pub fn log_info(&self) {
        info!(
            "listening on {}:{}, serving {} (secure: {}, amp param: {:?})",
            self.address, self.port, self.static_files_root, self.secure, self.amp_query_param
        );
    }
}

/// Installs the process-wide config. Only the first call has an effect.
pub fn set_config(cfg: ServerConfig) {
    if CONFIG.set(cfg).is_err() {
        warn!("config already set, ignoring");
    }
}

/// The installed config, or the defaults when none was installed.
pub fn config() -> &'static ServerConfig {
    CONFIG.get_or_init(ServerConfig::default)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Ok(Duration::from_secs_f64(secs))
}
