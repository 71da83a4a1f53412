use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

fn default_port() -> u16 {
    25565
}

fn default_ipv6() -> bool {
    true
}

fn default_max_connections() -> usize {
    32
}

fn default_timeout() -> u64 {
    15
}

fn default_compression() -> i32 {
    2
}

fn default_difficulty() -> u8 {
    1
}

fn default_description() -> String {
    "A Minecraft server running on galena".to_owned()
}

fn default_world() -> PathBuf {
    PathBuf::from("world")
}

fn default_keepalive_send_interval() -> u64 {
    10
}

fn default_keepalive_timeout() -> u64 {
    30
}

fn default_players_max() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepaliveConfig {
    #[serde(default = "default_keepalive_send_interval")]
    pub send_interval: u64,
    #[serde(default = "default_keepalive_timeout")]
    pub timeout: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            send_interval: default_keepalive_send_interval(),
            timeout: default_keepalive_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayersConfig {
    #[serde(default = "default_players_max")]
    pub max: u32,
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            max: default_players_max(),
        }
    }
}

/// One listener's configuration; every key is optional in the JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Explicit bind address; overrides the `ipv6` wildcard choice.
    pub host: Option<String>,
    pub ipv6: bool,
    pub max_connections: usize,
    /// Connection idle timeout, seconds.
    pub timeout: u64,
    pub online: bool,
    /// Compression threshold in bytes; negative disables the compressed
    /// framing layer entirely.
    pub compression: i32,
    /// Fallback difficulty when level.dat does not carry one.
    pub difficulty: u8,
    pub keepalive: KeepaliveConfig,
    pub players: PlayersConfig,
    pub description: String,
    pub world: PathBuf,
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: None,
            ipv6: default_ipv6(),
            max_connections: default_max_connections(),
            timeout: default_timeout(),
            online: false,
            compression: default_compression(),
            difficulty: default_difficulty(),
            keepalive: KeepaliveConfig::default(),
            players: PlayersConfig::default(),
            description: default_description(),
            world: default_world(),
            data_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        match &self.host {
            Some(host) => format!("{}:{}", host, self.port),
            None if self.ipv6 => format!("[::]:{}", self.port),
            None => format!("0.0.0.0:{}", self.port),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("galena-data"))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn keepalive_send_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive.send_interval)
    }

    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive.timeout)
    }
}
