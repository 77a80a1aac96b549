use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::shm::{self, OFFSETS_FILE_NAME};

pub const ENV_BIND_ADDR: &str = "AEROFLY_BRIDGE_BIND_ADDR";
pub const ENV_TCP_PORT: &str = "AEROFLY_BRIDGE_TCP_PORT";
pub const ENV_TCP_CMD_PORT: &str = "AEROFLY_BRIDGE_TCP_CMD_PORT";
pub const ENV_WS_ENABLE: &str = "AEROFLY_BRIDGE_WS_ENABLE";
pub const ENV_WS_PORT: &str = "AEROFLY_BRIDGE_WS_PORT";
pub const ENV_BROADCAST_MS: &str = "AEROFLY_BRIDGE_BROADCAST_MS";
pub const ENV_IDLE_TIMEOUT_MS: &str = "AEROFLY_BRIDGE_IDLE_TIMEOUT_MS";
pub const ENV_SHM_ENABLE: &str = "AEROFLY_BRIDGE_SHM_ENABLE";
pub const ENV_SHM_NAME: &str = "AEROFLY_BRIDGE_SHM_NAME";
pub const ENV_SHM_DIR: &str = "AEROFLY_BRIDGE_SHM_DIR";
pub const ENV_OFFSETS_PATH: &str = "AEROFLY_BRIDGE_OFFSETS_PATH";
pub const ENV_LOG_LEVEL: &str = "AEROFLY_BRIDGE_LOG_LEVEL";
pub const ENV_LOG_CONSOLE: &str = "AEROFLY_BRIDGE_LOG_CONSOLE";
pub const ENV_LOG_FILE: &str = "AEROFLY_BRIDGE_LOG_FILE";

pub const MIN_BROADCAST_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: expected {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{key}: port {port} is privileged")]
    PrivilegedPort { key: &'static str, port: u16 },
    #[error("broadcast interval {0:?} is below the 5 ms minimum")]
    IntervalTooShort(Duration),
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: IpAddr,
    pub tcp_data_port: u16,
    pub tcp_command_port: u16,
    pub ws_enabled: bool,
    pub ws_port: u16,
    pub broadcast_interval: Duration,
    /// Command and WebSocket connections without traffic for this long are
    /// closed. TCP data clients never send, so they are exempt.
    pub idle_timeout: Duration,
    pub shm_enabled: bool,
    pub shm_name: String,
    pub shm_dir: PathBuf,
    pub offsets_path: Option<PathBuf>,
    pub max_clients: usize,
    /// Snapshots queued per client before it is dropped as too slow.
    pub client_backlog: usize,
    pub write_timeout: Duration,
    pub max_command_bytes: usize,
    pub max_message_bytes: usize,
    pub handshake_timeout: Duration,
    pub command_queue_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            tcp_data_port: 12345,
            tcp_command_port: 12346,
            ws_enabled: true,
            ws_port: 8765,
            broadcast_interval: Duration::from_millis(20),
            idle_timeout: Duration::from_secs(30),
            shm_enabled: true,
            shm_name: "AeroflyBridgeData".to_owned(),
            shm_dir: shm::default_dir(),
            offsets_path: None,
            max_clients: 32,
            client_backlog: 8,
            write_timeout: Duration::from_secs(2),
            max_command_bytes: 64 * 1024,
            max_message_bytes: 1024 * 1024,
            handshake_timeout: Duration::from_secs(5),
            command_queue_capacity: 1024,
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    /// Loopback-only config on ephemeral ports with shared memory off.
    pub fn local() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            tcp_data_port: 0,
            tcp_command_port: 0,
            ws_port: 0,
            shm_enabled: false,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `AEROFLY_BRIDGE_*` values. Invalid values are
    /// logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        };

        if let Some((key, v)) = get(ENV_BIND_ADDR) {
            let parsed = v
                .parse::<IpAddr>()
                .map_err(|_| invalid(key, &v, "an IP address"));
            apply(&mut config.bind_addr, key, parsed);
        }
        if let Some((key, v)) = get(ENV_TCP_PORT) {
            apply(&mut config.tcp_data_port, key, parse_port(key, &v));
        }
        if let Some((key, v)) = get(ENV_TCP_CMD_PORT) {
            apply(&mut config.tcp_command_port, key, parse_port(key, &v));
        }
        if let Some((key, v)) = get(ENV_WS_ENABLE) {
            apply(&mut config.ws_enabled, key, parse_flag(key, &v));
        }
        if let Some((key, v)) = get(ENV_WS_PORT) {
            apply(&mut config.ws_port, key, parse_port(key, &v));
        }
        if let Some((key, v)) = get(ENV_BROADCAST_MS) {
            let parsed = parse_millis(key, &v).and_then(|interval| {
                if interval < MIN_BROADCAST_INTERVAL {
                    Err(ConfigError::IntervalTooShort(interval))
                } else {
                    Ok(interval)
                }
            });
            apply(&mut config.broadcast_interval, key, parsed);
        }
        if let Some((key, v)) = get(ENV_IDLE_TIMEOUT_MS) {
            let parsed = parse_millis(key, &v).and_then(|d| {
                if d.is_zero() {
                    Err(ConfigError::Zero(key))
                } else {
                    Ok(d)
                }
            });
            apply(&mut config.idle_timeout, key, parsed);
        }
        if let Some((key, v)) = get(ENV_SHM_ENABLE) {
            apply(&mut config.shm_enabled, key, parse_flag(key, &v));
        }
        if let Some((_, v)) = get(ENV_SHM_NAME) {
            config.shm_name = v;
        }
        if let Some((_, v)) = get(ENV_SHM_DIR) {
            config.shm_dir = PathBuf::from(v);
        }
        if let Some((_, v)) = get(ENV_OFFSETS_PATH) {
            config.offsets_path = Some(PathBuf::from(v));
        }
        config
    }

    /// Where the offsets descriptor is written.
    pub fn offsets_path(&self) -> PathBuf {
        self.offsets_path
            .clone()
            .unwrap_or_else(|| self.shm_dir.join(OFFSETS_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_interval < MIN_BROADCAST_INTERVAL {
            return Err(ConfigError::IntervalTooShort(self.broadcast_interval));
        }
        let sizes = [
            ("max_clients", self.max_clients),
            ("client_backlog", self.client_backlog),
            ("max_command_bytes", self.max_command_bytes),
            ("max_message_bytes", self.max_message_bytes),
            ("command_queue_capacity", self.command_queue_capacity),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::Zero("idle_timeout"));
        }
        Ok(())
    }
}

fn apply<T>(field: &mut T, key: &str, parsed: Result<T, ConfigError>) {
    match parsed {
        Ok(value) => *field = value,
        Err(e) => warn!("ignoring {}: {}", key, e),
    }
}

fn invalid(key: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_owned(),
        expected,
    }
}

/// Accepts `0/1/true/false/yes/no/on/off`, case-insensitive.
pub fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "a boolean")),
    }
}

/// Port 0 asks for an ephemeral port; other ports below 1024 are refused.
pub fn parse_port(key: &'static str, value: &str) -> Result<u16, ConfigError> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "a port number"))?;
    if port != 0 && port < 1024 {
        return Err(ConfigError::PrivilegedPort { key, port });
    }
    Ok(port)
}

pub fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(key, value, "milliseconds"))
}

/// Reads a flag from the process environment, falling back to `default`.
pub fn env_flag(key: &'static str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => parse_flag(key, &value).unwrap_or_else(|e| {
            warn!("ignoring {}: {}", key, e);
            default
        }),
        _ => default,
    }
}
