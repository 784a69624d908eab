//! # Node Configuration
//!
//! Read from a JSON file, layered over defaults, then overridden from the
//! environment (`TM_*` variables).
//!
//! ## Startup Requirements
//!
//! `validate` reports the first violated requirement, in this order:
//!
//! 1. key password (unless a key pair is configured)
//! 2. key salt (unless a key pair is configured)
//! 3. currency name
//! 4. a listening interface (IPv4 or IPv6)
//! 5. a remote contact interface (IPv4 or IPv6)
//! 6. a remote contact port

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::Endpoint;
use thiserror::Error;
use tm_01_peer_sync::SyncConfig;
use tm_02_block_propagation::PropagationConfig;
use tm_03_block_generation::GenerationConfig;

/// Listening port used when none is configured.
pub const DEFAULT_PORT: u16 = 8033;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No key password was given.")]
    MissingPassword,

    #[error("No key salt was given.")]
    MissingSalt,

    #[error("No currency name was given.")]
    MissingCurrency,

    #[error("No interface to listen to.")]
    MissingListenInterface,

    #[error("No interface for remote contact.")]
    MissingRemoteInterface,

    #[error("No port for remote contact.")]
    MissingRemotePort,

    #[error("Cannot read configuration file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Explicit base58 key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    #[serde(rename = "pub")]
    pub public: String,
    pub sec: String,
}

/// Sync settings: client tunables plus the periodic round interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    #[serde(flatten)]
    pub client: SyncConfig,
    /// Pause between two background sync rounds. `0` disables them.
    pub interval_ms: u64,
}

impl SyncSettings {
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            client: SyncConfig::default(),
            interval_ms: 60_000,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub currency: String,
    /// Explicit key pair; takes priority over `passwd` + `salt`.
    pub pair: Option<PairConfig>,
    pub passwd: Option<String>,
    pub salt: Option<String>,

    /// Listening interfaces.
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub port: u16,

    /// Address announced to other peers.
    pub remoteipv4: Option<Ipv4Addr>,
    pub remoteipv6: Option<Ipv6Addr>,
    pub remotehost: Option<String>,
    pub remoteport: Option<u16>,

    /// Run the block generation loop.
    pub participate: bool,
    /// Never contact the network.
    pub isolate: bool,

    /// Documents queued in the inbox before submitters wait.
    pub inbox_capacity: usize,

    pub generation: GenerationConfig,
    pub propagation: PropagationConfig,
    pub sync: SyncSettings,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            currency: String::new(),
            pair: None,
            passwd: None,
            salt: None,
            ipv4: None,
            ipv6: None,
            port: DEFAULT_PORT,
            remoteipv4: None,
            remoteipv6: None,
            remotehost: None,
            remoteport: None,
            participate: false,
            isolate: false,
            inbox_capacity: 256,
            generation: GenerationConfig::default(),
            propagation: PropagationConfig::default(),
            sync: SyncSettings::default(),
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl NodeConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    /// Check the startup requirements. Only the first violation is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.is_none() {
            if !present(&self.passwd) {
                return Err(ConfigError::MissingPassword);
            }
            if !present(&self.salt) {
                return Err(ConfigError::MissingSalt);
            }
        }
        if self.currency.is_empty() {
            return Err(ConfigError::MissingCurrency);
        }
        if self.ipv4.is_none() && self.ipv6.is_none() {
            return Err(ConfigError::MissingListenInterface);
        }
        if self.remoteipv4.is_none() && self.remoteipv6.is_none() {
            return Err(ConfigError::MissingRemoteInterface);
        }
        if self.remoteport.is_none() {
            return Err(ConfigError::MissingRemotePort);
        }
        Ok(())
    }

    /// The endpoint other peers reach this node at.
    ///
    /// Remote contact settings win; the listening interface and port fill in
    /// whatever is not set.
    #[must_use]
    pub fn self_endpoint(&self) -> Endpoint {
        Endpoint::basic_merkled(
            self.remotehost.clone().filter(|h| !h.is_empty()),
            self.remoteipv4.or(self.ipv4),
            self.remoteipv6.or(self.ipv6),
            self.remoteport.unwrap_or(self.port),
        )
    }

    /// Apply `TM_*` overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(currency) = lookup("TM_CURRENCY") {
            self.currency = currency;
        }
        if let Some(port) = lookup("TM_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(port) = lookup("TM_REMOTE_PORT").and_then(|p| p.parse().ok()) {
            self.remoteport = Some(port);
        }
        if let Some(flag) = lookup("TM_PARTICIPATE").and_then(|v| parse_flag(&v)) {
            self.participate = flag;
        }
        if let Some(flag) = lookup("TM_ISOLATE").and_then(|v| parse_flag(&v)) {
            self.isolate = flag;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A configuration that passes validation, keyed by password and salt.
    pub(crate) fn valid_config() -> NodeConfig {
        NodeConfig {
            currency: "beta_brousouf".into(),
            passwd: Some("abc".into()),
            salt: Some("abc".into()),
            ipv4: Some(Ipv4Addr::LOCALHOST),
            port: 8999,
            remoteipv4: Some(Ipv4Addr::LOCALHOST),
            remoteport: Some(8999),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(valid_config().validate(), Ok(()));
    }

    #[test]
    fn test_each_missing_field_has_its_own_error() {
        let cases: Vec<(fn(&mut NodeConfig), ConfigError)> = vec![
            (|c| c.passwd = None, ConfigError::MissingPassword),
            (|c| c.salt = Some(String::new()), ConfigError::MissingSalt),
            (|c| c.currency.clear(), ConfigError::MissingCurrency),
            (|c| c.ipv4 = None, ConfigError::MissingListenInterface),
            (|c| c.remoteipv4 = None, ConfigError::MissingRemoteInterface),
            (|c| c.remoteport = None, ConfigError::MissingRemotePort),
        ];
        for (break_it, expected) in cases {
            let mut config = valid_config();
            break_it(&mut config);
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_first_violation_wins() {
        let config = NodeConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingPassword));
        assert_eq!(
            ConfigError::MissingPassword.to_string(),
            "No key password was given."
        );
    }

    #[test]
    fn test_pair_replaces_credentials() {
        let mut config = valid_config();
        config.passwd = None;
        config.salt = None;
        config.pair = Some(PairConfig {
            public: "pub".into(),
            sec: "sec".into(),
        });
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_ipv6_counts_as_interface() {
        let mut config = valid_config();
        config.ipv4 = None;
        config.ipv6 = Some(Ipv6Addr::LOCALHOST);
        config.remoteipv4 = None;
        config.remoteipv6 = Some(Ipv6Addr::LOCALHOST);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_self_endpoint_prefers_remote_settings() {
        let mut config = valid_config();
        config.remoteipv4 = Some(Ipv4Addr::new(203, 0, 113, 7));
        config.remoteport = Some(443);
        assert_eq!(
            config.self_endpoint().to_string(),
            "BASIC_MERKLED_API 203.0.113.7 443"
        );

        config.remoteipv4 = None;
        config.remoteport = None;
        assert_eq!(
            config.self_endpoint().to_string(),
            "BASIC_MERKLED_API 127.0.0.1 8999"
        );
    }

    #[test]
    fn test_from_json_uses_wire_names_and_defaults() {
        let config = NodeConfig::from_json(
            r#"{
                "currency": "beta_brousouf",
                "pair": { "pub": "P", "sec": "S" },
                "ipv4": "127.0.0.1",
                "remoteipv4": "127.0.0.1",
                "remoteport": 9000,
                "participate": true,
                "generation": { "idle_pause_ms": 10 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.pair.as_ref().map(|p| p.public.as_str()), Some("P"));
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.participate);
        assert_eq!(config.generation.idle_pause_ms, 10);
        assert_eq!(config.generation.retry_pause_ms, 5_000);
        assert_eq!(config.sync.client.page_size, SyncConfig::default().page_size);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            NodeConfig::from_json("{ currency"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TM_CURRENCY", "gamma"),
            ("TM_PORT", "9100"),
            ("TM_REMOTE_PORT", "9200"),
            ("TM_PARTICIPATE", "yes"),
            ("TM_ISOLATE", "not-a-flag"),
        ]
        .into_iter()
        .collect();

        let mut config = valid_config();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.currency, "gamma");
        assert_eq!(config.port, 9100);
        assert_eq!(config.remoteport, Some(9200));
        assert!(config.participate);
        assert!(!config.isolate);
    }
}
