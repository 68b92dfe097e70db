use std::collections::HashSet;

use serde::Deserialize;

use super::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

impl RpcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.participants.is_empty() {
            return Err(ConfigError::Invalid("participants must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for p in &self.participants {
            p.validate()?;
            if !seen.insert(p.user.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate participant: {}",
                    p.user
                )));
            }
        }

        self.server.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Clients must present exactly this string at login.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Serialize all gameplay through one dedicated thread.
    #[serde(default = "default_logic_thread")]
    pub logic_thread: bool,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            protocol_version: default_protocol_version(),
            logic_thread: default_logic_thread(),
            max_frame_bytes: default_max_frame_bytes(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.protocol_version must not be empty".into(),
            ));
        }
        if !(1024..=16 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(ConfigError::Invalid(
                "server.max_frame_bytes must be between 1024 and 16777216".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(ConfigError::Invalid(
                "server.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(ConfigError::Invalid(
                "server.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(ConfigError::Invalid(
                "server.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:7420".into()
}
fn default_protocol_version() -> String {
    "1".into()
}
fn default_logic_thread() -> bool {
    true
}
fn default_max_frame_bytes() -> usize {
    256 * 1024
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    pub user: String,
    pub passphrase: String,
}

impl ParticipantConfig {
    fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid("participant user must not be empty".into()));
        }
        if self.passphrase.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "participant {} has an empty passphrase",
                self.user
            )));
        }
        Ok(())
    }
}
