use serde::Deserialize;
use bruinchat_core::error::{ChatError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub hub: HubSection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChatError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.hub.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(ChatError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(ChatError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(ChatError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=60000).contains(&self.write_timeout_ms) {
            return Err(ChatError::BadRequest(
                "gateway.write_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_write_timeout_ms() -> u64 {
    5000
}

/// What registering a user who already has a live session does to the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectMode {
    /// Overwrite the entry and close the superseded session right away.
    #[default]
    ClosePrevious,
    /// Overwrite the entry only; the old session dies on its next failed I/O.
    KeepPrevious,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    /// Per-session outbound queue capacity (frames).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default)]
    pub on_reconnect: ReconnectMode,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
            max_frame_bytes: default_max_frame_bytes(),
            on_reconnect: ReconnectMode::default(),
        }
    }
}

impl HubSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(ChatError::BadRequest(
                "hub.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(256..=1048576).contains(&self.max_frame_bytes) {
            return Err(ChatError::BadRequest(
                "hub.max_frame_bytes must be between 256 and 1048576".into(),
            ));
        }
        Ok(())
    }
}

fn default_outbound_queue() -> usize {
    256
}
fn default_max_frame_bytes() -> usize {
    16384
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    /// Environment variable holding the HS256 secret shared with the account service.
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
        }
    }
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret_env.trim().is_empty() {
            return Err(ChatError::BadRequest(
                "auth.jwt_secret_env must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".into()
}
