//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use bruinchat_core::error::{ChatError, Result};

pub use schema::{AuthSection, GatewayConfig, GatewaySection, HubSection, ReconnectMode};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ChatError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| ChatError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
