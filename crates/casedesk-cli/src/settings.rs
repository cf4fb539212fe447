//! Resolve the effective gateway configuration from the optional YAML file
//! and the command-line/environment overrides.

use anyhow::Context;
use casedesk_core::config::GatewayConfig;
use std::path::{Path, PathBuf};

/// Values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub backend_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub static_dir: Option<PathBuf>,
}

pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<GatewayConfig> {
    let mut config = match path {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };

    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(url) = overrides.backend_url {
        config.backend_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secret) = overrides.jwt_secret {
        config.jwt_secret = secret;
    }
    if let Some(dir) = overrides.static_dir {
        config.static_dir = Some(dir);
    }
    Ok(config)
}
