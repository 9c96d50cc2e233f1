//! Whitelisted node services.

use crate::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_LOG_LINES: u32 = 100;
const MAX_LOG_LINES: u32 = 1000;

/// Services an agent may restart, inspect, tail or reconfigure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKey {
    Singbox,
    Adguard,
    Caddy,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 3] = [Self::Singbox, Self::Adguard, Self::Caddy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singbox => "singbox",
            Self::Adguard => "adguard",
            Self::Caddy => "caddy",
        }
    }

    /// Docker container backing the service.
    pub fn container_name(&self) -> &'static str {
        match self {
            Self::Singbox => "sui-singbox",
            Self::Adguard => "sui-adguard",
            Self::Caddy => "sui-caddy",
        }
    }

    /// Config file path relative to the agent's config directory.
    pub fn config_file(&self) -> &'static str {
        match self {
            Self::Singbox => "singbox/config.json",
            Self::Adguard => "adguard/AdGuardHome.yaml",
            Self::Caddy => "caddy/Caddyfile",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CodecError> {
        match s {
            "singbox" => Ok(Self::Singbox),
            "adguard" => Ok(Self::Adguard),
            "caddy" => Ok(Self::Caddy),
            other => Err(CodecError::validation(
                format!("service {other:?}"),
                "unknown service",
            )),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Clamp a requested log tail length; out-of-range or garbage means 100.
pub fn sanitize_lines(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(n) if (1..=MAX_LOG_LINES).contains(&n) => n,
        _ => DEFAULT_LOG_LINES,
    }
}
