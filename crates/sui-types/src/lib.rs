//! sui-types: cross-crate stable contracts (error taxonomy, protocol kinds, node records).
//!
//! Everything here is plain data plus the traits the codec uses to talk to
//! collaborators it does not own (node directory, container control, link
//! transport).

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod errors;
pub mod node;
pub mod service;
pub mod traits;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub use errors::{CodecError, DecodeError};
pub use node::{sanitize_domain, sanitize_name, validate_node_id, NodeRecord, NodeStatus};
pub use service::{sanitize_lines, ServiceKey};
pub use traits::{ContainerControl, LinkSource, NodeDirectory};

/// The closed set of tunnel protocols a node serves.
///
/// Declaration order is load-bearing: listen ports are handed out in this
/// order, so reordering variants would silently move every issued link.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetKind {
    /// VLESS over TCP with XTLS Vision flow and Reality obfuscation.
    VlessVision,
    /// VMess over WebSocket, TLS terminated by the reverse proxy.
    VmessWs,
    /// Hysteria2 over QUIC.
    Hysteria2,
}

impl PresetKind {
    /// All kinds, in port-allocation order.
    pub const ALL: [PresetKind; 3] = [Self::VlessVision, Self::VmessWs, Self::Hysteria2];

    /// Persistence key (`vless_vision`, `vmess_ws`, `hysteria2`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VlessVision => "vless_vision",
            Self::VmessWs => "vmess_ws",
            Self::Hysteria2 => "hysteria2",
        }
    }

    /// Human label used in link fragments.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VlessVision => "VLESS-Vision",
            Self::VmessWs => "VMess-WS",
            Self::Hysteria2 => "Hysteria2",
        }
    }

    /// sing-box `type` value for inbounds and outbounds.
    pub fn singbox_type(&self) -> &'static str {
        match self {
            Self::VlessVision => "vless",
            Self::VmessWs => "vmess",
            Self::Hysteria2 => "hysteria2",
        }
    }

    /// Parse a persistence key; anything else is a validation error.
    pub fn parse(key: &str) -> Result<Self, CodecError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "vless_vision" | "vless" => Ok(Self::VlessVision),
            "vmess_ws" | "vmess" => Ok(Self::VmessWs),
            "hysteria2" | "hy2" => Ok(Self::Hysteria2),
            _ => Err(CodecError::validation(
                format!("preset {key}"),
                "unknown preset key (expected vless_vision, vmess_ws or hysteria2)",
            )),
        }
    }
}

impl Display for PresetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PresetKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
