//! sing-box server configuration derived from the preset set.
//!
//! The config is a pure projection: same presets and options give the same
//! document, and nothing is ever read back from it.

use crate::model::{Hysteria2Preset, Presets, VlessVisionPreset, VmessWsPreset};
use serde::{Deserialize, Serialize};
use sui_types::{CodecError, PresetKind};

pub const DEFAULT_BASE_PORT: u16 = 10000;
pub const DEFAULT_REALITY_SNI: &str = "www.microsoft.com";
pub const VISION_FLOW: &str = "xtls-rprx-vision";

/// Node-level knobs for config and link generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// First listen port; enabled presets take consecutive ports from here.
    pub base_port: u16,
    /// Reality handshake target, also the `sni` of VLESS links.
    pub reality_sni: String,
    /// Public domain of the node.
    pub domain: String,
    pub certificate_path: String,
    pub key_path: String,
    pub log_level: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            reality_sni: DEFAULT_REALITY_SNI.to_string(),
            domain: String::new(),
            certificate_path: "/certs/fullchain.pem".to_string(),
            key_path: "/certs/privkey.pem".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerOptions {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_port(mut self, port: u16) -> Self {
        self.base_port = port;
        self
    }

    #[must_use]
    pub fn with_reality_sni(mut self, sni: impl Into<String>) -> Self {
        self.reality_sni = sni.into();
        self
    }

    #[must_use]
    pub fn with_tls_files(mut self, certificate: impl Into<String>, key: impl Into<String>) -> Self {
        self.certificate_path = certificate.into();
        self.key_path = key.into();
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Listen port for each enabled preset, in declared order.
///
/// Disabled presets consume no port. Fails if the range would leave `u16`.
pub fn assign_ports(presets: &Presets, base: u16) -> Result<Vec<(PresetKind, u16)>, CodecError> {
    if base == 0 {
        return Err(CodecError::validation("base port", "must be non-zero"));
    }
    let mut next = Some(base);
    let mut out = Vec::with_capacity(PresetKind::ALL.len());
    for kind in presets.enabled_kinds() {
        let port = next.ok_or_else(|| {
            CodecError::validation(
                format!("preset {kind}"),
                format!("port range from {base} overflows"),
            )
        })?;
        out.push((kind, port));
        next = port.checked_add(1);
    }
    Ok(out)
}

/// Port of one preset, `None` when it is disabled.
pub fn port_for(presets: &Presets, kind: PresetKind, base: u16) -> Result<Option<u16>, CodecError> {
    Ok(assign_ports(presets, base)?
        .into_iter()
        .find_map(|(k, p)| (k == kind).then_some(p)))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub log: LogConfig,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
}

impl ServerConfig {
    /// Listen port of the inbound serving `kind`.
    pub fn port_of(&self, kind: PresetKind) -> Option<u16> {
        self.inbounds
            .iter()
            .find(|i| i.kind() == kind)
            .map(Inbound::listen_port)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub timestamp: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inbound {
    Vless(VlessInbound),
    Vmess(VmessInbound),
    Hysteria2(Hysteria2Inbound),
}

impl Inbound {
    pub fn kind(&self) -> PresetKind {
        match self {
            Self::Vless(_) => PresetKind::VlessVision,
            Self::Vmess(_) => PresetKind::VmessWs,
            Self::Hysteria2(_) => PresetKind::Hysteria2,
        }
    }

    pub fn listen_port(&self) -> u16 {
        match self {
            Self::Vless(i) => i.listen_port,
            Self::Vmess(i) => i.listen_port,
            Self::Hysteria2(i) => i.listen_port,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Vless(i) => &i.tag,
            Self::Vmess(i) => &i.tag,
            Self::Hysteria2(i) => &i.tag,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VlessInbound {
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    pub users: Vec<VlessUser>,
    pub tls: RealityTls,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VlessUser {
    pub uuid: String,
    pub flow: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RealityTls {
    pub enabled: bool,
    pub server_name: String,
    pub reality: RealityConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RealityConfig {
    pub enabled: bool,
    pub handshake: RealityHandshake,
    pub private_key: String,
    pub short_id: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RealityHandshake {
    pub server: String,
    pub server_port: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VmessInbound {
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    pub users: Vec<VmessUser>,
    pub transport: WsTransport,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VmessUser {
    pub uuid: String,
    #[serde(rename = "alterId")]
    pub alter_id: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WsTransport {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2Inbound {
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    pub users: Vec<Hysteria2User>,
    pub tls: CertificateTls,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2User {
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CertificateTls {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub certificate_path: String,
    pub key_path: String,
    pub alpn: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Direct { tag: String },
}

const LISTEN_ALL: &str = "::";

fn inbound_tag(kind: PresetKind) -> String {
    format!("{}-in", kind.singbox_type())
}

fn vless_inbound(p: &VlessVisionPreset, port: u16, opts: &ServerOptions) -> Inbound {
    Inbound::Vless(VlessInbound {
        tag: inbound_tag(PresetKind::VlessVision),
        listen: LISTEN_ALL.to_string(),
        listen_port: port,
        users: vec![VlessUser {
            uuid: p.uuid.clone(),
            flow: VISION_FLOW.to_string(),
        }],
        tls: RealityTls {
            enabled: true,
            server_name: opts.reality_sni.clone(),
            reality: RealityConfig {
                enabled: true,
                handshake: RealityHandshake {
                    server: opts.reality_sni.clone(),
                    server_port: 443,
                },
                private_key: p.private_key.clone(),
                short_id: vec![p.short_id.clone()],
            },
        },
    })
}

fn vmess_inbound(p: &VmessWsPreset, port: u16) -> Inbound {
    Inbound::Vmess(VmessInbound {
        tag: inbound_tag(PresetKind::VmessWs),
        listen: LISTEN_ALL.to_string(),
        listen_port: port,
        users: vec![VmessUser {
            uuid: p.uuid.clone(),
            alter_id: 0,
        }],
        transport: WsTransport {
            kind: "ws".to_string(),
            path: p.path.clone(),
        },
    })
}

fn hysteria2_inbound(p: &Hysteria2Preset, port: u16, opts: &ServerOptions) -> Inbound {
    Inbound::Hysteria2(Hysteria2Inbound {
        tag: inbound_tag(PresetKind::Hysteria2),
        listen: LISTEN_ALL.to_string(),
        listen_port: port,
        users: vec![Hysteria2User {
            password: p.password.clone(),
        }],
        tls: CertificateTls {
            enabled: true,
            server_name: (!opts.domain.is_empty()).then(|| opts.domain.clone()),
            certificate_path: opts.certificate_path.clone(),
            key_path: opts.key_path.clone(),
            alpn: vec!["h3".to_string()],
        },
    })
}

/// Derive the sing-box server document from `presets`.
pub fn build_server_config(
    presets: &Presets,
    opts: &ServerOptions,
) -> Result<ServerConfig, CodecError> {
    let inbounds = assign_ports(presets, opts.base_port)?
        .into_iter()
        .map(|(kind, port)| match kind {
            PresetKind::VlessVision => vless_inbound(&presets.vless_vision, port, opts),
            PresetKind::VmessWs => vmess_inbound(&presets.vmess_ws, port),
            PresetKind::Hysteria2 => hysteria2_inbound(&presets.hysteria2, port, opts),
        })
        .collect();

    Ok(ServerConfig {
        log: LogConfig {
            level: opts.log_level.clone(),
            timestamp: true,
        },
        inbounds,
        outbounds: vec![Outbound::Direct {
            tag: "direct".to_string(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::CredentialGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn presets() -> Presets {
        Presets::generate(&mut CredentialGenerator::new(StdRng::seed_from_u64(1)))
    }

    #[test]
    fn all_enabled_take_consecutive_ports() {
        let cfg = build_server_config(&presets(), &ServerOptions::new("n.example.com")).unwrap();
        assert_eq!(cfg.port_of(PresetKind::VlessVision), Some(10000));
        assert_eq!(cfg.port_of(PresetKind::VmessWs), Some(10001));
        assert_eq!(cfg.port_of(PresetKind::Hysteria2), Some(10002));
    }

    #[test]
    fn disabled_middle_preset_consumes_no_port() {
        let mut p = presets();
        p.set_enabled(PresetKind::VmessWs, false);
        let cfg = build_server_config(&p, &ServerOptions::default()).unwrap();
        assert_eq!(cfg.inbounds.len(), 2);
        assert_eq!(cfg.port_of(PresetKind::VlessVision), Some(10000));
        assert_eq!(cfg.port_of(PresetKind::VmessWs), None);
        assert_eq!(cfg.port_of(PresetKind::Hysteria2), Some(10001));
    }

    #[test]
    fn deterministic_for_same_input() {
        let p = presets();
        let o = ServerOptions::new("a.com").with_base_port(20000);
        assert_eq!(
            build_server_config(&p, &o).unwrap(),
            build_server_config(&p, &o).unwrap()
        );
        assert_eq!(port_for(&p, PresetKind::Hysteria2, 20000).unwrap(), Some(20002));
    }

    #[test]
    fn json_shape() {
        let p = presets();
        let o = ServerOptions::new("node.example.com").with_reality_sni("www.apple.com");
        let v = serde_json::to_value(build_server_config(&p, &o).unwrap()).unwrap();

        let vless = &v["inbounds"][0];
        assert_eq!(vless["type"], "vless");
        assert_eq!(vless["tag"], "vless-in");
        assert_eq!(vless["users"][0]["flow"], VISION_FLOW);
        assert_eq!(vless["tls"]["reality"]["handshake"]["server"], "www.apple.com");
        assert_eq!(vless["tls"]["reality"]["short_id"][0], p.vless_vision.short_id.as_str());

        let vmess = &v["inbounds"][1];
        assert_eq!(vmess["type"], "vmess");
        assert_eq!(vmess["users"][0]["alterId"], 0);
        assert_eq!(vmess["transport"]["type"], "ws");
        assert_eq!(vmess["transport"]["path"], p.vmess_ws.path.as_str());

        let hy2 = &v["inbounds"][2];
        assert_eq!(hy2["type"], "hysteria2");
        assert_eq!(hy2["tls"]["server_name"], "node.example.com");

        assert_eq!(v["outbounds"][0]["type"], "direct");
        assert_eq!(v["log"]["level"], "info");
    }

    #[test]
    fn nothing_enabled_yields_no_inbounds() {
        let mut p = presets();
        for k in PresetKind::ALL {
            p.set_enabled(k, false);
        }
        let cfg = build_server_config(&p, &ServerOptions::default()).unwrap();
        assert!(cfg.inbounds.is_empty());
        assert_eq!(cfg.outbounds.len(), 1);
    }

    #[test]
    fn port_overflow_is_rejected() {
        let p = presets();
        let err = assign_ports(&p, 65535).unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert_eq!(assign_ports(&p, 65533).unwrap().last(), Some(&(PresetKind::Hysteria2, 65535)));
        assert!(assign_ports(&p, 0).is_err());
    }
}
