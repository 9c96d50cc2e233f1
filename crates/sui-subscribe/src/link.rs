//! Connection link encoding.
//!
//! One encoder per protocol. Each takes the preset, the node's public domain
//! and the listen port assigned by the server config, and produces the URI a
//! client app imports.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use sui_presets::server_config::VISION_FLOW;
use sui_presets::{
    assign_ports, is_placeholder_key, Hysteria2Preset, PresetRef, Presets, ServerOptions,
    VlessVisionPreset, VmessWsPreset,
};
use sui_types::{sanitize_domain, CodecError, PresetKind};

/// Client fingerprint advertised in VLESS links.
pub const VLESS_FINGERPRINT: &str = "chrome";

/// One client-importable link, as served by a node agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionLink {
    pub protocol: PresetKind,
    pub uri: String,
    pub port: u16,
}

/// Embedded JSON of a `vmess://` link.
///
/// Numeric fields are written as strings; both forms are accepted on input
/// since third-party generators disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmessPayload {
    #[serde(default = "vmess_version", deserialize_with = "string_or_number")]
    pub v: String,
    #[serde(default)]
    pub ps: String,
    pub add: String,
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    pub id: String,
    #[serde(default = "zero", deserialize_with = "string_or_number")]
    pub aid: String,
    #[serde(default = "tcp")]
    pub net: String,
    #[serde(rename = "type", default = "none")]
    pub header_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub tls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
}

fn vmess_version() -> String {
    "2".to_string()
}
fn zero() -> String {
    "0".to_string()
}
fn tcp() -> String {
    "tcp".to_string()
}
fn none() -> String {
    "none".to_string()
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(u64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::S(s) => s,
        Raw::N(n) => n.to_string(),
    })
}

fn fragment(domain: &str, kind: PresetKind) -> String {
    urlencoding::encode(&format!("{domain}-{}", kind.label())).into_owned()
}

fn unpublishable(kind: PresetKind, reason: &str) -> CodecError {
    CodecError::validation(format!("preset {kind}"), reason)
}

/// `vless://` link with Reality parameters. Refuses placeholder keys.
pub fn vless_link(
    preset: &VlessVisionPreset,
    domain: &str,
    port: u16,
    sni: &str,
) -> Result<ConnectionLink, CodecError> {
    let kind = PresetKind::VlessVision;
    if is_placeholder_key(&preset.public_key) {
        return Err(unpublishable(
            kind,
            "reality keypair is a placeholder; regenerate before publishing",
        ));
    }
    if preset.uuid.is_empty() {
        return Err(unpublishable(kind, "uuid is empty"));
    }
    let uri = format!(
        "vless://{uuid}@{domain}:{port}?encryption=none&flow={flow}&security=reality&sni={sni}&fp={fp}&pbk={pbk}&sid={sid}&type=tcp#{frag}",
        uuid = preset.uuid,
        flow = VISION_FLOW,
        sni = urlencoding::encode(sni),
        fp = VLESS_FINGERPRINT,
        pbk = urlencoding::encode(&preset.public_key),
        sid = urlencoding::encode(&preset.short_id),
        frag = fragment(domain, kind),
    );
    Ok(ConnectionLink {
        protocol: kind,
        uri,
        port,
    })
}

/// `vmess://` + standard base64 of the JSON payload.
pub fn vmess_link(
    preset: &VmessWsPreset,
    domain: &str,
    port: u16,
) -> Result<ConnectionLink, CodecError> {
    let kind = PresetKind::VmessWs;
    if preset.uuid.is_empty() {
        return Err(unpublishable(kind, "uuid is empty"));
    }
    let payload = VmessPayload {
        v: vmess_version(),
        ps: format!("{domain}-{}", kind.label()),
        add: domain.to_string(),
        port: port.to_string(),
        id: preset.uuid.clone(),
        aid: zero(),
        net: "ws".to_string(),
        header_type: none(),
        host: domain.to_string(),
        path: preset.path.clone(),
        tls: "tls".to_string(),
        sni: None,
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|e| unpublishable(kind, &format!("payload serialization: {e}")))?;
    Ok(ConnectionLink {
        protocol: kind,
        uri: format!("vmess://{}", STANDARD.encode(json)),
        port,
    })
}

/// `hysteria2://` link; the password travels as userinfo.
pub fn hysteria2_link(
    preset: &Hysteria2Preset,
    domain: &str,
    port: u16,
) -> Result<ConnectionLink, CodecError> {
    let kind = PresetKind::Hysteria2;
    if preset.password.is_empty() {
        return Err(unpublishable(kind, "password is empty"));
    }
    let uri = format!(
        "hysteria2://{password}@{domain}:{port}?sni={domain}#{frag}",
        password = urlencoding::encode(&preset.password),
        frag = fragment(domain, kind),
    );
    Ok(ConnectionLink {
        protocol: kind,
        uri,
        port,
    })
}

/// Encode one preset at `port`.
pub fn encode_preset(
    preset: PresetRef<'_>,
    domain: &str,
    port: u16,
    opts: &ServerOptions,
) -> Result<ConnectionLink, CodecError> {
    match preset {
        PresetRef::VlessVision(p) => vless_link(p, domain, port, &opts.reality_sni),
        PresetRef::VmessWs(p) => vmess_link(p, domain, port),
        PresetRef::Hysteria2(p) => hysteria2_link(p, domain, port),
    }
}

/// Links for every enabled preset at its assigned port.
///
/// The domain and base port are validated up front. A preset that cannot be
/// published is logged and left out; the others are still returned.
pub fn node_links(
    presets: &Presets,
    domain: &str,
    opts: &ServerOptions,
) -> Result<Vec<ConnectionLink>, CodecError> {
    let domain = sanitize_domain(domain)?;
    let ports = assign_ports(presets, opts.base_port)?;
    let mut links = Vec::with_capacity(ports.len());
    for (kind, port) in ports {
        match encode_preset(presets.get(kind), &domain, port, opts) {
            Ok(link) => links.push(link),
            Err(e) => {
                tracing::warn!(protocol = %kind, domain = %domain, error = %e, "link not published");
            }
        }
    }
    Ok(links)
}
