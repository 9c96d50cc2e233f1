//! Connection link decoding for cross-format export.
//!
//! VLESS and Hysteria2 links go through a real URI parser; the VMess payload
//! is base64 JSON. Every malformed segment is a typed [`DecodeError`] naming
//! the protocol.

use crate::link::{ConnectionLink, VmessPayload};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use sui_types::{DecodeError, PresetKind};
use url::Url;

/// Fields carried by a `vless://` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlessFields {
    pub uuid: String,
    pub server: String,
    pub port: u16,
    pub flow: Option<String>,
    pub security: Option<String>,
    pub sni: Option<String>,
    pub fingerprint: Option<String>,
    pub public_key: Option<String>,
    pub short_id: Option<String>,
    pub network: Option<String>,
    pub name: Option<String>,
}

/// Fields carried by a `vmess://` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmessFields {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub id: String,
    pub alter_id: u32,
    pub net: String,
    pub host: String,
    pub path: String,
    pub tls: bool,
    pub sni: Option<String>,
}

/// Fields carried by a `hysteria2://` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2Fields {
    pub password: String,
    pub server: String,
    pub port: u16,
    pub sni: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLink {
    Vless(VlessFields),
    Vmess(VmessFields),
    Hysteria2(Hysteria2Fields),
}

impl DecodedLink {
    pub fn protocol(&self) -> PresetKind {
        match self {
            Self::Vless(_) => PresetKind::VlessVision,
            Self::Vmess(_) => PresetKind::VmessWs,
            Self::Hysteria2(_) => PresetKind::Hysteria2,
        }
    }
}

fn strip_scheme<'a>(
    uri: &'a str,
    protocol: PresetKind,
    schemes: &[&str],
) -> Result<&'a str, DecodeError> {
    let uri = uri.trim();
    schemes
        .iter()
        .find_map(|s| {
            uri.get(..s.len())
                .filter(|head| head.eq_ignore_ascii_case(s))
                .map(|_| &uri[s.len()..])
        })
        .ok_or_else(|| DecodeError::Scheme {
            protocol,
            uri_head: uri.chars().take(16).collect(),
        })
}

fn pct_decode(raw: &str, protocol: PresetKind) -> Result<String, DecodeError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| DecodeError::Uri {
            protocol,
            reason: e.to_string(),
        })
}

/// Parse an authority-form link and pull out the parts every scheme shares.
struct Authority {
    userinfo: String,
    server: String,
    port: u16,
    query: Vec<(String, String)>,
    name: Option<String>,
}

impl Authority {
    fn parse(uri: &str, protocol: PresetKind) -> Result<Self, DecodeError> {
        let url = Url::parse(uri.trim()).map_err(|e| DecodeError::Uri {
            protocol,
            reason: e.to_string(),
        })?;
        let userinfo = pct_decode(url.username(), protocol)?;
        if userinfo.is_empty() {
            return Err(DecodeError::MissingField {
                protocol,
                field: "userinfo",
            });
        }
        let server = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(DecodeError::MissingField {
                protocol,
                field: "host",
            })?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port().ok_or(DecodeError::MissingField {
            protocol,
            field: "port",
        })?;
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let name = match url.fragment().filter(|f| !f.is_empty()) {
            Some(f) => Some(pct_decode(f, protocol)?),
            None => None,
        };
        Ok(Self {
            userinfo,
            server,
            port,
            query,
            name,
        })
    }

    /// First non-empty value of `key`.
    fn param(&self, key: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    }
}

/// Decode a `vless://` link. Missing `pbk` / `sid` become `None`.
pub fn decode_vless(uri: &str) -> Result<VlessFields, DecodeError> {
    let protocol = PresetKind::VlessVision;
    strip_scheme(uri, protocol, &["vless://"])?;
    let a = Authority::parse(uri, protocol)?;
    Ok(VlessFields {
        flow: a.param("flow"),
        security: a.param("security"),
        sni: a.param("sni"),
        fingerprint: a.param("fp"),
        public_key: a.param("pbk"),
        short_id: a.param("sid"),
        network: a.param("type"),
        uuid: a.userinfo,
        server: a.server,
        port: a.port,
        name: a.name,
    })
}

/// Decode a `hysteria2://` (or `hy2://`) link.
pub fn decode_hysteria2(uri: &str) -> Result<Hysteria2Fields, DecodeError> {
    let protocol = PresetKind::Hysteria2;
    strip_scheme(uri, protocol, &["hysteria2://", "hy2://"])?;
    let a = Authority::parse(uri, protocol)?;
    Ok(Hysteria2Fields {
        sni: a.param("sni"),
        password: a.userinfo,
        server: a.server,
        port: a.port,
        name: a.name,
    })
}

/// Base64 as found in the wild: padded or not, standard or URL-safe alphabet.
fn lenient_base64(raw: &str, protocol: PresetKind) -> Result<Vec<u8>, DecodeError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let engines = [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD];
    let mut last = None;
    for engine in engines {
        match engine.decode(&compact) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => last = Some(e),
        }
    }
    Err(DecodeError::Base64 {
        protocol,
        reason: last.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Decode a `vmess://` link: base64, then JSON.
pub fn decode_vmess(uri: &str) -> Result<VmessFields, DecodeError> {
    let protocol = PresetKind::VmessWs;
    let body = strip_scheme(uri, protocol, &["vmess://"])?;
    let bytes = lenient_base64(body, protocol)?;
    let payload: VmessPayload = serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json {
        protocol,
        reason: e.to_string(),
    })?;

    let missing = |field: &'static str| DecodeError::MissingField { protocol, field };
    if payload.id.is_empty() {
        return Err(missing("id"));
    }
    if payload.add.is_empty() {
        return Err(missing("add"));
    }
    let port = payload.port.trim().parse::<u16>().map_err(|e| DecodeError::Json {
        protocol,
        reason: format!("port {:?}: {e}", payload.port),
    })?;
    let alter_id = payload.aid.trim().parse::<u32>().unwrap_or(0);

    Ok(VmessFields {
        name: payload.ps,
        server: payload.add,
        port,
        id: payload.id,
        alter_id,
        net: payload.net,
        host: payload.host,
        path: payload.path,
        tls: payload.tls.eq_ignore_ascii_case("tls"),
        sni: payload.sni.filter(|s| !s.is_empty()),
    })
}

/// Decode a link according to its declared protocol.
pub fn decode_link(link: &ConnectionLink) -> Result<DecodedLink, DecodeError> {
    match link.protocol {
        PresetKind::VlessVision => decode_vless(&link.uri).map(DecodedLink::Vless),
        PresetKind::VmessWs => decode_vmess(&link.uri).map(DecodedLink::Vmess),
        PresetKind::Hysteria2 => decode_hysteria2(&link.uri).map(DecodedLink::Hysteria2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{hysteria2_link, vless_link, vmess_link};
    use sui_presets::{Hysteria2Preset, VlessVisionPreset, VmessWsPreset};

    const UUID: &str = "11111111-2222-3333-4444-555555555555";

    #[test]
    fn vmess_round_trip() {
        let p = VmessWsPreset {
            enabled: true,
            uuid: UUID.into(),
            path: "/x".into(),
        };
        let link = vmess_link(&p, "example.com", 10001).unwrap();
        let f = decode_vmess(&link.uri).unwrap();
        assert_eq!(f.id, UUID);
        assert_eq!(f.path, "/x");
        assert_eq!(f.net, "ws");
        assert_eq!(f.port, 10001);
        assert_eq!(f.server, "example.com");
        assert!(f.tls);
    }

    #[test]
    fn vless_round_trip() {
        let p = VlessVisionPreset {
            enabled: true,
            uuid: UUID.into(),
            private_key: "never-on-the-wire".into(),
            public_key: "Zm9vYmFyYmF6cXV4".into(),
            short_id: "0a1b2c3d".into(),
        };
        let link = vless_link(&p, "example.com", 10000, "www.microsoft.com").unwrap();
        let f = decode_vless(&link.uri).unwrap();
        assert_eq!(f.uuid, UUID);
        assert_eq!(f.public_key.as_deref(), Some("Zm9vYmFyYmF6cXV4"));
        assert_eq!(f.short_id.as_deref(), Some("0a1b2c3d"));
        assert_eq!(f.sni.as_deref(), Some("www.microsoft.com"));
        assert_eq!(f.flow.as_deref(), Some("xtls-rprx-vision"));
        assert_eq!(f.network.as_deref(), Some("tcp"));
        assert_eq!(f.name.as_deref(), Some("example.com-VLESS-Vision"));
        assert_eq!((f.server.as_str(), f.port), ("example.com", 10000));
    }

    #[test]
    fn hysteria2_round_trip() {
        let p = Hysteria2Preset {
            enabled: true,
            password: "p@ss/word".into(),
        };
        let link = hysteria2_link(&p, "example.com", 10002).unwrap();
        let f = decode_hysteria2(&link.uri).unwrap();
        assert_eq!(f.password, "p@ss/word");
        assert_eq!(f.sni.as_deref(), Some("example.com"));
        assert_eq!(f.port, 10002);
    }

    #[test]
    fn vless_without_reality_params() {
        let f = decode_vless(&format!("vless://{UUID}@h.com:443?security=reality&sni=x.com")).unwrap();
        assert_eq!(f.public_key, None);
        assert_eq!(f.short_id, None);
        // empty values count as absent
        let f = decode_vless(&format!("vless://{UUID}@h.com:443?pbk=&sid=")).unwrap();
        assert_eq!(f.public_key, None);
        assert_eq!(f.short_id, None);
    }

    #[test]
    fn vless_errors_are_typed() {
        assert!(matches!(
            decode_vless("vmess://abc"),
            Err(DecodeError::Scheme { protocol: PresetKind::VlessVision, .. })
        ));
        assert!(matches!(
            decode_vless("vless://h.com:443"),
            Err(DecodeError::MissingField { field: "userinfo", .. })
        ));
        assert!(matches!(
            decode_vless(&format!("vless://{UUID}@h.com")),
            Err(DecodeError::MissingField { field: "port", .. })
        ));
        assert!(matches!(
            decode_vless(&format!("vless://{UUID}@h.com:99999")),
            Err(DecodeError::Uri { .. })
        ));
    }

    #[test]
    fn vmess_accepts_numeric_and_unpadded_forms() {
        let json = format!(r#"{{"v":2,"add":"a.com","port":443,"id":"{UUID}","aid":0,"net":"ws","path":"/p"}}"#);
        for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD] {
            let uri = format!("vmess://{}", engine.encode(&json));
            let f = decode_vmess(&uri).unwrap();
            assert_eq!(f.port, 443);
            assert_eq!(f.alter_id, 0);
            assert!(!f.tls);
        }
    }

    #[test]
    fn vmess_errors_are_typed() {
        assert!(matches!(
            decode_vmess("vmess://!!!not-base64!!!"),
            Err(DecodeError::Base64 { .. })
        ));
        let not_json = format!("vmess://{}", STANDARD.encode("hello"));
        assert!(matches!(decode_vmess(&not_json), Err(DecodeError::Json { .. })));
        let no_id = format!("vmess://{}", STANDARD.encode(r#"{"add":"a.com","port":"1","id":""}"#));
        assert!(matches!(
            decode_vmess(&no_id),
            Err(DecodeError::MissingField { field: "id", .. })
        ));
        let bad_port = format!("vmess://{}", STANDARD.encode(r#"{"add":"a.com","port":"x","id":"i"}"#));
        assert!(matches!(decode_vmess(&bad_port), Err(DecodeError::Json { .. })));
    }

    #[test]
    fn hy2_alias_scheme() {
        let f = decode_hysteria2("hy2://secret@h.com:8443?sni=h.com#n").unwrap();
        assert_eq!(f.password, "secret");
        assert_eq!(f.name.as_deref(), Some("n"));
    }

    #[test]
    fn decode_link_dispatches_on_protocol() {
        let link = ConnectionLink {
            protocol: PresetKind::Hysteria2,
            uri: format!("vless://{UUID}@h.com:1"),
            port: 1,
        };
        let err = decode_link(&link).unwrap_err();
        assert_eq!(err.protocol(), PresetKind::Hysteria2);
    }
}
