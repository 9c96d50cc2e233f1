//! sing-box client outbound rendering.

use crate::decode::{DecodedLink, Hysteria2Fields, VlessFields, VmessFields};
use serde::Serialize;

pub const DIRECT_TAG: &str = "direct";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SingboxClientConfig {
    pub outbounds: Vec<ClientOutbound>,
    pub route: Route,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Route {
    #[serde(rename = "final")]
    pub final_tag: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientOutbound {
    Vless(VlessOutbound),
    Vmess(VmessOutbound),
    Hysteria2(Hysteria2Outbound),
    Direct { tag: String },
}

impl ClientOutbound {
    pub fn tag(&self) -> &str {
        match self {
            Self::Vless(o) => &o.tag,
            Self::Vmess(o) => &o.tag,
            Self::Hysteria2(o) => &o.tag,
            Self::Direct { tag } => tag,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VlessOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    pub tls: ClientTls,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VmessOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    pub security: &'static str,
    pub alter_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<ClientTls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<WsTransport>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Hysteria2Outbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub password: String,
    pub tls: ClientTls,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClientTls {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utls: Option<Utls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality: Option<ClientReality>,
}

impl ClientTls {
    fn plain(server_name: Option<String>) -> Self {
        Self {
            enabled: true,
            server_name,
            utls: None,
            reality: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Utls {
    pub enabled: bool,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClientReality {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WsTransport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<WsHeaders>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WsHeaders {
    #[serde(rename = "Host")]
    pub host: String,
}

fn vless_outbound(tag: String, server: &str, port: u16, f: &VlessFields) -> ClientOutbound {
    let is_reality = f.security.as_deref() == Some("reality")
        || f.public_key.is_some()
        || f.short_id.is_some();
    ClientOutbound::Vless(VlessOutbound {
        tag,
        server: server.to_string(),
        server_port: port,
        uuid: f.uuid.clone(),
        flow: f.flow.clone(),
        tls: ClientTls {
            enabled: true,
            server_name: f.sni.clone(),
            utls: f.fingerprint.clone().map(|fingerprint| Utls {
                enabled: true,
                fingerprint,
            }),
            reality: is_reality.then(|| ClientReality {
                enabled: true,
                public_key: f.public_key.clone(),
                short_id: f.short_id.clone(),
            }),
        },
    })
}

fn vmess_outbound(tag: String, server: &str, port: u16, f: &VmessFields) -> ClientOutbound {
    let server_name = f
        .sni
        .clone()
        .or_else(|| (!f.host.is_empty()).then(|| f.host.clone()));
    ClientOutbound::Vmess(VmessOutbound {
        tag,
        server: server.to_string(),
        server_port: port,
        uuid: f.id.clone(),
        security: "auto",
        alter_id: f.alter_id,
        tls: f.tls.then(|| ClientTls::plain(server_name)),
        transport: (f.net == "ws").then(|| WsTransport {
            kind: "ws",
            path: if f.path.is_empty() { "/".to_string() } else { f.path.clone() },
            headers: (!f.host.is_empty()).then(|| WsHeaders {
                host: f.host.clone(),
            }),
        }),
    })
}

fn hysteria2_outbound(tag: String, server: &str, port: u16, f: &Hysteria2Fields) -> ClientOutbound {
    ClientOutbound::Hysteria2(Hysteria2Outbound {
        tag,
        server: server.to_string(),
        server_port: port,
        password: f.password.clone(),
        tls: ClientTls::plain(f.sni.clone()),
    })
}

/// One outbound; `server` is the node domain and `port` the link port.
pub fn singbox_outbound(tag: String, server: &str, port: u16, link: &DecodedLink) -> ClientOutbound {
    match link {
        DecodedLink::Vless(f) => vless_outbound(tag, server, port, f),
        DecodedLink::Vmess(f) => vmess_outbound(tag, server, port, f),
        DecodedLink::Hysteria2(f) => hysteria2_outbound(tag, server, port, f),
    }
}

/// Append the `direct` outbound and route everything to the first proxy.
pub fn singbox_config(mut outbounds: Vec<ClientOutbound>) -> SingboxClientConfig {
    let final_tag = outbounds
        .first()
        .map_or_else(|| DIRECT_TAG.to_string(), |o| o.tag().to_string());
    outbounds.push(ClientOutbound::Direct {
        tag: DIRECT_TAG.to_string(),
    });
    SingboxClientConfig {
        outbounds,
        route: Route { final_tag },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_routes_to_direct() {
        let v = serde_json::to_value(singbox_config(Vec::new())).unwrap();
        assert_eq!(v["route"]["final"], "direct");
        assert_eq!(v["outbounds"], serde_json::json!([{"type": "direct", "tag": "direct"}]));
    }

    #[test]
    fn vless_nests_reality_under_tls() {
        let f = VlessFields {
            uuid: "u".into(),
            server: "x".into(),
            port: 1,
            flow: Some("xtls-rprx-vision".into()),
            security: Some("reality".into()),
            sni: Some("www.microsoft.com".into()),
            fingerprint: Some("chrome".into()),
            public_key: Some("PK".into()),
            short_id: Some("abcd".into()),
            network: Some("tcp".into()),
            name: None,
        };
        let cfg = singbox_config(vec![singbox_outbound("n-VLESS-Vision".into(), "a.com", 10000, &DecodedLink::Vless(f))]);
        let v = serde_json::to_value(&cfg).unwrap();
        let o = &v["outbounds"][0];
        assert_eq!(o["type"], "vless");
        assert_eq!(o["server_port"], 10000);
        assert_eq!(o["tls"]["reality"]["public_key"], "PK");
        assert_eq!(o["tls"]["utls"]["fingerprint"], "chrome");
        assert_eq!(v["route"]["final"], "n-VLESS-Vision");
        assert_eq!(v["outbounds"][1]["type"], "direct");
    }

    #[test]
    fn vmess_ws_transport() {
        let f = VmessFields {
            name: String::new(),
            server: "a.com".into(),
            port: 10001,
            id: "u".into(),
            alter_id: 0,
            net: "ws".into(),
            host: "a.com".into(),
            path: "/x".into(),
            tls: true,
            sni: None,
        };
        let v = serde_json::to_value(singbox_outbound("t".into(), "a.com", 10001, &DecodedLink::Vmess(f))).unwrap();
        assert_eq!(v["transport"]["type"], "ws");
        assert_eq!(v["transport"]["path"], "/x");
        assert_eq!(v["transport"]["headers"]["Host"], "a.com");
        assert_eq!(v["tls"]["server_name"], "a.com");
    }
}
