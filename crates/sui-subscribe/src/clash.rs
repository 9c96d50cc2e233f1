//! Clash (mihomo) proxy list rendering.

use crate::decode::{DecodedLink, Hysteria2Fields, VlessFields, VmessFields};
use serde::Serialize;

pub const GROUP_NAME: &str = "SUI-Auto";
pub const CHECK_URL: &str = "http://www.gstatic.com/generate_204";
pub const CHECK_INTERVAL_SECS: u32 = 300;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashConfig {
    pub proxies: Vec<ClashProxy>,
    #[serde(rename = "proxy-groups")]
    pub proxy_groups: Vec<ClashProxyGroup>,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ClashProxy {
    Vless(ClashVlessProxy),
    Vmess(ClashVmessProxy),
    Hysteria2(ClashHysteria2Proxy),
}

impl ClashProxy {
    pub fn name(&self) -> &str {
        match self {
            Self::Vless(p) => &p.name,
            Self::Vmess(p) => &p.name,
            Self::Hysteria2(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashVlessProxy {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: &'static str,
    pub server: String,
    pub port: u16,
    pub uuid: String,
    pub network: String,
    pub udp: bool,
    pub tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(rename = "client-fingerprint", skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(rename = "reality-opts", skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<ClashRealityOpts>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashRealityOpts {
    #[serde(rename = "public-key", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(rename = "short-id", skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashVmessProxy {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: &'static str,
    pub server: String,
    pub port: u16,
    pub uuid: String,
    #[serde(rename = "alterId")]
    pub alter_id: u32,
    pub cipher: &'static str,
    pub udp: bool,
    pub tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    pub network: String,
    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashWsOpts {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<ClashWsHeaders>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashWsHeaders {
    #[serde(rename = "Host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashHysteria2Proxy {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: &'static str,
    pub server: String,
    pub port: u16,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(rename = "skip-cert-verify")]
    pub skip_cert_verify: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClashProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: &'static str,
    pub proxies: Vec<String>,
    pub url: String,
    pub interval: u32,
}

fn vless_proxy(name: String, server: &str, port: u16, f: &VlessFields) -> ClashProxy {
    let reality_opts = (f.public_key.is_some() || f.short_id.is_some()).then(|| ClashRealityOpts {
        public_key: f.public_key.clone(),
        short_id: f.short_id.clone(),
    });
    ClashProxy::Vless(ClashVlessProxy {
        name,
        proxy_type: "vless",
        server: server.to_string(),
        port,
        uuid: f.uuid.clone(),
        network: f.network.clone().unwrap_or_else(|| "tcp".to_string()),
        udp: true,
        tls: true,
        flow: f.flow.clone(),
        servername: f.sni.clone(),
        client_fingerprint: f.fingerprint.clone(),
        reality_opts,
    })
}

fn vmess_proxy(name: String, server: &str, port: u16, f: &VmessFields) -> ClashProxy {
    let ws_opts = (f.net == "ws").then(|| ClashWsOpts {
        path: if f.path.is_empty() { "/".to_string() } else { f.path.clone() },
        headers: (!f.host.is_empty()).then(|| ClashWsHeaders {
            host: f.host.clone(),
        }),
    });
    let servername = f
        .sni
        .clone()
        .or_else(|| (f.tls && !f.host.is_empty()).then(|| f.host.clone()));
    ClashProxy::Vmess(ClashVmessProxy {
        name,
        proxy_type: "vmess",
        server: server.to_string(),
        port,
        uuid: f.id.clone(),
        alter_id: f.alter_id,
        cipher: "auto",
        udp: true,
        tls: f.tls,
        servername,
        network: f.net.clone(),
        ws_opts,
    })
}

fn hysteria2_proxy(name: String, server: &str, port: u16, f: &Hysteria2Fields) -> ClashProxy {
    ClashProxy::Hysteria2(ClashHysteria2Proxy {
        name,
        proxy_type: "hysteria2",
        server: server.to_string(),
        port,
        password: f.password.clone(),
        sni: f.sni.clone(),
        skip_cert_verify: false,
    })
}

/// One Clash proxy; `server` is the node domain and `port` the link port.
pub fn clash_proxy(name: String, server: &str, port: u16, link: &DecodedLink) -> ClashProxy {
    match link {
        DecodedLink::Vless(f) => vless_proxy(name, server, port, f),
        DecodedLink::Vmess(f) => vmess_proxy(name, server, port, f),
        DecodedLink::Hysteria2(f) => hysteria2_proxy(name, server, port, f),
    }
}

/// Wrap proxies with the `url-test` group and a catch-all rule.
pub fn clash_config(proxies: Vec<ClashProxy>) -> ClashConfig {
    let names = proxies.iter().map(|p| p.name().to_string()).collect();
    ClashConfig {
        proxies,
        proxy_groups: vec![ClashProxyGroup {
            name: GROUP_NAME.to_string(),
            group_type: "url-test",
            proxies: names,
            url: CHECK_URL.to_string(),
            interval: CHECK_INTERVAL_SECS,
        }],
        rules: vec![format!("MATCH,{GROUP_NAME}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vless_fields(pbk: Option<&str>) -> VlessFields {
        VlessFields {
            uuid: "u".into(),
            server: "ignored".into(),
            port: 1,
            flow: Some("xtls-rprx-vision".into()),
            security: Some("reality".into()),
            sni: Some("www.microsoft.com".into()),
            fingerprint: Some("chrome".into()),
            public_key: pbk.map(Into::into),
            short_id: Some("abcd".into()),
            network: Some("tcp".into()),
            name: None,
        }
    }

    #[test]
    fn vless_reality_opts_follow_decoded_fields() {
        let p = clash_proxy("n-vless".into(), "a.com", 10000, &DecodedLink::Vless(vless_fields(Some("PK"))));
        let v = serde_yaml::to_value(&p).unwrap();
        assert_eq!(v["reality-opts"]["public-key"].as_str(), Some("PK"));
        assert_eq!(v["server"].as_str(), Some("a.com"));
        assert_eq!(v["client-fingerprint"].as_str(), Some("chrome"));

        let p = clash_proxy("n-vless".into(), "a.com", 10000, &DecodedLink::Vless(vless_fields(None)));
        let v = serde_yaml::to_value(&p).unwrap();
        assert!(v["reality-opts"].get("public-key").is_none());
        assert_eq!(v["reality-opts"]["short-id"].as_str(), Some("abcd"));
    }

    #[test]
    fn vmess_ws_opts() {
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
        let v = serde_yaml::to_value(clash_proxy("n-vmess".into(), "a.com", 10001, &DecodedLink::Vmess(f))).unwrap();
        assert_eq!(v["ws-opts"]["path"].as_str(), Some("/x"));
        assert_eq!(v["ws-opts"]["headers"]["Host"].as_str(), Some("a.com"));
        assert_eq!(v["alterId"].as_u64(), Some(0));
        assert_eq!(v["servername"].as_str(), Some("a.com"));
    }

    #[test]
    fn group_lists_every_proxy() {
        let hy = DecodedLink::Hysteria2(Hysteria2Fields {
            password: "p".into(),
            server: "a.com".into(),
            port: 1,
            sni: None,
            name: None,
        });
        let cfg = clash_config(vec![
            clash_proxy("a-hy2".into(), "a.com", 1, &hy),
            clash_proxy("b-hy2".into(), "b.com", 2, &hy),
        ]);
        let g = &cfg.proxy_groups[0];
        assert_eq!(g.group_type, "url-test");
        assert_eq!(g.interval, 300);
        assert_eq!(g.proxies, vec!["a-hy2", "b-hy2"]);
        assert_eq!(cfg.rules, vec!["MATCH,SUI-Auto"]);
    }
}
