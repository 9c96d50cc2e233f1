//! Fleet-wide subscription export.
//!
//! Links are gathered from every reachable node, then rendered in the format
//! the client asked for. A node that cannot be reached or a link that cannot
//! be decoded is logged and skipped; the rest of the fleet is still served.

use crate::clash::{clash_config, clash_proxy, ClashConfig};
use crate::decode::{decode_link, DecodedLink};
use crate::link::ConnectionLink;
use crate::singbox::{singbox_config, singbox_outbound, SingboxClientConfig};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::collections::HashSet;
use sui_types::{LinkSource, NodeDirectory, NodeRecord};
use thiserror::Error;

/// Links served by one node.
pub type FleetLinks = Vec<(NodeRecord, Vec<ConnectionLink>)>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render clash yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("render json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Value of the subscription `format` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionFormat {
    Base64,
    Clash,
    Singbox,
    /// Anything else: the raw link list as JSON.
    Links,
}

impl SubscriptionFormat {
    /// `None` or empty means base64.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("base64") => Self::Base64,
            Some("clash") => Self::Clash,
            Some("singbox") | Some("sing-box") => Self::Singbox,
            Some(_) => Self::Links,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Base64 => "text/plain; charset=utf-8",
            Self::Clash => "text/yaml; charset=utf-8",
            Self::Singbox | Self::Links => "application/json",
        }
    }
}

/// Rendered subscription body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
}

/// Ask every registered node for its links.
///
/// Directory failures abort; a node whose agent cannot be reached
/// contributes nothing and is logged with its id.
pub fn collect_fleet<D, S>(directory: &D, source: &S) -> Result<FleetLinks, D::Error>
where
    D: NodeDirectory,
    S: LinkSource<Links = Vec<ConnectionLink>>,
{
    let nodes = directory.list()?;
    let mut fleet = Vec::with_capacity(nodes.len());
    for node in nodes {
        match source.fetch_links(&node) {
            Ok(links) => {
                tracing::debug!(node = %node.id, links = links.len(), "links collected");
                fleet.push((node, links));
            }
            Err(e) => {
                tracing::warn!(node = %node.id, domain = %node.domain, error = %e, "node unreachable, skipped");
            }
        }
    }
    Ok(fleet)
}

/// Newline-joined URIs, standard base64.
pub fn export_base64(fleet: &FleetLinks) -> String {
    let joined = fleet
        .iter()
        .flat_map(|(_, links)| links.iter().map(|l| l.uri.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    STANDARD.encode(joined)
}

struct Entry {
    name: String,
    server: String,
    port: u16,
    decoded: DecodedLink,
}

/// First free name of `base`, `{base}-{node_id}`, `{base}-{node_id}-2`, ...
fn unique_name(seen: &mut HashSet<String>, base: String, node_id: &str) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let tagged = format!("{base}-{node_id}");
    if seen.insert(tagged.clone()) {
        return tagged;
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{tagged}-{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Decode every link, dropping the ones that fail. Names are
/// `{nodeName}-{protocolLabel}`, made unique with the node id on collision.
fn decoded_entries(fleet: &FleetLinks) -> Vec<Entry> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (node, links) in fleet {
        for link in links {
            let decoded = match decode_link(link) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(node = %node.id, protocol = %link.protocol, error = %e, "link dropped from export");
                    continue;
                }
            };
            let name = unique_name(
                &mut seen,
                format!("{}-{}", node.name, link.protocol.label()),
                &node.id,
            );
            out.push(Entry {
                name,
                server: node.domain.clone(),
                port: link.port,
                decoded,
            });
        }
    }
    out
}

pub fn build_clash(fleet: &FleetLinks) -> ClashConfig {
    clash_config(
        decoded_entries(fleet)
            .into_iter()
            .map(|e| clash_proxy(e.name, &e.server, e.port, &e.decoded))
            .collect(),
    )
}

pub fn build_singbox(fleet: &FleetLinks) -> SingboxClientConfig {
    singbox_config(
        decoded_entries(fleet)
            .into_iter()
            .map(|e| singbox_outbound(e.name, &e.server, e.port, &e.decoded))
            .collect(),
    )
}

pub fn export_clash(fleet: &FleetLinks) -> Result<String, ExportError> {
    Ok(serde_yaml::to_string(&build_clash(fleet))?)
}

pub fn export_singbox(fleet: &FleetLinks) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&build_singbox(fleet))?)
}

#[derive(Debug, Serialize)]
struct LinkListEntry<'a> {
    node: &'a str,
    name: &'a str,
    #[serde(flatten)]
    link: &'a ConnectionLink,
}

/// Structured fallback: every link with the node it came from.
pub fn export_links(fleet: &FleetLinks) -> Result<String, ExportError> {
    let entries: Vec<_> = fleet
        .iter()
        .flat_map(|(node, links)| {
            links.iter().map(move |link| LinkListEntry {
                node: &node.id,
                name: &node.name,
                link,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Render `fleet` in `format`.
pub fn export(fleet: &FleetLinks, format: SubscriptionFormat) -> Result<Rendered, ExportError> {
    let body = match format {
        SubscriptionFormat::Base64 => export_base64(fleet),
        SubscriptionFormat::Clash => export_clash(fleet)?,
        SubscriptionFormat::Singbox => export_singbox(fleet)?,
        SubscriptionFormat::Links => export_links(fleet)?,
    };
    Ok(Rendered {
        content_type: format.content_type(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!(SubscriptionFormat::parse(None), SubscriptionFormat::Base64);
        assert_eq!(SubscriptionFormat::parse(Some("")), SubscriptionFormat::Base64);
        assert_eq!(SubscriptionFormat::parse(Some("Clash")), SubscriptionFormat::Clash);
        assert_eq!(SubscriptionFormat::parse(Some("singbox")), SubscriptionFormat::Singbox);
        assert_eq!(SubscriptionFormat::parse(Some("v2rayn")), SubscriptionFormat::Links);
    }

    #[test]
    fn empty_fleet_base64_is_empty() {
        assert_eq!(export_base64(&Vec::new()), "");
    }
}
