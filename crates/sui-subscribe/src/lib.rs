//! Subscription codec: connection links in, client configs out.
//!
//! - [`link`]: preset → `vless://` / `vmess://` / `hysteria2://`
//! - [`decode`]: the reverse, into typed fields
//! - [`clash`], [`singbox`]: client document models
//! - [`export`]: fleet aggregation and format selection

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod clash;
pub mod decode;
pub mod export;
pub mod link;
pub mod singbox;

pub use decode::{
    decode_hysteria2, decode_link, decode_vless, decode_vmess, DecodedLink, Hysteria2Fields,
    VlessFields, VmessFields,
};
pub use export::{
    build_clash, build_singbox, collect_fleet, export, export_base64, export_clash,
    export_links, export_singbox, ExportError, FleetLinks, Rendered, SubscriptionFormat,
};
pub use link::{
    encode_preset, hysteria2_link, node_links, vless_link, vmess_link, ConnectionLink,
    VmessPayload,
};
