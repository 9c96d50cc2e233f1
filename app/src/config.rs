//! Process configuration from the environment, overridable by CLI flags.

use anyhow::{Context, Result};
use std::path::PathBuf;
use sui_presets::ServerOptions;
use sui_security::ClusterSecret;

pub const DEFAULT_CONFIG_DIR: &str = "/config";
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const NODES_FILE: &str = "nodes.json";
pub const LINKS_DIR: &str = "links";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cluster_secret: ClusterSecret,
    pub node_domain: Option<String>,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub reality_sni: Option<String>,
    pub base_port: Option<u16>,
}

/// Flag values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub node_domain: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub reality_sni: Option<String>,
    pub base_port: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let base_port = match non_empty("SUI_BASE_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("SUI_BASE_PORT {raw:?} is not a port number"))?,
            ),
            None => None,
        };
        Ok(Self {
            cluster_secret: ClusterSecret::new(get("CLUSTER_SECRET").unwrap_or_default()),
            node_domain: non_empty("NODE_DOMAIN"),
            config_dir: non_empty("CONFIG_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from),
            data_dir: non_empty("DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            reality_sni: non_empty("SUI_REALITY_SNI"),
            base_port,
        })
    }

    #[must_use]
    pub fn with_overrides(mut self, o: Overrides) -> Self {
        if o.node_domain.is_some() {
            self.node_domain = o.node_domain;
        }
        if let Some(dir) = o.config_dir {
            self.config_dir = dir;
        }
        if let Some(dir) = o.data_dir {
            self.data_dir = dir;
        }
        if o.reality_sni.is_some() {
            self.reality_sni = o.reality_sni;
        }
        if o.base_port.is_some() {
            self.base_port = o.base_port;
        }
        self
    }

    /// Node registry kept by the controller.
    pub fn nodes_file(&self) -> PathBuf {
        self.data_dir.join(NODES_FILE)
    }

    /// Per-node link snapshots used by `export`.
    pub fn links_dir(&self) -> PathBuf {
        self.data_dir.join(LINKS_DIR)
    }

    /// Options for config and link generation on this node.
    pub fn server_options(&self) -> ServerOptions {
        let mut opts = ServerOptions::new(self.node_domain.clone().unwrap_or_default());
        if let Some(sni) = &self.reality_sni {
            opts = opts.with_reality_sni(sni.clone());
        }
        if let Some(port) = self.base_port {
            opts = opts.with_base_port(port);
        }
        opts
    }

    pub fn require_domain(&self) -> Result<&str> {
        self.node_domain
            .as_deref()
            .context("NODE_DOMAIN is not set (use --domain or the NODE_DOMAIN variable)")
    }

    pub fn require_secret(&self) -> Result<&ClusterSecret> {
        anyhow::ensure!(
            !self.cluster_secret.is_empty(),
            "CLUSTER_SECRET is not set"
        );
        Ok(&self.cluster_secret)
    }
}
