pub mod export;
pub mod links;
pub mod node;
pub mod preset;
pub mod service;

use crate::config::{AppConfig, Overrides};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sui_presets::PresetStore;

#[derive(Parser, Debug)]
#[command(name = "sui", version)]
#[command(about = "Relay node presets, links, node registry and subscription export", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand; each overrides its environment variable.
#[derive(clap::Args, Debug, Default)]
pub struct GlobalOpts {
    /// Node config directory [env: CONFIG_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
    /// Controller data directory [env: DATA_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Public domain of this node [env: NODE_DOMAIN]
    #[arg(long, global = true)]
    pub domain: Option<String>,
    /// Reality handshake target [env: SUI_REALITY_SNI]
    #[arg(long, global = true)]
    pub reality_sni: Option<String>,
    /// First listen port [env: SUI_BASE_PORT]
    #[arg(long, global = true)]
    pub base_port: Option<u16>,
    /// Debug logging unless SUI_LOG_LEVEL says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            node_domain: self.domain.clone(),
            config_dir: self.config_dir.clone(),
            data_dir: self.data_dir.clone(),
            reality_sni: self.reality_sni.clone(),
            base_port: self.base_port,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the hidden API path derived from CLUSTER_SECRET
    Path,
    /// Inspect and manage protocol presets
    Preset(preset::PresetArgs),
    /// Print the sing-box server config derived from the presets
    Config,
    /// Print connection links for this node
    Links(links::LinksArgs),
    /// Manage the controller's node registry
    Node(node::NodeArgs),
    /// Render a fleet subscription
    Export(export::ExportArgs),
    /// Control whitelisted node services
    Service(service::ServiceArgs),
}

pub fn run(args: Args) -> Result<()> {
    let cfg = AppConfig::from_env()?.with_overrides(args.global.overrides());
    match args.command {
        Commands::Path => print_path(&cfg),
        Commands::Preset(a) => preset::run(&cfg, a),
        Commands::Config => print_server_config(&cfg),
        Commands::Links(a) => links::run(&cfg, a),
        Commands::Node(a) => node::run(&cfg, a),
        Commands::Export(a) => export::run(&cfg, a),
        Commands::Service(a) => service::run(&cfg, a),
    }
}

pub(crate) fn open_store(cfg: &AppConfig) -> PresetStore {
    PresetStore::open(&cfg.config_dir, cfg.server_options())
}

fn print_path(cfg: &AppConfig) -> Result<()> {
    let secret = cfg.require_secret()?;
    println!("{}", sui_security::derive_path(secret.expose()));
    println!("{}", sui_security::api_prefix(secret.expose()));
    Ok(())
}

fn print_server_config(cfg: &AppConfig) -> Result<()> {
    let store = open_store(cfg);
    let presets = store.ensure_initialized()?;
    let config = store.server_config(&presets)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}
