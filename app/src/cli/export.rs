use crate::config::AppConfig;
use crate::directory::{JsonNodeDirectory, LinkSnapshots};
use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use std::path::PathBuf;
use sui_presets::write_atomic;
use sui_subscribe::{collect_fleet, export, SubscriptionFormat};

#[derive(ClapArgs, Debug)]
pub struct ExportArgs {
    /// base64 (default), clash or singbox; anything else lists the links as JSON
    #[arg(long)]
    pub format: Option<String>,
    /// Directory of link snapshots [default: DATA_DIR/links]
    #[arg(long, value_name = "DIR")]
    pub links_dir: Option<PathBuf>,
    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(cfg: &AppConfig, args: ExportArgs) -> Result<()> {
    let directory = JsonNodeDirectory::new(cfg.nodes_file());
    let snapshots = LinkSnapshots::new(args.links_dir.unwrap_or_else(|| cfg.links_dir()));
    let fleet = collect_fleet(&directory, &snapshots)?;

    let format = SubscriptionFormat::parse(args.format.as_deref());
    let rendered = export(&fleet, format)?;
    tracing::info!(
        nodes = fleet.len(),
        format = ?format,
        content_type = rendered.content_type,
        "subscription rendered"
    );

    match args.output {
        Some(path) => write_atomic(&path, rendered.body.as_bytes())
            .with_context(|| format!("write {}", path.display()))?,
        None => println!("{}", rendered.body),
    }
    Ok(())
}
