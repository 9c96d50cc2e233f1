use super::open_store;
use crate::config::AppConfig;
use crate::directory::LinkSnapshots;
use anyhow::Result;
use clap::Args as ClapArgs;
use sui_subscribe::node_links;
use sui_types::node::node_id;

#[derive(ClapArgs, Debug)]
pub struct LinksArgs {
    /// Print the links as a JSON array
    #[arg(long)]
    pub json: bool,
    /// Also write a snapshot for `export`, under DATA_DIR/links
    #[arg(long)]
    pub save: bool,
}

pub fn run(cfg: &AppConfig, args: LinksArgs) -> Result<()> {
    let domain = cfg.require_domain()?;
    let store = open_store(cfg);
    let presets = store.ensure_initialized()?;
    let links = node_links(&presets, domain, store.options())?;

    if args.save {
        let path = LinkSnapshots::new(cfg.links_dir()).save(&node_id(domain), &links)?;
        tracing::info!(path = %path.display(), count = links.len(), "link snapshot saved");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else {
        for link in &links {
            println!("{}", link.uri);
        }
    }
    Ok(())
}
