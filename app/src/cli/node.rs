use crate::config::AppConfig;
use crate::directory::{JsonNodeDirectory, LinkSnapshots};
use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Args as ClapArgs, Subcommand};
use sui_security::node_api_url;
use sui_types::{validate_node_id, LinkSource, NodeDirectory, NodeRecord};

#[derive(ClapArgs, Debug)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Register a node; re-adding a domain replaces its record
    Add {
        name: String,
        #[arg(value_name = "DOMAIN")]
        node_domain: String,
        /// Reach the agent over plain HTTP
        #[arg(long)]
        http: bool,
    },
    /// List registered nodes
    List {
        #[arg(long)]
        json: bool,
    },
    /// Remove a node by id
    Remove { id: String },
    /// Print the agent API base URL of a node
    Url { id: String },
    /// Mark each node online or offline by whether its link snapshot loads
    Check,
}

pub fn run(cfg: &AppConfig, args: NodeArgs) -> Result<()> {
    let dir = JsonNodeDirectory::new(cfg.nodes_file());
    match args.command {
        NodeCommand::Add {
            name,
            node_domain,
            http,
        } => {
            let record = NodeRecord::new(&name, &node_domain, !http)?;
            dir.put(&record.id, record.clone())?;
            println!("{}", record.id);
        }
        NodeCommand::List { json } => {
            let nodes = dir.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                for n in &nodes {
                    let scheme = if n.use_https { "https" } else { "http" };
                    println!("{}  {:<24} {scheme}://{}", n.id, n.name, n.domain);
                }
            }
        }
        NodeCommand::Remove { id } => {
            let id = validate_node_id(&id)?;
            if !dir.delete(id)? {
                bail!("node {id}: not found");
            }
            println!("removed {id}");
        }
        NodeCommand::Url { id } => {
            let secret = cfg.require_secret()?;
            let id = validate_node_id(&id)?;
            let Some(node) = dir.get(id)? else {
                bail!("node {id}: not found");
            };
            println!("{}", node_api_url(&node, secret.expose()));
        }
        NodeCommand::Check => {
            let snapshots = LinkSnapshots::new(cfg.links_dir());
            let now = Utc::now();
            for mut node in dir.list()? {
                let reachable = snapshots.fetch_links(&node).is_ok();
                node.mark_checked(reachable, now);
                println!("{}  {:?}", node.id, node.status);
                dir.put(&node.id.clone(), node)?;
            }
        }
    }
    Ok(())
}
