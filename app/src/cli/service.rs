use crate::config::AppConfig;
use crate::docker::DockerCli;
use anyhow::Result;
use clap::{Args as ClapArgs, Subcommand};
use sui_types::{sanitize_lines, ContainerControl, ServiceKey};

#[derive(ClapArgs, Debug)]
pub struct ServiceArgs {
    /// Container CLI to invoke
    #[arg(long, default_value = "docker", hide = true)]
    pub docker: String,
    #[command(subcommand)]
    pub command: ServiceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// Container state of one service, or all of them
    Status { service: Option<ServiceKey> },
    /// Restart one service
    Restart { service: ServiceKey },
    /// Tail a service's logs
    Logs {
        service: ServiceKey,
        /// 1..=1000, anything else falls back to 100
        #[arg(long, default_value = "100")]
        lines: String,
    },
}

pub fn run(_cfg: &AppConfig, args: ServiceArgs) -> Result<()> {
    let docker = DockerCli::new(args.docker);
    match args.command {
        ServiceCommand::Status { service } => {
            let services = match service {
                Some(s) => vec![s],
                None => ServiceKey::ALL.to_vec(),
            };
            for s in services {
                println!("{:<8} {}", s.as_str(), docker.inspect_status(s));
            }
        }
        ServiceCommand::Restart { service } => println!("{}", docker.restart(service)?),
        ServiceCommand::Logs { service, lines } => {
            print!("{}", docker.tail_logs(service, sanitize_lines(&lines))?);
        }
    }
    Ok(())
}
