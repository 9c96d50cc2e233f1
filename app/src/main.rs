use clap::Parser;
use sui::cli::{self, Args};
use sui::logging::{init_logging, LoggingConfig};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig::from_env().with_verbose(args.global.verbose))?;
    tracing::debug!(command = ?args.command, "starting");
    cli::run(args)
}
