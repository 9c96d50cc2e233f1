use super::open_store;
use crate::config::AppConfig;
use anyhow::Result;
use clap::{Args as ClapArgs, Subcommand};
use sui_presets::{PresetStore, Presets};
use sui_security::redact_token;
use sui_types::PresetKind;

#[derive(ClapArgs, Debug)]
pub struct PresetArgs {
    #[command(subcommand)]
    pub command: PresetCommand,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// Generate presets on first start; no-op afterwards
    Init,
    /// Print the stored presets
    Show {
        /// Print the Reality private key in clear
        #[arg(long)]
        reveal: bool,
    },
    /// Enable one protocol
    Enable { kind: PresetKind },
    /// Disable one protocol
    Disable { kind: PresetKind },
    /// Rotate credentials for one protocol, or all of them
    Regenerate { kind: Option<PresetKind> },
}

pub fn run(cfg: &AppConfig, args: PresetArgs) -> Result<()> {
    let store = open_store(cfg);
    let presets = match args.command {
        PresetCommand::Init => {
            let existed = store.load().is_some();
            let presets = store.ensure_initialized()?;
            if existed {
                println!("presets already initialized at {}", store.presets_path().display());
            } else {
                println!("presets written to {}", store.presets_path().display());
            }
            return print_ports(&store, &presets);
        }
        PresetCommand::Show { reveal } => {
            let presets = store.ensure_initialized()?;
            println!("{}", render(&presets, reveal)?);
            return Ok(());
        }
        PresetCommand::Enable { kind } => store.set_enabled(kind, true)?,
        PresetCommand::Disable { kind } => store.set_enabled(kind, false)?,
        PresetCommand::Regenerate { kind: Some(kind) } => store.regenerate(kind)?,
        PresetCommand::Regenerate { kind: None } => store.regenerate_all()?,
    };
    print_ports(&store, &presets)
}

fn print_ports(store: &PresetStore, presets: &Presets) -> Result<()> {
    let config = store.server_config(presets)?;
    for kind in PresetKind::ALL {
        match config.port_of(kind) {
            Some(port) => println!("{:<14} enabled   port {port}", kind.as_str()),
            None => println!("{:<14} disabled", kind.as_str()),
        }
    }
    Ok(())
}

/// Presets as pretty JSON, the Reality private key redacted unless `reveal`.
pub fn render(presets: &Presets, reveal: bool) -> Result<String> {
    let mut value = serde_json::to_value(presets)?;
    if !reveal {
        if let Some(key) = value
            .pointer_mut("/vless_vision/private_key")
            .and_then(|v| v.as_str().map(redact_token))
        {
            value["vless_vision"]["private_key"] = serde_json::Value::String(key);
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sui_presets::CredentialGenerator;

    #[test]
    fn private_key_is_redacted_by_default() {
        let presets = Presets::generate(&mut CredentialGenerator::os());
        let private = presets.vless_vision.private_key.clone();

        let shown = render(&presets, false).unwrap();
        assert!(!shown.contains(&private));
        assert!(shown.contains(&presets.vless_vision.public_key));

        let revealed = render(&presets, true).unwrap();
        assert!(revealed.contains(&private));
    }
}
