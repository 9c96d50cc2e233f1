//! Preset management for a relay node.
//!
//! - [`keygen`]: UUIDs, Reality keypairs, short ids, passwords, WS paths
//! - [`model`]: the closed three-protocol preset set
//! - [`store`]: `presets.json` persistence and server config rewrite
//! - [`server_config`]: sing-box inbound derivation and port assignment
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use sui_presets::{build_server_config, CredentialGenerator, Presets, ServerOptions};
//! use sui_types::PresetKind;
//!
//! let mut gen = CredentialGenerator::new(StdRng::seed_from_u64(0));
//! let mut presets = Presets::generate(&mut gen);
//! presets.set_enabled(PresetKind::VmessWs, false);
//!
//! let cfg = build_server_config(&presets, &ServerOptions::new("node.example.com")).unwrap();
//! assert_eq!(cfg.port_of(PresetKind::Hysteria2), Some(10001));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod fs_atomic;
pub mod keygen;
pub mod model;
pub mod server_config;
pub mod store;

pub use fs_atomic::write_atomic;
pub use keygen::{is_placeholder_key, public_key_for, CredentialGenerator, KeyPair};
pub use model::{Hysteria2Preset, PresetRef, Presets, VlessVisionPreset, VmessWsPreset};
pub use server_config::{
    assign_ports, build_server_config, port_for, ServerConfig, ServerOptions, DEFAULT_BASE_PORT,
    DEFAULT_REALITY_SNI,
};
pub use store::{PresetStore, StoreError, PRESETS_FILE, SERVER_CONFIG_FILE};
