//! Persistent preset store.
//!
//! `presets.json` is the source of truth; `singbox/config.json` is rewritten
//! from it after every mutation. All mutations run under one mutex, which
//! also guards the credential generator, and every file is replaced
//! atomically.

use crate::fs_atomic::write_atomic;
use crate::keygen::CredentialGenerator;
use crate::model::Presets;
use crate::server_config::{build_server_config, ServerConfig, ServerOptions};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::io;
use std::path::{Path, PathBuf};
use sui_types::{CodecError, PresetKind};
use thiserror::Error;

pub const PRESETS_FILE: &str = "presets.json";
pub const SERVER_CONFIG_FILE: &str = "singbox/config.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} holds invalid presets: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-backed presets plus the server config derived from them.
pub struct PresetStore<R = OsRng> {
    presets_path: PathBuf,
    server_config_path: PathBuf,
    options: ServerOptions,
    generator: Mutex<CredentialGenerator<R>>,
}

impl PresetStore<OsRng> {
    /// Store rooted at a node's config directory, using the OS RNG.
    pub fn open(config_dir: impl AsRef<Path>, options: ServerOptions) -> Self {
        let dir = config_dir.as_ref();
        Self::with_generator(
            dir.join(PRESETS_FILE),
            dir.join(SERVER_CONFIG_FILE),
            options,
            CredentialGenerator::os(),
        )
    }
}

impl<R: RngCore> PresetStore<R> {
    pub fn with_generator(
        presets_path: impl Into<PathBuf>,
        server_config_path: impl Into<PathBuf>,
        options: ServerOptions,
        generator: CredentialGenerator<R>,
    ) -> Self {
        Self {
            presets_path: presets_path.into(),
            server_config_path: server_config_path.into(),
            options,
            generator: Mutex::new(generator),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn presets_path(&self) -> &Path {
        &self.presets_path
    }

    pub fn server_config_path(&self) -> &Path {
        &self.server_config_path
    }

    /// Persisted presets. Absent, unreadable, malformed or invalid data
    /// yields `None`.
    pub fn load(&self) -> Option<Presets> {
        match self.read().and_then(|p| p.map(|p| self.checked(p)).transpose()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(path = %self.presets_path.display(), error = %e, "presets not loaded");
                None
            }
        }
    }

    /// The file as stored. Only a missing file or one of the wrong shape is
    /// `None`; content that parses is returned unvalidated.
    fn read(&self) -> Result<Option<Presets>, StoreError> {
        let raw = match std::fs::read(&self.presets_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.presets_path, e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(p) => Ok(Some(p)),
            Err(e) => {
                tracing::warn!(path = %self.presets_path.display(), error = %e, "presets malformed, ignoring");
                Ok(None)
            }
        }
    }

    fn checked(&self, presets: Presets) -> Result<Presets, StoreError> {
        presets.validate().map_err(|source| StoreError::Invalid {
            path: self.presets_path.clone(),
            source,
        })?;
        Ok(presets)
    }

    /// Persisted presets, or a freshly generated all-enabled set that is
    /// written out together with its server config.
    pub fn ensure_initialized(&self) -> Result<Presets, StoreError> {
        let mut gen = self.generator.lock();
        self.load_or_init(&mut gen)
    }

    /// Toggle one preset and rewrite both files.
    pub fn set_enabled(&self, kind: PresetKind, enabled: bool) -> Result<Presets, StoreError> {
        let mut gen = self.generator.lock();
        let mut presets = self.load_or_init(&mut gen)?;
        presets.set_enabled(kind, enabled);
        self.persist(&presets)?;
        tracing::info!(protocol = %kind, enabled, "preset toggled");
        Ok(presets)
    }

    /// New credentials for every kind; enabled flags are kept.
    pub fn regenerate_all(&self) -> Result<Presets, StoreError> {
        let mut gen = self.generator.lock();
        let mut presets = self.read_or_init(&mut gen)?;
        for kind in PresetKind::ALL {
            presets.regenerate(kind, &mut gen);
        }
        self.persist(&presets)?;
        tracing::info!("all preset credentials regenerated");
        Ok(presets)
    }

    /// New credentials for one kind; its enabled flag is kept.
    ///
    /// Also the repair path for a file that parses but fails validation:
    /// the result is validated only after the kind is replaced.
    pub fn regenerate(&self, kind: PresetKind) -> Result<Presets, StoreError> {
        let mut gen = self.generator.lock();
        let mut presets = self.read_or_init(&mut gen)?;
        presets.regenerate(kind, &mut gen);
        self.persist(&presets)?;
        tracing::info!(protocol = %kind, "preset credentials regenerated");
        Ok(presets)
    }

    /// Server config for `presets` under this store's options.
    pub fn server_config(&self, presets: &Presets) -> Result<ServerConfig, CodecError> {
        build_server_config(presets, &self.options)
    }

    /// Stored presets, validated. Invalid content is an error, never a
    /// reason to generate new credentials.
    fn load_or_init(&self, gen: &mut CredentialGenerator<R>) -> Result<Presets, StoreError> {
        let presets = self.read_or_init(gen)?;
        self.checked(presets)
    }

    fn read_or_init(&self, gen: &mut CredentialGenerator<R>) -> Result<Presets, StoreError> {
        if let Some(p) = self.read()? {
            return Ok(p);
        }
        let presets = Presets::generate(gen);
        self.persist(&presets)?;
        tracing::info!(path = %self.presets_path.display(), "generated initial presets");
        Ok(presets)
    }

    // Caller holds the generator lock.
    fn persist(&self, presets: &Presets) -> Result<(), StoreError> {
        presets.validate().map_err(|source| StoreError::Invalid {
            path: self.presets_path.clone(),
            source,
        })?;
        let config = self.server_config(presets)?;
        let presets_json = serde_json::to_vec_pretty(presets).map_err(|source| StoreError::Serialize {
            what: "presets",
            source,
        })?;
        let config_json = serde_json::to_vec_pretty(&config).map_err(|source| StoreError::Serialize {
            what: "server config",
            source,
        })?;

        write_atomic(&self.presets_path, &presets_json)
            .map_err(|e| StoreError::io(&self.presets_path, e))?;
        write_atomic(&self.server_config_path, &config_json)
            .map_err(|e| StoreError::io(&self.server_config_path, e))?;
        tracing::debug!(
            path = %self.server_config_path.display(),
            inbounds = config.inbounds.len(),
            "server config written"
        );
        Ok(())
    }
}
