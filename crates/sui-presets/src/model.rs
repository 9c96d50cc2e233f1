//! The persisted preset set.
//!
//! One struct field per protocol, so the set of kinds is closed at compile
//! time. Serialized as `presets.json`, an object keyed by protocol in
//! declared order.

use crate::keygen::{is_placeholder_key, public_key_for, CredentialGenerator};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sui_types::{CodecError, PresetKind};

/// VLESS + XTLS Vision + Reality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlessVisionPreset {
    pub enabled: bool,
    pub uuid: String,
    pub private_key: String,
    pub public_key: String,
    pub short_id: String,
}

/// VMess over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmessWsPreset {
    pub enabled: bool,
    pub uuid: String,
    pub path: String,
}

/// Hysteria2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hysteria2Preset {
    pub enabled: bool,
    pub password: String,
}

/// Borrowed view of a single preset, for walking the set in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetRef<'a> {
    VlessVision(&'a VlessVisionPreset),
    VmessWs(&'a VmessWsPreset),
    Hysteria2(&'a Hysteria2Preset),
}

impl PresetRef<'_> {
    pub fn kind(&self) -> PresetKind {
        match self {
            Self::VlessVision(_) => PresetKind::VlessVision,
            Self::VmessWs(_) => PresetKind::VmessWs,
            Self::Hysteria2(_) => PresetKind::Hysteria2,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::VlessVision(p) => p.enabled,
            Self::VmessWs(p) => p.enabled,
            Self::Hysteria2(p) => p.enabled,
        }
    }
}

/// Credentials and enabled flags for every protocol a node serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    pub vless_vision: VlessVisionPreset,
    pub vmess_ws: VmessWsPreset,
    pub hysteria2: Hysteria2Preset,
}

impl Presets {
    /// Fresh credentials for every kind, all enabled.
    pub fn generate<R: RngCore>(gen: &mut CredentialGenerator<R>) -> Self {
        Self {
            vless_vision: new_vless(gen, true),
            vmess_ws: new_vmess(gen, true),
            hysteria2: new_hysteria2(gen, true),
        }
    }

    pub fn get(&self, kind: PresetKind) -> PresetRef<'_> {
        match kind {
            PresetKind::VlessVision => PresetRef::VlessVision(&self.vless_vision),
            PresetKind::VmessWs => PresetRef::VmessWs(&self.vmess_ws),
            PresetKind::Hysteria2 => PresetRef::Hysteria2(&self.hysteria2),
        }
    }

    /// All presets in port-allocation order.
    pub fn iter(&self) -> impl Iterator<Item = PresetRef<'_>> + '_ {
        PresetKind::ALL.into_iter().map(move |k| self.get(k))
    }

    /// Enabled kinds in port-allocation order.
    pub fn enabled_kinds(&self) -> Vec<PresetKind> {
        self.iter().filter(|p| p.enabled()).map(|p| p.kind()).collect()
    }

    pub fn is_enabled(&self, kind: PresetKind) -> bool {
        self.get(kind).enabled()
    }

    pub fn set_enabled(&mut self, kind: PresetKind, enabled: bool) {
        match kind {
            PresetKind::VlessVision => self.vless_vision.enabled = enabled,
            PresetKind::VmessWs => self.vmess_ws.enabled = enabled,
            PresetKind::Hysteria2 => self.hysteria2.enabled = enabled,
        }
    }

    /// Replace one kind's credentials, keeping its enabled flag.
    pub fn regenerate<R: RngCore>(&mut self, kind: PresetKind, gen: &mut CredentialGenerator<R>) {
        match kind {
            PresetKind::VlessVision => {
                self.vless_vision = new_vless(gen, self.vless_vision.enabled);
            }
            PresetKind::VmessWs => self.vmess_ws = new_vmess(gen, self.vmess_ws.enabled),
            PresetKind::Hysteria2 => self.hysteria2 = new_hysteria2(gen, self.hysteria2.enabled),
        }
    }

    /// Reject persisted content that cannot be served.
    ///
    /// A placeholder Reality key is accepted here; it only blocks publication
    /// of the VLESS link.
    pub fn validate(&self) -> Result<(), CodecError> {
        let v = &self.vless_vision;
        check_uuid(PresetKind::VlessVision, &v.uuid)?;
        if !is_placeholder_key(&v.private_key) && public_key_for(&v.private_key)? != v.public_key
        {
            return Err(invalid(
                PresetKind::VlessVision,
                "public_key does not match private_key",
            ));
        }
        if v.short_id.len() > 16
            || v.short_id.len() % 2 != 0
            || !v.short_id.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(invalid(
                PresetKind::VlessVision,
                "short_id must be an even number of hex chars, at most 16",
            ));
        }

        check_uuid(PresetKind::VmessWs, &self.vmess_ws.uuid)?;
        let path = &self.vmess_ws.path;
        if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
            return Err(invalid(
                PresetKind::VmessWs,
                "path must start with '/' and contain no whitespace",
            ));
        }

        if self.hysteria2.password.is_empty() {
            return Err(invalid(PresetKind::Hysteria2, "password is empty"));
        }
        Ok(())
    }
}

fn invalid(kind: PresetKind, reason: &str) -> CodecError {
    CodecError::validation(format!("preset {kind}"), reason)
}

fn check_uuid(kind: PresetKind, value: &str) -> Result<(), CodecError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| invalid(kind, &format!("uuid: {e}")))
}

fn new_vless<R: RngCore>(gen: &mut CredentialGenerator<R>, enabled: bool) -> VlessVisionPreset {
    let keys = gen.new_keypair();
    VlessVisionPreset {
        enabled,
        uuid: gen.new_uuid(),
        private_key: keys.private_key,
        public_key: keys.public_key,
        short_id: gen.new_short_id(),
    }
}

fn new_vmess<R: RngCore>(gen: &mut CredentialGenerator<R>, enabled: bool) -> VmessWsPreset {
    VmessWsPreset {
        enabled,
        uuid: gen.new_uuid(),
        path: gen.new_ws_path(),
    }
}

fn new_hysteria2<R: RngCore>(gen: &mut CredentialGenerator<R>, enabled: bool) -> Hysteria2Preset {
    Hysteria2Preset {
        enabled,
        password: gen.new_hysteria_password(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gen() -> CredentialGenerator<StdRng> {
        CredentialGenerator::new(StdRng::seed_from_u64(42))
    }

    #[test]
    fn generated_set_is_valid_and_enabled() {
        let p = Presets::generate(&mut gen());
        p.validate().unwrap();
        assert_eq!(p.enabled_kinds(), PresetKind::ALL.to_vec());
    }

    #[test]
    fn json_keys_follow_declared_order() {
        let p = Presets::generate(&mut gen());
        let s = serde_json::to_string(&p).unwrap();
        let a = s.find("\"vless_vision\"").unwrap();
        let b = s.find("\"vmess_ws\"").unwrap();
        let c = s.find("\"hysteria2\"").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn regenerate_keeps_flag_and_other_kinds() {
        let mut g = gen();
        let mut p = Presets::generate(&mut g);
        p.set_enabled(PresetKind::VmessWs, false);
        let before = p.clone();

        p.regenerate(PresetKind::VmessWs, &mut g);
        assert!(!p.vmess_ws.enabled);
        assert_ne!(p.vmess_ws.uuid, before.vmess_ws.uuid);
        assert_eq!(p.vless_vision, before.vless_vision);
        assert_eq!(p.hysteria2, before.hysteria2);
    }

    #[test]
    fn iter_walks_declared_order() {
        let p = Presets::generate(&mut gen());
        let kinds: Vec<_> = p.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, PresetKind::ALL.to_vec());
    }

    #[test]
    fn validate_rejects_tampered_content() {
        let good = Presets::generate(&mut gen());

        let mut p = good.clone();
        p.vless_vision.public_key = good.vmess_ws.uuid.clone();
        assert!(p.validate().is_err());

        let mut p = good.clone();
        p.vmess_ws.path = "no-slash".into();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("vmess_ws"));

        let mut p = good.clone();
        p.hysteria2.password.clear();
        assert!(p.validate().is_err());

        let mut p = good;
        p.vless_vision.short_id = "xyz".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn placeholder_key_still_validates() {
        let mut p = Presets::generate(&mut gen());
        let ph = crate::keygen::KeyPair::placeholder();
        p.vless_vision.private_key = ph.private_key;
        p.vless_vision.public_key = ph.public_key;
        p.validate().unwrap();
    }
}
