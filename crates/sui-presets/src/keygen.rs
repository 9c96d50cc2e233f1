//! Credential generation for the three preset kinds.
//!
//! The generator owns its randomness source so tests can drive it with a
//! seeded RNG and production uses the OS RNG.
//!
//! Reality keys use the same text form as `sing-box generate reality-keypair`:
//! unpadded URL-safe base64 of the raw 32-byte X25519 scalar / point.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use sui_types::{CodecError, PresetKind};
use x25519_dalek::{PublicKey, StaticSecret};

const PLACEHOLDER_PRIVATE_KEY: &str = "PLACEHOLDER-PRIVATE-KEY-REGENERATE-ME";
const PLACEHOLDER_PUBLIC_KEY: &str = "PLACEHOLDER-PUBLIC-KEY-REGENERATE-ME";

const SHORT_ID_LEN: usize = 8;
const HYSTERIA_PASSWORD_LEN: usize = 16;
const WS_PATH_BYTES: usize = 6;

/// Reality X25519 keypair in wire text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl KeyPair {
    /// Marked stand-in used when key generation is impossible. Links must not
    /// be published while a preset carries it.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            private_key: PLACEHOLDER_PRIVATE_KEY.to_string(),
            public_key: PLACEHOLDER_PUBLIC_KEY.to_string(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_key(&self.private_key) || is_placeholder_key(&self.public_key)
    }

    /// Derive the pair from a raw 32-byte scalar.
    #[must_use]
    pub fn from_private_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self {
            private_key: URL_SAFE_NO_PAD.encode(secret.to_bytes()),
            public_key: URL_SAFE_NO_PAD.encode(public.as_bytes()),
        }
    }
}

/// Whether a stored key is the generation placeholder.
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    key.starts_with("PLACEHOLDER-")
}

/// Recompute the public key for a stored private key.
pub fn public_key_for(private_key: &str) -> Result<String, CodecError> {
    let subject = format!("preset {}", PresetKind::VlessVision);
    let raw = URL_SAFE_NO_PAD
        .decode(private_key.trim_end_matches('='))
        .map_err(|e| CodecError::validation(&subject, format!("private_key is not base64: {e}")))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| CodecError::validation(&subject, "private_key must be 32 bytes"))?;
    Ok(KeyPair::from_private_bytes(bytes).public_key)
}

/// Produces UUIDs, short ids, passwords, WebSocket paths and Reality keys.
#[derive(Debug)]
pub struct CredentialGenerator<R = OsRng> {
    rng: R,
}

impl CredentialGenerator<OsRng> {
    /// Generator backed by the operating system RNG.
    #[must_use]
    pub fn os() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for CredentialGenerator<OsRng> {
    fn default() -> Self {
        Self::os()
    }
}

impl<R: RngCore> CredentialGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        self.rng.fill_bytes(&mut buf);
        buf
    }

    /// Random version-4 UUID in hyphenated lowercase form.
    pub fn new_uuid(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.bytes::<16>())
            .into_uuid()
            .hyphenated()
            .to_string()
    }

    /// Reality short id: 8 lowercase hex chars drawn from 16 random bytes.
    pub fn new_short_id(&mut self) -> String {
        let mut hex = hex::encode(self.bytes::<16>());
        hex.truncate(SHORT_ID_LEN);
        hex
    }

    /// Hysteria2 password: a fresh UUID with hyphens stripped, first 16 chars.
    pub fn new_hysteria_password(&mut self) -> String {
        let mut simple: String = self.new_uuid().chars().filter(|c| *c != '-').collect();
        simple.truncate(HYSTERIA_PASSWORD_LEN);
        simple
    }

    /// WebSocket path for VMess, e.g. `/3f9a0c1b22de`.
    pub fn new_ws_path(&mut self) -> String {
        format!("/{}", hex::encode(self.bytes::<WS_PATH_BYTES>()))
    }

    /// Fresh X25519 keypair, or [`KeyPair::placeholder`] when the RNG fails.
    pub fn new_keypair(&mut self) -> KeyPair {
        let mut scalar = [0u8; 32];
        match self.rng.try_fill_bytes(&mut scalar) {
            Ok(()) => KeyPair::from_private_bytes(scalar),
            Err(e) => {
                let err = CodecError::capability("x25519 key generation", e.to_string());
                tracing::error!(
                    error = %err,
                    protocol = %PresetKind::VlessVision,
                    "falling back to placeholder reality keypair; vless links stay unpublished until regenerated"
                );
                KeyPair::placeholder()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> CredentialGenerator<StdRng> {
        CredentialGenerator::new(StdRng::seed_from_u64(7))
    }

    /// RNG whose fallible path always fails.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy source gone")))
        }
    }

    #[test]
    fn uuid_is_v4_text() {
        let id = seeded().new_uuid();
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id, id.to_lowercase());
        assert_eq!(id.len(), 36);
    }

    #[test]
    fn uuids_differ() {
        let mut g = CredentialGenerator::os();
        assert_ne!(g.new_uuid(), g.new_uuid());
    }

    #[test]
    fn short_id_shape() {
        let sid = seeded().new_short_id();
        assert_eq!(sid.len(), 8);
        assert!(sid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn hysteria_password_shape() {
        let pw = seeded().new_hysteria_password();
        assert_eq!(pw.len(), 16);
        assert!(!pw.contains('-'));
    }

    #[test]
    fn ws_path_shape() {
        let p = seeded().new_ws_path();
        assert!(p.starts_with('/'));
        assert_eq!(p.len(), 13);
    }

    #[test]
    fn keypair_matches_rfc7748_vector() {
        let sk = hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
            .unwrap();
        let pk = hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
            .unwrap();
        let pair = KeyPair::from_private_bytes(sk.try_into().unwrap());
        assert_eq!(URL_SAFE_NO_PAD.decode(&pair.public_key).unwrap(), pk);
        assert_eq!(pair.private_key.len(), 43);
        assert_eq!(public_key_for(&pair.private_key).unwrap(), pair.public_key);
    }

    #[test]
    fn generated_keypair_is_consistent() {
        let pair = seeded().new_keypair();
        assert!(!pair.is_placeholder());
        assert_eq!(public_key_for(&pair.private_key).unwrap(), pair.public_key);
    }

    #[test]
    fn broken_rng_degrades_to_placeholder() {
        let pair = CredentialGenerator::new(BrokenRng).new_keypair();
        assert!(pair.is_placeholder());
        assert!(pair.public_key.contains("PLACEHOLDER"));
    }

    #[test]
    fn public_key_for_rejects_garbage() {
        assert!(public_key_for("not base64 !!").is_err());
        assert!(public_key_for("AAAA").is_err());
    }
}
