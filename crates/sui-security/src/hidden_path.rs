//! # Hidden API path derivation
//!
//! Master and agents are deployed independently and never negotiate where the
//! agent API lives. Both sides hash the shared cluster secret with a fixed salt
//! and mount (or call) the API under the first 16 hex chars of the digest.
//!
//! The path is an obscurity measure, not a credential: anyone with enough
//! probing budget can find it. The `X-SUI-Token` header is the authorization
//! boundary (see [`crate::guard`]).

use sha2::{Digest, Sha256};
use sui_types::NodeRecord;

/// Fixed salt. Changing it moves every agent's API path.
const PATH_SALT: &str = "SUI_Solo_Secured_2025";

const PATH_HEX_LEN: usize = 16;

/// `hex(sha256(SALT ":" secret))[..16]`.
#[must_use]
pub fn derive_path(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PATH_SALT.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(PATH_HEX_LEN);
    hex
}

/// `/{path}/api/v1`, the prefix every privileged agent endpoint lives under.
#[must_use]
pub fn api_prefix(secret: &str) -> String {
    format!("/{}/api/v1", derive_path(secret))
}

/// Base URL the master uses to reach a node's agent.
#[must_use]
pub fn node_api_url(node: &NodeRecord, secret: &str) -> String {
    let scheme = if node.use_https { "https" } else { "http" };
    format!("{scheme}://{}{}", node.domain, api_prefix(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // printf %s "SUI_Solo_Secured_2025:secret" | sha256sum | cut -c1-16
        assert_eq!(derive_path("secret"), "19e14c4b1444b5f3");
    }

    #[test]
    fn empty_secret_still_yields_a_path() {
        let p = derive_path("");
        assert_eq!(p.len(), 16);
    }

    #[test]
    fn prefix_and_url() {
        let p = derive_path("s");
        assert_eq!(api_prefix("s"), format!("/{p}/api/v1"));

        let mut node = NodeRecord::new("n", "relay.example.com", true).unwrap();
        assert_eq!(
            node_api_url(&node, "s"),
            format!("https://relay.example.com/{p}/api/v1")
        );
        node.use_https = false;
        assert!(node_api_url(&node, "s").starts_with("http://"));
    }
}
