//! # Constant-time token comparison
//!
//! The cluster secret is presented by the master in the `X-SUI-Token` header
//! and compared on the agent before any privileged operation runs.
//!
//! Standard `==` on byte slices returns at the first mismatching byte, which
//! lets an attacker recover the secret one byte at a time by timing failed
//! requests. [`secure_equals`] inspects every byte regardless of where the
//! first mismatch is.
//!
//! Lengths are compared up front and a mismatch returns immediately. That
//! leaks the length of the secret, which is acceptable: the content is what
//! the attacker is after.
//!
//! ```
//! use sui_security::credentials::{secure_equals, verify_token};
//!
//! assert!(secure_equals(b"abc", b"abc"));
//! assert!(!secure_equals(b"abc", b"abd"));
//! assert!(verify_token("secret", "secret"));
//! ```

use subtle::ConstantTimeEq;

/// Compare two byte strings without short-circuiting on content.
///
/// Returns `false` immediately when the lengths differ; otherwise every byte
/// pair is folded into the result before it is inspected.
#[must_use]
pub fn secure_equals(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// String convenience over [`secure_equals`].
///
/// An empty `expected` never matches: an agent started without a cluster
/// secret must not accept an empty header as valid.
#[must_use]
pub fn verify_token(expected: &str, presented: &str) -> bool {
    let matches = secure_equals(expected.as_bytes(), presented.as_bytes());
    matches && !expected.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs() {
        assert!(secure_equals(b"", b""));
        assert!(secure_equals(b"token123", b"token123"));
    }

    #[test]
    fn single_differing_byte() {
        let expected = "a".repeat(100);
        let first_wrong = format!("b{}", "a".repeat(99));
        let last_wrong = "a".repeat(99) + "b";
        let all_wrong = "b".repeat(100);

        assert!(!secure_equals(expected.as_bytes(), first_wrong.as_bytes()));
        assert!(!secure_equals(expected.as_bytes(), last_wrong.as_bytes()));
        assert!(!secure_equals(expected.as_bytes(), all_wrong.as_bytes()));
        assert!(secure_equals(expected.as_bytes(), expected.as_bytes()));
    }

    #[test]
    fn differing_lengths() {
        assert!(!secure_equals(b"token", b"token\0"));
        assert!(!secure_equals(b"", b"x"));
    }

    #[test]
    fn verify_token_rejects_empty_secret() {
        assert!(!verify_token("", ""));
        assert!(verify_token("s3cr3t", "s3cr3t"));
        assert!(!verify_token("s3cr3t", "S3cr3t"));
    }

    #[test]
    fn unicode_tokens() {
        assert!(verify_token("密码123", "密码123"));
        assert!(!verify_token("密码123", "密码124"));
    }
}
