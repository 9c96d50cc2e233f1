//! # Credential redaction
//!
//! The cluster secret and generated proxy credentials must never reach a log
//! file in clear. Wrap them in [`ClusterSecret`] or pass them through
//! [`redact_token`] before handing them to `tracing`.

use std::fmt;

/// Mask a credential for logs.
///
/// Up to 8 chars keep the first 2, up to 12 keep the first 4; longer values
/// keep 4 at each end with at most 8 stars between.
///
/// ```
/// use sui_security::redact_token;
///
/// assert_eq!(redact_token("abcdefghijklmnopqrstuvwxyz"), "abcd********wxyz");
/// assert_eq!(redact_token("pw"), "pw******");
/// assert_eq!(redact_token(""), "********");
/// ```
#[must_use]
pub fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let head = |n: usize| chars.iter().take(n).collect::<String>();
    match chars.len() {
        0 => "********".to_string(),
        1..=8 => format!("{}******", head(2)),
        9..=12 => format!("{}****", head(4)),
        n => {
            let tail: String = chars[n - 4..].iter().collect();
            format!("{}{}{tail}", head(4), "*".repeat((n - 8).min(8)))
        }
    }
}

/// The shared cluster secret. `Display` and `Debug` are redacted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClusterSecret(String);

impl ClusterSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only for hashing and comparison, never for logging.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClusterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact_token(&self.0))
    }
}

impl fmt::Debug for ClusterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClusterSecret")
            .field(&redact_token(&self.0))
            .finish()
    }
}
