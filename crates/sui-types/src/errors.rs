//! Error taxonomy shared by the codec crates.
//!
//! Every variant carries a `subject` naming the node, preset or protocol that
//! failed. Fleet-wide operations log and skip per-item failures, so an error
//! without a subject is useless to the operator reading the log.

use crate::PresetKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// High-level classification for logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Malformed input rejected at the boundary.
    Validation,
    /// Unknown node or preset key.
    NotFound,
    /// Malformed persisted data or URI.
    Decode,
    /// A generation capability is missing; a placeholder was substituted.
    CapabilityUnavailable,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Decode => "decode",
            Self::CapabilityUnavailable => "capability_unavailable",
        };
        f.write_str(s)
    }
}

/// Core error type for the credential and subscription codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed protocol field, invalid port, unknown service key.
    #[error("{subject}: invalid input: {reason}")]
    Validation { subject: String, reason: String },

    /// Unknown node or preset.
    #[error("{subject}: not found")]
    NotFound { subject: String },

    /// Malformed persisted credential or URI.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Key generation (or another capability) is unavailable.
    #[error("{capability} unavailable: {reason}")]
    CapabilityUnavailable { capability: String, reason: String },
}

impl CodecError {
    #[inline]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::Validation,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Decode(_) => ErrorClass::Decode,
            Self::CapabilityUnavailable { .. } => ErrorClass::CapabilityUnavailable,
        }
    }

    #[inline]
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::NotFound {
            subject: subject.into(),
        }
    }

    #[inline]
    pub fn capability(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}

/// A URI or payload that could not be decoded back into structured fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{protocol}: unexpected scheme in {uri_head:?}")]
    Scheme {
        protocol: PresetKind,
        uri_head: String,
    },

    #[error("{protocol}: invalid base64 payload: {reason}")]
    Base64 { protocol: PresetKind, reason: String },

    #[error("{protocol}: invalid json payload: {reason}")]
    Json { protocol: PresetKind, reason: String },

    #[error("{protocol}: malformed uri: {reason}")]
    Uri { protocol: PresetKind, reason: String },

    #[error("{protocol}: missing field `{field}`")]
    MissingField {
        protocol: PresetKind,
        field: &'static str,
    },
}

impl DecodeError {
    /// The protocol whose link failed to decode.
    pub fn protocol(&self) -> PresetKind {
        match self {
            Self::Scheme { protocol, .. }
            | Self::Base64 { protocol, .. }
            | Self::Json { protocol, .. }
            | Self::Uri { protocol, .. }
            | Self::MissingField { protocol, .. } => *protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_class() {
        assert_eq!(
            CodecError::validation("service x", "unknown").class(),
            ErrorClass::Validation
        );
        assert_eq!(CodecError::not_found("node 1234abcd").class(), ErrorClass::NotFound);
        let e: CodecError = DecodeError::MissingField {
            protocol: PresetKind::VmessWs,
            field: "id",
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Decode);
    }

    #[test]
    fn errors_name_their_subject() {
        let e = CodecError::not_found("node deadbeef");
        assert_eq!(e.to_string(), "node deadbeef: not found");

        let e = DecodeError::Base64 {
            protocol: PresetKind::VmessWs,
            reason: "bad symbol".into(),
        };
        assert!(e.to_string().starts_with("vmess_ws:"));
        assert_eq!(e.protocol(), PresetKind::VmessWs);
    }
}
