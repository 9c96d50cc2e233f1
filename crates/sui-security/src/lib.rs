//! Security utilities shared by the sui master and node agents
//!
//! This crate provides:
//! - Hidden API path derivation (identical on every process given the same secret)
//! - Constant-time token comparison
//! - Sliding-window rate limiting with escalating blocks
//! - An agent-side guard combining the two
//! - Credential redaction for logging
//!
//! # Examples
//!
//! ## Hidden path
//!
//! ```
//! use sui_security::derive_path;
//!
//! let p = derive_path("cluster-secret");
//! assert_eq!(p.len(), 16);
//! assert_eq!(p, derive_path("cluster-secret"));
//! ```
//!
//! ## Constant-time token check
//!
//! ```
//! use sui_security::secure_equals;
//!
//! assert!(secure_equals(b"token", b"token"));
//! assert!(!secure_equals(b"token", b"tokeN"));
//! assert!(!secure_equals(b"token", b"token!"));
//! ```
//!
//! ## Rate limiting
//!
//! ```
//! use std::time::Instant;
//! use sui_security::RateLimiter;
//!
//! let limiter = RateLimiter::auth_sensitive();
//! let now = Instant::now();
//! for _ in 0..5 {
//!     assert!(limiter.is_allowed_at("10.0.0.1", now));
//! }
//! assert!(!limiter.is_allowed_at("10.0.0.1", now));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod credentials;
pub mod guard;
pub mod hidden_path;
pub mod rate_limit;
pub mod redact;

pub use credentials::{secure_equals, verify_token};
pub use guard::{AccessDenied, AgentGuard, AUTH_HEADER};
pub use hidden_path::{api_prefix, derive_path, node_api_url};
pub use rate_limit::{client_key, Limiters, RateLimitConfig, RateLimiter};
pub use redact::{redact_token, ClusterSecret};
