//! Agent-side authorization for privileged endpoints.
//!
//! Order matters: the strict limiter is consulted before the token is
//! compared, so a brute-force client is cut off whether or not its guesses
//! are well-formed.

use crate::credentials::verify_token;
use crate::rate_limit::Limiters;
use crate::redact::ClusterSecret;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Header carrying the cluster secret on master → agent calls.
pub const AUTH_HEADER: &str = "X-SUI-Token";

/// Why a request was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// Too many attempts; retry after the given duration.
    #[error("too many auth attempts, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    /// Token missing or wrong.
    #[error("unauthorized")]
    Unauthorized,
}

impl AccessDenied {
    /// HTTP status the transport should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::Unauthorized => 401,
        }
    }
}

/// Guards every privileged agent endpoint.
#[derive(Debug)]
pub struct AgentGuard {
    secret: ClusterSecret,
    limiters: Limiters,
}

impl AgentGuard {
    #[must_use]
    pub fn new(secret: ClusterSecret, limiters: Limiters) -> Self {
        if secret.is_empty() {
            tracing::warn!("cluster secret is empty; every privileged request will be refused");
        }
        Self { secret, limiters }
    }

    #[must_use]
    pub fn limiters(&self) -> &Limiters {
        &self.limiters
    }

    /// Authorize a privileged request at the current instant.
    pub fn authorize(&self, client: &str, presented: Option<&str>) -> Result<(), AccessDenied> {
        self.authorize_at(client, presented, Instant::now())
    }

    /// Authorize a privileged request at `now`: auth limiter, token, API limiter.
    pub fn authorize_at(
        &self,
        client: &str,
        presented: Option<&str>,
        now: Instant,
    ) -> Result<(), AccessDenied> {
        if !self.limiters.auth.is_allowed_at(client, now) {
            return Err(AccessDenied::RateLimited {
                retry_after: self.limiters.auth.config().block_duration(),
            });
        }
        if !verify_token(self.secret.expose(), presented.unwrap_or_default()) {
            tracing::warn!(client = %client, "auth failed");
            return Err(AccessDenied::Unauthorized);
        }
        if !self.limiters.api.is_allowed_at(client, now) {
            return Err(AccessDenied::RateLimited {
                retry_after: self.limiters.api.retry_after(),
            });
        }
        Ok(())
    }
}
