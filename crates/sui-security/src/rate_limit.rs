//! Sliding-window rate limiter with escalating blocks
//!
//! Each client key (normally the client IP) keeps the timestamps of its
//! accepted requests inside the window. A request arriving when the window is
//! already full is rejected *and* blocks the key for twice the window, so a
//! sustained brute-force run is pushed back harder than a single burst.
//!
//! State lives in a sharded map: concurrent requests for the same key are
//! serialized on that key's shard, different keys rarely contend.
//!
//! This is in-memory, best-effort protection; nothing survives a restart.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per window
    pub max_requests: u32,
    /// Sliding window length
    pub window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// How long a key stays blocked after breaching the limit.
    #[must_use]
    pub fn block_duration(&self) -> Duration {
        self.window.saturating_mul(2)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(30, 60)
    }
}

#[derive(Debug, Default)]
struct ClientWindow {
    recent: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl ClientWindow {
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }
}

/// `now + d`, or the latest representable instant short of it.
fn saturating_deadline(now: Instant, d: Duration) -> Instant {
    let mut d = d;
    loop {
        if let Some(t) = now.checked_add(d) {
            return t;
        }
        d /= 2;
    }
}

/// Per-key sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: DashMap<String, ClientWindow>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    /// Loose limiter for ordinary API calls: 30 requests per minute.
    #[must_use]
    pub fn general_api() -> Self {
        Self::new(RateLimitConfig::new(30, 60))
    }

    /// Strict limiter for secret retrieval, restarts and config writes:
    /// 5 requests per minute.
    #[must_use]
    pub fn auth_sensitive() -> Self {
        Self::new(RateLimitConfig::new(5, 60))
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Seconds a rejected client should wait, as advertised in `retry_after`.
    #[must_use]
    pub fn retry_after(&self) -> Duration {
        self.config.window
    }

    /// Check and record a request at the current instant.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    /// Check and record a request at `now`.
    pub fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self.clients.entry(key.to_string()).or_default();
        let client = entry.value_mut();

        if client.is_blocked(now) {
            tracing::debug!(key = %key, "rate limit: key is blocked");
            return false;
        }

        client.evict(now, self.config.window);

        if client.recent.len() >= self.config.max_requests as usize {
            client.blocked_until = Some(saturating_deadline(now, self.config.block_duration()));
            tracing::warn!(
                key = %key,
                max = self.config.max_requests,
                window_secs = self.config.window.as_secs(),
                "rate limit exceeded, blocking key"
            );
            return false;
        }

        client.recent.push_back(now);
        true
    }

    /// Requests still available to `key` in the current window.
    ///
    /// Read-only: nothing is recorded.
    pub fn remaining(&self, key: &str, now: Instant) -> u32 {
        let Some(client) = self.clients.get(key) else {
            return self.config.max_requests;
        };
        if client.is_blocked(now) {
            return 0;
        }
        let live = client
            .recent
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < self.config.window)
            .count();
        self.config
            .max_requests
            .saturating_sub(u32::try_from(live).unwrap_or(u32::MAX))
    }

    /// Drop keys with no live timestamps and no active block.
    pub fn purge_idle(&self, now: Instant) {
        let window = self.config.window;
        self.clients.retain(|_, client| {
            client.evict(now, window);
            !client.recent.is_empty() || client.is_blocked(now)
        });
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.clients.len()
    }
}

/// The two limiters every process carries, constructed once at startup and
/// handed to each request handler.
#[derive(Debug)]
pub struct Limiters {
    pub api: RateLimiter,
    pub auth: RateLimiter,
}

impl Limiters {
    #[must_use]
    pub fn new(api: RateLimitConfig, auth: RateLimitConfig) -> Self {
        Self {
            api: RateLimiter::new(api),
            auth: RateLimiter::new(auth),
        }
    }
}

impl Default for Limiters {
    fn default() -> Self {
        Self {
            api: RateLimiter::general_api(),
            auth: RateLimiter::auth_sensitive(),
        }
    }
}

/// Client key for limiting: first `X-Forwarded-For` hop set by the reverse
/// proxy, else the socket peer, else loopback.
#[must_use]
pub fn client_key(forwarded_for: Option<&str>, remote_addr: Option<&str>) -> String {
    forwarded_for
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(remote_addr)
        .unwrap_or("127.0.0.1")
        .to_string()
}
