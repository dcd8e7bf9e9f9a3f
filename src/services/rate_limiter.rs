//! Fixed-window rate limiter keyed by `(client, route class)`.
//!
//! Each counter lives in a `DashMap` entry. The check-and-increment runs while
//! the entry's shard lock is held, so concurrent requests from one client can
//! never push the count past the ceiling. Windows that have elapsed are reset
//! lazily on the next request and swept by [`RateLimiter::evict_expired`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Groups of routes that share a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Signup and login.
    Auth,
    /// API key management behind the session-token gate.
    ApiKeys,
    /// Resource routes behind the API-key gate.
    Resources,
    /// Rejected credentials at either gate.
    CredentialFailures,
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteClass::Auth => "auth",
            RouteClass::ApiKeys => "api_keys",
            RouteClass::Resources => "resources",
            RouteClass::CredentialFailures => "credential_failures",
        };
        f.write_str(name)
    }
}

/// Longest window a rule may use. Longer windows are clamped to this.
pub const MAX_WINDOW: Duration = Duration::from_secs(86_400);

/// Window length and ceiling for one route class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitRule {
    pub fn new(window_seconds: u64, max_requests: u32) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            max_requests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub auth: RateLimitRule,
    pub api_keys: RateLimitRule,
    pub resources: RateLimitRule,
    pub credential_failures: RateLimitRule,
}

impl RateLimitConfig {
    pub fn rule(&self, class: RouteClass) -> RateLimitRule {
        match class {
            RouteClass::Auth => self.auth,
            RouteClass::ApiKeys => self.api_keys,
            RouteClass::Resources => self.resources,
            RouteClass::CredentialFailures => self.credential_failures,
        }
    }

    /// Same rule for every class.
    pub fn uniform(rule: RateLimitRule) -> Self {
        Self {
            auth: rule,
            api_keys: rule,
            resources: rule,
            credential_failures: rule,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Throttled { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// A slot taken by [`RateLimiter::try_reserve`].
#[derive(Debug)]
#[must_use = "an unused reservation keeps its slot until the window ends"]
pub struct Reservation {
    client: String,
    class: RouteClass,
    reset_at: Instant,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

type CounterKey = (String, RouteClass);

pub struct RateLimiter {
    counters: DashMap<CounterKey, Window>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            counters: DashMap::new(),
            config,
        }
    }

    /// Count one request and report whether it fits in the current window.
    pub fn check(&self, client: &str, class: RouteClass) -> RateDecision {
        self.count(client, class).0
    }

    /// Increment-and-compare under the entry lock. Also returns the end of the
    /// window the request was counted in.
    fn count(&self, client: &str, class: RouteClass) -> (RateDecision, Instant) {
        let rule = self.config.rule(class);
        let length = rule.window.min(MAX_WINDOW);
        let now = Instant::now();

        let mut window = self
            .counters
            .entry((client.to_string(), class))
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + length,
            });

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + length;
        }

        if window.count >= rule.max_requests {
            let retry_after = window.reset_at - now;
            return (RateDecision::Throttled { retry_after }, window.reset_at);
        }

        window.count += 1;
        let remaining = rule.max_requests - window.count;
        (RateDecision::Allowed { remaining }, window.reset_at)
    }

    /// `true` if the request fits in the current window.
    pub fn allow(&self, client: &str, class: RouteClass) -> bool {
        self.check(client, class).is_allowed()
    }

    /// Take one slot from `(client, class)` up front.
    ///
    /// Fails with the time until the window resets when no slot is left. A
    /// slot held by a request that turns out not to need it is handed back
    /// with [`RateLimiter::release`].
    pub fn try_reserve(&self, client: &str, class: RouteClass) -> Result<Reservation, Duration> {
        match self.count(client, class) {
            (RateDecision::Allowed { .. }, reset_at) => Ok(Reservation {
                client: client.to_string(),
                class,
                reset_at,
            }),
            (RateDecision::Throttled { retry_after }, _) => Err(retry_after),
        }
    }

    /// Return a reserved slot. A no-op once the window it was taken from has ended.
    pub fn release(&self, reservation: Reservation) {
        let key = (reservation.client, reservation.class);
        if let Some(mut window) = self.counters.get_mut(&key) {
            if window.reset_at == reservation.reset_at && window.count > 0 {
                window.count -= 1;
            }
        }
    }

    /// Drop every counter whose window has elapsed. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, window| window.reset_at > now);
        before.saturating_sub(self.counters.len())
    }

    /// Number of live counters.
    pub fn tracked(&self) -> usize {
        self.counters.len()
    }

    /// Periodically evict expired counters on a background task.
    pub fn spawn_eviction_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = self.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = self.tracked(), "Evicted rate-limit counters");
                }
            }
        })
    }
}
