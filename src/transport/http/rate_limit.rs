//! Per-client and global request rate limiting.
//!
//! Per-IP limiters live in an LRU cache bounded by `max_entries`, so a flood of distinct source
//! addresses evicts the least recently seen clients instead of growing memory without bound.

use anyhow::{anyhow, Context};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lru::LruCache;
use metrics::{counter, gauge};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::{NonZeroU32, NonZeroUsize},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tracing::{debug, warn};

use crate::infra::config::RateLimitConfig;
use crate::infra::metrics::{RATE_LIMITED_TOTAL, RATE_LIMITER_EVICTIONS, RATE_LIMITER_IP_CACHE_SIZE};
use crate::transport::http::error::ApiError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Paths that are never throttled so probes and scrapers keep working under load.
const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Global,
    PerIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub scope: RateLimitScope,
    pub retry_after: Duration,
}

pub struct ApiRateLimiter {
    per_ip: Mutex<LruCache<IpAddr, Arc<DirectRateLimiter>>>,
    global: DirectRateLimiter,
    per_ip_quota: Quota,
    max_entries: usize,
    trust_proxy_headers: bool,
    clock: DefaultClock,
}

impl ApiRateLimiter {
    pub fn new(config: &RateLimitConfig) -> anyhow::Result<Self> {
        let per_ip = NonZeroU32::new(config.per_ip).context("per-IP rate limit must be > 0")?;
        let global = NonZeroU32::new(config.global).context("global rate limit must be > 0")?;
        let cache_size =
            NonZeroUsize::new(config.max_entries).context("rate limiter max entries must be > 0")?;
        let per_ip_quota = Quota::with_period(config.window / config.per_ip)
            .ok_or_else(|| anyhow!("rate limit window must be > 0"))?
            .allow_burst(per_ip);
        let global_quota = Quota::with_period(config.window / config.global)
            .ok_or_else(|| anyhow!("rate limit window must be > 0"))?
            .allow_burst(global);

        Ok(Self {
            per_ip: Mutex::new(LruCache::new(cache_size)),
            global: RateLimiter::direct(global_quota),
            per_ip_quota,
            max_entries: config.max_entries,
            trust_proxy_headers: config.trust_proxy_headers,
            clock: DefaultClock::default(),
        })
    }

    /// The global bucket is checked first.
    pub fn check(&self, ip: IpAddr) -> Result<(), RateLimited> {
        if let Err(not_until) = self.global.check() {
            return Err(RateLimited {
                scope: RateLimitScope::Global,
                retry_after: not_until.wait_time_from(self.clock.now()),
            });
        }
        let limiter = self.limiter_for(ip);
        if let Err(not_until) = limiter.check() {
            return Err(RateLimited {
                scope: RateLimitScope::PerIp,
                retry_after: not_until.wait_time_from(self.clock.now()),
            });
        }
        Ok(())
    }

    fn limiter_for(&self, ip: IpAddr) -> Arc<DirectRateLimiter> {
        let mut cache = self.per_ip.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(limiter) = cache.get(&ip) {
            return limiter.clone();
        }
        let limiter = Arc::new(RateLimiter::direct(self.per_ip_quota));
        if cache.push(ip, limiter.clone()).is_some() {
            counter!(RATE_LIMITER_EVICTIONS).increment(1);
            debug!(ip = %ip, max_entries = self.max_entries, "rate limiter evicted least recent client");
        }
        gauge!(RATE_LIMITER_IP_CACHE_SIZE).set(cache.len() as f64);
        limiter
    }

    pub fn tracked_ips(&self) -> usize {
        self.per_ip
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// First `X-Forwarded-For` hop when proxies are trusted, else the socket peer.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
        if self.trust_proxy_headers {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }
        peer.map(|p| p.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

pub async fn rate_limit(
    State(limiter): State<Arc<ApiRateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = limiter.client_ip(request.headers(), peer);

    if let Err(limited) = limiter.check(ip) {
        let scope = match limited.scope {
            RateLimitScope::Global => "global",
            RateLimitScope::PerIp => "per_ip",
        };
        counter!(RATE_LIMITED_TOTAL, "scope" => scope).increment(1);
        warn!(ip = %ip, scope, path = %request.uri().path(), "rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after_secs: retry_after_secs(limited.retry_after),
        });
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(per_ip: u32, global: u32) -> RateLimitConfig {
        RateLimitConfig {
            per_ip,
            global,
            window: Duration::from_secs(60),
            max_entries: 2,
            trust_proxy_headers: true,
        }
    }

    #[test]
    fn per_ip_quota_is_independent_per_client() {
        let limiter = ApiRateLimiter::new(&config(2, 100)).unwrap();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(a).is_ok());
        let err = limiter.check(a).unwrap_err();
        assert_eq!(err.scope, RateLimitScope::PerIp);
        assert!(err.retry_after > Duration::ZERO);
        assert!(limiter.check(b).is_ok());
    }

    #[test]
    fn global_quota_applies_across_clients() {
        let limiter = ApiRateLimiter::new(&config(10, 2)).unwrap();
        assert!(limiter.check("10.0.0.1".parse().unwrap()).is_ok());
        assert!(limiter.check("10.0.0.2".parse().unwrap()).is_ok());
        let err = limiter.check("10.0.0.3".parse().unwrap()).unwrap_err();
        assert_eq!(err.scope, RateLimitScope::Global);
    }

    #[test]
    fn cache_is_bounded() {
        let limiter = ApiRateLimiter::new(&config(10, 100)).unwrap();
        for i in 1..=5u8 {
            limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, i))).unwrap();
        }
        assert_eq!(limiter.tracked_ips(), 2);
    }

    #[test]
    fn forwarded_header_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();

        let trusting = ApiRateLimiter::new(&config(1, 1)).unwrap();
        assert_eq!(
            trusting.client_ip(&headers, Some(peer)),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );

        let strict = ApiRateLimiter::new(&RateLimitConfig {
            trust_proxy_headers: false,
            ..config(1, 1)
        })
        .unwrap();
        assert_eq!(strict.client_ip(&headers, Some(peer)), peer.ip());
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(2_500)), 3);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(ApiRateLimiter::new(&config(0, 1)).is_err());
    }
}
