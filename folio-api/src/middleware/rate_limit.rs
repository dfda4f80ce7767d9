//! Per-client-IP rate limiting with `governor`.
//!
//! The client is the socket peer. `X-Forwarded-For` and `X-Real-IP` are
//! only believed when the peer is listed in `trusted_proxies`.

use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{clock::DefaultClock, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// How often the background task sweeps idle clients.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

struct ClientLimiter {
    limiter: DirectRateLimiter,
    /// Milliseconds since `RateLimitState::epoch` of the last request.
    last_seen_ms: AtomicU64,
}

type LimiterMap = DashMap<IpAddr, Arc<ClientLimiter>>;

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    limiters: Arc<LimiterMap>,
    epoch: Instant,
}

impl RateLimitState {
    pub fn new(config: Arc<ApiConfig>) -> Self {
        Self {
            config,
            limiters: Arc::new(DashMap::new()),
            epoch: Instant::now(),
        }
    }

    fn quota(&self) -> Quota {
        let per_minute = NonZeroU32::new(self.config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.config.rate_limit_burst).unwrap_or(NonZeroU32::MIN);
        Quota::per_minute(per_minute).allow_burst(burst)
    }

    /// Time for an untouched limiter to refill its whole burst. Past this an
    /// entry holds no state worth keeping.
    fn idle_after(&self) -> Duration {
        let per_minute = u64::from(self.config.rate_limit_per_minute.max(1));
        let burst = u64::from(self.config.rate_limit_burst.max(1));
        Duration::from_millis((60_000 * burst).div_ceil(per_minute)).max(PRUNE_INTERVAL)
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn limiter_for(&self, ip: IpAddr) -> Arc<ClientLimiter> {
        let entry = self
            .limiters
            .entry(ip)
            .or_insert_with(|| {
                Arc::new(ClientLimiter {
                    limiter: RateLimiter::direct(self.quota()),
                    last_seen_ms: AtomicU64::new(0),
                })
            })
            .clone();
        entry.last_seen_ms.store(self.now_ms(), Ordering::Relaxed);
        entry
    }

    /// Drop clients idle for longer than `idle_after`. Returns how many
    /// were removed.
    pub fn prune_idle(&self) -> usize {
        let cutoff = self
            .now_ms()
            .saturating_sub(u64::try_from(self.idle_after().as_millis()).unwrap_or(u64::MAX));
        let before = self.limiters.len();
        self.limiters
            .retain(|_, client| client.last_seen_ms.load(Ordering::Relaxed) >= cutoff);
        before.saturating_sub(self.limiters.len())
    }

    /// Sweep idle clients every minute on the current runtime. The task
    /// ends once every clone of this state is dropped.
    pub fn spawn_pruner(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No Tokio runtime; idle rate limiters will not be pruned");
            return;
        };
        let weak: Weak<LimiterMap> = Arc::downgrade(&self.limiters);
        let config = self.config.clone();
        let epoch = self.epoch;
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiters) = weak.upgrade() else { break };
                let state = RateLimitState {
                    config: config.clone(),
                    limiters,
                    epoch,
                };
                let removed = state.prune_idle();
                if removed > 0 {
                    tracing::debug!(removed, remaining = state.tracked_clients(), "Pruned idle rate limiters");
                }
            }
        });
    }

    /// Number of distinct clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiters.len()
    }
}

/// Rejection carrying the number of seconds until the next allowed request.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = ApiError::too_many_requests(Some(self.retry_after)).into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Client address as reported by a trusted proxy.
///
/// `X-Forwarded-For` is read right to left, skipping our own proxies, so a
/// value the client prepended is never picked over the hop that appended it.
fn forwarded_client(headers: &HeaderMap, trusted: &[IpAddr]) -> Option<IpAddr> {
    let forwarded = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();
    let mut hops = forwarded.iter().rev().map(|hop| hop.parse::<IpAddr>());
    let from_chain = loop {
        match hops.next() {
            Some(Ok(ip)) if trusted.contains(&ip) => continue,
            Some(Ok(ip)) => break Some(ip),
            // A garbled hop ends the trustworthy part of the chain.
            Some(Err(_)) | None => break None,
        }
    };

    from_chain.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.trim().parse().ok())
    })
}

/// Resolve the rate-limit key for a request.
fn extract_client_ip(request: &Request, trusted: &[IpAddr]) -> IpAddr {
    // ConnectInfo is absent when the router is driven without a listener (tests).
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    };

    if trusted.contains(&peer) {
        forwarded_client(request.headers(), trusted).unwrap_or(peer)
    } else {
        peer
    }
}

/// Enforce `rate_limit_per_minute` (plus burst) per client IP.
///
/// Responds 429 with a `retry-after` header once the quota is spent.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let ip = extract_client_ip(&request, &state.config.trusted_proxies);
    let client = state.limiter_for(ip);

    match client.limiter.check() {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.config.rate_limit_per_minute),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    const PROXY: &str = "10.9.9.9";

    fn app(config: ApiConfig) -> (Router, RateLimitState) {
        let state = RateLimitState::new(Arc::new(config));
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));
        (router, state)
    }

    fn request(peer: &str, headers: &[(&str, &str)]) -> Result<Request, Box<dyn std::error::Error>> {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty())?;
        let addr = SocketAddr::new(peer.parse()?, 40000);
        request.extensions_mut().insert(ConnectInfo(addr));
        Ok(request)
    }

    fn tight_config() -> ApiConfig {
        ApiConfig {
            rate_limit_per_minute: 1,
            rate_limit_burst: 2,
            ..ApiConfig::default()
        }
    }

    fn behind_proxy() -> ApiConfig {
        ApiConfig {
            trusted_proxies: vec![PROXY.parse().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))],
            ..tight_config()
        }
    }

    #[tokio::test]
    async fn test_burst_then_429() -> Result<(), Box<dyn std::error::Error>> {
        let (router, _) = app(tight_config());

        for _ in 0..2 {
            let response = router.clone().oneshot(request("10.0.0.1", &[])?).await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers().get("x-ratelimit-limit").map(|v| v.as_bytes()),
                Some(b"1".as_slice())
            );
        }

        let response = router.oneshot(request("10.0.0.1", &[])?).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        Ok(())
    }

    #[tokio::test]
    async fn test_clients_are_limited_independently() -> Result<(), Box<dyn std::error::Error>> {
        let (router, state) = app(tight_config());

        for _ in 0..3 {
            let _ = router.clone().oneshot(request("10.0.0.1", &[])?).await?;
        }
        let response = router.oneshot(request("10.0.0.2", &[])?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.tracked_clients(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_spoofed_headers_from_untrusted_peer_share_one_quota(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (router, state) = app(tight_config());

        let mut allowed = 0;
        for n in 0..50 {
            let spoofed = format!("198.51.100.{}", n);
            let response = router
                .clone()
                .oneshot(request(
                    "203.0.113.5",
                    &[("x-forwarded-for", spoofed.as_str()), ("x-real-ip", spoofed.as_str())],
                )?)
                .await?;
            if response.status() == StatusCode::OK {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 2);
        assert_eq!(state.tracked_clients(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_trusted_proxy_forwards_client_address() -> Result<(), Box<dyn std::error::Error>> {
        let (router, state) = app(behind_proxy());

        for client in ["198.51.100.1", "198.51.100.2"] {
            let response = router
                .clone()
                .oneshot(request(PROXY, &[("x-forwarded-for", client)])?)
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(state.tracked_clients(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_never_limits() -> Result<(), Box<dyn std::error::Error>> {
        let (router, state) = app(ApiConfig {
            rate_limit_enabled: false,
            ..tight_config()
        });

        for _ in 0..5 {
            let response = router.clone().oneshot(request("10.0.0.1", &[])?).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(state.tracked_clients(), 0);
        Ok(())
    }

    #[test]
    fn test_client_ip_resolution() -> Result<(), Box<dyn std::error::Error>> {
        let trusted: Vec<IpAddr> = vec![PROXY.parse()?];

        // Untrusted peer: headers ignored.
        let req = request("203.0.113.5", &[("x-forwarded-for", "198.51.100.7")])?;
        assert_eq!(extract_client_ip(&req, &trusted).to_string(), "203.0.113.5");

        // Trusted peer: rightmost untrusted hop wins over a prepended value.
        let req = request(PROXY, &[("x-forwarded-for", "1.2.3.4, 198.51.100.7, 10.9.9.9")])?;
        assert_eq!(extract_client_ip(&req, &trusted).to_string(), "198.51.100.7");

        let req = request(PROXY, &[("x-real-ip", "198.51.100.8")])?;
        assert_eq!(extract_client_ip(&req, &trusted).to_string(), "198.51.100.8");

        // Trusted peer with nothing forwarded is itself the client.
        let req = request(PROXY, &[])?;
        assert_eq!(extract_client_ip(&req, &trusted).to_string(), PROXY);

        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())?;
        assert!(extract_client_ip(&req, &trusted).is_unspecified());
        Ok(())
    }

    #[test]
    fn test_prune_drops_only_idle_clients() {
        let state = RateLimitState::new(Arc::new(tight_config()));
        let stale = state.limiter_for(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let _fresh = state.limiter_for(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(state.prune_idle(), 0);

        // Backdate past the refill window instead of sleeping.
        let window = u64::try_from(state.idle_after().as_millis()).unwrap_or(u64::MAX);
        let Some(epoch) = state.epoch.checked_sub(Duration::from_millis(window + 1_000)) else {
            return;
        };
        let state = RateLimitState { epoch, ..state };
        state
            .limiters
            .iter()
            .filter(|entry| !Arc::ptr_eq(entry.value(), &stale))
            .for_each(|entry| entry.value().last_seen_ms.store(state.now_ms(), Ordering::Relaxed));

        assert_eq!(state.prune_idle(), 1);
        assert_eq!(state.tracked_clients(), 1);
        assert!(state.limiters.contains_key(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))));
    }

    #[test]
    fn test_idle_window_covers_burst_refill() {
        let state = RateLimitState::new(Arc::new(ApiConfig {
            rate_limit_per_minute: 6,
            rate_limit_burst: 30,
            ..ApiConfig::default()
        }));
        assert_eq!(state.idle_after(), Duration::from_secs(300));

        let state = RateLimitState::new(Arc::new(ApiConfig::default()));
        assert_eq!(state.idle_after(), PRUNE_INTERVAL);
    }
}
