// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IP-keyed rate limiting with per-endpoint policies.
//!
//! Policies are `"<N> per <unit>"` strings (unit in second, minute, hour,
//! day) evaluated over fixed windows aligned to the unix clock. Exhaustion
//! answers 429 with `Retry-After` and the `RATE_LIMITED` envelope before
//! any handler work; admitted responses carry `X-RateLimit-Limit` with the
//! policy string.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{ApiError, ErrorCode, RelayError};
use tracing::warn;

use crate::request_id::RequestId;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RETRY_AFTER: &str = "retry-after";

/// A parsed `"<N> per <unit>"` policy.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub limit: u32,
    pub window: Duration,
    raw: String,
}

impl RatePolicy {
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let (limit, unit) = match parts.as_slice() {
            [n, "per", unit] => (n, unit),
            _ => {
                return Err(RelayError::Config(format!(
                    "invalid rate limit policy '{raw}': expected '<N> per <unit>'"
                )))
            }
        };
        let limit: u32 = limit.parse().map_err(|_| {
            RelayError::Config(format!("invalid rate limit count in policy '{raw}'"))
        })?;
        if limit == 0 {
            return Err(RelayError::Config(format!(
                "rate limit count must be positive in policy '{raw}'"
            )));
        }
        let window = match *unit {
            "second" => Duration::from_secs(1),
            "minute" => Duration::from_secs(60),
            "hour" => Duration::from_secs(3600),
            "day" => Duration::from_secs(86400),
            other => {
                return Err(RelayError::Config(format!(
                    "unknown rate limit unit '{other}' in policy '{raw}'"
                )))
            }
        };
        Ok(Self {
            limit,
            window,
            raw: raw.to_string(),
        })
    }

    /// The configured policy string, surfaced in `X-RateLimit-Limit`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug)]
struct Window {
    start: u64,
    count: u32,
}

/// Process-wide limiter state, keyed by endpoint name and client IP.
pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<(&'static str, IpAddr), Window>>,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Admits or rejects one request. On rejection, returns the seconds
    /// until the current window rolls over.
    pub fn check(&self, endpoint: &'static str, policy: &RatePolicy, ip: IpAddr) -> Result<(), u64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.check_at(endpoint, policy, ip, now)
    }

    fn check_at(
        &self,
        endpoint: &'static str,
        policy: &RatePolicy,
        ip: IpAddr,
        now: u64,
    ) -> Result<(), u64> {
        if !self.enabled {
            return Ok(());
        }
        let window_secs = policy.window.as_secs().max(1);
        let window_start = now - now % window_secs;
        let mut windows = self.windows.lock().expect("limiter lock poisoned");
        let entry = windows.entry((endpoint, ip)).or_insert(Window {
            start: window_start,
            count: 0,
        });
        if entry.start != window_start {
            entry.start = window_start;
            entry.count = 0;
        }
        if entry.count >= policy.limit {
            let retry_after = (window_start + window_secs).saturating_sub(now).max(1);
            return Err(retry_after);
        }
        entry.count += 1;
        Ok(())
    }
}

/// Per-route-group middleware state: which policy applies and the shared
/// limiter.
#[derive(Clone)]
pub struct EndpointLimit {
    pub name: &'static str,
    pub policy: Arc<RatePolicy>,
    pub limiter: Arc<RateLimiter>,
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Middleware applying one endpoint group's policy.
pub async fn rate_limit_middleware(
    State(limit): State<EndpointLimit>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "-".to_string());

    match limit.limiter.check(limit.name, &limit.policy, ip) {
        Ok(()) => {
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(limit.policy.as_str()) {
                response.headers_mut().insert(X_RATELIMIT_LIMIT, value);
            }
            response
        }
        Err(retry_after) => {
            warn!(
                request_id = %request_id,
                endpoint = limit.name,
                client_ip = %ip,
                retry_after,
                "rate limit exceeded"
            );
            let error = ApiError::new(
                ErrorCode::RateLimited,
                format!("Rate limit exceeded: {}", limit.policy.as_str()),
            );
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(error.json_envelope(&request_id)),
            )
                .into_response();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert(RETRY_AFTER, value);
            }
            if let Ok(value) = HeaderValue::from_str(limit.policy.as_str()) {
                headers.insert(X_RATELIMIT_LIMIT, value);
            }
            response
        }
    }
}
