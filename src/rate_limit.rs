//! Store-backed request limiting and rotation-abuse detection.
//!
//! All cross-request state lives in a shared TTL store (Redis in
//! production); handler instances hold no counters of their own. The
//! limiter is deliberately soft: the store-level INCR is the only atomic
//! step, so a handful of requests racing at the threshold may slip through
//! before the block flag lands.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use redis::{aio::ConnectionManager, AsyncCommands};
use uuid::{Uuid, Variant, Version};

use crate::{audit::AuditSink, errors::AppError, state::AppState};

pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Window/threshold settings for one route's fixed-window counter.
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub window: u64,
    pub max_requests: i64,
    pub block_window: u64,
}

impl RoutePolicy {
    pub fn per_minute(max_requests: i64) -> Self {
        Self {
            window: 60,
            max_requests,
            block_window: 60,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub window: u64,
    pub max_distinct: i64,
    pub block_window: u64,
}

/// Too many distinct device ids from one IP.
pub const DEVICE_ROTATION: RotationPolicy = RotationPolicy {
    window: 300,
    max_distinct: 2,
    block_window: 300,
};

/// One device id showing up from too many distinct IPs. Looser than the
/// device-id check: legitimate devices roam between networks.
pub const IP_ROTATION: RotationPolicy = RotationPolicy {
    window: 300,
    max_distinct: 5,
    block_window: 300,
};

/// Which of (ip, device id) scopes a rotation check; the other is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOwner {
    Ip,
    DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block { retry_after: u64, message: String },
}

/// Minimal atomic-counter/TTL surface the limiter needs from its store.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn incr(&self, key: &str) -> Result<i64, AppError>;
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), AppError>;
    /// Sets a TTL only when the key has none, so an existing window keeps
    /// its original deadline.
    async fn expire_if_unset(&self, key: &str, seconds: u64) -> Result<(), AppError>;
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
    async fn set_flag(&self, key: &str, seconds: u64) -> Result<(), AppError>;
    async fn add_member(&self, key: &str, member: &str) -> Result<(), AppError>;
    async fn member_count(&self, key: &str) -> Result<i64, AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Production store over a shared Redis connection.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RateStore for RedisStore {
    async fn incr(&self, key: &str) -> Result<i64, AppError> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, seconds as i64).await?;
        Ok(())
    }

    async fn expire_if_unset(&self, key: &str, seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .arg("NX")
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let present: bool = conn.exists(key).await?;
        Ok(present)
    }

    async fn set_flag(&self, key: &str, seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, 1, seconds).await?;
        Ok(())
    }

    async fn add_member(&self, key: &str, member: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn member_count(&self, key: &str) -> Result<i64, AppError> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.scard(key).await?;
        Ok(count)
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    audit: Arc<dyn AuditSink>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Gate that runs before any counter is touched: the device id must be
    /// present (400) and canonical lowercase UUIDv4 (401).
    pub fn verify_device_id(raw: Option<&str>) -> Result<String, AppError> {
        let raw = raw
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("No device id found.".to_string()))?;

        let malformed = || AppError::Unauthorized("Incorrect device id format found.".to_string());

        let parsed = Uuid::parse_str(raw).map_err(|_| malformed())?;
        if parsed.get_version() != Some(Version::Random)
            || parsed.get_variant() != Variant::RFC4122
            || parsed.hyphenated().to_string() != raw
        {
            return Err(malformed());
        }

        Ok(raw.to_string())
    }

    fn base_key(ip: &str, device_id: &str, route: &str) -> String {
        format!("ip:{ip}:deviceId:{device_id}:route:{route}")
    }

    /// Fixed-window limiter for one `(route, ip, deviceId)` scope.
    pub async fn check_route(
        &self,
        ip: &str,
        device_id: &str,
        route: &str,
        policy: &RoutePolicy,
    ) -> Result<Decision, AppError> {
        let base = Self::base_key(ip, device_id, route);
        let counter_key = format!("{base}:requests");
        let block_key = format!("{base}:blocked");

        // an active block short-circuits without touching the counter
        if self.store.exists(&block_key).await? {
            return Ok(Decision::Block {
                retry_after: policy.block_window,
                message: "Too many requests. Please try again later.".to_string(),
            });
        }

        let count = self.store.incr(&counter_key).await?;
        if count == 1 {
            self.store.expire(&counter_key, policy.window).await?;
        }

        if count > policy.max_requests {
            self.store.set_flag(&block_key, policy.block_window).await?;
            self.audit
                .route_blocked(ip, device_id, route, count, policy.max_requests);

            return Ok(Decision::Block {
                retry_after: policy.block_window,
                message: format!(
                    "Too many requests. You have been blocked for {}.",
                    block_duration_label(policy.block_window)
                ),
            });
        }

        Ok(Decision::Allow)
    }

    /// Counts distinct counterpart values seen for the owner inside a
    /// fixed-origin window; breaching the threshold blocks the owner and
    /// clears the set so the next window starts empty.
    pub async fn check_rotation(
        &self,
        owner: RotationOwner,
        ip: &str,
        device_id: &str,
        policy: &RotationPolicy,
    ) -> Result<Decision, AppError> {
        let (set_key, block_key, owner_value, tracked, owner_kind, blocked_msg, breach_msg) =
            match owner {
                RotationOwner::Ip => (
                    format!("ip:{ip}:deviceIds"),
                    format!("ip:{ip}:blocked"),
                    ip,
                    device_id,
                    "ip",
                    "Too many device switches. Try again later.",
                    "Too many device IDs detected.",
                ),
                RotationOwner::DeviceId => (
                    format!("deviceId:{device_id}:ips"),
                    format!("deviceId:{device_id}:blocked"),
                    device_id,
                    ip,
                    "device id",
                    "Too many IP switches. Try again later.",
                    "Too many IP addresses detected.",
                ),
            };

        if self.store.exists(&block_key).await? {
            return Ok(Decision::Block {
                retry_after: policy.block_window,
                message: blocked_msg.to_string(),
            });
        }

        self.store.add_member(&set_key, tracked).await?;
        self.store.expire_if_unset(&set_key, policy.window).await?;

        let distinct = self.store.member_count(&set_key).await?;
        if distinct > policy.max_distinct {
            self.store.set_flag(&block_key, policy.block_window).await?;
            self.store.remove(&set_key).await?;
            self.audit
                .rotation_blocked(owner_kind, owner_value, distinct, policy.max_distinct);

            return Ok(Decision::Block {
                retry_after: policy.block_window,
                message: format!(
                    "{breach_msg} You have been blocked for {}.",
                    block_duration_label(policy.block_window)
                ),
            });
        }

        Ok(Decision::Allow)
    }
}

fn block_duration_label(block_window: u64) -> String {
    let minutes = block_window.div_ceil(60);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

/// First valid `X-Forwarded-For` entry, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(|v| v.parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Per-route state for the guard middleware.
#[derive(Clone)]
pub struct GuardConfig {
    pub state: Arc<AppState>,
    pub route: &'static str,
    pub policy: RoutePolicy,
}

/// Runs the device-id gate, both rotation detectors and the route limiter
/// ahead of the handler. Any block terminates the request here.
pub async fn guard(
    State(cfg): State<GuardConfig>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let device_id = RateLimiter::verify_device_id(
        req.headers()
            .get(DEVICE_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )?;
    let ip = client_ip(req.headers(), peer);

    let limiter = &cfg.state.limiter;

    // a block is terminal; later checks must not run (or count) after one
    ensure_allowed(
        limiter
            .check_rotation(RotationOwner::Ip, &ip, &device_id, &DEVICE_ROTATION)
            .await?,
    )?;
    ensure_allowed(
        limiter
            .check_rotation(RotationOwner::DeviceId, &ip, &device_id, &IP_ROTATION)
            .await?,
    )?;
    ensure_allowed(
        limiter
            .check_route(&ip, &device_id, cfg.route, &cfg.policy)
            .await?,
    )?;

    Ok(next.run(req).await)
}

fn ensure_allowed(decision: Decision) -> Result<(), AppError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Block {
            retry_after,
            message,
        } => Err(AppError::TooManyRequests {
            retry_after,
            message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_gate_accepts_canonical_v4() {
        let id = "0d3adf00-7e10-4e28-89ab-1f0d6c2a9b3e";
        assert_eq!(RateLimiter::verify_device_id(Some(id)).unwrap(), id);
    }

    #[test]
    fn device_id_gate_rejects_missing() {
        assert!(matches!(
            RateLimiter::verify_device_id(None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            RateLimiter::verify_device_id(Some("")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn device_id_gate_rejects_malformed() {
        for bad in [
            "not-a-uuid",
            // v1, not v4
            "8c15a16e-52cb-11ee-be56-0242ac120002",
            // uppercase is not the canonical form
            "0D3ADF00-7E10-4E28-89AB-1F0D6C2A9B3E",
            // braces are not canonical either
            "{0d3adf00-7e10-4e28-89ab-1f0d6c2a9b3e}",
        ] {
            assert!(
                matches!(
                    RateLimiter::verify_device_id(Some(bad)),
                    Err(AppError::Unauthorized(_))
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn forwarded_header_wins_when_valid() {
        let peer: SocketAddr = "10.0.0.1:9999".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers, peer), "203.0.113.7");

        let mut garbage = HeaderMap::new();
        garbage.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        assert_eq!(client_ip(&garbage, peer), "10.0.0.1");

        assert_eq!(client_ip(&HeaderMap::new(), peer), "10.0.0.1");
    }
}
