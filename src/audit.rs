//! Append-only record of security-relevant events.
//!
//! The sink is injected where blocks are decided; emission must never fail
//! the request, so the trait is infallible.

pub trait AuditSink: Send + Sync {
    fn route_blocked(&self, ip: &str, device_id: &str, route: &str, count: i64, max: i64);
    fn rotation_blocked(&self, owner_kind: &str, owner: &str, distinct: i64, max: i64);
    fn tokens_swept(&self, removed: u64);
}

/// Audit events as structured tracing records under `target: "audit"`.
#[derive(Debug, Clone, Default)]
pub struct TracingAudit;

impl TracingAudit {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAudit {
    fn route_blocked(&self, ip: &str, device_id: &str, route: &str, count: i64, max: i64) {
        tracing::warn!(
            target: "audit",
            event = "route_blocked",
            ip,
            device_id,
            route,
            requests = count,
            max_allowed = max,
        );
    }

    fn rotation_blocked(&self, owner_kind: &str, owner: &str, distinct: i64, max: i64) {
        tracing::warn!(
            target: "audit",
            event = "rotation_blocked",
            owner_kind,
            owner,
            distinct_seen = distinct,
            max_allowed = max,
        );
    }

    fn tokens_swept(&self, removed: u64) {
        tracing::info!(target: "audit", event = "tokens_swept", removed);
    }
}
