//! Prometheus metrics collection for shadowchat.
//!
//! Exposed on an HTTP endpoint (see [`crate::http`]). Tracks pairing
//! throughput, moderation events and relay health.
//!
//! ## Metrics
//!
//! - `shadowchat_searches_total{outcome}` - Searches by outcome (matched, queued, rejected)
//! - `shadowchat_matches_total{pool}` - Pairings by the pool the partner came from
//! - `shadowchat_rejections_total{operation, code}` - Policy rejections and failures
//! - `shadowchat_command_duration_seconds{command}` - Gateway command latency

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Searches by outcome.
pub static SEARCHES: OnceLock<IntCounterVec> = OnceLock::new();

/// Successful pairings by source pool.
pub static MATCHES: OnceLock<IntCounterVec> = OnceLock::new();

/// Operation failures by static error code.
pub static REJECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Reports filed (counted or not).
pub static REPORTS: OnceLock<IntCounter> = OnceLock::new();

/// Bans issued automatically from reports.
pub static AUTO_BANS: OnceLock<IntCounter> = OnceLock::new();

/// Messages relayed by content kind.
pub static MESSAGES_RELAYED: OnceLock<IntCounterVec> = OnceLock::new();

/// Relay attempts whose partner was unreachable.
pub static DELIVERY_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Messages refused by the per-user rate limit.
pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Clients currently attached to the line gateway.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Gateway command processing latency by command.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded. Calls
/// after the first are no-ops.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(SEARCHES, IntCounterVec::new(Opts::new("shadowchat_searches_total", "Searches by outcome"), &["outcome"]));
    register!(MATCHES, IntCounterVec::new(Opts::new("shadowchat_matches_total", "Pairings by source pool"), &["pool"]));
    register!(REJECTIONS, IntCounterVec::new(Opts::new("shadowchat_rejections_total", "Operation failures by code"), &["operation", "code"]));
    register!(REPORTS, IntCounter::new("shadowchat_reports_total", "Reports filed"));
    register!(AUTO_BANS, IntCounter::new("shadowchat_auto_bans_total", "Automatic bans"));
    register!(MESSAGES_RELAYED, IntCounterVec::new(Opts::new("shadowchat_messages_relayed_total", "Messages relayed by kind"), &["kind"]));
    register!(DELIVERY_FAILURES, IntCounter::new("shadowchat_delivery_failures_total", "Relays to an unreachable partner"));
    register!(RATE_LIMITED, IntCounter::new("shadowchat_rate_limited_total", "Messages refused by the rate limit"));
    register!(CONNECTED_CLIENTS, IntGauge::new("shadowchat_connected_clients", "Clients attached to the gateway"));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("shadowchat_command_duration_seconds", "Gateway command latency by command")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["command"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

#[inline]
fn inc_vec(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
pub fn record_search(outcome: &str) {
    inc_vec(&SEARCHES, &[outcome]);
}

#[inline]
pub fn record_match(pool: &str) {
    inc_vec(&MATCHES, &[pool]);
}

/// Record a failed operation under its static error code.
#[inline]
pub fn record_rejection(operation: &str, code: &str) {
    inc_vec(&REJECTIONS, &[operation, code]);
    if code == "rate_limited" {
        inc(&RATE_LIMITED);
    }
}

#[inline]
pub fn record_report(auto_banned: bool) {
    inc(&REPORTS);
    if auto_banned {
        inc(&AUTO_BANS);
    }
}

#[inline]
pub fn record_relay(kind: &str) {
    inc_vec(&MESSAGES_RELAYED, &[kind]);
}

#[inline]
pub fn record_delivery_failure() {
    inc(&DELIVERY_FAILURES);
}

#[inline]
pub fn client_connected() {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.inc();
    }
}

#[inline]
pub fn client_disconnected() {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.dec();
    }
}

/// Record gateway command latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}
