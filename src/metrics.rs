//! Ambient process/operational metrics, exposed at `/metrics` in the
//! Prometheus text format. Not itself a notification path — purely for
//! operating the process.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static ALARMS_RAISED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("alarm_manager_alarms_raised_total", "Alarms admitted via RAISE").unwrap();
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

pub static ALARMS_CLEARED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("alarm_manager_alarms_cleared_total", "Alarms removed via CLEAR").unwrap();
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

pub static ALARMS_SUPPRESSED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "alarm_manager_alarms_suppressed_total",
        "Duplicate RAISE messages suppressed because severity was unchanged",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

pub static ALARMS_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "alarm_manager_alarms_dropped_total",
        "Alarm messages dropped: unknown definition or missing mandatory fields",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

pub static DOWNSTREAM_POST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "alarm_manager_downstream_post_failures_total",
        "Failed POSTs to the alert backend or notification manager",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

pub static ACTIVE_ALARMS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("alarm_manager_active_alarms", "Current size of the active alarm list").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).ok();
    gauge
});

pub static HISTORY_ALARMS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("alarm_manager_history_alarms", "Current size of the alarm history list").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).ok();
    gauge
});

/// Renders the registry in the Prometheus exposition format.
pub fn render() -> String {
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if TextEncoder::new().encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Forces all lazily-registered collectors to register before the first
/// scrape, so `/metrics` is never empty on a cold start.
pub fn init() {
    Lazy::force(&ALARMS_RAISED_TOTAL);
    Lazy::force(&ALARMS_CLEARED_TOTAL);
    Lazy::force(&ALARMS_SUPPRESSED_TOTAL);
    Lazy::force(&ALARMS_DROPPED_TOTAL);
    Lazy::force(&DOWNSTREAM_POST_FAILURES_TOTAL);
    Lazy::force(&ACTIVE_ALARMS);
    Lazy::force(&HISTORY_ALARMS);
}
