//! Prometheus metrics for the table engine
//!
//! - Store operations issued by controllers, by operation and outcome
//! - Notices shown to users, by level
//! - Rows currently loaded, by table

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

use crate::events::NoticeLevel;

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref STORE_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lynxky_store_ops_total", "Store operations issued by table controllers"),
        &["op", "status"]
    ).unwrap();

    pub static ref NOTICES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lynxky_notices_total", "User-facing notices by level"),
        &["level"]
    ).unwrap();

    pub static ref LOADED_ROWS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("lynxky_loaded_rows", "Rows held in memory per table"),
        &["table"]
    ).unwrap();
}

/// Registers all metrics. Safe to call more than once.
pub fn init_metrics() {
    let registered = [
        METRICS_REGISTRY.register(Box::new(STORE_OPS_TOTAL.clone())),
        METRICS_REGISTRY.register(Box::new(NOTICES_TOTAL.clone())),
        METRICS_REGISTRY.register(Box::new(LOADED_ROWS.clone())),
    ];
    if registered.iter().all(|r| r.is_ok()) {
        info!("Metrics initialized");
    }
}

/// Counts one store call and whether it succeeded.
pub fn record_store_op(op: &str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    STORE_OPS_TOTAL.with_label_values(&[op, status]).inc();
}

pub fn record_notice(level: NoticeLevel) {
    NOTICES_TOTAL.with_label_values(&[level.as_str()]).inc();
}

pub fn set_loaded_rows(table: &str, rows: usize) {
    LOADED_ROWS.with_label_values(&[table]).set(rows as i64);
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    init_metrics();
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_recorded_ops() {
        record_store_op("insert_row", true);
        record_store_op("insert_row", false);
        record_notice(NoticeLevel::Warning);

        let text = export_metrics();
        assert!(text.contains("lynxky_store_ops_total"));
        assert!(text.contains("op=\"insert_row\""));
        assert!(text.contains("lynxky_notices_total"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_metrics();
        init_metrics();
        let counter = STORE_OPS_TOTAL.with_label_values(&["metrics_test_op", "ok"]);
        let before = counter.get();
        record_store_op("metrics_test_op", true);
        assert_eq!(counter.get(), before + 1);
    }
}
