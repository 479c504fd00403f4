//! Prometheus metrics for the synced enforcer

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Lock and operation metrics exposed to Prometheus
pub struct FacadeMetrics {
    /// Completed operations by name and lock mode
    operations: IntCounterVec,

    /// Operations that returned an engine error
    errors: IntCounterVec,

    /// Time spent waiting to acquire the lock
    lock_wait: HistogramVec,

    registry: Registry,
}

impl FacadeMetrics {
    /// Create metrics registered under `namespace`
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations = IntCounterVec::new(
            Opts::new("rbac_operations_total", "Total RBAC operations executed")
                .namespace(namespace),
            &["operation", "mode"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        let errors = IntCounterVec::new(
            Opts::new("rbac_operation_errors_total", "RBAC operations that returned an error")
                .namespace(namespace),
            &["operation"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        let lock_wait = HistogramVec::new(
            HistogramOpts::new("rbac_lock_wait_seconds", "Time spent acquiring the enforcer lock")
                .namespace(namespace)
                .buckets(vec![
                    0.000_001, 0.000_01, 0.000_1, 0.001, 0.01, 0.1, 1.0,
                ]),
            &["mode"],
        )?;
        registry.register(Box::new(lock_wait.clone()))?;

        Ok(Self {
            operations,
            errors,
            lock_wait,
            registry,
        })
    }

    pub fn record_operation(&self, operation: &str, mode: &str, failed: bool) {
        self.operations.with_label_values(&[operation, mode]).inc();
        if failed {
            self.errors.with_label_values(&[operation]).inc();
        }
    }

    pub fn record_lock_wait(&self, mode: &str, waited: Duration) {
        self.lock_wait
            .with_label_values(&[mode])
            .observe(waited.as_secs_f64());
    }

    pub fn operation_count(&self, operation: &str, mode: &str) -> u64 {
        self.operations.with_label_values(&[operation, mode]).get()
    }

    pub fn error_count(&self, operation: &str) -> u64 {
        self.errors.with_label_values(&[operation]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
