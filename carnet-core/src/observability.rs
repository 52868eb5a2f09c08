/*!
Observability infrastructure: tracing setup and optional Prometheus counters.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{BackupError, Result};

/// Install a global tracing subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Intended for binaries and long-lived hosts; libraries embedding
/// the engine should install their own.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = TracingRegistry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    set_global_default(subscriber)
        .map_err(|e| BackupError::storage(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<BackupMetrics> = OnceLock::new();

/// Counters covering the engine's caller-facing operations.
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct BackupMetrics {
    pub backups_created_total: Counter,
    pub backup_bytes_total: Counter,
    pub restores_total: Counter,
    pub backups_deleted_total: Counter,
    registry: Registry,
}

#[cfg(feature = "metrics")]
impl BackupMetrics {
    fn new() -> std::result::Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let backups_created_total = Counter::new(
            "carnet_backups_created_total",
            "Total snapshots archived",
        )?;
        let backup_bytes_total = Counter::new(
            "carnet_backup_bytes_total",
            "Total compressed bytes written to the archive",
        )?;
        let restores_total = Counter::new(
            "carnet_restores_total",
            "Total successful restore operations",
        )?;
        let backups_deleted_total = Counter::new(
            "carnet_backups_deleted_total",
            "Total archive entries deleted",
        )?;

        registry.register(Box::new(backups_created_total.clone()))?;
        registry.register(Box::new(backup_bytes_total.clone()))?;
        registry.register(Box::new(restores_total.clone()))?;
        registry.register(Box::new(backups_deleted_total.clone()))?;

        Ok(Self {
            backups_created_total,
            backup_bytes_total,
            restores_total,
            backups_deleted_total,
            registry,
        })
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| BackupError::storage(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| BackupError::storage(format!("metrics are not UTF-8: {e}")))
    }
}

/// The process-wide metrics instance.
#[cfg(feature = "metrics")]
pub fn metrics() -> &'static BackupMetrics {
    METRICS.get_or_init(|| BackupMetrics::new().expect("failed to initialize backup metrics"))
}

#[cfg(feature = "metrics")]
pub(crate) fn record_backup_created(size_bytes: u64) {
    let m = metrics();
    m.backups_created_total.inc();
    m.backup_bytes_total.inc_by(size_bytes as f64);
}

#[cfg(feature = "metrics")]
pub(crate) fn record_restore() {
    metrics().restores_total.inc();
}

#[cfg(feature = "metrics")]
pub(crate) fn record_backup_deleted() {
    metrics().backups_deleted_total.inc();
}
