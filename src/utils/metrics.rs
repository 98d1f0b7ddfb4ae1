//! Prometheus metrics service for LP Rugwatch

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::time::Instant;
use tracing::info;

/// Metrics service for Prometheus
pub struct MetricsService {
    registry: Registry,
    start_time: Instant,

    // Watcher metrics
    pub transfers_processed: CounterVec,
    pub iteration_errors: CounterVec,
    pub watcher_status: GaugeVec,

    // Supply cache
    pub total_supply: Gauge,
    pub supply_refreshes: IntCounter,

    // Alerts
    pub alerts_sent: CounterVec,

    pub uptime: Gauge,
}

impl MetricsService {
    /// Create a new metrics service with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let transfers_processed = CounterVec::new(
            Opts::new("rugwatch_transfers_processed_total", "Transfer events evaluated"),
            &["watcher"],
        )?;
        let iteration_errors = CounterVec::new(
            Opts::new("rugwatch_iteration_errors_total", "Poll iterations that failed"),
            &["watcher"],
        )?;
        let watcher_status = GaugeVec::new(
            Opts::new("rugwatch_watcher_running", "Watcher status"),
            &["watcher"],
        )?;
        let total_supply = Gauge::new(
            "rugwatch_lp_total_supply",
            "Last cached LP share total supply (lossy)",
        )?;
        let supply_refreshes = IntCounter::new(
            "rugwatch_supply_refreshes_total",
            "totalSupply queries issued by the supply cache",
        )?;
        let alerts_sent = CounterVec::new(
            Opts::new("rugwatch_alerts_total", "Alerts dispatched"),
            &["kind", "status"],
        )?;
        let uptime = Gauge::new("rugwatch_uptime_seconds", "Application uptime")?;

        registry.register(Box::new(transfers_processed.clone()))?;
        registry.register(Box::new(iteration_errors.clone()))?;
        registry.register(Box::new(watcher_status.clone()))?;
        registry.register(Box::new(total_supply.clone()))?;
        registry.register(Box::new(supply_refreshes.clone()))?;
        registry.register(Box::new(alerts_sent.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        info!(target: "METRICS", "Prometheus metrics initialized");

        Ok(Self {
            registry,
            start_time: Instant::now(),
            transfers_processed,
            iteration_errors,
            watcher_status,
            total_supply,
            supply_refreshes,
            alerts_sent,
            uptime,
        })
    }

    pub fn record_transfer(&self, watcher: &str) {
        self.transfers_processed.with_label_values(&[watcher]).inc();
    }

    pub fn record_iteration_error(&self, watcher: &str) {
        self.iteration_errors.with_label_values(&[watcher]).inc();
    }

    pub fn record_alert(&self, kind: &str, delivered: bool) {
        let status = if delivered { "delivered" } else { "failed" };
        self.alerts_sent.with_label_values(&[kind, status]).inc();
    }

    pub fn record_supply(&self, supply: f64) {
        self.supply_refreshes.inc();
        self.total_supply.set(supply);
    }

    /// Set watcher status
    pub fn set_watcher_status(&self, watcher: &str, running: bool) {
        self.watcher_status
            .with_label_values(&[watcher])
            .set(if running { 1.0 } else { 0.0 });
    }

    /// Get metrics as Prometheus text format
    pub fn get_metrics(&self) -> prometheus::Result<String> {
        self.uptime.set(self.start_time.elapsed().as_secs_f64());

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_text_contains_recorded_series() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_transfer("lp_share");
        metrics.record_alert("DEV_DUMP", true);
        metrics.record_alert("AUTO_EXIT", false);
        metrics.set_watcher_status("position_nft", true);

        let text = metrics.get_metrics().unwrap();
        assert!(text.contains("rugwatch_transfers_processed_total{watcher=\"lp_share\"} 1"));
        assert!(text.contains("rugwatch_alerts_total{kind=\"DEV_DUMP\",status=\"delivered\"} 1"));
        assert!(text.contains("rugwatch_alerts_total{kind=\"AUTO_EXIT\",status=\"failed\"} 1"));
        assert!(text.contains("rugwatch_watcher_running{watcher=\"position_nft\"} 1"));
    }

    #[test]
    fn supply_refresh_counts_and_sets_gauge() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_supply(100.0);
        metrics.record_supply(250.0);
        assert_eq!(metrics.supply_refreshes.get(), 2);
        assert_eq!(metrics.total_supply.get(), 250.0);
    }
}
