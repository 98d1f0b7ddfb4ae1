//! Cached LP share total supply with interval-based refresh

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::utils::chain::{ChainClient, ChainError};
use crate::utils::MetricsService;

/// Last known total supply of the LP share token.
///
/// The value is refreshed lazily by [`SupplyCache::get`] once it is older than
/// the refresh interval. A failed refresh leaves the previous reading in place
/// and returns the error, so the next call tries again.
pub struct SupplyCache {
    chain: Arc<dyn ChainClient>,
    token: Address,
    refresh_interval: Duration,
    value: U256,
    last_refreshed: Instant,
    metrics: Option<Arc<MetricsService>>,
}

impl SupplyCache {
    /// Query the current supply and build the cache around it
    pub async fn seed(
        chain: Arc<dyn ChainClient>,
        token: Address,
        refresh_interval: Duration,
    ) -> Result<Self, ChainError> {
        let value = chain.total_supply(token).await?;
        debug!(target: "LP_WATCHER", "Seeded total supply: {}", value);

        Ok(Self {
            chain,
            token,
            refresh_interval,
            value,
            last_refreshed: Instant::now(),
            metrics: None,
        })
    }

    /// Report refreshes to the metrics service
    pub fn with_metrics(mut self, metrics: Arc<MetricsService>) -> Self {
        metrics.record_supply(approx_f64(self.value));
        self.metrics = Some(metrics);
        self
    }

    pub fn is_stale(&self) -> bool {
        self.last_refreshed.elapsed() > self.refresh_interval
    }

    /// Cached total supply, refreshed first when stale
    pub async fn get(&mut self) -> Result<U256, ChainError> {
        if self.is_stale() {
            self.refresh().await?;
        }
        Ok(self.value)
    }

    /// Unconditionally re-query the supply and reset the refresh timer
    pub async fn refresh(&mut self) -> Result<U256, ChainError> {
        let value = self.chain.total_supply(self.token).await?;
        if value != self.value {
            debug!(target: "LP_WATCHER", "Total supply changed: {} -> {}", self.value, value);
        }

        self.value = value;
        self.last_refreshed = Instant::now();

        if let Some(metrics) = &self.metrics {
            metrics.record_supply(approx_f64(value));
        }

        Ok(value)
    }

    /// Cached value without any refresh
    pub fn value(&self) -> U256 {
        self.value
    }
}

/// Lossy conversion for gauges and display
pub(crate) fn approx_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}
