//! Position NFT watcher - alerts when the dev wallet moves a V3 position NFT

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::WatchError;
use crate::modules::lp_share_watcher::tx_label;
use crate::modules::status::WatcherStatus;
use crate::utils::alerts::{AlertCategory, AlertEvent};
use crate::utils::chain::{ChainClient, ChainService, FilterId, PositionTransfer};
use crate::utils::{AlertDispatcher, MetricsService};

pub const WATCHER: &str = "position_nft";

/// Position NFT watcher module
pub struct PositionNftWatcher {
    manager: Address,
    dev_wallet: Address,
    tracked_token_id: U256,
    poll_interval: Duration,

    chain: Arc<dyn ChainClient>,
    alerts: Arc<AlertDispatcher>,
    metrics: Arc<MetricsService>,
    status: Arc<WatcherStatus>,
}

impl PositionNftWatcher {
    pub fn new(
        config: &Config,
        chain: Arc<dyn ChainClient>,
        alerts: Arc<AlertDispatcher>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            manager: config.v3_manager_address,
            dev_wallet: config.dev_wallet,
            tracked_token_id: config.position_token_id,
            poll_interval: config.poll_interval,
            chain,
            alerts,
            metrics,
            status: Arc::new(WatcherStatus::default()),
        }
    }

    pub fn status(&self) -> Arc<WatcherStatus> {
        Arc::clone(&self.status)
    }

    /// Install the transfer filter on the position manager
    pub async fn start(&self) -> Result<FilterId, WatchError> {
        info!(
            target: "NFT_WATCHER",
            "Starting position NFT watcher on {} (tracked id {})",
            ChainService::shorten_address(&self.manager, 4),
            self.tracked_token_id
        );

        let filter = self
            .chain
            .new_transfer_filter(self.manager)
            .await
            .map_err(WatchError::startup(WATCHER))?;

        self.status.set_running(true);
        self.metrics.set_watcher_status(WATCHER, true);
        info!(target: "NFT_WATCHER", "Monitoring NFT transfers...");

        Ok(filter)
    }

    pub async fn spawn(self) -> Result<JoinHandle<()>, WatchError> {
        let filter = self.start().await?;
        Ok(tokio::spawn(self.run(filter)))
    }

    pub async fn run(self, filter: FilterId) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.poll_once(filter).await {
                warn!(target: "NFT_WATCHER", "{}", e);
                self.status.record_error();
                self.metrics.record_iteration_error(WATCHER);
            }
        }
    }

    pub async fn poll_once(&self, filter: FilterId) -> Result<usize, WatchError> {
        let transfers = self
            .chain
            .position_transfers(filter)
            .await
            .map_err(WatchError::iteration(WATCHER))?;

        for transfer in &transfers {
            self.metrics.record_transfer(WATCHER);
            self.handle_transfer(transfer).await;
        }

        self.status.record_poll(transfers.len());
        Ok(transfers.len())
    }

    async fn handle_transfer(&self, transfer: &PositionTransfer) {
        debug!(
            target: "NFT_WATCHER",
            "NFT #{} {} -> {} (tx {}, log {:?})",
            transfer.token_id,
            transfer.from,
            transfer.to,
            tx_label(transfer.tx_hash),
            transfer.log_index
        );

        if transfer.from != self.dev_wallet {
            return;
        }

        // Any position leaving the dev wallet counts, the tracked id only labels it

        let position = if transfer.token_id == self.tracked_token_id {
            format!("Position #{} (tracked)", transfer.token_id)
        } else {
            format!(
                "Position #{} (not the tracked #{})",
                transfer.token_id, self.tracked_token_id
            )
        };
        let detail = format!(
            "{}\nTo: {}\nTx: {}",
            position,
            transfer.to,
            tx_label(transfer.tx_hash)
        );

        self.status.record_alert();
        self.alerts
            .dispatch(&AlertEvent::new(AlertCategory::DevNftMove, detail))
            .await;
        self.alerts.auto_exit("V3 LP NFT moved").await;
    }
}
