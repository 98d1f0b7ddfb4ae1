//! LP share watcher - alerts on LP mints, burns and dev dumps of the V2 pair token

use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::WatchError;
use crate::modules::dump_rules::{DumpRules, Finding};
use crate::modules::status::WatcherStatus;
use crate::modules::supply_cache::SupplyCache;
use crate::utils::alerts::{AlertCategory, AlertEvent};
use crate::utils::chain::{ChainClient, ChainService, FilterId, LiquidityShareTransfer};
use crate::utils::market::{self, MarketSource};
use crate::utils::{AlertDispatcher, MetricsService};

pub const WATCHER: &str = "lp_share";

/// Per-run state owned by the watcher task
pub struct LpShareState {
    pub supply: SupplyCache,
    filter: FilterId,
}

/// LP share watcher module
pub struct LpShareWatcher {
    pair: Address,
    rules: DumpRules,
    refresh_interval: Duration,
    poll_interval: Duration,

    chain: Arc<dyn ChainClient>,
    alerts: Arc<AlertDispatcher>,
    market: Arc<dyn MarketSource>,
    metrics: Arc<MetricsService>,
    status: Arc<WatcherStatus>,
}

impl LpShareWatcher {
    /// Create a new LP share watcher
    pub fn new(
        config: &Config,
        chain: Arc<dyn ChainClient>,
        alerts: Arc<AlertDispatcher>,
        market: Arc<dyn MarketSource>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            pair: config.v2_pair_address,
            rules: DumpRules::new(config.dev_wallet, config.rug_threshold_percent),
            refresh_interval: config.supply_refresh_interval,
            poll_interval: config.poll_interval,
            chain,
            alerts,
            market,
            metrics,
            status: Arc::new(WatcherStatus::default()),
        }
    }

    pub fn status(&self) -> Arc<WatcherStatus> {
        Arc::clone(&self.status)
    }

    /// Seed the supply cache and install the transfer filter
    pub async fn start(&self) -> Result<LpShareState, WatchError> {
        info!(
            target: "LP_WATCHER",
            "Starting LP share watcher on pair {}",
            ChainService::shorten_address(&self.pair, 4)
        );

        let supply = SupplyCache::seed(Arc::clone(&self.chain), self.pair, self.refresh_interval)
            .await
            .map_err(WatchError::startup(WATCHER))?
            .with_metrics(Arc::clone(&self.metrics));
        self.status.set_total_supply(supply.value().to_string());

        let filter = self
            .chain
            .new_transfer_filter(self.pair)
            .await
            .map_err(WatchError::startup(WATCHER))?;

        self.status.set_running(true);
        self.metrics.set_watcher_status(WATCHER, true);
        info!(target: "LP_WATCHER", "Monitoring LP transfers (supply {})", supply.value());

        Ok(LpShareState { supply, filter })
    }

    /// Start and move the poll loop onto its own task
    pub async fn spawn(self) -> Result<JoinHandle<()>, WatchError> {
        let state = self.start().await?;
        Ok(tokio::spawn(self.run(state)))
    }

    /// Poll forever. Iteration errors are logged and the loop carries on.
    pub async fn run(self, mut state: LpShareState) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.poll_once(&mut state).await {
                warn!(target: "LP_WATCHER", "{}", e);
                self.status.record_error();
                self.metrics.record_iteration_error(WATCHER);
            }
        }
    }

    /// One loop iteration: refresh supply if stale, drain and evaluate transfers.
    /// Returns the number of transfers processed.
    pub async fn poll_once(&self, state: &mut LpShareState) -> Result<usize, WatchError> {
        let total_supply = state
            .supply
            .get()
            .await
            .map_err(WatchError::iteration(WATCHER))?;
        self.status.set_total_supply(total_supply.to_string());

        let transfers = self
            .chain
            .share_transfers(state.filter)
            .await
            .map_err(WatchError::iteration(WATCHER))?;

        for transfer in &transfers {
            self.metrics.record_transfer(WATCHER);
            self.handle_transfer(transfer, total_supply).await;
        }

        self.status.record_poll(transfers.len());
        Ok(transfers.len())
    }

    async fn handle_transfer(&self, transfer: &LiquidityShareTransfer, total_supply: U256) {
        debug!(
            target: "LP_WATCHER",
            "Transfer {} -> {} amount {} (tx {}, log {:?})",
            transfer.from,
            transfer.to,
            transfer.amount,
            tx_label(transfer.tx_hash),
            transfer.log_index
        );

        let findings = self.rules.evaluate(transfer, total_supply);

        // Dev moves under the threshold are worth a log line, not an alert

        if findings.is_empty() && transfer.from == self.rules.dev_wallet {
            info!(
                target: "LP_WATCHER",
                "Dev moved {:.2}% of LP supply (below {:.1}% threshold)",
                crate::modules::dump_rules::share_percent(transfer.amount, total_supply),
                self.rules.threshold_percent
            );
        }

        for finding in findings {
            self.status.record_alert();
            match finding {
                Finding::LpMint | Finding::LpBurn => {
                    let detail = format!(
                        "Amount: {}\nTx: {}",
                        transfer.amount,
                        tx_label(transfer.tx_hash)
                    );
                    self.alerts
                        .dispatch(&AlertEvent::new(finding.category(), detail))
                        .await;
                }
                Finding::DevDump { percent } => {
                    // Best effort, a missing snapshot never holds back the alert
                    let snapshot = self.market.snapshot(self.pair).await;
                    let detail = format!(
                        "{:.2}% of LP supply\nTo: {}\nTx: {}\n{}",
                        percent,
                        transfer.to,
                        tx_label(transfer.tx_hash),
                        market::describe(snapshot.as_ref())
                    );
                    self.alerts
                        .dispatch(&AlertEvent::new(AlertCategory::DevDump, detail))
                        .await;
                    self.alerts.auto_exit("Dev dumped LP").await;
                }
            }
        }
    }
}

pub(crate) fn tx_label(tx_hash: Option<B256>) -> String {
    tx_hash
        .map(|h| h.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
