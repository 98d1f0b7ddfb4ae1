//! LP Rugwatch - liquidity position rug-pull monitor
//!
//! Watches one token's liquidity and alerts when:
//! - LP share tokens are minted or burned on the V2 pair
//! - the dev wallet moves a large share of the LP supply
//! - the dev wallet moves a V3 position NFT
//!
//! This is a **monitoring-only** tool - it never signs or sends transactions.

mod config;
mod dashboard;
mod error;
mod modules;
mod utils;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use config::Config;
use dashboard::DashboardServer;
use modules::{LpShareWatcher, PositionNftWatcher};
use utils::{
    init_logger, AlertChannel, AlertDispatcher, ChainClient, ChainService, DexScreenerClient,
    LogChannel, MetricsService, TelegramChannel,
};

/// LP Rugwatch application
pub struct Rugwatch {
    config: Config,
    // Each watcher polls its filter over its own WebSocket connection
    lp_chain: Arc<dyn ChainClient>,
    nft_chain: Arc<dyn ChainClient>,
    alerts: Arc<AlertDispatcher>,
    market: Arc<DexScreenerClient>,
    metrics: Arc<MetricsService>,
}

impl Rugwatch {
    /// Connect providers and build shared services
    pub async fn new(config: Config) -> Result<Self> {
        let metrics = Arc::new(MetricsService::new()?);

        let lp_chain: Arc<dyn ChainClient> = Arc::new(
            ChainService::connect(&config)
                .await
                .context("cannot reach chain endpoints for the LP share watcher")?,
        );
        let nft_chain: Arc<dyn ChainClient> = Arc::new(
            ChainService::connect(&config)
                .await
                .context("cannot reach chain endpoints for the position NFT watcher")?,
        );

        let channel: Arc<dyn AlertChannel> =
            match (&config.telegram_bot_token, &config.telegram_chat_id) {
                (Some(token), Some(chat_id)) => Arc::new(TelegramChannel::new(
                    token.clone(),
                    chat_id.clone(),
                    config.alert_timeout,
                )?),
                _ => {
                    warn!(target: "RUGWATCH", "Telegram not configured - alerts will only be logged");
                    Arc::new(LogChannel)
                }
            };
        let alerts = Arc::new(AlertDispatcher::new(channel, Arc::clone(&metrics)));

        let market = Arc::new(DexScreenerClient::new(
            config.dexscreener_chain.clone(),
            config.market_timeout,
        )?);

        Ok(Self {
            config,
            lp_chain,
            nft_chain,
            alerts,
            market,
            metrics,
        })
    }

    /// Build both watchers, each on its own chain connection
    fn watchers(&self) -> (LpShareWatcher, PositionNftWatcher) {
        let lp_watcher = LpShareWatcher::new(
            &self.config,
            Arc::clone(&self.lp_chain),
            Arc::clone(&self.alerts),
            self.market.clone(),
            Arc::clone(&self.metrics),
        );
        let nft_watcher = PositionNftWatcher::new(
            &self.config,
            Arc::clone(&self.nft_chain),
            Arc::clone(&self.alerts),
            Arc::clone(&self.metrics),
        );

        (lp_watcher, nft_watcher)
    }

    /// Start both watchers and the dashboard, then wait on the watcher tasks
    pub async fn start(&self) -> Result<()> {
        info!(target: "RUGWATCH", "Initializing LP Rugwatch...");

        let block = self
            .lp_chain
            .block_number()
            .await
            .context("chain connectivity check failed")?;
        info!(target: "RUGWATCH", "Connected to chain at block {}", block);
        info!(
            target: "RUGWATCH",
            "Dev wallet {} | dump threshold {:.1}% | exit sell percent {}",
            self.config.dev_wallet,
            self.config.rug_threshold_percent,
            self.config.sell_percent
        );

        self.alerts.announce_startup().await;

        let (lp_watcher, nft_watcher) = self.watchers();

        let dashboard = DashboardServer::new(
            self.config.dashboard_port,
            lp_watcher.status(),
            nft_watcher.status(),
            Arc::clone(&self.alerts),
            Arc::clone(&self.metrics),
        );

        let lp_task = lp_watcher.spawn().await?;
        let nft_task = nft_watcher.spawn().await?;

        crate::log_success!("RUGWATCH", "Both watchers running");

        tokio::spawn(async move {
            if let Err(e) = dashboard.start().await {
                error!(target: "DASHBOARD", "Dashboard stopped: {}", e);
            }
        });

        // The loops never return; a finished task means it panicked.
        let (lp_result, nft_result) = tokio::join!(lp_task, nft_task);
        lp_result.context("LP share watcher task ended")?;
        nft_result.context("position NFT watcher task ended")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "RUGWATCH", "Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(target: "RUGWATCH", "Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(target: "RUGWATCH", "Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let rugwatch = match Rugwatch::new(config).await {
        Ok(rw) => rw,
        Err(e) => {
            error!(target: "RUGWATCH", "Failed to initialize: {:#}", e);
            return Err(e);
        }
    };

    tokio::select! {
        result = rugwatch.start() => {
            if let Err(e) = result {
                error!(target: "RUGWATCH", "Fatal error: {:#}", e);
                return Err(e);
            }
        }
        _ = shutdown_signal() => {
            info!(target: "RUGWATCH", "Shutdown signal received, exiting");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::MockChain;
    use crate::utils::alerts::testing::RecordingChannel;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn watchers_install_filters_on_separate_connections() {
        let config = crate::config::test_config();
        let lp_chain = Arc::new(MockChain::with_supply(100));
        let nft_chain = Arc::new(MockChain::default());
        let metrics = Arc::new(MetricsService::new().unwrap());

        let rugwatch = Rugwatch {
            lp_chain: lp_chain.clone(),
            nft_chain: nft_chain.clone(),
            alerts: Arc::new(AlertDispatcher::new(
                Arc::new(RecordingChannel::default()),
                Arc::clone(&metrics),
            )),
            market: Arc::new(DexScreenerClient::new("base", Duration::from_secs(1)).unwrap()),
            metrics,
            config: config.clone(),
        };

        let (lp_watcher, nft_watcher) = rugwatch.watchers();
        lp_watcher.start().await.unwrap();
        nft_watcher.start().await.unwrap();

        assert_eq!(lp_chain.filters_installed(), vec![config.v2_pair_address]);
        assert_eq!(nft_chain.filters_installed(), vec![config.v3_manager_address]);
    }
}
