//! DexScreener pair snapshot used to enrich dump alerts

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

const DEXSCREENER_API: &str = "https://api.dexscreener.com/latest/dex/pairs";

/// Text used in place of a snapshot when the lookup fails
pub const MARKET_UNAVAILABLE: &str = "DEXScreener data unavailable";

#[derive(Debug, Deserialize)]
struct PairsResponse {
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Deserialize)]
struct PairData {
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    fdv: Option<f64>,
    liquidity: Option<PairLiquidity>,
}

#[derive(Debug, Deserialize)]
struct PairLiquidity {
    usd: Option<f64>,
}

/// Market figures for one pair at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub price_usd: Option<String>,
    pub fully_diluted_value: Option<f64>,
    pub liquidity_usd: Option<f64>,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = self.price_usd.as_deref().unwrap_or("N/A");
        let fdv = self
            .fully_diluted_value
            .map(|v| format!("{:.0}", v))
            .unwrap_or_else(|| "N/A".to_string());
        let liquidity = self
            .liquidity_usd
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "N/A".to_string());

        write!(f, "DEXScreener\nPrice: {}\nFDV: {}\nLiquidity: {}", price, fdv, liquidity)
    }
}

/// Best-effort market lookup. `None` means unavailable.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn snapshot(&self, pair: Address) -> Option<MarketSnapshot>;
}

/// Render a lookup result for an alert body
pub fn describe(snapshot: Option<&MarketSnapshot>) -> String {
    snapshot
        .map(|s| s.to_string())
        .unwrap_or_else(|| MARKET_UNAVAILABLE.to_string())
}

pub struct DexScreenerClient {
    client: Client,
    chain_id: String,
}

impl DexScreenerClient {
    pub fn new(chain_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            chain_id: chain_id.into(),
        })
    }

    async fn fetch(&self, pair: Address) -> Result<MarketSnapshot> {
        let url = format!("{}/{}/{}", DEXSCREENER_API, self.chain_id, pair);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("DexScreener API error: {}", response.status()));
        }

        let body = response.text().await?;
        parse_snapshot(&body)?.ok_or_else(|| anyhow!("no pairs returned for {}", pair))
    }
}

#[async_trait]
impl MarketSource for DexScreenerClient {
    async fn snapshot(&self, pair: Address) -> Option<MarketSnapshot> {
        match self.fetch(pair).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(target: "MARKET", "Snapshot for {} unavailable: {}", pair, e);
                None
            }
        }
    }
}

/// Parse a pairs response; the first pair wins
fn parse_snapshot(body: &str) -> Result<Option<MarketSnapshot>> {
    let data: PairsResponse = serde_json::from_str(body)?;

    Ok(data
        .pairs
        .and_then(|pairs| pairs.into_iter().next())
        .map(|p| MarketSnapshot {
            price_usd: p.price_usd,
            fully_diluted_value: p.fdv,
            liquidity_usd: p.liquidity.and_then(|l| l.usd),
        }))
}
