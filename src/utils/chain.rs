//! EVM chain access for LP Rugwatch (read-only, no wallet)

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

sol! {
    #[sol(rpc)]
    interface ILiquidityShare {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function totalSupply() external view returns (uint256);
    }

    interface IPositionManager {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

/// Server-side log filter handle returned by `eth_newFilter`
pub type FilterId = U256;

/// Errors from the chain access layer
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),
}

/// Liquidity-pool share (ERC-20) transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityShareTransfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub tx_hash: Option<B256>,
    pub log_index: Option<u64>,
}

/// Position NFT (ERC-721) transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTransfer {
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
    pub tx_hash: Option<B256>,
    pub log_index: Option<u64>,
}

/// Chain operations the watchers depend on
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block number, used as a connectivity check
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// `totalSupply()` of an ERC-20 token
    async fn total_supply(&self, token: Address) -> Result<U256, ChainError>;

    /// Install a `Transfer` log filter on `contract` starting at the latest block
    async fn new_transfer_filter(&self, contract: Address) -> Result<FilterId, ChainError>;

    /// Share transfers that arrived since the previous poll of `filter`
    async fn share_transfers(&self, filter: FilterId) -> Result<Vec<LiquidityShareTransfer>, ChainError>;

    /// Position transfers that arrived since the previous poll of `filter`
    async fn position_transfers(&self, filter: FilterId) -> Result<Vec<PositionTransfer>, ChainError>;
}

/// Chain service backed by alloy providers.
///
/// Calls go over HTTP; filters are installed and polled over the WebSocket
/// endpoint.
pub struct ChainService {
    http: DynProvider,
    ws: DynProvider,
}

impl ChainService {
    /// Connect both providers
    pub async fn connect(config: &Config) -> Result<Self, ChainError> {
        let http = ProviderBuilder::new()
            .connect_http(config.rpc_http_url.clone())
            .erased();

        let ws = ProviderBuilder::new()
            .connect_ws(WsConnect::new(config.rpc_ws_url.as_str()))
            .await?
            .erased();

        info!(target: "CHAIN", "Providers ready (monitor-only mode)");

        Ok(Self { http, ws })
    }

    async fn filter_logs(&self, filter: FilterId) -> Result<Vec<Log>, ChainError> {
        Ok(self.ws.get_filter_changes::<Log>(filter).await?)
    }

    /// Shorten an address for display
    pub fn shorten_address(address: &Address, chars: usize) -> String {
        let full = address.to_string();
        if full.len() <= chars * 2 + 2 {
            return full;
        }
        format!("{}...{}", &full[..chars + 2], &full[full.len() - chars..])
    }
}

#[async_trait]
impl ChainClient for ChainService {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.http.get_block_number().await?)
    }

    async fn total_supply(&self, token: Address) -> Result<U256, ChainError> {
        let contract = ILiquidityShare::new(token, self.http.clone());
        Ok(contract.totalSupply().call().await?)
    }

    async fn new_transfer_filter(&self, contract: Address) -> Result<FilterId, ChainError> {
        let filter = Filter::new()
            .address(contract)
            .event_signature(ILiquidityShare::Transfer::SIGNATURE_HASH)
            .from_block(BlockNumberOrTag::Latest);

        Ok(self.ws.new_filter(&filter).await?)
    }

    async fn share_transfers(&self, filter: FilterId) -> Result<Vec<LiquidityShareTransfer>, ChainError> {
        let logs = self.filter_logs(filter).await?;
        Ok(logs.iter().filter_map(decode_share_transfer).collect())
    }

    async fn position_transfers(&self, filter: FilterId) -> Result<Vec<PositionTransfer>, ChainError> {
        let logs = self.filter_logs(filter).await?;
        Ok(logs.iter().filter_map(decode_position_transfer).collect())
    }
}

/// Decode an ERC-20 `Transfer` log; undecodable logs are skipped
pub fn decode_share_transfer(log: &Log) -> Option<LiquidityShareTransfer> {
    match ILiquidityShare::Transfer::decode_log_data(log.data()) {
        Ok(event) => Some(LiquidityShareTransfer {
            from: event.from,
            to: event.to,
            amount: event.value,
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
        }),
        Err(e) => {
            warn!(target: "CHAIN", "Skipping undecodable share transfer log: {}", e);
            None
        }
    }
}

/// Decode an ERC-721 `Transfer` log; undecodable logs are skipped
pub fn decode_position_transfer(log: &Log) -> Option<PositionTransfer> {
    match IPositionManager::Transfer::decode_log_data(log.data()) {
        Ok(event) => Some(PositionTransfer {
            from: event.from,
            to: event.to,
            token_id: event.tokenId,
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
        }),
        Err(e) => {
            warn!(target: "CHAIN", "Skipping undecodable position transfer log: {}", e);
            None
        }
    }
}
