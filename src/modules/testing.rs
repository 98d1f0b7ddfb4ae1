//! Scripted chain and market doubles for watcher tests

use alloy::primitives::{Address, U256};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::utils::chain::{
    ChainClient, ChainError, FilterId, LiquidityShareTransfer, PositionTransfer,
};
use crate::utils::market::{MarketSnapshot, MarketSource};

fn boom(msg: &str) -> ChainError {
    ChainError::Transport(TransportErrorKind::custom_str(msg))
}

/// One scripted `eth_getFilterChanges` response
pub enum Batch<T> {
    Events(Vec<T>),
    Fail,
}

#[derive(Default)]
pub struct MockChain {
    supply: Mutex<U256>,
    supply_calls: AtomicUsize,
    supply_fails: AtomicBool,
    connect_fails: AtomicBool,
    filters_installed: Mutex<Vec<Address>>,
    share_batches: Mutex<VecDeque<Batch<LiquidityShareTransfer>>>,
    position_batches: Mutex<VecDeque<Batch<PositionTransfer>>>,
}

impl MockChain {
    pub fn with_supply(supply: u64) -> Self {
        let chain = Self::default();
        chain.set_supply(supply);
        chain
    }

    pub fn set_supply(&self, supply: u64) {
        *self.supply.lock() = U256::from(supply);
    }

    pub fn fail_supply(&self, fail: bool) {
        self.supply_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.connect_fails.store(fail, Ordering::SeqCst);
    }

    pub fn supply_calls(&self) -> usize {
        self.supply_calls.load(Ordering::SeqCst)
    }

    pub fn filters_installed(&self) -> Vec<Address> {
        self.filters_installed.lock().clone()
    }

    pub fn push_shares(&self, batch: Batch<LiquidityShareTransfer>) {
        self.share_batches.lock().push_back(batch);
    }

    pub fn push_positions(&self, batch: Batch<PositionTransfer>) {
        self.position_batches.lock().push_back(batch);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        if self.connect_fails.load(Ordering::SeqCst) {
            return Err(boom("connection refused"));
        }
        Ok(1)
    }

    async fn total_supply(&self, _token: Address) -> Result<U256, ChainError> {
        self.supply_calls.fetch_add(1, Ordering::SeqCst);
        if self.supply_fails.load(Ordering::SeqCst) {
            return Err(boom("totalSupply reverted"));
        }
        Ok(*self.supply.lock())
    }

    async fn new_transfer_filter(&self, contract: Address) -> Result<FilterId, ChainError> {
        if self.connect_fails.load(Ordering::SeqCst) {
            return Err(boom("connection refused"));
        }
        let mut installed = self.filters_installed.lock();
        installed.push(contract);
        Ok(U256::from(installed.len()))
    }

    async fn share_transfers(&self, _filter: FilterId) -> Result<Vec<LiquidityShareTransfer>, ChainError> {
        match self.share_batches.lock().pop_front() {
            Some(Batch::Events(events)) => Ok(events),
            Some(Batch::Fail) => Err(boom("filter not found")),
            None => Ok(Vec::new()),
        }
    }

    async fn position_transfers(&self, _filter: FilterId) -> Result<Vec<PositionTransfer>, ChainError> {
        match self.position_batches.lock().pop_front() {
            Some(Batch::Events(events)) => Ok(events),
            Some(Batch::Fail) => Err(boom("filter not found")),
            None => Ok(Vec::new()),
        }
    }
}

/// Market source returning a fixed answer and counting lookups
#[derive(Default)]
pub struct MockMarket {
    pub snapshot: Option<MarketSnapshot>,
    pub lookups: AtomicUsize,
}

impl MockMarket {
    pub fn available() -> Self {
        Self {
            snapshot: Some(MarketSnapshot {
                price_usd: Some("0.0012".to_string()),
                fully_diluted_value: Some(1_200_000.0),
                liquidity_usd: Some(85_000.0),
            }),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSource for MockMarket {
    async fn snapshot(&self, _pair: Address) -> Option<MarketSnapshot> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone()
    }
}
