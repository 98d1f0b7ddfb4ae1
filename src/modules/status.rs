//! Shared, read-only view of a watcher's progress for the dashboard

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Watcher statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStats {
    pub is_running: bool,
    pub transfers_seen: u64,
    pub alerts_raised: u64,
    pub iteration_errors: u64,
    pub last_poll: Option<DateTime<Utc>>,
    pub total_supply: Option<String>,
}

/// Counters updated by the watcher task and read by the dashboard
#[derive(Debug, Default)]
pub struct WatcherStatus {
    is_running: AtomicBool,
    transfers_seen: AtomicU64,
    alerts_raised: AtomicU64,
    iteration_errors: AtomicU64,
    last_poll: RwLock<Option<DateTime<Utc>>>,
    total_supply: RwLock<Option<String>>,
}

impl WatcherStatus {
    pub fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn record_poll(&self, transfers: usize) {
        self.transfers_seen
            .fetch_add(transfers as u64, Ordering::SeqCst);
        *self.last_poll.write() = Some(Utc::now());
    }

    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_error(&self) {
        self.iteration_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_total_supply(&self, supply: String) {
        *self.total_supply.write() = Some(supply);
    }

    pub fn get_stats(&self) -> WatcherStats {
        WatcherStats {
            is_running: self.is_running(),
            transfers_seen: self.transfers_seen.load(Ordering::SeqCst),
            alerts_raised: self.alerts_raised.load(Ordering::SeqCst),
            iteration_errors: self.iteration_errors.load(Ordering::SeqCst),
            last_poll: *self.last_poll.read(),
            total_supply: self.total_supply.read().clone(),
        }
    }
}
