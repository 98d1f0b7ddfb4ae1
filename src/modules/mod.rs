//! LP Rugwatch monitoring modules

pub mod dump_rules;
pub mod lp_share_watcher;
pub mod position_nft_watcher;
pub mod status;
pub mod supply_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use lp_share_watcher::LpShareWatcher;
pub use position_nft_watcher::PositionNftWatcher;
