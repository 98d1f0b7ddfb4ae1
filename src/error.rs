//! Watcher error classification

use thiserror::Error;

use crate::utils::chain::ChainError;

/// Errors surfaced by the watchers.
///
/// `Startup` errors happen before a watcher has a live filter and are fatal.
/// `Iteration` errors happen inside the poll loop; they are logged and the
/// loop carries on at the next tick.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("{watcher} failed to start: {source}")]
    Startup {
        watcher: &'static str,
        #[source]
        source: ChainError,
    },

    #[error("{watcher} poll iteration failed: {source}")]
    Iteration {
        watcher: &'static str,
        #[source]
        source: ChainError,
    },
}

impl WatchError {
    pub fn startup(watcher: &'static str) -> impl FnOnce(ChainError) -> Self {
        move |source| WatchError::Startup { watcher, source }
    }

    pub fn iteration(watcher: &'static str) -> impl FnOnce(ChainError) -> Self {
        move |source| WatchError::Iteration { watcher, source }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::Startup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn only_startup_errors_are_fatal() {
        let startup = WatchError::startup("lp_share")(ChainError::Transport(
            TransportErrorKind::custom_str("refused"),
        ));
        let iteration = WatchError::iteration("lp_share")(ChainError::Transport(
            TransportErrorKind::custom_str("filter not found"),
        ));

        assert!(startup.is_fatal());
        assert!(!iteration.is_fatal());
        assert!(iteration.to_string().starts_with("lp_share poll iteration failed"));
    }
}
