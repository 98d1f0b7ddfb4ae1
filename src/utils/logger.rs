//! Logging setup for LP Rugwatch

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets of the per-transfer watcher logs
const WATCHER_TARGETS: [&str; 2] = ["LP_WATCHER", "NFT_WATCHER"];

/// Used when `RUST_LOG` is unset. Watcher targets run at debug so every
/// transfer is logged with its tx hash and log index.
fn default_directives() -> String {
    let mut directives = vec!["info".to_string(), "lp_rugwatch=debug".to_string()];
    directives.extend(WATCHER_TARGETS.iter().map(|t| format!("{}=debug", t)));
    directives.join(",")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()))
}

/// Initialize the tracing logger with colored output
pub fn init_logger() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true),
        )
        .init();
}

#[macro_export]
macro_rules! log_success {
    ($module:expr, $($arg:tt)*) => {
        tracing::info!(target: $module, "✅ {}", format!($($arg)*))
    };
}

/// Critical rug alert line, independent of the alert channel
#[macro_export]
macro_rules! log_rug {
    ($($arg:tt)*) => {
        tracing::error!(target: "RUG_ALERT", "🚨 {}", format!($($arg)*))
    };
}
