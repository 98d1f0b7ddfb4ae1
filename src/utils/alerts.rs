//! Alert formatting and delivery (Telegram, or log-only)

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::utils::MetricsService;

const HISTORY_LIMIT: usize = 1000;

/// Alert categories raised by the watchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCategory {
    LpMint,
    LpBurn,
    DevDump,
    DevNftMove,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::LpMint => "LP_MINT",
            AlertCategory::LpBurn => "LP_BURN",
            AlertCategory::DevDump => "DEV_DUMP",
            AlertCategory::DevNftMove => "DEV_NFT_MOVE",
        }
    }

    fn headline(&self) -> &'static str {
        match self {
            AlertCategory::LpMint => "🔥 LP MINT detected",
            AlertCategory::LpBurn => "🔥 LP BURN detected",
            AlertCategory::DevDump => "🚨 DEV LP DUMP",
            AlertCategory::DevNftMove => "🚨 DEV moved V3 LP NFT",
        }
    }
}

/// A categorized alert with free-text detail
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub category: AlertCategory,
    pub detail: String,
}

impl AlertEvent {
    pub fn new(category: AlertCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    /// Human-readable message sent to the operator
    pub fn text(&self) -> String {
        if self.detail.is_empty() {
            self.category.headline().to_string()
        } else {
            format!("{}\n{}", self.category.headline(), self.detail)
        }
    }
}

/// Alert history record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    pub delivered: bool,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Operator notification channel
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), AlertError>;
}

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API channel
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    /// Every request is bounded by `timeout` so a hung connection cannot
    /// stall the watcher awaiting delivery.
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(target: "ALERTS", "Telegram bot initialized");

        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            bot_token,
            chat_id,
        })
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let params = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self.client.post(&url).json(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Channel used when no Telegram credentials are configured
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        info!(target: "ALERTS", "(log-only) {}", text.replace('\n', " | "));
        Ok(())
    }
}

/// Formats alerts, delivers them through a channel and keeps a bounded history
pub struct AlertDispatcher {
    channel: Arc<dyn AlertChannel>,
    metrics: Arc<MetricsService>,
    alert_history: RwLock<VecDeque<Alert>>,
    alert_sender: broadcast::Sender<Alert>,
    next_id: AtomicI64,
}

impl AlertDispatcher {
    pub fn new(channel: Arc<dyn AlertChannel>, metrics: Arc<MetricsService>) -> Self {
        let (alert_sender, _) = broadcast::channel(HISTORY_LIMIT);

        Self {
            channel,
            metrics,
            alert_history: RwLock::new(VecDeque::with_capacity(HISTORY_LIMIT)),
            alert_sender,
            next_id: AtomicI64::new(1),
        }
    }

    /// Subscribe to dispatched alerts
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.alert_sender.subscribe()
    }

    /// Dispatch a categorized alert. Returns whether the channel accepted it.
    pub async fn dispatch(&self, event: &AlertEvent) -> bool {
        if matches!(event.category, AlertCategory::DevDump | AlertCategory::DevNftMove) {
            crate::log_rug!("{}", event.text().replace('\n', " | "));
        }
        self.deliver(event.category.as_str(), event.text()).await
    }

    /// Higher-urgency exit signal that follows a dev dump or NFT move
    pub async fn auto_exit(&self, reason: &str) -> bool {
        let text = format!("🛑 AUTO-EXIT SIGNAL\nReason: {}\nTake action immediately!", reason);
        self.deliver("AUTO_EXIT", text).await
    }

    pub async fn announce_startup(&self) -> bool {
        self.deliver("STATUS", "🧪 Bot online & monitoring started".to_string())
            .await
    }

    async fn deliver(&self, kind: &str, text: String) -> bool {
        let delivered = match self.channel.send(&text).await {
            Ok(()) => {
                info!(target: "ALERTS", "[{}] {}", kind, text.replace('\n', " | "));
                true
            }
            Err(e) => {
                error!(target: "ALERTS", "Alert send failed ({}): {}", kind, e);
                false
            }
        };
        self.metrics.record_alert(kind, delivered);

        let alert = Alert {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            alert_type: kind.to_string(),
            message: text,
            delivered,
            timestamp: Utc::now().to_rfc3339(),
        };

        {
            let mut history = self.alert_history.write();
            history.push_front(alert.clone());
            history.truncate(HISTORY_LIMIT);
        }

        let _ = self.alert_sender.send(alert);

        delivered
    }

    /// Get recent alerts, newest first
    pub fn get_recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let history = self.alert_history.read();
        history.iter().take(limit).cloned().collect()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingChannel;
    use super::*;
    use pretty_assertions::assert_eq;

    fn dispatcher(channel: Arc<RecordingChannel>) -> AlertDispatcher {
        AlertDispatcher::new(channel, Arc::new(MetricsService::new().unwrap()))
    }

    /// Telegram channel pointed at a server that accepts but never answers
    async fn silent_telegram() -> TelegramChannel {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        TelegramChannel::new(
            "123:abc".to_string(),
            "-100".to_string(),
            Duration::from_millis(200),
        )
        .unwrap()
        .with_api_base(format!("http://{}", addr))
    }

    #[tokio::test]
    async fn telegram_send_gives_up_on_silent_server() {
        let channel = silent_telegram().await;

        let result = tokio::time::timeout(Duration::from_secs(5), channel.send("hello"))
            .await
            .expect("send must be bounded by the client timeout");

        match result {
            Err(AlertError::Http(e)) => assert!(e.is_timeout(), "{e}"),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_telegram_delivery_is_reported_not_hung() {
        let channel = silent_telegram().await;
        let alerts = AlertDispatcher::new(Arc::new(channel), Arc::new(MetricsService::new().unwrap()));

        let delivered = tokio::time::timeout(
            Duration::from_secs(5),
            alerts.dispatch(&AlertEvent::new(AlertCategory::DevDump, "50.00% of LP supply")),
        )
        .await
        .unwrap();

        assert!(!delivered);
        assert!(!alerts.get_recent_alerts(1)[0].delivered);
    }

    #[test]
    fn text_joins_headline_and_detail() {
        let event = AlertEvent::new(AlertCategory::DevDump, "40.00% of LP supply");
        assert_eq!(event.text(), "🚨 DEV LP DUMP\n40.00% of LP supply");

        let bare = AlertEvent::new(AlertCategory::LpMint, "");
        assert_eq!(bare.text(), "🔥 LP MINT detected");
    }

    #[test]
    fn category_wire_names() {
        assert_eq!(AlertCategory::DevNftMove.as_str(), "DEV_NFT_MOVE");
        assert_eq!(
            serde_json::to_string(&AlertCategory::LpBurn).unwrap(),
            "\"LP_BURN\""
        );
    }

    #[tokio::test]
    async fn dispatch_records_history_newest_first() {
        let channel = Arc::new(RecordingChannel::default());
        let alerts = dispatcher(channel.clone());

        assert!(alerts.dispatch(&AlertEvent::new(AlertCategory::LpBurn, "")).await);
        assert!(alerts.auto_exit("Dev dumped LP").await);

        let recent = alerts.get_recent_alerts(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].alert_type, "AUTO_EXIT");
        assert_eq!(recent[1].alert_type, "LP_BURN");
        assert_eq!(
            channel.messages()[1],
            "🛑 AUTO-EXIT SIGNAL\nReason: Dev dumped LP\nTake action immediately!"
        );
    }

    #[tokio::test]
    async fn failed_delivery_is_reported_not_raised() {
        let channel = Arc::new(RecordingChannel::failing());
        let alerts = dispatcher(channel.clone());

        let delivered = alerts
            .dispatch(&AlertEvent::new(AlertCategory::DevNftMove, ""))
            .await;

        assert!(!delivered);
        assert_eq!(channel.messages().len(), 1);
        assert!(!alerts.get_recent_alerts(1)[0].delivered);
    }

    #[tokio::test]
    async fn subscribers_receive_dispatched_alerts() {
        let alerts = dispatcher(Arc::new(RecordingChannel::default()));
        let mut rx = alerts.subscribe();

        alerts.announce_startup().await;

        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.alert_type, "STATUS");
        assert_eq!(alert.message, "🧪 Bot online & monitoring started");
    }
}
