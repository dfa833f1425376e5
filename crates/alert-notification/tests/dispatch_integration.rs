//! 웹훅 알림 수신부터 채널 전송 집계까지의 통합 테스트

use std::sync::Mutex;

use alert_core::WebhookConfig;
use alert_notification::{
    AlertChannel, AlertDispatcher, AlertStatus, ChannelConfig, ChannelKind, ChannelLink,
    DeliveryStatus, MessageSink, NotificationError, NotificationResult, OutboundMessage, Webhook, WebhookAlert,
};
use async_trait::async_trait;
use serde_json::json;

/// 전송된 메시지를 기록하고, 지정한 채널 종류는 실패시키는 테스트용 전송기
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: Vec<ChannelKind>,
}

impl RecordingSink {
    fn failing(kinds: &[ChannelKind]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: kinds.to_vec(),
        }
    }

    fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, channel: &AlertChannel, message: &OutboundMessage) -> NotificationResult<String> {
        if self.failing.contains(&channel.kind()) {
            return Err(NotificationError::SendFailed(format!("{} unavailable", channel.kind())));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(format!("Message sent to {}", channel.name))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn telegram_channel() -> AlertChannel {
    let config = ChannelConfig::parse(
        ChannelKind::Telegram,
        &json!({"botToken": "123:abc", "chatId": "42"}),
    )
    .unwrap();
    AlertChannel::new("telegram", config).with_id("ch-telegram")
}

fn discord_channel() -> AlertChannel {
    let config = ChannelConfig::parse(
        ChannelKind::Discord,
        &json!({"webhookUrl": "https://discord.com/api/webhooks/1/token"}),
    )
    .unwrap();
    AlertChannel::new("discord", config).with_id("ch-discord")
}

fn email_channel() -> AlertChannel {
    let config = ChannelConfig::parse(
        ChannelKind::Email,
        &json!({"smtp": {"host": "smtp.example.com", "port": 465, "secure": true}, "to": "desk@example.com"}),
    )
    .unwrap();
    AlertChannel::new("email", config).with_id("ch-email")
}

fn tradingview_alert() -> WebhookAlert {
    WebhookAlert::from_json(&json!({
        "key": "s3cret",
        "ticker": "BTCUSDT",
        "close": 65000.0,
        "exchange": "Binance",
        "timeframe": "1h",
        "msg": "Breakout above range"
    }))
    .unwrap()
}

fn webhook() -> Webhook {
    Webhook::new("wh-1", "/webhook/abc123")
        .with_secret("s3cret")
        .with_channel(ChannelLink::new("ch-telegram"))
        .with_channel(ChannelLink::new("ch-discord"))
        .with_channel(ChannelLink::new("ch-email"))
}

#[tokio::test]
async fn test_dispatch_all_channels_delivered() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    let channels = vec![
        telegram_channel(),
        discord_channel()
            .with_template("{{ticker}} @ {{close}} ({{exchange}}) {{msg}}")
            .unwrap(),
    ];

    let report = dispatcher
        .dispatch(&webhook(), &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.status, AlertStatus::Delivered);
    assert_eq!(report.sent_count(), 2);
    assert!(report.sent_at.is_some());
    assert_eq!(report.message, "Breakout above range");

    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].text.contains("*Ticker:* BTCUSDT"));
    assert!(sent[0].text.contains("*Price:* $65000"));
    assert!(sent[0].text.contains("*Volume:* N/A"));
    assert_eq!(sent[1].text, "BTCUSDT @ 65000 (Binance) Breakout above range");

    // 시크릿 키는 어떤 메시지에도 노출되지 않음
    assert!(sent.iter().all(|m| !m.text.contains("s3cret")));
}

#[tokio::test]
async fn test_dispatch_partial_failure() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::failing(&[ChannelKind::Email]);
    let channels = vec![telegram_channel(), email_channel()];

    let report = dispatcher
        .dispatch(&webhook(), &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.status, AlertStatus::Processing);
    assert!(report.sent_at.is_none());

    let failed = report
        .deliveries
        .iter()
        .find(|d| d.channel == ChannelKind::Email)
        .unwrap();
    assert_eq!(failed.status, DeliveryStatus::Failed);
    assert!(failed.sent_at.is_none());
    assert!(failed.response.as_deref().unwrap().contains("EMAIL unavailable"));
}

#[tokio::test]
async fn test_dispatch_all_failed() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::failing(&[ChannelKind::Telegram, ChannelKind::Discord]);
    let channels = vec![telegram_channel(), discord_channel()];

    let report = dispatcher
        .dispatch(&webhook(), &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.status, AlertStatus::Failed);
    assert_eq!(report.failed_count(), 2);
}

#[tokio::test]
async fn test_dispatch_skips_inactive_channels() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    let channels = vec![telegram_channel().with_active(false), discord_channel()];

    let report = dispatcher
        .dispatch(&webhook(), &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].channel_id, "ch-discord");
}

#[tokio::test]
async fn test_dispatch_skips_inactive_links() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    // 채널 자체는 활성이지만 이 웹훅과의 연결만 꺼짐
    let webhook = webhook().with_channel(ChannelLink::new("ch-telegram").with_active(false));
    let channels = vec![telegram_channel(), discord_channel()];

    let report = dispatcher
        .dispatch(&webhook, &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.status, AlertStatus::Delivered);
    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].channel_id, "ch-discord");
    assert!(sink.sent().iter().all(|m| m.channel != ChannelKind::Telegram));
}

#[tokio::test]
async fn test_dispatch_ignores_unlinked_channels() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    let webhook = Webhook::new("wh-3", "/webhook/solo")
        .with_secret("s3cret")
        .with_channel(ChannelLink::new("ch-email"))
        .with_channel(ChannelLink::new("ch-deleted"));
    let channels = vec![telegram_channel(), email_channel()];

    let report = dispatcher
        .dispatch(&webhook, &tradingview_alert(), &channels, &sink)
        .await
        .unwrap();

    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].channel, ChannelKind::Email);
}

#[tokio::test]
async fn test_dispatch_rejects_bad_secret() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    let alert = WebhookAlert::from_json(&json!({"key": "guess", "ticker": "BTC"})).unwrap();

    let result = dispatcher
        .dispatch(&webhook(), &alert, &[telegram_channel()], &sink)
        .await;

    assert!(matches!(result, Err(NotificationError::InvalidSecret)));
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_requires_secret_when_configured() {
    let dispatcher = AlertDispatcher::new(WebhookConfig {
        require_secret: true,
        ..WebhookConfig::default()
    });
    let sink = RecordingSink::default();
    let alert = WebhookAlert::from_json(&json!({"ticker": "BTC"})).unwrap();

    let result = dispatcher
        .dispatch(&webhook(), &alert, &[telegram_channel()], &sink)
        .await;
    assert!(matches!(result, Err(NotificationError::InvalidSecret)));
}

#[tokio::test]
async fn test_dispatch_inactive_webhook() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();

    let result = dispatcher
        .dispatch(
            &webhook().with_active(false),
            &tradingview_alert(),
            &[telegram_channel()],
            &sink,
        )
        .await;
    assert!(matches!(result, Err(NotificationError::WebhookInactive(_))));
}

#[tokio::test]
async fn test_default_message_when_msg_missing() {
    let dispatcher = AlertDispatcher::default();
    let sink = RecordingSink::default();
    let alert = WebhookAlert::from_json(&json!({"ticker": "ETH"})).unwrap();

    let report = dispatcher
        .dispatch(&Webhook::new("wh-2", "/webhook/open"), &alert, &[], &sink)
        .await
        .unwrap();

    assert_eq!(report.message, "Webhook Alert");
    // 전송 대상이 없으면 모두 완료된 것으로 간주
    assert_eq!(report.status, AlertStatus::Delivered);
}

#[test]
fn test_resolve_webhook_by_endpoint() {
    let dispatcher = AlertDispatcher::default();
    let webhooks = vec![
        Webhook::new("wh-old", "/webhook/abc123").with_active(false),
        Webhook::new("wh-new", "/webhook/abc123"),
        Webhook::new("wh-other", "/webhook/zzz"),
    ];

    assert_eq!(dispatcher.resolve(&webhooks, "abc123").unwrap().id, "wh-new");
    assert!(matches!(
        dispatcher.resolve(&webhooks, "missing"),
        Err(NotificationError::WebhookInactive(path)) if path == "/webhook/missing"
    ));
}

#[test]
fn test_plan_renders_per_channel() {
    let dispatcher = AlertDispatcher::default();
    let channels = vec![telegram_channel(), discord_channel(), email_channel()];

    let plan = dispatcher.plan(&webhook(), &tradingview_alert(), &channels);
    assert_eq!(plan.len(), 3);
    assert!(plan[1].text.contains("**Ticker:** BTCUSDT"));
    assert!(plan[2].text.contains("Message: Breakout above range"));
    assert!(plan.iter().all(|m| m.alert_id == plan[0].alert_id));

    let unlinked = Webhook::new("wh-2", "/webhook/open");
    assert!(dispatcher.plan(&unlinked, &tradingview_alert(), &channels).is_empty());
}
