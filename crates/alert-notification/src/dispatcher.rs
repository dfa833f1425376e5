//! 알림 채널 팬아웃.
//!
//! 수신된 웹훅 알림을 검증하고, 웹훅에 연결된 활성 채널마다 템플릿으로 메시지를 렌더링해
//! 전송기([`MessageSink`])에 넘긴 뒤 전송 결과를 집계합니다. 실제 전송
//! (Telegram Bot API, SMTP 등)은 `MessageSink` 구현체의 몫입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use alert_core::WebhookConfig;

use crate::alert::{AlertStatus, DeliveryRecord, DeliveryStatus, Webhook, WebhookAlert};
use crate::channel::AlertChannel;
use crate::types::{ChannelKind, NotificationError, NotificationResult, VariableSet};

/// 채널로 보낼 렌더링된 메시지.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub alert_id: String,
    pub channel_id: String,
    pub channel: ChannelKind,
    pub text: String,
}

/// 메시지 전송기 trait.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 메시지를 채널로 전송하고 응답 설명을 반환합니다.
    async fn deliver(&self, channel: &AlertChannel, message: &OutboundMessage) -> NotificationResult<String>;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}

/// 알림 한 건의 처리 결과.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub alert_id: String,
    /// 알림 메시지 (`msg` 또는 기본 메시지)
    pub message: String,
    pub status: AlertStatus,
    pub deliveries: Vec<DeliveryRecord>,
    /// 모든 채널 전송 완료 시각
    pub sent_at: Option<DateTime<Utc>>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.count(DeliveryStatus::Sent)
    }

    pub fn failed_count(&self) -> usize {
        self.count(DeliveryStatus::Failed)
    }

    fn count(&self, status: DeliveryStatus) -> usize {
        self.deliveries.iter().filter(|d| d.status == status).count()
    }
}

/// 웹훅 알림 디스패처.
#[derive(Debug, Clone, Default)]
pub struct AlertDispatcher {
    config: WebhookConfig,
}

impl AlertDispatcher {
    /// 새 디스패처를 생성합니다.
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// 요청 경로 세그먼트에 해당하는 활성 웹훅을 찾습니다.
    pub fn resolve<'a>(&self, webhooks: &'a [Webhook], segment: &str) -> NotificationResult<&'a Webhook> {
        webhooks
            .iter()
            .find(|w| w.is_active && w.matches_endpoint(segment, &self.config))
            .ok_or_else(|| NotificationError::WebhookInactive(self.config.endpoint_path(segment)))
    }

    /// 웹훅 활성 여부와 시크릿 키를 확인합니다.
    pub fn accept(&self, webhook: &Webhook, alert: &WebhookAlert) -> NotificationResult<()> {
        if !webhook.is_active {
            return Err(NotificationError::WebhookInactive(webhook.endpoint.clone()));
        }

        alert
            .verify_secret(webhook.secret_key.as_ref(), self.config.require_secret)
            .inspect_err(|_| {
                warn!(webhook_id = %webhook.id, alert_id = %alert.id, "Invalid secret key");
            })
    }

    fn outbound(alert: &WebhookAlert, channel: &AlertChannel, variables: &VariableSet) -> OutboundMessage {
        OutboundMessage {
            alert_id: alert.id.clone(),
            channel_id: channel.id.clone(),
            channel: channel.kind(),
            text: channel.render(variables),
        }
    }

    /// 웹훅에 연결된 채널 중 전송 대상을 연결 순서대로 반환합니다.
    ///
    /// 연결과 채널이 모두 활성이어야 하며, 목록에 없는 채널 연결은 건너뜁니다.
    fn linked_channels<'a>(
        webhook: &'a Webhook,
        channels: &'a [AlertChannel],
    ) -> impl Iterator<Item = &'a AlertChannel> + 'a {
        webhook.channels.iter().filter_map(move |link| {
            if !link.is_active {
                debug!(webhook_id = %webhook.id, channel_id = %link.channel_id, "비활성 채널 연결 건너뜀");
                return None;
            }
            match channels.iter().find(|channel| channel.id == link.channel_id) {
                Some(channel) if channel.is_active => Some(channel),
                Some(channel) => {
                    debug!(channel_id = %channel.id, "비활성 채널 건너뜀");
                    None
                }
                None => {
                    debug!(webhook_id = %webhook.id, channel_id = %link.channel_id, "연결된 채널 없음");
                    None
                }
            }
        })
    }

    /// 웹훅에 연결된 활성 채널마다 메시지를 렌더링합니다.
    pub fn plan(&self, webhook: &Webhook, alert: &WebhookAlert, channels: &[AlertChannel]) -> Vec<OutboundMessage> {
        let variables = alert.variables();
        Self::linked_channels(webhook, channels)
            .map(|channel| Self::outbound(alert, channel, &variables))
            .collect()
    }

    /// 알림을 검증하고 웹훅에 연결된 활성 채널로 전송한 뒤 결과를 집계합니다.
    ///
    /// 개별 채널 전송 실패는 에러가 아니라 `Failed` 전송 기록으로 남습니다.
    pub async fn dispatch(
        &self,
        webhook: &Webhook,
        alert: &WebhookAlert,
        channels: &[AlertChannel],
        sink: &dyn MessageSink,
    ) -> NotificationResult<DispatchReport> {
        self.accept(webhook, alert)?;

        let message = alert.message(&self.config.default_message);
        let variables = alert.variables();
        let mut deliveries = Vec::new();

        for channel in Self::linked_channels(webhook, channels) {
            let outbound = Self::outbound(alert, channel, &variables);

            let (status, response, sent_at) = match sink.deliver(channel, &outbound).await {
                Ok(response) => {
                    debug!(channel_id = %channel.id, sink = sink.name(), "알림 전송 완료");
                    (DeliveryStatus::Sent, Some(response), Some(Utc::now()))
                }
                Err(e) => {
                    warn!(
                        channel_id = %channel.id,
                        channel = %outbound.channel,
                        sink = sink.name(),
                        error = %e,
                        "Failed to send alert"
                    );
                    (DeliveryStatus::Failed, Some(e.to_string()), None)
                }
            };

            deliveries.push(DeliveryRecord {
                alert_id: alert.id.clone(),
                channel_id: outbound.channel_id,
                channel: outbound.channel,
                status,
                response,
                sent_at,
            });
        }

        let statuses: Vec<DeliveryStatus> = deliveries.iter().map(|d| d.status).collect();
        let status = AlertStatus::from_deliveries(&statuses);
        let sent_at = (status == AlertStatus::Delivered).then(Utc::now);

        let report = DispatchReport {
            alert_id: alert.id.clone(),
            message,
            status,
            deliveries,
            sent_at,
        };

        info!(
            webhook_id = %webhook.id,
            alert_id = %report.alert_id,
            status = ?report.status,
            sent = report.sent_count(),
            failed = report.failed_count(),
            "Alert processed"
        );

        Ok(report)
    }
}
