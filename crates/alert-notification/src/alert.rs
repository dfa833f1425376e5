//! 웹훅 알림 수신 타입.
//!
//! 외부(TradingView 등)에서 들어온 알림 페이로드, 웹훅 정의, 알림/전송 상태를
//! 정의합니다.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use alert_core::WebhookConfig;

use crate::types::{ChannelKind, NotificationError, NotificationResult, VariableSet, VariableValue};

/// 페이로드의 시크릿 키 필드. 템플릿 변수로 노출되지 않습니다.
pub const SECRET_KEY_FIELD: &str = "key";

/// 페이로드의 자유 형식 메시지 필드.
pub const MESSAGE_FIELD: &str = "msg";

/// 알림 수신용 웹훅.
#[derive(Debug)]
pub struct Webhook {
    /// 웹훅 ID
    pub id: String,
    /// 전체 엔드포인트 경로 (예: `/webhook/abc123`)
    pub endpoint: String,
    /// 페이로드 `key` 필드와 비교할 시크릿
    pub secret_key: Option<SecretString>,
    /// 활성화 여부
    pub is_active: bool,
    /// 알림을 받을 채널 연결
    pub channels: Vec<ChannelLink>,
}

/// 웹훅과 알림 채널의 연결.
///
/// 연결마다 활성화 여부가 있어, 채널 자체를 끄지 않고도 특정 웹훅의 알림만
/// 받지 않도록 할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLink {
    pub channel_id: String,
    pub is_active: bool,
}

impl ChannelLink {
    /// 새 활성 연결을 생성합니다.
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            is_active: true,
        }
    }

    /// 활성화 여부를 설정합니다.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

impl Webhook {
    /// 새 활성 웹훅을 생성합니다.
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            secret_key: None,
            is_active: true,
            channels: Vec::new(),
        }
    }

    /// 시크릿 키를 설정합니다.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret: String = secret.into();
        self.secret_key = Some(SecretString::new(secret.into()));
        self
    }

    /// 활성화 여부를 설정합니다.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// 채널 연결을 추가합니다. 같은 채널이 이미 연결돼 있으면 교체합니다.
    pub fn with_channel(mut self, link: ChannelLink) -> Self {
        self.channels.retain(|l| l.channel_id != link.channel_id);
        self.channels.push(link);
        self
    }

    /// 채널 연결을 찾습니다.
    pub fn link(&self, channel_id: &str) -> Option<&ChannelLink> {
        self.channels.iter().find(|l| l.channel_id == channel_id)
    }

    /// 요청 경로 세그먼트가 이 웹훅의 엔드포인트인지 확인합니다.
    pub fn matches_endpoint(&self, segment: &str, config: &WebhookConfig) -> bool {
        self.endpoint == config.endpoint_path(segment)
    }
}

/// 수신된 웹훅 알림.
#[derive(Debug, Clone)]
pub struct WebhookAlert {
    /// 알림 ID
    pub id: String,
    /// 원본 페이로드
    payload: serde_json::Map<String, serde_json::Value>,
    /// 수신 시각
    pub received_at: DateTime<Utc>,
}

impl WebhookAlert {
    /// JSON 페이로드에서 알림을 생성합니다. 페이로드는 객체여야 합니다.
    pub fn from_json(payload: &serde_json::Value) -> NotificationResult<Self> {
        let payload = payload.as_object().cloned().ok_or_else(|| {
            NotificationError::InvalidPayload("alert payload must be a JSON object".to_string())
        })?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            received_at: Utc::now(),
        })
    }

    /// 요청 본문 바이트에서 알림을 생성합니다.
    pub fn from_slice(body: &[u8]) -> NotificationResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        Self::from_json(&value)
    }

    /// 원본 페이로드.
    pub fn payload(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.payload
    }

    /// 원본 페이로드를 JSON 문자열로 반환합니다.
    pub fn raw_data(&self) -> NotificationResult<String> {
        Ok(serde_json::to_string(&self.payload)?)
    }

    fn field(&self, name: &str) -> Option<VariableValue> {
        self.payload
            .get(name)
            .and_then(VariableValue::from_json)
            .filter(|v| !v.is_falsy())
    }

    /// 페이로드의 시크릿 키를 웹훅 시크릿과 비교합니다.
    ///
    /// 키가 없으면 `require_secret`이 false일 때만 통과합니다.
    pub fn verify_secret(&self, expected: Option<&SecretString>, require_secret: bool) -> NotificationResult<()> {
        match (self.field(SECRET_KEY_FIELD), expected) {
            (None, _) if require_secret => Err(NotificationError::InvalidSecret),
            (None, _) => Ok(()),
            (Some(VariableValue::Text(provided)), Some(expected))
                if provided == expected.expose_secret() =>
            {
                Ok(())
            }
            (Some(_), _) => Err(NotificationError::InvalidSecret),
        }
    }

    /// 템플릿 변수. 시크릿 키 필드는 제외됩니다.
    pub fn variables(&self) -> VariableSet {
        self.payload
            .iter()
            .filter(|(k, _)| k.as_str() != SECRET_KEY_FIELD)
            .filter_map(|(k, v)| VariableValue::from_json(v).map(|v| (k.clone(), v)))
            .collect()
    }

    /// 알림 메시지. `msg`가 비어 있으면 `default`를 사용합니다.
    pub fn message(&self, default: &str) -> String {
        self.field(MESSAGE_FIELD)
            .map(|v| v.to_string())
            .unwrap_or_else(|| default.to_string())
    }
}

/// 알림 처리 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// 수신됨
    Received,
    /// 처리 중 (일부 채널만 전송됨)
    Processing,
    /// 모든 채널 전송 완료
    Delivered,
    /// 전송 실패
    Failed,
}

impl AlertStatus {
    /// 채널별 전송 결과로 알림 상태를 계산합니다.
    ///
    /// 모두 성공(전송 대상이 없는 경우 포함)이면 `Delivered`, 일부 성공이면
    /// `Processing`, 모두 실패면 `Failed`.
    pub fn from_deliveries(statuses: &[DeliveryStatus]) -> Self {
        let sent = statuses.iter().filter(|s| **s == DeliveryStatus::Sent).count();
        if sent == statuses.len() {
            AlertStatus::Delivered
        } else if sent > 0 {
            AlertStatus::Processing
        } else {
            AlertStatus::Failed
        }
    }
}

/// 채널 전송 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// 채널별 전송 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub alert_id: String,
    pub channel_id: String,
    pub channel: ChannelKind,
    pub status: DeliveryStatus,
    /// 전송기 응답 또는 에러 메시지
    pub response: Option<String>,
    /// 전송 성공 시각
    pub sent_at: Option<DateTime<Utc>>,
}
