//! 알림 채널 설정.
//!
//! 채널 종류별 자격증명을 타입으로 표현하고, 대시보드가 저장하는 camelCase
//! JSON 설정을 파싱/검증합니다. 채널 템플릿 저장 시 템플릿 검증을 수행합니다.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use validator::Validate;

use crate::template::{default_template, ensure_valid, substitute};
use crate::types::{ChannelKind, NotificationError, NotificationResult, VariableSet};

const REDACTED: &str = "[REDACTED]";

/// 텔레그램 채널 설정.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// @BotFather에서 받은 봇 토큰
    #[validate(length(min = 1))]
    pub bot_token: String,
    /// 메시지를 보낼 채팅 ID. 대시보드는 숫자로 저장하기도 합니다.
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1))]
    pub chat_id: String,
}

/// 문자열 또는 JSON 숫자를 문자열로 읽습니다.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Discord/Slack 웹훅 채널 설정.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IncomingWebhookConfig {
    /// 웹훅 URL
    #[validate(length(min = 1), url)]
    pub webhook_url: String,
}

/// SMTP 서버 설정.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SmtpConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// TLS 사용 여부
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// 이메일 채널 설정.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailChannelConfig {
    #[validate(nested)]
    pub smtp: SmtpConfig,
    /// 수신 주소
    #[validate(length(min = 1))]
    pub to: String,
    /// 발신 주소
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// 트위터(X) 채널 설정.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TwitterChannelConfig {
    #[validate(length(min = 1))]
    pub api_key: String,
    #[validate(length(min = 1))]
    pub api_secret: String,
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1))]
    pub access_token_secret: String,
}

impl fmt::Debug for TelegramChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramChannelConfig")
            .field("bot_token", &REDACTED)
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl fmt::Debug for IncomingWebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingWebhookConfig")
            .field("webhook_url", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl fmt::Debug for EmailChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailChannelConfig")
            .field("smtp", &self.smtp)
            .field("to", &self.to)
            .field("from", &self.from)
            .finish()
    }
}

impl fmt::Debug for TwitterChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterChannelConfig")
            .field("api_key", &REDACTED)
            .field("api_secret", &REDACTED)
            .field("access_token", &REDACTED)
            .field("access_token_secret", &REDACTED)
            .finish()
    }
}

/// 채널 종류별 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChannelConfig {
    Telegram(TelegramChannelConfig),
    Discord(IncomingWebhookConfig),
    Slack(IncomingWebhookConfig),
    Email(EmailChannelConfig),
    Twitter(TwitterChannelConfig),
}

/// 필수 필드가 없거나 잘못되었을 때의 안내 메시지.
fn requirement_message(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Telegram => "Telegram channels require botToken and chatId",
        ChannelKind::Discord => "Discord channels require webhookUrl",
        ChannelKind::Slack => "Slack channels require webhookUrl",
        ChannelKind::Email => "Email channels require smtp configuration and to address",
        ChannelKind::Twitter => "Twitter channels require API keys and access tokens",
    }
}

fn parse_section<T>(kind: ChannelKind, value: &serde_json::Value) -> NotificationResult<T>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let invalid = || NotificationError::InvalidConfig(requirement_message(kind).to_string());

    let config: T = serde_json::from_value(value.clone()).map_err(|e| {
        debug!(channel = %kind, error = %e, "채널 설정 역직렬화 실패");
        invalid()
    })?;
    config.validate().map_err(|e| {
        debug!(channel = %kind, error = %e, "채널 설정 검증 실패");
        invalid()
    })?;
    Ok(config)
}

impl ChannelConfig {
    /// 채널 종류에 맞게 JSON 설정을 파싱하고 필수 필드를 검증합니다.
    pub fn parse(kind: ChannelKind, value: &serde_json::Value) -> NotificationResult<Self> {
        Ok(match kind {
            ChannelKind::Telegram => ChannelConfig::Telegram(parse_section(kind, value)?),
            ChannelKind::Discord => ChannelConfig::Discord(parse_section(kind, value)?),
            ChannelKind::Slack => ChannelConfig::Slack(parse_section(kind, value)?),
            ChannelKind::Email => ChannelConfig::Email(parse_section(kind, value)?),
            ChannelKind::Twitter => ChannelConfig::Twitter(parse_section(kind, value)?),
        })
    }

    /// 저장된 JSON 문자열 설정을 파싱합니다.
    pub fn from_json_str(kind: ChannelKind, raw: &str) -> NotificationResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|_| NotificationError::InvalidConfig("Invalid JSON configuration".to_string()))?;
        Self::parse(kind, &value)
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Telegram(_) => ChannelKind::Telegram,
            ChannelConfig::Discord(_) => ChannelKind::Discord,
            ChannelConfig::Slack(_) => ChannelKind::Slack,
            ChannelConfig::Email(_) => ChannelKind::Email,
            ChannelConfig::Twitter(_) => ChannelKind::Twitter,
        }
    }

    /// 저장 형식(camelCase JSON)으로 직렬화합니다.
    pub fn to_json_string(&self) -> NotificationResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 알림 채널.
#[derive(Debug, Clone)]
pub struct AlertChannel {
    /// 채널 ID
    pub id: String,
    /// 표시 이름
    pub name: String,
    /// 채널 설정
    pub config: ChannelConfig,
    /// 사용자 정의 템플릿 (없으면 채널 기본 템플릿)
    template: Option<String>,
    /// 활성화 여부
    pub is_active: bool,
}

impl AlertChannel {
    /// 새 활성 채널을 생성합니다.
    pub fn new(name: impl Into<String>, config: ChannelConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            config,
            template: None,
            is_active: true,
        }
    }

    /// 채널 ID를 설정합니다.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 검증된 사용자 템플릿을 설정한 채널을 반환합니다.
    pub fn with_template(mut self, template: impl Into<String>) -> NotificationResult<Self> {
        self.set_template(Some(template.into()))?;
        Ok(self)
    }

    /// 활성화 여부를 설정합니다.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn kind(&self) -> ChannelKind {
        self.config.kind()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// 사용자 템플릿을 저장합니다. `None`이면 기본 템플릿으로 되돌립니다.
    ///
    /// 검증에 실패하면 기존 템플릿은 그대로 유지됩니다.
    pub fn set_template(&mut self, template: Option<String>) -> NotificationResult<()> {
        if let Some(template) = &template {
            ensure_valid(template)?;
        }
        self.template = template;
        Ok(())
    }

    /// 실제로 사용될 템플릿.
    pub fn effective_template(&self) -> &str {
        self.template
            .as_deref()
            .unwrap_or_else(|| default_template(self.kind()))
    }

    /// 알림 변수로 이 채널의 메시지를 렌더링합니다.
    pub fn render(&self, variables: &VariableSet) -> String {
        debug!(
            channel_id = %self.id,
            channel = %self.kind(),
            custom_template = self.template.is_some(),
            "알림 메시지 렌더링"
        );
        substitute(self.effective_template(), variables)
    }
}
