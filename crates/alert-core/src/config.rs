//! 설정 관리.
//!
//! 애플리케이션 설정을 정의하고 파일/환경 변수에서 로드합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreResult;

/// 환경 변수 오버라이드 접두사 (`ALERT__WEBHOOK__DEFAULT_MESSAGE` 형식).
const ENV_PREFIX: &str = "ALERT";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 웹훅 수신 설정
    pub webhook: WebhookConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 웹훅 수신 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 웹훅 엔드포인트 경로 접두사
    pub endpoint_prefix: String,
    /// 페이로드에 `msg`가 없을 때 사용할 알림 메시지
    pub default_message: String,
    /// 시크릿 키(`key`) 없는 페이로드 거부 여부
    pub require_secret: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_prefix: "/webhook/".to_string(),
            default_message: "Webhook Alert".to_string(),
            require_secret: false,
        }
    }
}

impl WebhookConfig {
    /// 엔드포인트 세그먼트로 전체 웹훅 경로를 만듭니다.
    pub fn endpoint_path(&self, segment: &str) -> String {
        format!("{}{}", self.endpoint_prefix, segment.trim_start_matches('/'))
    }
}

impl AppConfig {
    fn builder() -> CoreResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = WebhookConfig::default();
        let builder = config::Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("webhook.endpoint_prefix", defaults.endpoint_prefix)?
            .set_default("webhook.default_message", defaults.default_message)?
            .set_default("webhook.require_secret", defaults.require_secret)?;
        Ok(builder)
    }

    fn env_source() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let config = Self::builder()?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(Self::env_source())
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        tracing::debug!(path = %path.as_ref().display(), "설정 로드 완료");
        Ok(app_config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }

    /// `.env`와 환경 변수만으로 설정을 로드합니다.
    pub fn from_env() -> CoreResult<Self> {
        let _ = dotenvy::dotenv();

        let config = Self::builder()?.add_source(Self::env_source()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// TOML 문자열에서 설정을 로드합니다. 환경 변수는 적용하지 않습니다.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        let config = Self::builder()?
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
