//! 알림 채널 종류, 템플릿 변수, 에러 타입 정의.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::template::TemplateIssue;

/// 값이 없을 때 `N/A`로 대체되는 알림 기본 변수.
pub const KNOWN_KEYS: [&str; 8] = [
    "close",
    "open",
    "high",
    "low",
    "volume",
    "ticker",
    "exchange",
    "timeframe",
];

/// 알림 채널 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelKind {
    Telegram,
    Discord,
    Slack,
    Email,
    Twitter,
}

impl ChannelKind {
    /// 지원하는 모든 채널 종류.
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Telegram,
        ChannelKind::Discord,
        ChannelKind::Slack,
        ChannelKind::Email,
        ChannelKind::Twitter,
    ];

    /// 저장 형식 이름 (`TELEGRAM` 등).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "TELEGRAM",
            ChannelKind::Discord => "DISCORD",
            ChannelKind::Slack => "SLACK",
            ChannelKind::Email => "EMAIL",
            ChannelKind::Twitter => "TWITTER",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NotificationError::InvalidConfig(format!("Unknown channel type: {}", s)))
    }
}

/// 템플릿 변수 값.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// 문자열 값
    Text(String),
    /// 숫자 값 (가격, 거래량 등)
    Number(Decimal),
    /// 불리언 값
    Bool(bool),
}

impl VariableValue {
    /// 빈 문자열, 0, `false`는 값이 없는 것으로 취급됩니다.
    pub fn is_falsy(&self) -> bool {
        match self {
            VariableValue::Text(s) => s.is_empty(),
            VariableValue::Number(n) => n.is_zero(),
            VariableValue::Bool(b) => !b,
        }
    }

    /// JSON 값을 변수 값으로 변환합니다. `null`은 값 없음(`None`)입니다.
    ///
    /// 배열/객체는 압축 JSON 문자열로 렌더링됩니다.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(VariableValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                let raw = n.to_string();
                let parsed = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw));
                Some(match parsed {
                    Ok(d) if !renders_as_exponent(&raw, d) => VariableValue::Number(d),
                    _ => VariableValue::Text(exponent_text(&raw)),
                })
            }
            serde_json::Value::String(s) => Some(VariableValue::Text(s.clone())),
            other => Some(VariableValue::Text(other.to_string())),
        }
    }
}

/// 1e-6
const EXPONENT_LOWER: Decimal = Decimal::from_parts(1, 0, 0, false, 6);
/// 1e21
const EXPONENT_UPPER: Decimal = Decimal::from_parts(3_735_027_712, 902_409_669, 54, false, 0);

/// 지수 표기 JSON 숫자 중 JS 문자열 변환도 지수 표기를 쓰는 범위
/// (`|x| < 1e-6` 또는 `|x| >= 1e21`)인지 확인합니다.
fn renders_as_exponent(raw: &str, value: Decimal) -> bool {
    let magnitude = value.abs();
    raw.contains(['e', 'E'])
        && (magnitude >= EXPONENT_UPPER || (!magnitude.is_zero() && magnitude < EXPONENT_LOWER))
}

/// 양수 지수에 부호를 붙입니다 (`1e21` → `1e+21`).
fn exponent_text(raw: &str) -> String {
    match raw.split_once(['e', 'E']) {
        Some((mantissa, exponent)) if !exponent.starts_with(['-', '+']) => {
            format!("{mantissa}e+{exponent}")
        }
        _ => raw.to_string(),
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Text(s) => f.write_str(s),
            // 65000.0 → 65000, 1.50 → 1.5
            VariableValue::Number(n) => write!(f, "{}", n.normalize()),
            VariableValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Text(value)
    }
}

impl From<Decimal> for VariableValue {
    fn from(value: Decimal) -> Self {
        VariableValue::Number(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Number(Decimal::from(value))
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

/// 변수 이름(대소문자 구분) → 값 매핑.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    values: BTreeMap<String, VariableValue>,
}

impl VariableSet {
    /// 빈 변수 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 변수를 추가한 집합을 반환합니다.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// 변수를 추가하거나 덮어씁니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<VariableValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<VariableValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&VariableValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 이름 오름차순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON 객체에서 변수 집합을 만듭니다. `null` 필드는 제외됩니다.
    pub fn from_json(value: &serde_json::Value) -> NotificationResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            NotificationError::InvalidPayload("alert payload must be a JSON object".to_string())
        })?;

        Ok(object
            .iter()
            .filter_map(|(k, v)| VariableValue::from_json(v).map(|v| (k.clone(), v)))
            .collect())
    }
}

impl<K: Into<String>, V: Into<VariableValue>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = VariableSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("잘못된 템플릿: {}", join_issues(.0))]
    InvalidTemplate(Vec<TemplateIssue>),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("잘못된 페이로드: {0}")]
    InvalidPayload(String),

    #[error("Invalid secret key")]
    InvalidSecret,

    #[error("Webhook not found or inactive: {0}")]
    WebhookInactive(String),

    #[error("알림 전송 실패: {0}")]
    SendFailed(String),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_issues(issues: &[TemplateIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
