//! 알림 메시지 템플릿 엔진.
//!
//! `{{name}}` 형식의 플레이스홀더를 알림 변수로 치환하고, 채널별 기본
//! 템플릿과 템플릿 문법 검증을 제공합니다. 모든 함수는 순수 함수이며
//! 어떤 입력에도 실패하지 않습니다.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{ChannelKind, NotificationError, NotificationResult, VariableSet, KNOWN_KEYS};

/// 기본 변수에 값이 없을 때 출력되는 문자열.
pub const NOT_AVAILABLE: &str = "N/A";

/// 플레이스홀더 이름은 영문자, 숫자, 밑줄만 허용.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap_or_else(|_| unreachable!()));

/// 닫는 괄호 없이 입력 끝까지 이어지는 `{{`.
static DANGLING_OPENER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]*$").unwrap_or_else(|_| unreachable!()));

const TELEGRAM_TEMPLATE: &str = "📈 *Alert*

*Ticker:* {{ticker}}
*Price:* ${{close}}
*Open:* {{open}}
*High:* {{high}}
*Low:* {{low}}
*Volume:* {{volume}}
*Exchange:* {{exchange}}
*Timeframe:* {{timeframe}}

{{msg}}";

const DISCORD_TEMPLATE: &str = "📈 **Alert**

**Ticker:** {{ticker}}
**Price:** ${{close}}
**Open:** {{open}}
**High:** {{high}}
**Low:** {{low}}
**Volume:** {{volume}}
**Exchange:** {{exchange}}
**Timeframe:** {{timeframe}}

{{msg}}";

// Slack mrkdwn은 단일 별표가 굵게
const SLACK_TEMPLATE: &str = "📈 *Alert*

*Ticker:* {{ticker}}
*Price:* ${{close}}
*Open:* {{open}}
*High:* {{high}}
*Low:* {{low}}
*Volume:* {{volume}}
*Exchange:* {{exchange}}
*Timeframe:* {{timeframe}}

{{msg}}";

const EMAIL_TEMPLATE: &str = "Alert

Ticker: {{ticker}}
Price: ${{close}}
Open: {{open}}
High: {{high}}
Low: {{low}}
Volume: {{volume}}
Exchange: {{exchange}}
Timeframe: {{timeframe}}

Message: {{msg}}";

const TWITTER_TEMPLATE: &str = "📈 Alert: {{ticker}} at ${{close}} on {{exchange}} ({{timeframe}}) O {{open}} H {{high}} L {{low}} V {{volume}} {{msg}}";

/// 템플릿 검증 문제 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum TemplateIssue {
    #[serde(rename = "Template cannot be empty")]
    #[error("Template cannot be empty")]
    EmptyTemplate,

    #[serde(rename = "Malformed variable syntax found")]
    #[error("Malformed variable syntax found")]
    MalformedSyntax,

    #[serde(rename = "Unbalanced variable braces")]
    #[error("Unbalanced variable braces")]
    UnbalancedBraces,
}

/// 템플릿 검증 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValidation {
    /// 문제가 하나도 없으면 true
    pub valid: bool,
    /// 발견된 모든 문제
    pub errors: Vec<TemplateIssue>,
}

impl TemplateValidation {
    fn from_issues(errors: Vec<TemplateIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// 사용자에게 보여줄 에러 메시지 목록.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

fn is_known_key(name: &str) -> bool {
    KNOWN_KEYS.contains(&name)
}

/// 템플릿의 플레이스홀더를 변수 값으로 치환합니다.
///
/// 1. 변수 집합의 모든 키(이름 오름차순)에 대해 `{{key}}`를 값으로 치환합니다.
///    기본 변수(`KNOWN_KEYS`)의 빈 값(0, 빈 문자열, `false`)은 값 없음으로 봅니다.
/// 2. 남아 있는 기본 변수 플레이스홀더는 모두 `N/A`가 됩니다.
///
/// 값이 없는 그 외 플레이스홀더는 그대로 남습니다.
pub fn substitute(template: &str, variables: &VariableSet) -> String {
    let mut rendered = template.to_string();

    for (key, value) in variables.iter() {
        if is_known_key(key) && value.is_falsy() {
            continue;
        }
        let token = placeholder(key);
        if rendered.contains(&token) {
            rendered = rendered.replace(&token, &value.to_string());
        }
    }

    for key in KNOWN_KEYS {
        let token = placeholder(key);
        if rendered.contains(&token) {
            rendered = rendered.replace(&token, NOT_AVAILABLE);
        }
    }

    rendered
}

/// 템플릿에 사용된 변수 이름을 중복 없이 추출합니다.
pub fn extract_variables(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 채널 종류별 기본 템플릿.
pub fn default_template(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Telegram => TELEGRAM_TEMPLATE,
        ChannelKind::Discord => DISCORD_TEMPLATE,
        ChannelKind::Slack => SLACK_TEMPLATE,
        ChannelKind::Email => EMAIL_TEMPLATE,
        ChannelKind::Twitter => TWITTER_TEMPLATE,
    }
}

/// 채널 종류 이름으로 기본 템플릿을 조회합니다.
///
/// 이름은 `DISCORD`처럼 정확히 일치해야 하며, 그 외(대소문자/공백 차이 포함)는
/// 텔레그램 템플릿을 반환합니다.
pub fn default_template_for(channel_type: &str) -> &'static str {
    ChannelKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == channel_type)
        .map(default_template)
        .unwrap_or(TELEGRAM_TEMPLATE)
}

/// 템플릿 문법을 검증하고 발견된 모든 문제를 보고합니다.
pub fn validate(template: &str) -> TemplateValidation {
    let mut errors = Vec::new();

    if template.trim().is_empty() {
        errors.push(TemplateIssue::EmptyTemplate);
    }

    if DANGLING_OPENER_REGEX.is_match(template) {
        errors.push(TemplateIssue::MalformedSyntax);
    }

    let opens = template.matches("{{").count();
    let closes = template.matches("}}").count();
    if opens != closes {
        errors.push(TemplateIssue::UnbalancedBraces);
    }

    TemplateValidation::from_issues(errors)
}

/// 검증에 실패한 템플릿을 에러로 반환합니다. 템플릿 저장 전에 사용합니다.
pub fn ensure_valid(template: &str) -> NotificationResult<()> {
    let validation = validate(template);
    if validation.valid {
        Ok(())
    } else {
        Err(NotificationError::InvalidTemplate(validation.errors))
    }
}
