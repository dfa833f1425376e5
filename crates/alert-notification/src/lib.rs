//! # Alert Notification
//!
//! 웹훅 알림 템플릿 및 채널 팬아웃.
//!
//! 지원 채널:
//! - Telegram
//! - Discord (webhook)
//! - Slack (webhook)
//! - Email (SMTP)
//! - Twitter
//!
//! # 템플릿 변수
//!
//! 템플릿은 `{{name}}` 플레이스홀더를 사용합니다. 기본 변수(`ticker`, `close`,
//! `open`, `high`, `low`, `volume`, `exchange`, `timeframe`)는 값이 없으면
//! `N/A`로 출력되고, 자유 형식 메시지는 `{{msg}}`로 넣습니다.

pub mod alert;
pub mod channel;
pub mod dispatcher;
pub mod template;
pub mod types;

pub use alert::*;
pub use channel::*;
pub use dispatcher::*;
pub use template::*;
pub use types::*;
