//! 赞助枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};
use std::fmt;

/// 赞助状态
///
/// 没有终态限制：已确认、已取消的记录仍可流转到任意状态
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum SponsorshipState {
    /// 待联系 - 新建记录的初始状态
    #[default]
    ToContact,
    /// 已联系
    Contacted,
    /// 洽谈中（未确认）
    Unconfirmed,
    /// 已确认
    Confirmed,
    /// 已取消
    Canceled,
}

impl SponsorshipState {
    pub const ALL: [SponsorshipState; 5] = [
        Self::ToContact,
        Self::Contacted,
        Self::Unconfirmed,
        Self::Confirmed,
        Self::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToContact => "to_contact",
            Self::Contacted => "contacted",
            Self::Unconfirmed => "unconfirmed",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SponsorshipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态流转操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTransition {
    Confirm,
    Cancel,
    MarkContacted,
    MarkUnconfirmed,
}

impl StateTransition {
    /// 流转后的目标状态，与当前状态无关
    pub fn target(self) -> SponsorshipState {
        match self {
            Self::Confirm => SponsorshipState::Confirmed,
            Self::Cancel => SponsorshipState::Canceled,
            Self::MarkContacted => SponsorshipState::Contacted,
            Self::MarkUnconfirmed => SponsorshipState::Unconfirmed,
        }
    }

    /// 成功提示，`noun` 为 "Sponsor" 或 "Sponsorship"
    pub fn success_message(self, noun: &str) -> String {
        match self {
            Self::Confirm => format!("{noun} successfully confirmed!"),
            Self::Cancel => format!("{noun} successfully canceled"),
            Self::MarkContacted => format!("{noun} successfully contacted"),
            Self::MarkUnconfirmed => {
                format!("{noun} state successfully changed to unconfirmed.")
            }
        }
    }

    /// 失败提示
    pub fn failure_message(self, noun: &str) -> String {
        match self {
            Self::Confirm => format!("{noun} couldn't be confirmed."),
            Self::Cancel => format!("{noun} couldn't be canceled"),
            Self::MarkContacted => format!("{noun} state couldn't be updated to 'contacted'"),
            Self::MarkUnconfirmed => {
                format!("{noun} state couldn't be updated to 'unconfirmed'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SponsorshipState::ToContact).unwrap();
        assert_eq!(json, "\"to_contact\"");

        let state: SponsorshipState = serde_json::from_str("\"unconfirmed\"").unwrap();
        assert_eq!(state, SponsorshipState::Unconfirmed);

        assert!(serde_json::from_str::<SponsorshipState>("\"in_negotiation\"").is_err());
    }

    #[test]
    fn test_state_default_and_display() {
        assert_eq!(SponsorshipState::default(), SponsorshipState::ToContact);
        for state in SponsorshipState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json.trim_matches('"'), state.to_string());
        }
    }

    #[test]
    fn test_transition_targets() {
        assert_eq!(StateTransition::Confirm.target(), SponsorshipState::Confirmed);
        assert_eq!(StateTransition::Cancel.target(), SponsorshipState::Canceled);
        assert_eq!(
            StateTransition::MarkContacted.target(),
            SponsorshipState::Contacted
        );
        assert_eq!(
            StateTransition::MarkUnconfirmed.target(),
            SponsorshipState::Unconfirmed
        );
    }

    #[test]
    fn test_transition_messages() {
        assert_eq!(
            StateTransition::Confirm.success_message("Sponsor"),
            "Sponsor successfully confirmed!"
        );
        assert_eq!(
            StateTransition::MarkUnconfirmed.success_message("Sponsorship"),
            "Sponsorship state successfully changed to unconfirmed."
        );
        assert_eq!(
            StateTransition::MarkContacted.failure_message("Sponsor"),
            "Sponsor state couldn't be updated to 'contacted'"
        );
        assert_eq!(
            StateTransition::Cancel.failure_message("Sponsorship"),
            "Sponsorship couldn't be canceled"
        );
    }
}
