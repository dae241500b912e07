//! 访问门面
//!
//! 同一赞助实体有两个入口：
//! - 管理端（`AdminFacade`）：管理员或该会议的组织者，可访问会议下全部赞助
//! - 提交者端（`SubmitterFacade`）：任意登录用户，只能访问自己提交的赞助
//!
//! 门面在任何仓储写操作之前完成授权。

use serde::{Deserialize, Serialize};

use crate::error::{Result, SponsorshipError};
use crate::models::{Conference, Sponsorship};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ORGANIZER: &str = "organizer";

/// 当前操作人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
    /// 担任组织者的会议 short_title 列表
    pub conferences: Vec<String>,
}

impl Actor {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// 是否为该会议的组织者
    pub fn organizes(&self, short_title: &str) -> bool {
        self.has_role(ROLE_ORGANIZER) && self.conferences.iter().any(|c| c == short_title)
    }

    /// 管理员或会议组织者
    pub fn manages(&self, conference: &Conference) -> bool {
        self.is_admin() || self.organizes(&conference.short_title)
    }
}

/// 可访问的记录范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// 会议下全部赞助
    All,
    /// 仅该用户提交的赞助
    Submitter(i64),
}

impl AccessScope {
    /// 仓储查询使用的提交者过滤条件
    pub fn submitter_filter(&self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Submitter(user_id) => Some(*user_id),
        }
    }

    pub fn permits(&self, sponsorship: &Sponsorship) -> bool {
        match self {
            Self::All => true,
            Self::Submitter(user_id) => sponsorship.submitter_id == Some(*user_id),
        }
    }
}

/// 授权后的访问上下文
#[derive(Debug, Clone)]
pub struct SponsorshipAccess {
    pub conference: Conference,
    pub scope: AccessScope,
    pub actor_id: i64,
    /// 提示语中的名词，"Sponsor" 或 "Sponsorship"
    pub noun: &'static str,
    /// 新建记录写入的 submitter_id
    pub new_submitter: Option<i64>,
    /// 列表与新建表单是否要求会议已配置赞助等级
    pub requires_levels: bool,
}

impl SponsorshipAccess {
    pub fn noun_lower(&self) -> String {
        self.noun.to_lowercase()
    }

    pub fn whodunnit(&self) -> String {
        self.actor_id.to_string()
    }

    /// 超出范围的记录返回 Forbidden
    pub fn ensure_permits(&self, sponsorship: &Sponsorship) -> Result<()> {
        if self.scope.permits(sponsorship) {
            Ok(())
        } else {
            Err(SponsorshipError::Forbidden(format!(
                "{} {} is not accessible",
                self.noun, sponsorship.id
            )))
        }
    }
}

/// 访问门面
pub trait AccessFacade: Send + Sync + 'static {
    const NOUN: &'static str;

    const REQUIRES_LEVELS: bool;

    /// 校验操作人能否访问该会议，返回可访问范围
    fn authorize(actor: &Actor, conference: &Conference) -> Result<AccessScope>;

    /// 新建记录的提交者
    fn submitter_for_new(actor: &Actor) -> Option<i64>;

    /// 授权并构建访问上下文
    fn access(actor: &Actor, conference: Conference) -> Result<SponsorshipAccess> {
        let scope = Self::authorize(actor, &conference)?;
        Ok(SponsorshipAccess {
            conference,
            scope,
            actor_id: actor.user_id,
            noun: Self::NOUN,
            new_submitter: Self::submitter_for_new(actor),
            requires_levels: Self::REQUIRES_LEVELS,
        })
    }
}

/// 管理端门面
pub struct AdminFacade;

impl AccessFacade for AdminFacade {
    const NOUN: &'static str = "Sponsor";
    const REQUIRES_LEVELS: bool = true;

    fn authorize(actor: &Actor, conference: &Conference) -> Result<AccessScope> {
        if actor.manages(conference) {
            Ok(AccessScope::All)
        } else {
            Err(SponsorshipError::Forbidden(format!(
                "user {} cannot manage sponsors of {}",
                actor.user_id, conference.short_title
            )))
        }
    }

    fn submitter_for_new(_actor: &Actor) -> Option<i64> {
        None
    }
}

/// 提交者端门面
pub struct SubmitterFacade;

impl AccessFacade for SubmitterFacade {
    const NOUN: &'static str = "Sponsorship";
    const REQUIRES_LEVELS: bool = false;

    fn authorize(actor: &Actor, conference: &Conference) -> Result<AccessScope> {
        if actor.manages(conference) {
            Ok(AccessScope::All)
        } else {
            Ok(AccessScope::Submitter(actor.user_id))
        }
    }

    fn submitter_for_new(actor: &Actor) -> Option<i64> {
        Some(actor.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conference() -> Conference {
        Conference {
            id: 1,
            short_title: "osc24".to_string(),
            title: "Open Source Conference".to_string(),
        }
    }

    fn actor(user_id: i64, roles: &[&str], conferences: &[&str]) -> Actor {
        Actor {
            user_id,
            username: format!("user{user_id}"),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            conferences: conferences.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_admin_facade_authorization() {
        let conference = conference();
        let cases = [
            (actor(1, &["admin"], &[]), true),
            (actor(2, &["organizer"], &["osc24"]), true),
            (actor(3, &["organizer"], &["other"]), false),
            (actor(4, &[], &["osc24"]), false),
            (actor(5, &["user"], &[]), false),
        ];

        for (actor, allowed) in cases {
            let result = AdminFacade::authorize(&actor, &conference);
            assert_eq!(result.is_ok(), allowed, "actor {}", actor.user_id);
            if let Ok(scope) = result {
                assert_eq!(scope, AccessScope::All);
            }
        }
    }

    #[test]
    fn test_submitter_facade_scope() {
        let conference = conference();

        let scope = SubmitterFacade::authorize(&actor(9, &[], &[]), &conference).unwrap();
        assert_eq!(scope, AccessScope::Submitter(9));

        let scope =
            SubmitterFacade::authorize(&actor(2, &["organizer"], &["osc24"]), &conference).unwrap();
        assert_eq!(scope, AccessScope::All);
    }

    #[test]
    fn test_scope_permits_own_rows_only() {
        let access = SubmitterFacade::access(&actor(9, &[], &[]), conference()).unwrap();
        assert_eq!(access.noun, "Sponsorship");
        assert_eq!(access.new_submitter, Some(9));

        let own = Sponsorship::draft(1, Some(9));
        let foreign = Sponsorship::draft(1, Some(10));
        let anonymous = Sponsorship::draft(1, None);

        assert!(access.ensure_permits(&own).is_ok());
        assert!(matches!(
            access.ensure_permits(&foreign),
            Err(SponsorshipError::Forbidden(_))
        ));
        assert!(access.ensure_permits(&anonymous).is_err());
    }

    #[test]
    fn test_admin_access_context() {
        let access = AdminFacade::access(&actor(1, &["admin"], &[]), conference()).unwrap();
        assert_eq!(access.noun_lower(), "sponsor");
        assert!(access.new_submitter.is_none());
        assert!(access.requires_levels);
        assert_eq!(access.whodunnit(), "1");
    }
}
