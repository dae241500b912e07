//! JWT Token 处理
//!
//! 提供 JWT Token 的验证功能，签发仅用于测试和运维工具

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sponsor_shared::config::AuthConfig;
use sponsorship_core::Actor;

use crate::error::AdminError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expires_in_secs: config.expires_in_secs,
            issuer: config.issuer.clone(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 用户名
    pub username: String,
    /// 显示名称
    pub display_name: Option<String>,
    /// 角色列表
    pub roles: Vec<String>,
    /// 担任组织者的会议 short_title 列表
    #[serde(default)]
    pub conferences: Vec<String>,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 转换为业务层的操作人
    pub fn actor(&self) -> Result<Actor, AdminError> {
        let user_id = self
            .sub
            .parse()
            .map_err(|_| AdminError::Unauthorized("invalid subject".to_string()))?;

        Ok(Actor {
            user_id,
            username: self.username.clone(),
            roles: self.roles.clone(),
            conferences: self.conferences.clone(),
        })
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT Token
    pub fn generate_token(
        &self,
        user_id: i64,
        username: &str,
        display_name: Option<&str>,
        roles: Vec<String>,
        conferences: Vec<String>,
    ) -> Result<(String, i64), AdminError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            display_name: display_name.map(|s| s.to_string()),
            roles,
            conferences,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AdminError::Internal(format!("JWT encoding failed: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    ///
    /// 返回解析后的 Claims，如果 Token 无效或过期则返回错误
    pub fn verify_token(&self, token: &str) -> Result<Claims, AdminError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AdminError::Unauthorized("token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AdminError::Unauthorized("invalid token".to_string())
                }
                _ => AdminError::Unauthorized(format!("token verification failed: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, _exp) = manager
            .generate_token(
                42,
                "organizer",
                Some("Olga Organizer"),
                vec!["organizer".to_string()],
                vec!["osc24".to_string()],
            )
            .unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.conferences, vec!["osc24"]);

        let actor = claims.actor().unwrap();
        assert_eq!(actor.user_id, 42);
        assert!(actor.organizes("osc24"));
        assert!(!actor.is_admin());
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_token_from_other_issuer_rejected() {
        let other = JwtManager::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..JwtConfig::default()
        });
        let (token, _) = other
            .generate_token(1, "admin", None, vec!["admin".to_string()], vec![])
            .unwrap();

        let manager = JwtManager::new(JwtConfig::default());
        assert!(matches!(
            manager.verify_token(&token),
            Err(AdminError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let claims = Claims {
            sub: "abc".to_string(),
            username: "x".to_string(),
            display_name: None,
            roles: vec![],
            conferences: vec![],
            iat: 0,
            exp: 0,
            iss: "conference-platform".to_string(),
        };
        assert!(claims.actor().is_err());
    }
}
