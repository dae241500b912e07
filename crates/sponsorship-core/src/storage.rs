//! Logo 图片存储
//!
//! 上传分两步：先暂存到 `cache/` 得到令牌，随赞助记录保存时再复制到 `pictures/`。
//! 写入提交后才释放缓存，写入失败时令牌仍可重新提交。
//! 令牌即文件名（uuid + 扩展名），转存前校验格式，防止路径穿越。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, SponsorshipError};
use crate::validation::ValidationFailure;

const CACHE_DIR: &str = "cache";
const PICTURES_DIR: &str = "pictures";

/// 允许的图片类型及对应扩展名
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/svg+xml", "svg"),
    ("image/webp", "webp"),
];

/// 上传的图片
#[derive(Debug, Clone)]
pub struct PictureUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 图片存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PictureStore: Send + Sync {
    /// 暂存上传，返回缓存令牌
    async fn stash(&self, upload: PictureUpload) -> Result<String>;

    /// 将暂存的上传复制为永久引用，缓存保留；令牌未知或已过期时返回 None
    async fn promote(&self, token: &str) -> Result<Option<String>>;

    /// 释放已转存的缓存
    async fn release(&self, token: &str) -> Result<()>;

    /// 删除永久引用对应的文件
    async fn remove(&self, reference: &str) -> Result<()>;
}

/// 本地文件系统图片存储
pub struct LocalPictureStore {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalPictureStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn extension_for(content_type: &str) -> Option<&'static str> {
        let content_type = content_type.split(';').next().unwrap_or("").trim();
        ACCEPTED_TYPES
            .iter()
            .find(|(accepted, _)| accepted.eq_ignore_ascii_case(content_type))
            .map(|(_, ext)| *ext)
    }

    /// 令牌必须是 `{uuid}.{ext}` 形式
    fn is_valid_token(token: &str) -> bool {
        match token.split_once('.') {
            Some((stem, ext)) => {
                Uuid::parse_str(stem).is_ok()
                    && ACCEPTED_TYPES.iter().any(|(_, accepted)| *accepted == ext)
            }
            None => false,
        }
    }

    fn storage_error(action: &str, err: std::io::Error) -> SponsorshipError {
        SponsorshipError::Storage(format!("{action}: {err}"))
    }
}

#[async_trait]
impl PictureStore for LocalPictureStore {
    async fn stash(&self, upload: PictureUpload) -> Result<String> {
        let ext = Self::extension_for(&upload.content_type).ok_or_else(|| {
            SponsorshipError::Invalid(ValidationFailure::single(
                "picture",
                "Picture must be a PNG, JPEG, GIF, SVG or WebP image",
            ))
        })?;

        if upload.bytes.is_empty() {
            return Err(ValidationFailure::single("picture", "Picture can't be blank").into());
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ValidationFailure::single(
                "picture",
                format!("Picture must be smaller than {} bytes", self.max_bytes),
            )
            .into());
        }

        let cache_dir = self.root.join(CACHE_DIR);
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| Self::storage_error("create cache dir", e))?;

        let token = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(cache_dir.join(&token), &upload.bytes)
            .await
            .map_err(|e| Self::storage_error("write upload", e))?;

        debug!(
            token = %token,
            original = %upload.file_name,
            size = upload.bytes.len(),
            "Picture stashed"
        );
        Ok(token)
    }

    async fn promote(&self, token: &str) -> Result<Option<String>> {
        if !Self::is_valid_token(token) {
            warn!(token = %token, "Rejected malformed picture token");
            return Ok(None);
        }

        let cached = self.root.join(CACHE_DIR).join(token);
        if !tokio::fs::try_exists(&cached)
            .await
            .map_err(|e| Self::storage_error("check upload", e))?
        {
            return Ok(None);
        }

        let pictures_dir = self.root.join(PICTURES_DIR);
        tokio::fs::create_dir_all(&pictures_dir)
            .await
            .map_err(|e| Self::storage_error("create pictures dir", e))?;
        tokio::fs::copy(&cached, pictures_dir.join(token))
            .await
            .map_err(|e| Self::storage_error("promote upload", e))?;

        Ok(Some(format!("{PICTURES_DIR}/{token}")))
    }

    async fn release(&self, token: &str) -> Result<()> {
        if !Self::is_valid_token(token) {
            return Ok(());
        }

        match tokio::fs::remove_file(self.root.join(CACHE_DIR).join(token)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::storage_error("release upload", e)),
        }
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let token = match reference.strip_prefix(&format!("{PICTURES_DIR}/")) {
            Some(token) if Self::is_valid_token(token) => token,
            _ => {
                warn!(reference = %reference, "Ignored unknown picture reference");
                return Ok(());
            }
        };

        match tokio::fs::remove_file(self.root.join(PICTURES_DIR).join(token)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::storage_error("remove picture", e)),
        }
    }
}
