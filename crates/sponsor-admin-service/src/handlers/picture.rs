//! Logo 图片上传 API 处理器

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use sponsorship_core::{AccessFacade, PictureUpload};

use super::authorize;
use crate::{
    dto::{ApiResponse, PictureCacheDto},
    error::{AdminError, Result},
    middleware::CurrentActor,
    state::AppState,
};

/// 表单中的文件字段名
const PICTURE_FIELD: &str = "picture";

/// 暂存上传的图片，返回缓存令牌
///
/// POST {prefix}/pictures，multipart 字段 `picture`
pub async fn upload<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(short_title): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<PictureCacheDto>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdminError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(PICTURE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("picture").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AdminError::Validation(format!("Invalid multipart body: {e}")))?;

        upload = Some(PictureUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AdminError::Validation("Picture can't be blank".to_string()))?;
    let picture_cache = state.service.stash_picture(&access, upload).await?;

    Ok(Json(ApiResponse::success(PictureCacheDto { picture_cache })))
}
