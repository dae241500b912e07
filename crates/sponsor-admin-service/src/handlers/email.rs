//! 赞助邮件 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use sponsorship_core::AccessFacade;
use sponsorship_core::dto::EmailDraft;
use validator::Validate;

use super::authorize;
use crate::{
    dto::{ApiResponse, EmailRequest},
    error::Result,
    middleware::CurrentActor,
    state::AppState,
};

/// 预填邮件表单
///
/// GET {prefix}/{id}/email
pub async fn prepare<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<EmailDraft>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    let draft = state.service.prepare_email(&access, id).await?;
    Ok(Json(ApiResponse::success(draft)))
}

/// 邮件入队，立即返回，不等待投递
///
/// POST {prefix}/{id}/email
pub async fn send<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<ApiResponse<()>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    req.validate()?;

    let message = state.service.send_email(&access, id, req.into()).await?;
    Ok(Json(ApiResponse::success_empty(message)))
}
