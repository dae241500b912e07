//! 赞助管理 API 处理器
//!
//! 列表、新建表单、增删改查及状态流转

use axum::{
    Json,
    extract::{Path, State},
};
use sponsorship_core::dto::{Mutation, NewSponsorshipForm, SponsorshipIndex};
use sponsorship_core::{
    AccessFacade, Sponsorship, SponsorshipAccess, SponsorshipAggregate, StateTransition,
    SwagStatus,
};
use tracing::info;
use validator::Validate;

use super::authorize;
use crate::{
    dto::{ApiResponse, DeletedResponse, SponsorshipRequest},
    error::{AdminError, Result},
    middleware::CurrentActor,
    state::AppState,
};

/// 赞助列表及看板计数
///
/// GET {prefix}
pub async fn index<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(short_title): Path<String>,
) -> Result<Json<ApiResponse<SponsorshipIndex>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    let index = state.service.index(&access).await?;
    Ok(Json(ApiResponse::success(index)))
}

/// 新建表单默认值及可选赞助等级
///
/// GET {prefix}/new
pub async fn new_form<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(short_title): Path<String>,
) -> Result<Json<ApiResponse<NewSponsorshipForm>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    let form = state.service.new_form(&access).await?;
    Ok(Json(ApiResponse::success(form)))
}

/// 创建赞助（含嵌套物料和发货记录）
///
/// POST {prefix}
pub async fn create<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(short_title): Path<String>,
    Json(req): Json<SponsorshipRequest>,
) -> Result<Json<ApiResponse<SponsorshipAggregate>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    req.validate()?;

    let aggregate = state
        .service
        .create(&access, req.into())
        .await
        .map_err(|e| mutation_failed(&access, Mutation::Create, e))?;

    info!(sponsorship_id = aggregate.id(), user_id = actor.user_id, "Sponsorship created via API");
    Ok(Json(ApiResponse::success_with_message(
        aggregate,
        Mutation::Create.success_message(access.noun),
    )))
}

/// 赞助详情
///
/// GET {prefix}/{id}
pub async fn show<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<SponsorshipAggregate>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    let aggregate = state.service.show(&access, id).await?;
    Ok(Json(ApiResponse::success(aggregate)))
}

/// 更新赞助
///
/// PUT/PATCH {prefix}/{id}
pub async fn update<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
    Json(req): Json<SponsorshipRequest>,
) -> Result<Json<ApiResponse<SponsorshipAggregate>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    req.validate()?;

    let aggregate = state
        .service
        .update(&access, id, req.into())
        .await
        .map_err(|e| mutation_failed(&access, Mutation::Update, e))?;

    Ok(Json(ApiResponse::success_with_message(
        aggregate,
        Mutation::Update.success_message(access.noun),
    )))
}

/// 删除赞助
///
/// DELETE {prefix}/{id}
pub async fn destroy<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;

    state
        .service
        .destroy(&access, id)
        .await
        .map_err(|e| mutation_failed(&access, Mutation::Destroy, e))?;

    Ok(Json(ApiResponse::success_with_message(
        DeletedResponse::new(id),
        Mutation::Destroy.success_message(access.noun),
    )))
}

/// 物料列表及送达 / 到场状态
///
/// GET {prefix}/{id}/swags
pub async fn swags<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<Vec<SwagStatus>>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;
    let statuses = state.service.swag_statuses(&access, id).await?;
    Ok(Json(ApiResponse::success(statuses)))
}

// ==================== 状态流转 ====================

/// POST {prefix}/{id}/confirm
pub async fn confirm<F: AccessFacade>(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<(String, i64)>,
) -> Result<Json<ApiResponse<Sponsorship>>> {
    apply_transition::<F>(state, actor, path, StateTransition::Confirm).await
}

/// POST {prefix}/{id}/cancel
pub async fn cancel<F: AccessFacade>(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<(String, i64)>,
) -> Result<Json<ApiResponse<Sponsorship>>> {
    apply_transition::<F>(state, actor, path, StateTransition::Cancel).await
}

/// POST {prefix}/{id}/contacted
pub async fn contacted<F: AccessFacade>(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<(String, i64)>,
) -> Result<Json<ApiResponse<Sponsorship>>> {
    apply_transition::<F>(state, actor, path, StateTransition::MarkContacted).await
}

/// POST {prefix}/{id}/unconfirmed
pub async fn unconfirmed<F: AccessFacade>(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<(String, i64)>,
) -> Result<Json<ApiResponse<Sponsorship>>> {
    apply_transition::<F>(state, actor, path, StateTransition::MarkUnconfirmed).await
}

async fn apply_transition<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id)): Path<(String, i64)>,
    transition: StateTransition,
) -> Result<Json<ApiResponse<Sponsorship>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;

    let sponsorship = state
        .service
        .transition(&access, id, transition)
        .await
        .map_err(|e| {
            AdminError::rejected(e, |messages| {
                format!("{} {}", transition.failure_message(access.noun), messages)
            })
        })?;

    Ok(Json(ApiResponse::success_with_message(
        sponsorship,
        transition.success_message(access.noun),
    )))
}

/// 增删改失败时附加统一提示语
fn mutation_failed(
    access: &SponsorshipAccess,
    mutation: Mutation,
    err: sponsorship_core::SponsorshipError,
) -> AdminError {
    let noun = access.noun_lower();
    AdminError::rejected(err, |messages| mutation.failure_message(&noun, messages))
}
