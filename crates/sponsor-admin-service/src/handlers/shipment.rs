//! 发货到货跟踪 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use sponsorship_core::{AccessFacade, SponsorShipment};

use super::authorize;
use crate::{
    dto::{ApiResponse, ArrivalRequest},
    error::Result,
    middleware::CurrentActor,
    state::AppState,
};

/// 更新送达 / 到场标记
///
/// PATCH {prefix}/{id}/shipments/{shipment_id}/arrival
pub async fn record_arrival<F: AccessFacade>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((short_title, id, shipment_id)): Path<(String, i64, i64)>,
    Json(req): Json<ArrivalRequest>,
) -> Result<Json<ApiResponse<SponsorShipment>>> {
    let access = authorize::<F>(&state, &actor, &short_title).await?;

    let shipment = state
        .service
        .record_arrival(&access, id, shipment_id, req.into())
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        shipment,
        "Shipment successfully updated.",
    )))
}
