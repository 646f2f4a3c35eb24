use super::super::DashboardState;
use super::ApiResult;
use crate::engine::{CardState, Timeframe, TimeframeView};
use crate::error::DashboardError;
use crate::types::{
    AddTokenRequest, ChartQuery, NewAlert, OptionalIdRequest, ReorderRequest, StoreResponse,
    TimeframeRequest,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use tracing::info;

pub async fn get_cards(State(state): State<DashboardState>) -> Json<Vec<CardState>> {
    Json(state.session.cards().await)
}

pub async fn get_tracked_tokens(State(state): State<DashboardState>) -> Json<StoreResponse> {
    Json(StoreResponse::with_tokens(state.session.tokens().await))
}

pub async fn track_token(
    State(state): State<DashboardState>,
    Json(request): Json<AddTokenRequest>,
) -> ApiResult<StoreResponse> {
    let tokens = state.session.add_token(request.address.trim()).await?;
    info!("➕ Tracking {}", request.address.trim());
    Ok(Json(StoreResponse::with_tokens(tokens)))
}

pub async fn untrack_token(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
) -> ApiResult<StoreResponse> {
    let tokens = state.session.remove_token(&address).await?;
    info!("➖ Untracked {}", address);
    Ok(Json(StoreResponse::with_tokens(tokens)))
}

pub async fn reorder_tracked_tokens(
    State(state): State<DashboardState>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<StoreResponse> {
    let tokens = state.session.reorder_tokens(&request.addresses).await?;
    Ok(Json(StoreResponse::with_tokens(tokens)))
}

pub async fn get_chart(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<TimeframeView> {
    ensure_charting(&state)?;
    let timeframe = query.timeframe.as_deref().map(parse_timeframe).transpose()?;
    Ok(Json(state.session.chart(&address, timeframe).await?))
}

pub async fn select_timeframe(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
    Json(request): Json<TimeframeRequest>,
) -> ApiResult<TimeframeView> {
    ensure_charting(&state)?;
    let timeframe = parse_timeframe(&request.timeframe)?;
    Ok(Json(state.session.set_timeframe(&address, timeframe).await?))
}

pub async fn get_alerts(State(state): State<DashboardState>) -> ApiResult<StoreResponse> {
    ensure_alerts(&state)?;
    let alerts = state.session.refresh_alerts().await?;
    Ok(Json(StoreResponse::with_alerts(alerts)))
}

pub async fn create_alert(
    State(state): State<DashboardState>,
    Json(alert): Json<NewAlert>,
) -> ApiResult<StoreResponse> {
    ensure_alerts(&state)?;
    let alerts = state.session.create_alert(alert).await?;
    Ok(Json(StoreResponse::with_alerts(alerts)))
}

pub async fn delete_alert(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> ApiResult<StoreResponse> {
    ensure_alerts(&state)?;
    let alerts = state.session.delete_alert(&id).await?;
    Ok(Json(StoreResponse::with_alerts(alerts)))
}

pub async fn get_history(State(state): State<DashboardState>) -> ApiResult<StoreResponse> {
    let book = state.session.refresh_history().await?;
    Ok(Json(StoreResponse::with_history(book)))
}

pub async fn mark_history_read(
    State(state): State<DashboardState>,
    request: Option<Json<OptionalIdRequest>>,
) -> ApiResult<StoreResponse> {
    let id = request.and_then(|Json(r)| r.id);
    let book = state.session.mark_history_read(id.as_deref()).await?;
    Ok(Json(StoreResponse::with_history(book)))
}

pub async fn delete_history_item(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> ApiResult<StoreResponse> {
    let book = state.session.delete_history_item(&id).await?;
    Ok(Json(StoreResponse::with_history(book)))
}

pub async fn clear_history(State(state): State<DashboardState>) -> ApiResult<StoreResponse> {
    let book = state.session.clear_history().await?;
    Ok(Json(StoreResponse::with_history(book)))
}

fn parse_timeframe(raw: &str) -> Result<Timeframe, DashboardError> {
    raw.parse::<Timeframe>().map_err(DashboardError::Validation)
}

fn ensure_charting(state: &DashboardState) -> Result<(), DashboardError> {
    if state.session.features().charting_enabled {
        Ok(())
    } else {
        Err(DashboardError::validation("Charting is disabled"))
    }
}

fn ensure_alerts(state: &DashboardState) -> Result<(), DashboardError> {
    if state.session.features().alerts_enabled {
        Ok(())
    } else {
        Err(DashboardError::validation("Alerts are disabled"))
    }
}
