use super::super::StoreState;
use super::{parse_body, parse_required_body, unknown_action, ApiResult};
use crate::types::{
    ActionQuery, IdRequest, NewAlert, NewHistoryItem, OptionalIdRequest, StoreResponse,
    UpdateLastPriceRequest,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};

/// `GET /api.php?action=getAlerts|getHistory`
pub async fn store_query(
    State(state): State<StoreState>,
    Query(query): Query<ActionQuery>,
) -> ApiResult<StoreResponse> {
    let response = match query.action.as_deref() {
        Some("getAlerts") => StoreResponse::with_alerts(state.alerts.get_alerts().await?),
        Some("getHistory") => StoreResponse::with_history(state.alerts.get_history().await?),
        other => return Err(unknown_action(other)),
    };
    Ok(Json(response))
}

/// `POST /api.php?action=...` with a JSON body.
pub async fn store_command(
    State(state): State<StoreState>,
    Query(query): Query<ActionQuery>,
    body: Bytes,
) -> ApiResult<StoreResponse> {
    let alerts = &state.alerts;

    let response = match query.action.as_deref() {
        Some("getAlerts") => StoreResponse::with_alerts(alerts.get_alerts().await?),
        Some("getHistory") => StoreResponse::with_history(alerts.get_history().await?),
        Some("saveAlert") => {
            let alert: NewAlert = parse_required_body(&body)?;
            StoreResponse::with_alerts(alerts.save_alert(alert).await?)
        }
        Some("deleteAlert") => {
            let request: IdRequest = parse_required_body(&body)?;
            StoreResponse::with_alerts(alerts.delete_alert(&request.id).await?)
        }
        Some("updateAlertLastPrice") => {
            let request: UpdateLastPriceRequest = parse_required_body(&body)?;
            StoreResponse::with_alerts(
                alerts
                    .update_alert_last_price(&request.id, request.last_price)
                    .await?,
            )
        }
        Some("addHistory") => {
            let item: NewHistoryItem = parse_required_body(&body)?;
            StoreResponse::with_history(alerts.add_history(item).await?)
        }
        Some("markHistoryRead") => {
            let request: OptionalIdRequest = parse_body(&body)?;
            StoreResponse::with_history(alerts.mark_history_read(request.id.as_deref()).await?)
        }
        Some("deleteHistoryItem") => {
            let request: IdRequest = parse_required_body(&body)?;
            StoreResponse::with_history(alerts.delete_history_item(&request.id).await?)
        }
        Some("clearAllHistory") => StoreResponse::with_history(alerts.clear_all_history().await?),
        other => return Err(unknown_action(other)),
    };

    Ok(Json(response))
}
