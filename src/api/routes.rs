use super::{handlers, websocket, ApiState, DashboardState, StoreState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

pub fn create_router(state: ApiState) -> Router {
    let mut router = Router::new();

    if let Some(store) = state.store {
        router = router.merge(store_routes(store));
    }
    if let Some(dashboard) = state.dashboard {
        router = router.merge(dashboard_routes(dashboard));
    }

    router.layer(CorsLayer::permissive())
}

/// Action-parameterized persistence endpoints.
pub fn store_routes(state: StoreState) -> Router {
    Router::new()
        .route(
            "/tokens.php",
            get(handlers::list_tokens).post(handlers::token_action),
        )
        .route(
            "/api.php",
            get(handlers::store_query).post(handlers::store_command),
        )
        .with_state(state)
}

/// Presentation surface over a live dashboard session.
pub fn dashboard_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/api/dashboard/cards", get(handlers::get_cards))
        .route(
            "/api/dashboard/tokens",
            get(handlers::get_tracked_tokens).post(handlers::track_token),
        )
        .route("/api/dashboard/tokens/order", put(handlers::reorder_tracked_tokens))
        .route("/api/dashboard/tokens/:address", delete(handlers::untrack_token))
        .route("/api/dashboard/tokens/:address/chart", get(handlers::get_chart))
        .route(
            "/api/dashboard/tokens/:address/timeframe",
            put(handlers::select_timeframe),
        )
        .route(
            "/api/dashboard/alerts",
            get(handlers::get_alerts).post(handlers::create_alert),
        )
        .route("/api/dashboard/alerts/:id", delete(handlers::delete_alert))
        .route(
            "/api/dashboard/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/api/dashboard/history/read", post(handlers::mark_history_read))
        .route("/api/dashboard/history/:id", delete(handlers::delete_history_item))
        .route("/api/ws", get(websocket::websocket_handler))
        .with_state(state)
}
