pub mod alert_handlers;
pub mod dashboard_handlers;
pub mod token_handlers;

pub use alert_handlers::*;
pub use dashboard_handlers::*;
pub use token_handlers::*;

use crate::error::DashboardError;
use crate::types::StoreResponse;
use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use tracing::error;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// A `DashboardError` rendered as the `{ok: false, error}` envelope.
#[derive(Debug)]
pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Duplicate(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            DashboardError::Validation(msg)
            | DashboardError::NotFound(msg)
            | DashboardError::Duplicate(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(StoreResponse::failure(self.message()))).into_response()
    }
}

/// Decode a JSON request body; an empty body reads as `T::default()`.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required_body(body)
}

pub(crate) fn parse_required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| DashboardError::validation(format!("Invalid request body: {}", e)).into())
}

fn unknown_action(action: Option<&str>) -> ApiError {
    DashboardError::validation(format!("Unknown action: {}", action.unwrap_or(""))).into()
}
