use super::super::StoreState;
use super::{parse_body, unknown_action, ApiResult};
use crate::error::DashboardError;
use crate::storage::token_file::parse_address_list;
use crate::types::{ActionQuery, StoreResponse};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

/// Body fallback for callers that send the address(es) as JSON.
#[derive(Debug, Default, Deserialize)]
struct TokenActionBody {
    address: Option<String>,
    addresses: Option<Vec<String>>,
}

pub async fn list_tokens(State(state): State<StoreState>) -> ApiResult<StoreResponse> {
    let tokens = state.tokens.list().await?;
    Ok(Json(StoreResponse::with_tokens(tokens)))
}

pub async fn token_action(
    State(state): State<StoreState>,
    Query(query): Query<ActionQuery>,
    body: Bytes,
) -> ApiResult<StoreResponse> {
    let body: TokenActionBody = parse_body(&body)?;

    let tokens = match query.action.as_deref() {
        None | Some("list") => state.tokens.list().await?,
        Some("add") => {
            let address = required_address(query.address, body.address)?;
            state.tokens.add(&address).await?
        }
        Some("remove") => {
            let address = required_address(query.address, body.address)?;
            state.tokens.remove(&address).await?
        }
        Some("reorder") => {
            let addresses = match (query.addresses, body.addresses) {
                (Some(raw), _) => parse_address_list(&raw),
                (None, Some(list)) => list,
                (None, None) => {
                    return Err(DashboardError::validation("Missing addresses").into())
                }
            };
            state.tokens.reorder(&addresses).await?
        }
        other => return Err(unknown_action(other)),
    };

    Ok(Json(StoreResponse::with_tokens(tokens)))
}

fn required_address(
    query: Option<String>,
    body: Option<String>,
) -> Result<String, DashboardError> {
    query
        .or(body)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DashboardError::validation("Missing address"))
}
