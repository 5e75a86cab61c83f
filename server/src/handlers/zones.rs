use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mailroute::Zone;
use serde::Serialize;

use crate::error::{empty_zones, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    success: bool,
    zones: Vec<Zone>,
}

/// GET /cloudflare/zones - active zones. Error bodies still carry `zones: []`.
pub async fn list_zones(State(state): State<AppState>) -> Response {
    match state.routing.zones().await {
        Ok(zones) => Json(ZonesResponse {
            success: true,
            zones,
        })
        .into_response(),
        Err(e) => ApiError(e).into_response_with(empty_zones()),
    }
}
