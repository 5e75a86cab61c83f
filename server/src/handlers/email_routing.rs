use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use mailroute::{CreateRoutingRequest, DeleteRoutingRequest, RoutingRow};
use serde::Serialize;

use crate::error::{rejected, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    success: bool,
    emails: Vec<RoutingRow>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    success: bool,
    email: RoutingRow,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    success: bool,
    message: &'static str,
}

/// GET /email-routing - newest first.
pub async fn list_routes(State(state): State<AppState>) -> ApiResult<Json<ListResponse>> {
    let emails = state.routing.list()?;
    Ok(Json(ListResponse {
        success: true,
        emails,
    }))
}

/// POST /email-routing
pub async fn create_route(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoutingRequest>, JsonRejection>,
) -> ApiResult<Json<CreatedResponse>> {
    let Json(request) = payload.map_err(rejected)?;
    let email = state.routing.create(request).await?;
    Ok(Json(CreatedResponse {
        success: true,
        email,
    }))
}

/// DELETE /email-routing/{id}
///
/// A request without a JSON body is treated as one without a `ruleId`.
pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<DeleteRoutingRequest>, JsonRejection>,
) -> ApiResult<Json<DeletedResponse>> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => DeleteRoutingRequest::default(),
        Err(e) => return Err(rejected(e)),
    };

    state.routing.delete(&id, request).await?;
    Ok(Json(DeletedResponse {
        success: true,
        message: "Email routing deleted successfully",
    }))
}
