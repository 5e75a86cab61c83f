use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use mailroute::{CredentialInput, CredentialView, Credentials};
use serde::Serialize;

use crate::error::{rejected, ApiResult};
use crate::state::AppState;

/// The credential record is a singleton.
const CONFIG_ID: u8 = 1;

#[derive(Debug, Serialize)]
pub struct ConfigBody {
    id: u8,
    #[serde(flatten)]
    view: CredentialView,
    /// Plain values for populating the edit form.
    #[serde(rename = "_full", skip_serializing_if = "Option::is_none")]
    full: Option<CredentialView>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    success: bool,
    config: Option<ConfigBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl ConfigResponse {
    fn empty() -> Self {
        Self {
            success: true,
            config: None,
            message: Some("No configuration saved yet"),
        }
    }
}

/// GET /cloudflare/config - masked credentials.
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<ConfigResponse>> {
    let Some(creds) = state.credentials.get()? else {
        return Ok(Json(ConfigResponse::empty()));
    };

    let full = state.reveal_secrets.then(|| creds.reveal());
    Ok(Json(ConfigResponse {
        success: true,
        config: Some(ConfigBody {
            id: CONFIG_ID,
            view: creds.masked(),
            full,
        }),
        message: None,
    }))
}

/// POST|PUT /cloudflare/config - replaces the stored credentials.
pub async fn save_config(
    State(state): State<AppState>,
    payload: Result<Json<CredentialInput>, JsonRejection>,
) -> ApiResult<Json<ConfigResponse>> {
    let Json(input) = payload.map_err(rejected)?;
    let creds: Credentials = state.credentials.upsert(input)?;

    Ok(Json(ConfigResponse {
        success: true,
        config: Some(ConfigBody {
            id: CONFIG_ID,
            view: creds.masked(),
            full: None,
        }),
        message: Some("Configuration saved"),
    }))
}

/// GET /cloudflare/config/reveal - plain credentials for the edit form.
pub async fn reveal_config(State(state): State<AppState>) -> ApiResult<Json<ConfigResponse>> {
    let Some(creds) = state.credentials.get()? else {
        return Ok(Json(ConfigResponse::empty()));
    };

    tracing::info!("Revealed stored Cloudflare credentials");
    Ok(Json(ConfigResponse {
        success: true,
        config: Some(ConfigBody {
            id: CONFIG_ID,
            view: creds.reveal(),
            full: None,
        }),
        message: None,
    }))
}
