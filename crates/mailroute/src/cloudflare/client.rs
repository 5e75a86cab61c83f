//! Cloudflare API gateway.
//!
//! Stateless: every call receives the bearer token explicitly, so the caller
//! decides where credentials come from. Each operation is exactly one HTTP
//! round trip (two for rule creation, which resolves the zone name first);
//! nothing is retried or cached.

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{GatewayError, Result};
use super::types::{ApiResponse, CreateRuleRequest, RuleCreated, Zone, ZoneDetails};

/// Public Cloudflare v4 API root.
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Page size used when listing zones (Cloudflare's maximum for this endpoint).
pub const ZONES_PER_PAGE: u32 = 50;

/// Result of a successful rule creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRule {
    pub rule_id: String,
    pub zone_name: String,
    pub full_email: String,
}

/// HTTP gateway to the Cloudflare zone and email routing endpoints.
#[derive(Debug, Clone)]
pub struct CloudflareGateway {
    client: Client,
    api_base: String,
}

impl Default for CloudflareGateway {
    fn default() -> Self {
        Self::new(CLOUDFLARE_API_BASE)
    }
}

impl CloudflareGateway {
    /// Creates a gateway rooted at `api_base` (no trailing slash needed).
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_base)
    }

    /// Creates a gateway that reuses an existing HTTP client.
    pub fn with_client(client: Client, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self { client, api_base }
    }

    /// The API root this gateway talks to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Lists active zones on the account (first page, up to 50).
    pub async fn list_zones(&self, api_token: &SecretString) -> Result<Vec<Zone>> {
        let mut url = self.endpoint(&["zones"])?;
        url.query_pairs_mut()
            .append_pair("status", "active")
            .append_pair("per_page", &ZONES_PER_PAGE.to_string());
        let request = self.client.get(url).bearer_auth(api_token.expose_secret());

        let response: ApiResponse<Vec<Zone>> = self.execute(request).await?;
        let zones = response.result.unwrap_or_default();
        log::debug!("Fetched {} active zones", zones.len());
        Ok(zones)
    }

    /// Resolves a zone ID to its domain name.
    pub async fn zone_name(&self, api_token: &SecretString, zone_id: &str) -> Result<String> {
        let url = self.endpoint(&["zones", zone_id])?;
        let request = self.client.get(url).bearer_auth(api_token.expose_secret());

        let response: ApiResponse<ZoneDetails> = self.execute(request).await?;
        let details = require_result(response, "zone details")?;
        Ok(details.name)
    }

    /// Creates an enabled rule forwarding `alias_part@<zone name>` to
    /// `destination`.
    pub async fn create_routing_rule(
        &self,
        api_token: &SecretString,
        zone_id: &str,
        alias_part: &str,
        destination: &str,
    ) -> Result<CreatedRule> {
        let zone_name = self.zone_name(api_token, zone_id).await?;
        let full_email = format!("{}@{}", alias_part, zone_name);

        let url = self.endpoint(&["zones", zone_id, "email", "routing", "rules"])?;
        let request = self
            .client
            .post(url)
            .bearer_auth(api_token.expose_secret())
            .json(&CreateRuleRequest::forward(&full_email, destination));

        let response: ApiResponse<RuleCreated> = self.execute(request).await?;
        let created = require_result(response, "created rule")?;

        log::info!(
            "Created routing rule {} for {} -> {}",
            created.id,
            full_email,
            destination
        );

        Ok(CreatedRule {
            rule_id: created.id,
            zone_name,
            full_email,
        })
    }

    /// Deletes a routing rule from a zone.
    pub async fn delete_routing_rule(
        &self,
        api_token: &SecretString,
        zone_id: &str,
        rule_id: &str,
    ) -> Result<()> {
        let url = self.endpoint(&["zones", zone_id, "email", "routing", "rules", rule_id])?;
        let request = self
            .client
            .delete(url)
            .bearer_auth(api_token.expose_secret());

        let _: ApiResponse<Value> = self.execute(request).await?;
        log::info!("Deleted routing rule {} in zone {}", rule_id, zone_id);
        Ok(())
    }

    /// Appends path segments to the API root. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay inside their own segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| GatewayError::Endpoint(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Endpoint(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and unwraps the Cloudflare envelope.
    ///
    /// Any non-2xx status or `success: false` body becomes
    /// [`GatewayError::Remote`].
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiResponse<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = remote_message(&body, status);
            log::warn!("Cloudflare API returned {}: {}", status.as_u16(), message);
            return Err(GatewayError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse<T> =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        if !parsed.success {
            let message = remote_message(&body, status);
            log::warn!("Cloudflare API reported failure: {}", message);
            return Err(GatewayError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed)
    }
}

fn require_result<T>(response: ApiResponse<T>, what: &str) -> Result<T> {
    response
        .result
        .ok_or_else(|| GatewayError::Decode(format!("missing {} in response", what)))
}

/// Extracts the most specific error message from a Cloudflare error body.
///
/// Order: first entry of `errors`, top-level `message`, HTTP reason phrase.
fn remote_message(body: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<ApiResponse<Value>>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .find(|m| !m.is_empty())
                .or(parsed.message.filter(|m| !m.is_empty()))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::json;

    #[derive(Default)]
    struct Recorded {
        auth_headers: Vec<String>,
        rule_bodies: Vec<Value>,
    }

    type Shared = Arc<Mutex<Recorded>>;

    fn record_auth(state: &Shared, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        state.lock().unwrap().auth_headers.push(value);
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}/client/v4/", addr)
    }

    fn fake_cloudflare(state: Shared) -> Router {
        Router::new()
            .route(
                "/client/v4/zones",
                get(
                    |State(s): State<Shared>, headers: HeaderMap| async move {
                        record_auth(&s, &headers);
                        Json(json!({
                            "success": true,
                            "errors": [],
                            "result": [
                                {"id": "z1", "name": "example.com", "status": "active"},
                                {"id": "z2", "name": "example.org", "status": "active"}
                            ]
                        }))
                    },
                ),
            )
            .route(
                "/client/v4/zones/{zone_id}",
                get(|Path(zone_id): Path<String>| async move {
                    if zone_id == "z1" {
                        (
                            AxumStatus::OK,
                            Json(json!({"success": true, "result": {"id": "z1", "name": "example.com"}})),
                        )
                    } else {
                        (
                            AxumStatus::NOT_FOUND,
                            Json(json!({"success": false, "errors": [{"code": 1001, "message": "Invalid zone identifier"}]})),
                        )
                    }
                }),
            )
            .route(
                "/client/v4/zones/{zone_id}/email/routing/rules",
                post(
                    |State(s): State<Shared>, Json(body): Json<Value>| async move {
                        s.lock().unwrap().rule_bodies.push(body);
                        Json(json!({"success": true, "result": {"id": "rule-42"}}))
                    },
                ),
            )
            .route(
                "/client/v4/zones/{zone_id}/email/routing/rules/{rule_id}",
                delete(|Path((_, rule_id)): Path<(String, String)>| async move {
                    if rule_id == "rule-42" {
                        (AxumStatus::OK, Json(json!({"success": true, "result": {"id": "rule-42"}})))
                    } else {
                        (AxumStatus::BAD_REQUEST, Json(json!({"message": "Rule does not exist"})))
                    }
                }),
            )
            .with_state(state)
    }

    fn token() -> SecretString {
        SecretString::from("cf-token".to_string())
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let gateway = CloudflareGateway::new("http://localhost:9999/client/v4/");
        assert_eq!(gateway.api_base(), "http://localhost:9999/client/v4");
        assert_eq!(CloudflareGateway::default().api_base(), CLOUDFLARE_API_BASE);
    }

    #[test]
    fn test_remote_message_precedence() {
        let status = StatusCode::FORBIDDEN;
        assert_eq!(
            remote_message(br#"{"errors":[{"code":9,"message":"first"}],"message":"top"}"#, status),
            "first"
        );
        assert_eq!(remote_message(br#"{"errors":[],"message":"top"}"#, status), "top");
        assert_eq!(remote_message(b"<html>oops</html>", status), "Forbidden");
        assert_eq!(remote_message(b"{}", StatusCode::BAD_GATEWAY), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_list_zones_sends_bearer_token() {
        let state = Shared::default();
        let gateway = CloudflareGateway::new(serve(fake_cloudflare(state.clone())).await);

        let zones = gateway.list_zones(&token()).await.unwrap();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "example.com");
        assert_eq!(state.lock().unwrap().auth_headers, vec!["Bearer cf-token"]);
    }

    #[tokio::test]
    async fn test_create_routing_rule_builds_full_email() {
        let state = Shared::default();
        let gateway = CloudflareGateway::new(serve(fake_cloudflare(state.clone())).await);

        let created = gateway
            .create_routing_rule(&token(), "z1", "sales", "ops@example.com")
            .await
            .unwrap();

        assert_eq!(created.rule_id, "rule-42");
        assert_eq!(created.zone_name, "example.com");
        assert_eq!(created.full_email, "sales@example.com");

        let recorded = state.lock().unwrap();
        let body = &recorded.rule_bodies[0];
        assert_eq!(body["matchers"][0]["value"], "sales@example.com");
        assert_eq!(body["actions"][0]["value"][0], "ops@example.com");
        assert_eq!(body["enabled"], true);
    }

    #[tokio::test]
    async fn test_create_routing_rule_unknown_zone() {
        let state = Shared::default();
        let gateway = CloudflareGateway::new(serve(fake_cloudflare(state.clone())).await);

        let err = gateway
            .create_routing_rule(&token(), "missing", "sales", "ops@example.com")
            .await
            .unwrap_err();

        match err {
            GatewayError::Remote { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Invalid zone identifier");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(state.lock().unwrap().rule_bodies.is_empty());
    }

    #[tokio::test]
    async fn test_delete_routing_rule() {
        let gateway = CloudflareGateway::new(serve(fake_cloudflare(Shared::default())).await);

        gateway
            .delete_routing_rule(&token(), "z1", "rule-42")
            .await
            .unwrap();

        let err = gateway
            .delete_routing_rule(&token(), "z1", "rule-0")
            .await
            .unwrap_err();
        assert_eq!(err.remote_status(), Some(400));
        assert_eq!(err.to_string(), "Rule does not exist");
    }

    #[tokio::test]
    async fn test_success_status_with_failure_body() {
        let app = Router::new().route(
            "/client/v4/zones",
            get(|| async {
                Json(json!({"success": false, "errors": [{"code": 10000, "message": "Authentication error"}]}))
            }),
        );
        let gateway = CloudflareGateway::new(serve(app).await);

        let err = gateway.list_zones(&token()).await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication error");
        assert_eq!(err.remote_status(), Some(200));
    }

    #[tokio::test]
    async fn test_ids_are_encoded_as_single_segments() {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let app = Router::new()
            .route(
                "/client/v4/zones/{zone_id}/email/routing/rules/{rule_id}",
                delete(
                    |State(seen): State<Arc<Mutex<Vec<(String, String)>>>>,
                     Path(ids): Path<(String, String)>| async move {
                        seen.lock().unwrap().push(ids);
                        Json(json!({"success": true, "result": null}))
                    },
                ),
            )
            .with_state(seen.clone());
        let gateway = CloudflareGateway::new(serve(app).await);

        gateway
            .delete_routing_rule(&token(), "z1?x=1", "rule/../../zones#frag")
            .await
            .unwrap();

        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![("z1?x=1".to_string(), "rule/../../zones#frag".to_string())]
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_api_base() {
        let gateway = CloudflareGateway::new("not a url");
        assert!(matches!(
            gateway.endpoint(&["zones"]),
            Err(GatewayError::Endpoint(_))
        ));

        let gateway = CloudflareGateway::new("http://localhost:1/client/v4/");
        assert_eq!(
            gateway.endpoint(&["zones", "a b"]).unwrap().as_str(),
            "http://localhost:1/client/v4/zones/a%20b"
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = CloudflareGateway::new(format!("http://{}", addr));
        let err = gateway.list_zones(&token()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert_eq!(err.remote_status(), None);
    }
}
