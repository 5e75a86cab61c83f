//! Email routing orchestration.
//!
//! Every mutating operation runs the same sequence: validate input, load the
//! credential, call Cloudflare, then mirror the result locally. Cloudflare is
//! always updated first; the local table never gets ahead of it.

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;

use crate::cloudflare::{CloudflareGateway, Zone};
use crate::credentials::CredentialStore;
use crate::db::routing_repo::{self, RoutingRow};
use crate::db::Database;
use crate::error::{MailrouteError, Result};

/// Body of a rule creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoutingRequest {
    pub zone_id: String,
    pub alias_part: String,
    pub destination_email: String,
}

/// Body of a rule deletion request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteRoutingRequest {
    pub rule_id: String,
}

/// Zones and routing rules, backed by Cloudflare and mirrored locally.
#[derive(Clone)]
pub struct RoutingService {
    db: Database,
    gateway: CloudflareGateway,
    credentials: CredentialStore,
}

impl RoutingService {
    pub fn new(db: Database, gateway: CloudflareGateway, credentials: CredentialStore) -> Self {
        Self {
            db,
            gateway,
            credentials,
        }
    }

    /// Active zones on the configured account.
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        let creds = self.credentials.require()?;
        Ok(self.gateway.list_zones(&creds.api_token).await?)
    }

    /// All mirrored routing records, newest first.
    pub fn list(&self) -> Result<Vec<RoutingRow>> {
        Ok(routing_repo::list(&self.db)?)
    }

    /// Creates the Cloudflare rule, then records it locally.
    pub async fn create(&self, request: CreateRoutingRequest) -> Result<RoutingRow> {
        let zone_id = request.zone_id.trim();
        let alias_part = request.alias_part.trim();
        let destination = request.destination_email.trim();

        if zone_id.is_empty() || alias_part.is_empty() || destination.is_empty() {
            return Err(MailrouteError::Validation(
                "Missing required fields: zoneId, aliasPart, destinationEmail".to_string(),
            ));
        }

        let creds = self.credentials.require()?;

        let created = self
            .gateway
            .create_routing_rule(&creds.api_token, zone_id, alias_part, destination)
            .await?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let row = RoutingRow {
            id: uuid::Uuid::new_v4().to_string(),
            zone_id: zone_id.to_string(),
            zone_name: created.zone_name,
            alias_part: alias_part.to_string(),
            full_email: created.full_email,
            destination: destination.to_string(),
            rule_id: created.rule_id,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        if let Err(e) = routing_repo::insert(&self.db, &row) {
            log::error!(
                "Cloudflare rule {} ({}) was created but could not be recorded locally: {}",
                row.rule_id,
                row.full_email,
                e
            );
            return Err(e.into());
        }

        Ok(row)
    }

    /// Deletes the Cloudflare rule, then the local record.
    ///
    /// `rule_id` must be the rule recorded for `id`. If Cloudflare refuses,
    /// the local record is left untouched.
    pub async fn delete(&self, id: &str, request: DeleteRoutingRequest) -> Result<()> {
        let rule_id = request.rule_id.trim();
        if rule_id.is_empty() {
            return Err(MailrouteError::Validation("Missing ruleId".to_string()));
        }

        let creds = self.credentials.require()?;

        let record = routing_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| MailrouteError::NotFound("Email routing not found".to_string()))?;

        // Deleting any other rule would leave this record's rule live remotely
        // while its mirror disappears.
        if rule_id != record.rule_id {
            return Err(MailrouteError::Validation(
                "ruleId does not match the email routing record".to_string(),
            ));
        }

        self.gateway
            .delete_routing_rule(&creds.api_token, &record.zone_id, rule_id)
            .await?;

        if !routing_repo::delete_by_id(&self.db, id)? {
            // Removed concurrently between lookup and delete.
            return Err(MailrouteError::NotFound(
                "Email routing not found".to_string(),
            ));
        }

        log::info!("Deleted email routing {} ({})", id, record.full_email);
        Ok(())
    }
}
