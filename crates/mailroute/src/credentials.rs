//! Credential store: the single saved set of Cloudflare secrets plus the
//! list of permitted destination addresses.
//!
//! Saves are full replacements. Secrets leave this module either masked
//! ([`Credentials::masked`]) or through the explicit reveal view
//! ([`Credentials::reveal`]).

use std::sync::{Arc, LazyLock};

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::db::credential_repo::{self, CredentialRow};
use crate::db::{Database, DatabaseError};
use crate::error::{MailrouteError, Result};
use crate::secrets::{mask_secret, SecretError, SecretCipher};

/// Address shape accepted for destination emails.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"));

/// Returns true if `address` looks like a deliverable email address.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

/// Save request as sent by the dashboard form.
///
/// Missing fields deserialize as empty strings so validation can report
/// them together instead of failing JSON parsing.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialInput {
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Option<Vec<String>>,
}

impl std::fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialInput")
            .field("destination_emails", &self.destination_emails)
            .finish_non_exhaustive()
    }
}

impl CredentialInput {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("apiToken", &self.api_token),
            ("accountId", &self.account_id),
            ("d1Database", &self.d1_database),
            ("workerApi", &self.worker_api),
            ("kvStorage", &self.kv_storage),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Stored Cloudflare credentials, decrypted.
pub struct Credentials {
    pub api_token: SecretString,
    pub account_id: SecretString,
    pub d1_database: SecretString,
    pub worker_api: SecretString,
    pub kv_storage: SecretString,
    pub destination_emails: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("destination_emails", &self.destination_emails)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Credential values as shown to the browser. Secret fields are either all
/// masked or all plain, depending on how the view was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Vec<String>,
}

impl Credentials {
    /// Browser-safe view: every secret is `***` plus its last four characters.
    pub fn masked(&self) -> CredentialView {
        self.view(|secret| mask_secret(secret.expose_secret()))
    }

    /// Full values, for populating the edit form.
    pub fn reveal(&self) -> CredentialView {
        self.view(|secret| secret.expose_secret().to_string())
    }

    fn view(&self, render: impl Fn(&SecretString) -> String) -> CredentialView {
        CredentialView {
            api_token: render(&self.api_token),
            account_id: render(&self.account_id),
            d1_database: render(&self.d1_database),
            worker_api: render(&self.worker_api),
            kv_storage: render(&self.kv_storage),
            destination_emails: self.destination_emails.clone(),
        }
    }
}

/// Reads and replaces the singleton credential record.
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    cipher: Option<Arc<SecretCipher>>,
}

impl CredentialStore {
    /// Creates a store. With a cipher, secrets are written encrypted.
    pub fn new(db: Database, cipher: Option<Arc<SecretCipher>>) -> Self {
        Self { db, cipher }
    }

    /// Returns the saved credentials, or `None` if nothing has been saved.
    pub fn get(&self) -> Result<Option<Credentials>> {
        credential_repo::find(&self.db)?
            .map(|row| self.decode(row))
            .transpose()
    }

    /// Returns the saved credentials or [`MailrouteError::ConfigMissing`].
    pub fn require(&self) -> Result<Credentials> {
        self.get()?.ok_or(MailrouteError::ConfigMissing)
    }

    /// Validates `input` and replaces the stored record with it.
    ///
    /// Nothing is written when validation fails. Secrets are stored trimmed.
    /// Destination emails are trimmed and de-duplicated keeping first-seen
    /// order.
    pub fn upsert(&self, input: CredentialInput) -> Result<Credentials> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(MailrouteError::Validation(format!(
                "All fields are required (missing: {})",
                missing.join(", ")
            )));
        }

        let destination_emails = normalize_emails(input.destination_emails.unwrap_or_default())?;
        let emails_json = serde_json::to_string(&destination_emails).map_err(|e| {
            MailrouteError::Storage(DatabaseError::Corrupt {
                table: "cloudflare_config",
                reason: e.to_string(),
            })
        })?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let row = CredentialRow {
            api_token: self.seal(input.api_token.trim())?,
            account_id: self.seal(input.account_id.trim())?,
            d1_database: self.seal(input.d1_database.trim())?,
            worker_api: self.seal(input.worker_api.trim())?,
            kv_storage: self.seal(input.kv_storage.trim())?,
            destination_emails: emails_json,
            encrypted: self.cipher.is_some(),
            created_at: now.clone(),
            updated_at: now,
        };

        credential_repo::upsert(&self.db, &row)?;
        log::info!(
            "Saved Cloudflare credentials ({} destination emails, encrypted: {})",
            destination_emails.len(),
            row.encrypted
        );

        self.require()
    }

    fn seal(&self, value: &str) -> Result<String> {
        match &self.cipher {
            Some(cipher) => Ok(cipher.seal(value)?),
            None => Ok(value.to_string()),
        }
    }

    fn open(&self, value: String, encrypted: bool) -> Result<SecretString> {
        if !encrypted {
            return Ok(SecretString::from(value));
        }
        let cipher = self.cipher.as_ref().ok_or(SecretError::KeyRequired)?;
        Ok(SecretString::from(cipher.open(&value)?))
    }

    fn decode(&self, row: CredentialRow) -> Result<Credentials> {
        let destination_emails: Vec<String> = serde_json::from_str(&row.destination_emails)
            .map_err(|e| {
                MailrouteError::Storage(DatabaseError::Corrupt {
                    table: "cloudflare_config",
                    reason: format!("destination_emails: {}", e),
                })
            })?;

        Ok(Credentials {
            api_token: self.open(row.api_token, row.encrypted)?,
            account_id: self.open(row.account_id, row.encrypted)?,
            d1_database: self.open(row.d1_database, row.encrypted)?,
            worker_api: self.open(row.worker_api, row.encrypted)?,
            kv_storage: self.open(row.kv_storage, row.encrypted)?,
            destination_emails,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn normalize_emails(raw: Vec<String>) -> Result<Vec<String>> {
    let mut emails: Vec<String> = Vec::with_capacity(raw.len());
    for address in raw {
        let address = address.trim();
        if address.is_empty() {
            continue;
        }
        if !is_valid_email(address) {
            return Err(MailrouteError::Validation(format!(
                "Invalid email address: {}",
                address
            )));
        }
        if !emails.iter().any(|e| e == address) {
            emails.push(address.to_string());
        }
    }
    Ok(emails)
}
