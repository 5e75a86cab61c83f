use thiserror::Error;

use crate::cloudflare::GatewayError;
use crate::db::DatabaseError;
use crate::secrets::SecretError;

/// Every failure an exposed operation can report.
///
/// Each variant corresponds to one response class; see [`status_code`](Self::status_code).
#[derive(Error, Debug)]
pub enum MailrouteError {
    /// Malformed or missing request input.
    #[error("{0}")]
    Validation(String),

    /// No Cloudflare credentials have been saved yet.
    #[error("Cloudflare API config is not set up yet. Save it in the dashboard config first.")]
    ConfigMissing,

    /// Cloudflare rejected the request or could not be reached.
    #[error("{message}")]
    RemoteApi {
        status: Option<u16>,
        message: String,
    },

    /// A local record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Local persistence failed.
    #[error("Database error: {0}")]
    Storage(#[from] DatabaseError),

    /// Stored secrets could not be encrypted or decrypted.
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),
}

impl From<GatewayError> for MailrouteError {
    fn from(err: GatewayError) -> Self {
        MailrouteError::RemoteApi {
            status: err.remote_status(),
            message: err.to_string(),
        }
    }
}

impl MailrouteError {
    /// HTTP status the error is reported with.
    ///
    /// Remote failures are always 500: the Cloudflare status is kept in the
    /// error for logging, not forwarded.
    pub fn status_code(&self) -> u16 {
        match self {
            MailrouteError::Validation(_) | MailrouteError::ConfigMissing => 400,
            MailrouteError::NotFound(_) => 404,
            MailrouteError::RemoteApi { .. }
            | MailrouteError::Storage(_)
            | MailrouteError::Secret(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, MailrouteError>;
