pub mod cloudflare;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod routing;
pub mod secrets;

pub use cloudflare::{CloudflareGateway, GatewayError, Zone};
pub use config::{AppConfig, ConfigError};
pub use credentials::{CredentialInput, CredentialStore, CredentialView, Credentials};
pub use db::routing_repo::RoutingRow;
pub use db::{Database, DatabaseError};
pub use error::{MailrouteError, Result};
pub use routing::{CreateRoutingRequest, DeleteRoutingRequest, RoutingService};
pub use secrets::{mask_secret, resolve_secret, resolve_secret_optional, SecretError, SecretCipher};
