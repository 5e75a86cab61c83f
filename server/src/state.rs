//! Shared state handed to every request handler.

use std::sync::Arc;

use mailroute::{CloudflareGateway, CredentialStore, Database, RoutingService, SecretCipher};

/// Application state. Every field is a cheap handle, so cloning per request is fine.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub routing: RoutingService,
    /// Include plain secret values (`_full`) in the config read.
    pub reveal_secrets: bool,
}

impl AppState {
    pub fn new(
        db: Database,
        gateway: CloudflareGateway,
        cipher: Option<Arc<SecretCipher>>,
        reveal_secrets: bool,
    ) -> Self {
        let credentials = CredentialStore::new(db.clone(), cipher);
        let routing = RoutingService::new(db, gateway, credentials.clone());
        Self {
            credentials,
            routing,
            reveal_secrets,
        }
    }
}
