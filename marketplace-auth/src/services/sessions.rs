use std::sync::Arc;
use uuid::Uuid;

use crate::models::Session;
use crate::services::error::FederationError;
use crate::services::keycloak::KeycloakClient;
use crate::services::store::Store;

/// Creates and ends browser sessions.
#[derive(Clone)]
pub struct SessionProvisioner {
    store: Arc<dyn Store>,
    keycloak: KeycloakClient,
}

impl SessionProvisioner {
    pub fn new(store: Arc<dyn Store>, keycloak: KeycloakClient) -> Self {
        Self { store, keycloak }
    }

    /// Persist a session holding the provider refresh token.
    pub async fn create(&self, user_id: Uuid, refresh_token: &str) -> Result<Session, FederationError> {
        let session = self.store.create_session(user_id, refresh_token).await?;
        tracing::info!(session_id = %session.id, user_id = %user_id, "Session created");
        Ok(session)
    }

    /// Delete the session and revoke its refresh token upstream.
    ///
    /// Revocation is best effort: the local session is gone either way.
    pub async fn end(&self, session_id: Uuid) -> Result<(), FederationError> {
        let Some(session) = self.store.find_session(session_id).await? else {
            return Ok(());
        };

        self.store.delete_session(session.id).await?;
        tracing::info!(session_id = %session.id, user_id = %session.user_id, "Session ended");

        if let Err(e) = self.keycloak.revoke(&session.access_token).await {
            tracing::warn!(session_id = %session.id, error = %e, "Refresh token revocation failed");
        }
        Ok(())
    }
}
