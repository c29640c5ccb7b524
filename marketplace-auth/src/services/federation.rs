//! Two-phase federated sign-in: build the authorization redirect, then
//! complete the callback into a session and a final redirect.

use metrics::counter;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{IdentityProvider, Session};
use crate::services::accounts::AccountResolver;
use crate::services::claims::resolve_claims;
use crate::services::error::FederationError;
use crate::services::keycloak::KeycloakClient;
use crate::services::notifications::Notifier;
use crate::services::sessions::SessionProvisioner;
use crate::services::store::Store;

pub const AUTH_FAILURE_PATH: &str = "/notice/authFailure";
pub const SIGN_UP_COMPLETE_PATH: &str = "/sign-up/complete";
pub const HOME_PATH: &str = "/";

/// Callback step at which a sign-in stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Exchanging,
    ResolvingClaims,
    ResolvingAccount,
    ProvisioningSession,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Exchanging => "exchanging",
            Stage::ResolvingClaims => "resolving_claims",
            Stage::ResolvingAccount => "resolving_account",
            Stage::ProvisioningSession => "provisioning_session",
        };
        f.write_str(stage)
    }
}

/// Terminal result of a callback: always a redirect, with a session only
/// when sign-in succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub location: String,
    pub session: Option<Session>,
}

impl Completion {
    pub fn failure() -> Self {
        Self {
            location: AUTH_FAILURE_PATH.to_string(),
            session: None,
        }
    }
}

/// Keep local paths and absolute URLs on `origin`. Off-site URLs,
/// protocol-relative `//host`, backslash tricks and anything that cannot
/// travel in a `Location` header are dropped.
pub fn sanitize_redirect<'a>(target: Option<&'a str>, origin: &str) -> Option<&'a str> {
    target.filter(|t| {
        if t.is_empty() || !t.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return false;
        }
        if t.contains('\\') {
            return false;
        }
        if t.starts_with('/') {
            return !t.starts_with("//");
        }
        is_same_origin(t, origin)
    })
}

fn is_same_origin(target: &str, origin: &str) -> bool {
    let (Ok(target), Ok(origin)) = (Url::parse(target), Url::parse(origin)) else {
        return false;
    };
    target.scheme() == origin.scheme()
        && target.host_str() == origin.host_str()
        && target.port_or_known_default() == origin.port_or_known_default()
}

/// Where to send the browser once a session exists.
pub fn success_location(redirect_on_success: Option<&str>, is_new_account: bool) -> String {
    match redirect_on_success {
        Some(target) => target.to_string(),
        None if is_new_account => SIGN_UP_COMPLETE_PATH.to_string(),
        None => HOME_PATH.to_string(),
    }
}

#[derive(Clone)]
pub struct FederationService {
    keycloak: KeycloakClient,
    accounts: AccountResolver,
    sessions: SessionProvisioner,
}

impl FederationService {
    pub fn new(keycloak: KeycloakClient, store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            accounts: AccountResolver::new(store.clone(), notifier),
            sessions: SessionProvisioner::new(store, keycloak.clone()),
            keycloak,
        }
    }

    /// Location of the provider's authorization endpoint. Unknown provider
    /// hints are ignored rather than rejected.
    pub fn sign_in_location(&self, provider: Option<&str>, redirect_on_success: Option<&str>) -> String {
        let hint = provider.and_then(|p| p.parse::<IdentityProvider>().ok());
        let redirect = sanitize_redirect(redirect_on_success, self.keycloak.origin());

        match self.keycloak.authorization_url(hint, redirect) {
            Ok(url) => {
                tracing::debug!(hint = hint.map(|h| h.as_str()), "Redirecting to identity provider");
                url
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build authorization URL");
                AUTH_FAILURE_PATH.to_string()
            }
        }
    }

    /// Run the callback and converge every failure on the failure redirect.
    #[tracing::instrument(skip_all)]
    pub async fn callback(&self, code: Option<&str>, redirect_on_success: Option<&str>) -> Completion {
        let redirect = sanitize_redirect(redirect_on_success, self.keycloak.origin());

        match self.complete_sign_in(code, redirect).await {
            Ok(completion) => completion,
            Err((stage, err)) => {
                match &err {
                    FederationError::UnknownIdentityProvider(tag) => {
                        tracing::error!(%stage, provider = %tag, "Unknown identity provider");
                    }
                    FederationError::AccountDeactivatedByAdmin => {
                        tracing::warn!(%stage, "Sign-in refused");
                    }
                    _ => tracing::error!(%stage, error = %err, "Authorization failed"),
                }
                counter!("auth_callback_total", "outcome" => "failure").increment(1);
                Completion::failure()
            }
        }
    }

    /// Exchange, resolve and provision, reporting the stage of any failure.
    pub async fn complete_sign_in(
        &self,
        code: Option<&str>,
        redirect_on_success: Option<&str>,
    ) -> Result<Completion, (Stage, FederationError)> {
        let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
            (
                Stage::Exchanging,
                FederationError::TokenExchange("Missing authorization code".to_string()),
            )
        })?;

        let tokens = self
            .keycloak
            .exchange_code(code, redirect_on_success)
            .await
            .map_err(|e| (Stage::Exchanging, e))?;

        let claims = resolve_claims(&tokens).map_err(|e| (Stage::ResolvingClaims, e))?;

        let account = self
            .accounts
            .resolve(&claims)
            .await
            .map_err(|e| (Stage::ResolvingAccount, e))?;

        let session = self
            .sessions
            .create(account.user.id, &claims.refresh_token)
            .await
            .map_err(|e| (Stage::ProvisioningSession, e))?;

        let outcome = if account.is_new_account {
            "new_account"
        } else {
            "existing_account"
        };
        counter!("auth_callback_total", "outcome" => outcome).increment(1);

        Ok(Completion {
            location: success_location(redirect_on_success, account.is_new_account),
            session: Some(session),
        })
    }

    pub async fn sign_out(&self, session_id: Uuid) -> Result<(), FederationError> {
        self.sessions.end(session_id).await
    }
}
