//! Identity claims carried by a Keycloak token response.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::models::{IdentityProvider, UserType};
use crate::services::error::FederationError;

/// Token endpoint response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenSet {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

/// The subset of ID token claims used for account resolution.
#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    preferred_username: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// Provider tag parsed from a `handle@tag` username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderTag {
    Known(IdentityProvider),
    Unrecognized(String),
}

impl ProviderTag {
    /// Classify the text after the last `@`. A username with no `@` is
    /// treated as a tag in its own right and is never recognized.
    pub fn from_username(username: &str) -> Self {
        let tag = match username.rfind('@') {
            Some(idx) => &username[idx + 1..],
            None => username,
        };
        match tag.parse::<IdentityProvider>() {
            Ok(provider) => ProviderTag::Known(provider),
            Err(_) => ProviderTag::Unrecognized(tag.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityClaims {
    /// Provider-qualified username, stored verbatim.
    pub username: String,
    pub account_type: UserType,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
}

fn decode_id_token(token: &str) -> Result<IdTokenClaims, FederationError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(FederationError::InvalidClaims(
            "Invalid ID token format".to_string(),
        ));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| {
            FederationError::InvalidClaims(format!("Failed to decode ID token payload: {}", e))
        })?;

    serde_json::from_slice(&payload)
        .map_err(|e| FederationError::InvalidClaims(format!("Failed to parse ID token claims: {}", e)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Extract and validate identity claims from an exchanged token set.
///
/// The signature is not verified: the token arrived directly from the
/// token endpoint over a back-channel call authenticated with the client
/// secret.
pub fn resolve_claims(tokens: &TokenSet) -> Result<IdentityClaims, FederationError> {
    let claims = match tokens.id_token.as_deref() {
        Some(id_token) => decode_id_token(id_token)?,
        None => IdTokenClaims::default(),
    };

    let (username, access_token, refresh_token) = match (
        non_empty(claims.preferred_username),
        non_empty(tokens.access_token.clone()),
        non_empty(tokens.refresh_token.clone()),
    ) {
        (Some(username), Some(access), Some(refresh)) => (username, access, refresh),
        _ => {
            return Err(FederationError::InvalidClaims(
                "preferred_username, access_token and refresh_token are required".to_string(),
            ))
        }
    };

    let account_type = match ProviderTag::from_username(&username) {
        ProviderTag::Known(provider) => provider.user_type(),
        ProviderTag::Unrecognized(tag) => {
            return Err(FederationError::UnknownIdentityProvider(tag));
        }
    };

    Ok(IdentityClaims {
        username,
        account_type,
        display_name: non_empty(claims.name),
        email: non_empty(claims.email),
        access_token,
        refresh_token,
    })
}
