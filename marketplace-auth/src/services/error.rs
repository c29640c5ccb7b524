use service_core::error::AppError;
use thiserror::Error;

/// Failures raised while completing a federated sign-in.
///
/// Every variant ends in the same authentication-failure redirect; the
/// variant only decides what gets logged.
#[derive(Error, Debug)]
pub enum FederationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid identity claims: {0}")]
    InvalidClaims(String),

    #[error("Unknown identity provider: {0}")]
    UnknownIdentityProvider(String),

    #[error("Account deactivated by an administrator")]
    AccountDeactivatedByAdmin,

    #[error("Persistence error: {0}")]
    Persistence(#[from] AppError),
}

impl From<FederationError> for AppError {
    fn from(err: FederationError) -> Self {
        match err {
            FederationError::Configuration(e) => AppError::ConfigError(anyhow::anyhow!(e)),
            FederationError::TokenExchange(e) => AppError::BadGateway(e),
            FederationError::InvalidClaims(e) => AppError::Unauthorized(anyhow::anyhow!(e)),
            FederationError::UnknownIdentityProvider(tag) => {
                AppError::Unauthorized(anyhow::anyhow!("Unknown identity provider: {}", tag))
            }
            FederationError::AccountDeactivatedByAdmin => {
                AppError::Unauthorized(anyhow::anyhow!("Account deactivated by an administrator"))
            }
            FederationError::Persistence(e) => e,
        }
    }
}
