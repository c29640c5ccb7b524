//! Identity federation, account resolution and session provisioning.

pub mod accounts;
pub mod claims;
mod database;
pub mod error;
pub mod federation;
pub mod keycloak;
pub mod metrics;
pub mod notifications;
pub mod sessions;
pub mod store;

pub use accounts::{AccountResolver, ResolvedAccount};
pub use claims::{resolve_claims, IdentityClaims, ProviderTag, TokenSet};
pub use database::Database;
pub use error::FederationError;
pub use federation::{Completion, FederationService, Stage};
pub use keycloak::KeycloakClient;
pub use notifications::{EmailNotifier, LogNotifier, Notification, Notifier, RecordingNotifier};
pub use sessions::SessionProvisioner;
pub use store::{MemoryStore, Store, StoreOperation};
