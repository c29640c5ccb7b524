use std::sync::Arc;

use crate::models::{NewUser, User, UserStatus};
use crate::services::claims::IdentityClaims;
use crate::services::error::FederationError;
use crate::services::notifications::Notifier;
use crate::services::store::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccount {
    pub user: User,
    pub is_new_account: bool,
}

/// Maps a federated identity onto a local user record.
#[derive(Clone)]
pub struct AccountResolver {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl AccountResolver {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    #[tracing::instrument(skip_all, fields(account_type = claims.account_type.as_str()))]
    pub async fn resolve(&self, claims: &IdentityClaims) -> Result<ResolvedAccount, FederationError> {
        let existing = self
            .store
            .find_user_by_type_and_username(claims.account_type, &claims.username)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User lookup failed");
                e
            })?;

        let Some(user) = existing else {
            return self.register(claims).await;
        };

        match user.status {
            UserStatus::Active => Ok(ResolvedAccount {
                user,
                is_new_account: false,
            }),
            UserStatus::InactiveByUser => {
                let user = self
                    .store
                    .update_user_status(user.id, UserStatus::Active)
                    .await?;
                tracing::info!(user_id = %user.id, "Reactivated account deactivated by its owner");
                self.notifier.account_reactivated(&user);
                Ok(ResolvedAccount {
                    user,
                    is_new_account: false,
                })
            }
            UserStatus::InactiveByAdmin => {
                tracing::warn!(user_id = %user.id, "Sign-in refused for account deactivated by an administrator");
                Err(FederationError::AccountDeactivatedByAdmin)
            }
        }
    }

    async fn register(&self, claims: &IdentityClaims) -> Result<ResolvedAccount, FederationError> {
        let user = self
            .store
            .create_user(NewUser {
                user_type: claims.account_type,
                status: UserStatus::Active,
                name: claims.display_name.clone().unwrap_or_default(),
                email: claims.email.clone().unwrap_or_default(),
                job_title: String::new(),
                idp_username: claims.username.clone(),
            })
            .await?;

        tracing::info!(user_id = %user.id, user_type = user.user_type.as_str(), "Registered new account");

        if claims.email.is_some() {
            self.notifier.account_registered(&user);
        }

        Ok(ResolvedAccount {
            user,
            is_new_account: true,
        })
    }
}
