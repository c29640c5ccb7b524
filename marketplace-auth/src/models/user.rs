//! User accounts created by identity federation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Account category, decided by which identity provider authenticated the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "GOV")]
    Government,
    #[serde(rename = "VENDOR")]
    Vendor,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Government => "GOV",
            UserType::Vendor => "VENDOR",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOV" => Ok(UserType::Government),
            "VENDOR" => Ok(UserType::Vendor),
            _ => Err(format!("Invalid user type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "DEACTIVATED_BY_USER")]
    InactiveByUser,
    #[serde(rename = "DEACTIVATED_BY_ADMIN")]
    InactiveByAdmin,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::InactiveByUser => "DEACTIVATED_BY_USER",
            UserStatus::InactiveByAdmin => "DEACTIVATED_BY_ADMIN",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "DEACTIVATED_BY_USER" => Ok(UserStatus::InactiveByUser),
            "DEACTIVATED_BY_ADMIN" => Ok(UserStatus::InactiveByAdmin),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// Identity providers brokered by Keycloak.
///
/// The tag doubles as the `kc_idp_hint` value on sign-in and as the suffix
/// Keycloak appends to `preferred_username` (`handle@tag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityProvider {
    Github,
    Idir,
}

impl IdentityProvider {
    pub const ALL: [IdentityProvider; 2] = [IdentityProvider::Github, IdentityProvider::Idir];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityProvider::Github => "github",
            IdentityProvider::Idir => "idir",
        }
    }

    pub fn user_type(&self) -> UserType {
        match self {
            IdentityProvider::Idir => UserType::Government,
            IdentityProvider::Github => UserType::Vendor,
        }
    }
}

impl FromStr for IdentityProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(IdentityProvider::Github),
            "idir" => Ok(IdentityProvider::Idir),
            _ => Err(format!("Unknown identity provider: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub user_type: UserType,
    pub status: UserStatus,
    pub name: String,
    /// Empty when the identity provider did not release an address.
    pub email: String,
    pub job_title: String,
    /// Provider-qualified username (`handle@provider`), unique per user type.
    pub idp_username: String,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn email_address(&self) -> Option<&str> {
        Some(self.email.as_str()).filter(|email| !email.trim().is_empty())
    }
}

/// Fields supplied when a user is first provisioned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_type: UserType,
    pub status: UserStatus,
    pub name: String,
    pub email: String,
    pub job_title: String,
    pub idp_username: String,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            user_type: self.user_type,
            status: self.status,
            name: self.name,
            email: self.email,
            job_title: self.job_title,
            idp_username: self.idp_username,
            accepted_terms_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row shape of the `users` table; codes are stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub user_type: String,
    pub status: String,
    pub name: String,
    pub email: String,
    pub job_title: String,
    pub idp_username: String,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            user_type: row.user_type.parse()?,
            status: row.status.parse()?,
            name: row.name,
            email: row.email,
            job_title: row.job_title,
            idp_username: row.idp_username,
            accepted_terms_at: row.accepted_terms_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tags_map_to_account_types() {
        assert_eq!(
            "idir".parse::<IdentityProvider>().unwrap().user_type(),
            UserType::Government
        );
        assert_eq!(
            "github".parse::<IdentityProvider>().unwrap().user_type(),
            UserType::Vendor
        );
        assert!("GitHub".parse::<IdentityProvider>().is_err());
    }

    #[test]
    fn status_codes_round_trip_through_text_columns() {
        for status in [
            UserStatus::Active,
            UserStatus::InactiveByUser,
            UserStatus::InactiveByAdmin,
        ] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn blank_email_is_no_address() {
        let mut user = NewUser {
            user_type: UserType::Vendor,
            status: UserStatus::Active,
            name: "Bob".to_string(),
            email: String::new(),
            job_title: String::new(),
            idp_username: "bob@github".to_string(),
        }
        .into_user(Utc::now());
        assert_eq!(user.email_address(), None);

        user.email = "bob@example.com".to_string();
        assert_eq!(user.email_address(), Some("bob@example.com"));
    }
}
