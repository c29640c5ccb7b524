use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A signed-in browser session.
///
/// `access_token` holds the identity provider's refresh token; it is what
/// sign-out revokes upstream.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, access_token: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            access_token,
            created_at: now,
            updated_at: now,
        }
    }
}
