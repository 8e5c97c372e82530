use serde::Serialize;
use sqlx::FromRow;

/// Stored account row. Never serialized directly: it carries the password
/// hash and the refresh token fingerprint.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
    pub created_at: i64,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: i64,
    pub email: String,
    pub created_at: i64,
}

/// Operator view of an account, used by `shortly-admin`
#[derive(Debug, Clone, FromRow)]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub created_at: i64,
    pub link_count: i64,
    pub has_session: bool,
}
