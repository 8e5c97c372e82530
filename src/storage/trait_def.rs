use crate::models::{Account, AccountSummary, ShortLink, Visit};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    DuplicateShortCode,
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Other(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Create an account; fails with `DuplicateEmail` if the email is taken
    async fn create_account(&self, email: &str, password_hash: &str) -> StorageResult<Account>;

    async fn get_account(&self, account_id: i64) -> Result<Option<Account>>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Find the account whose stored refresh fingerprint equals `token_hash`
    async fn find_account_by_refresh_token(&self, token_hash: &str) -> Result<Option<Account>>;

    /// Overwrite (or clear) the stored refresh fingerprint
    async fn set_refresh_token(&self, account_id: i64, token_hash: Option<&str>) -> Result<()>;

    /// Replace the refresh fingerprint only if it still equals `current`.
    /// Returns false when another request rotated or cleared it first.
    async fn rotate_refresh_token(
        &self,
        account_id: i64,
        current: &str,
        next: &str,
    ) -> Result<bool>;

    /// Clear whichever account holds `token_hash`; false if none does
    async fn clear_refresh_token(&self, token_hash: &str) -> Result<bool>;

    /// Update email and/or password hash; `DuplicateEmail` if the new email is taken
    async fn update_account(
        &self,
        account_id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> StorageResult<bool>;

    async fn list_accounts(&self) -> Result<Vec<AccountSummary>>;

    /// Insert a link; fails with `DuplicateShortCode` instead of overwriting
    async fn create_link(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: i64,
    ) -> StorageResult<ShortLink>;

    /// Get a link (with its click records) by short code
    async fn get_link(&self, short_code: &str) -> Result<Option<ShortLink>>;

    /// Links owned by an account, newest first, with click records.
    /// `created_since` is an inclusive unix timestamp lower bound.
    async fn list_links(
        &self,
        owner_id: i64,
        created_since: Option<i64>,
    ) -> Result<Vec<ShortLink>>;

    /// Delete a link only if `owner_id` owns it
    async fn delete_link(&self, link_id: i64, owner_id: i64) -> Result<bool>;

    /// Atomically increment the click count and append the click record.
    /// Returns the destination URL, or `None` for an unknown code.
    async fn record_click(&self, short_code: &str, visit: &Visit) -> Result<Option<String>>;
}
