//! Account credentials and the refresh-token lifecycle
//!
//! Each account holds at most one live refresh token (stored as its
//! fingerprint). Logging in replaces it, refreshing rotates it with a
//! compare-and-swap, and logging out clears it.

use serde::Serialize;
use std::sync::Arc;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::{fingerprint, TokenService};
use crate::error::{AppError, AppResult, AuthFailure};
use crate::models::{Account, AccountProfile};
use crate::storage::{Storage, StorageError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: i64,
}

/// Already-validated profile changes
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct SessionManager {
    storage: Arc<dyn Storage>,
    tokens: Arc<TokenService>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn Storage>, tokens: Arc<TokenService>) -> Self {
        Self { storage, tokens }
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.tokens.clone()
    }

    pub async fn register(&self, email: &str, password: &str) -> AppResult<Account> {
        let password_hash = hash_blocking(password.to_string()).await?;
        let account = self.storage.create_account(email, &password_hash).await?;
        tracing::info!("Registered account {}", account.id);
        Ok(account)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<SessionTokens> {
        let account = self
            .storage
            .get_account_by_email(email)
            .await?
            .ok_or(AuthFailure::AccountNotFound)?;

        if !verify_blocking(password.to_string(), account.password_hash.clone()).await? {
            return Err(AuthFailure::InvalidPassword.into());
        }

        let pair = self.tokens.issue_pair(account.id)?;
        // Replaces any previous session
        self.storage
            .set_refresh_token(account.id, Some(&fingerprint(&pair.refresh_token)))
            .await?;

        Ok(SessionTokens {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user_id: account.id,
        })
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> AppResult<SessionTokens> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthFailure::MissingRefreshToken)?;
        let current = fingerprint(token);

        let account = self
            .storage
            .find_account_by_refresh_token(&current)
            .await?
            .ok_or(AuthFailure::InvalidRefreshToken)?;

        let claims = match self.tokens.validate_refresh_token(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!("Refresh token for account {} rejected: {}", account.id, err);
                self.storage.set_refresh_token(account.id, None).await?;
                return Err(AuthFailure::InvalidRefreshToken.into());
            }
        };

        if claims.account_id().ok() != Some(account.id) {
            return Err(AuthFailure::InvalidRefreshToken.into());
        }

        let pair = self.tokens.issue_pair(account.id)?;
        let rotated = self
            .storage
            .rotate_refresh_token(account.id, &current, &fingerprint(&pair.refresh_token))
            .await?;
        if !rotated {
            return Err(AuthFailure::InvalidRefreshToken.into());
        }

        Ok(SessionTokens {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user_id: account.id,
        })
    }

    pub async fn logout(&self, refresh_token: Option<&str>) -> AppResult<()> {
        if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
            if self.storage.clear_refresh_token(&fingerprint(token)).await? {
                tracing::debug!("Session cleared");
            }
        }
        Ok(())
    }

    pub async fn profile(&self, account_id: i64) -> AppResult<AccountProfile> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or(AuthFailure::AccountNotFound)?;
        Ok(account.profile())
    }

    /// Apply profile changes, returning the email now on the account
    pub async fn update_profile(&self, account_id: i64, update: ProfileUpdate) -> AppResult<String> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or(AuthFailure::AccountNotFound)?;

        let new_hash = match update.new_password {
            Some(new_password) => {
                let current = update.current_password.unwrap_or_default();
                if !verify_blocking(current, account.password_hash.clone()).await? {
                    return Err(AppError::bad_request("Current password is incorrect"));
                }
                Some(hash_blocking(new_password).await?)
            }
            None => None,
        };

        let new_email = update.email.filter(|email| *email != account.email);

        if new_email.is_none() && new_hash.is_none() {
            return Ok(account.email);
        }

        match self
            .storage
            .update_account(account.id, new_email.as_deref(), new_hash.as_deref())
            .await
        {
            Ok(_) => {}
            Err(StorageError::DuplicateEmail) => {
                return Err(AppError::bad_request("Email already in use"));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(new_email.unwrap_or(account.email))
    }
}

// Argon2 hashing blocks for tens of milliseconds
async fn hash_blocking(password: String) -> AppResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(hash)
}

async fn verify_blocking(password: String, hash: String) -> AppResult<bool> {
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(valid)
}
