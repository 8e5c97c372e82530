use crate::models::{Account, AccountSummary, ClickRecord, ShortLink, Visit};
use crate::storage::{attach_clicks, is_unique_violation, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, refresh_token_hash, created_at";
const LINK_COLUMNS: &str = "id, original_url, short_code, owner_id, clicks, created_at";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn clicks_for_link(&self, link_id: i64) -> Result<Vec<ClickRecord>> {
        let clicks = sqlx::query_as::<_, ClickRecord>(
            r#"
            SELECT link_id, clicked_at, user_agent, ip_address, referer, device, browser, os
            FROM clicks
            WHERE link_id = $1
            ORDER BY id
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(clicks)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                refresh_token_hash TEXT,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_accounts_refresh_token ON accounts(refresh_token_hash)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                owner_id BIGINT NOT NULL REFERENCES accounts(id),
                clicks BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner_id, created_at)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id BIGSERIAL PRIMARY KEY,
                link_id BIGINT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                clicked_at BIGINT NOT NULL,
                user_agent TEXT,
                ip_address TEXT,
                referer TEXT,
                device TEXT NOT NULL,
                browser TEXT NOT NULL,
                os TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_link ON clicks(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_account(&self, email: &str, password_hash: &str) -> StorageResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (email, password_hash, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        account.ok_or(StorageError::DuplicateEmail)
    }

    async fn get_account(&self, account_id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn find_account_by_refresh_token(&self, token_hash: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE refresh_token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn set_refresh_token(&self, account_id: i64, token_hash: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE accounts SET refresh_token_hash = $1 WHERE id = $2")
            .bind(token_hash)
            .bind(account_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        account_id: i64,
        current: &str,
        next: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token_hash = $1
            WHERE id = $2 AND refresh_token_hash = $3
            "#,
        )
        .bind(next)
        .bind(account_id)
        .bind(current)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token_hash = NULL WHERE refresh_token_hash = $1",
        )
        .bind(token_hash)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_account(
        &self,
        account_id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email = COALESCE($1, email),
                password_hash = COALESCE($2, password_hash)
            WHERE id = $3
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(account_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::DuplicateEmail
            } else {
                e.into()
            }
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let accounts = sqlx::query_as::<_, AccountSummary>(
            r#"
            SELECT a.id, a.email, a.created_at,
                   COUNT(l.id) AS link_count,
                   (a.refresh_token_hash IS NOT NULL) AS has_session
            FROM accounts a
            LEFT JOIN links l ON l.owner_id = a.id
            GROUP BY a.id
            ORDER BY a.id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(accounts)
    }

    async fn create_link(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: i64,
    ) -> StorageResult<ShortLink> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            r#"
            INSERT INTO links (short_code, original_url, owner_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(short_code)
        .bind(original_url)
        .bind(owner_id)
        .bind(now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        link.ok_or(StorageError::DuplicateShortCode)
    }

    async fn get_link(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = $1"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match link {
            Some(mut link) => {
                link.click_details = self.clicks_for_link(link.id).await?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }

    async fn list_links(
        &self,
        owner_id: i64,
        created_since: Option<i64>,
    ) -> Result<Vec<ShortLink>> {
        let since = created_since.unwrap_or(i64::MIN);

        let mut links = sqlx::query_as::<_, ShortLink>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE owner_id = $1 AND created_at >= $2
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(owner_id)
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        if links.is_empty() {
            return Ok(links);
        }

        let clicks = sqlx::query_as::<_, ClickRecord>(
            r#"
            SELECT c.link_id, c.clicked_at, c.user_agent, c.ip_address, c.referer,
                   c.device, c.browser, c.os
            FROM clicks c
            JOIN links l ON l.id = c.link_id
            WHERE l.owner_id = $1 AND l.created_at >= $2
            ORDER BY c.id
            "#,
        )
        .bind(owner_id)
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        attach_clicks(&mut links, clicks);
        Ok(links)
    }

    async fn delete_link(&self, link_id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND owner_id = $2")
            .bind(link_id)
            .bind(owner_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_click(&self, short_code: &str, visit: &Visit) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;

        // Row lock from the UPDATE serializes concurrent redirects of one code
        let target = sqlx::query_as::<_, (i64, String)>(
            r#"
            UPDATE links
            SET clicks = clicks + 1
            WHERE short_code = $1
            RETURNING id, original_url
            "#,
        )
        .bind(short_code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((link_id, original_url)) = target else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO clicks (link_id, clicked_at, user_agent, ip_address, referer, device, browser, os)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(link_id)
        .bind(visit.clicked_at)
        .bind(visit.user_agent.as_deref())
        .bind(visit.ip_address.as_deref())
        .bind(visit.referer.as_deref())
        .bind(&visit.client.device)
        .bind(&visit.client.browser)
        .bind(&visit.client.os)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(original_url))
    }
}
