use anyhow::{bail, Context};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub auth: AuthConfig,
    pub links: LinkConfig,
    pub analytics: AnalyticsConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl AuthConfig {
    pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
    pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub short_code_length: usize,
    pub redirect_status: RedirectMode,
}

impl LinkConfig {
    pub const DEFAULT_SHORT_CODE_LENGTH: usize = 7;
    const MIN_SHORT_CODE_LENGTH: usize = 4;
    const MAX_SHORT_CODE_LENGTH: usize = 32;
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            short_code_length: Self::DEFAULT_SHORT_CODE_LENGTH,
            redirect_status: RedirectMode::default(),
        }
    }
}

/// HTTP status used when redirecting a visitor to the destination URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    MovedPermanently,
    #[default]
    Found,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectMode {
    pub fn status_code(self) -> StatusCode {
        match self {
            RedirectMode::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            RedirectMode::Found => StatusCode::FOUND,
            RedirectMode::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
            RedirectMode::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }

    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim() {
            "301" => Ok(RedirectMode::MovedPermanently),
            "302" => Ok(RedirectMode::Found),
            "307" => Ok(RedirectMode::TemporaryRedirect),
            "308" => Ok(RedirectMode::PermanentRedirect),
            other => bail!("unsupported REDIRECT_STATUS '{other}' (expected 301, 302, 307 or 308)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Only the socket peer address is recorded
    None,
    /// X-Forwarded-For / X-Real-IP are honoured before the peer address
    #[default]
    Standard,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin is allowed
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let environment = match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./shortly.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port")?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = std::env::var("REDIRECT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("REDIRECT_PORT must be a valid port")?;

        let access_token_secret = load_secret("JWT_SECRET", environment)?;
        let refresh_token_secret = load_secret("REFRESH_SECRET", environment)?;

        let access_token_ttl_secs = std::env::var("ACCESS_TOKEN_TTL_SECS")
            .ok()
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("ACCESS_TOKEN_TTL_SECS must be an integer")?
            .unwrap_or(AuthConfig::DEFAULT_ACCESS_TTL_SECS);
        let refresh_token_ttl_secs = std::env::var("REFRESH_TOKEN_TTL_SECS")
            .ok()
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("REFRESH_TOKEN_TTL_SECS must be an integer")?
            .unwrap_or(AuthConfig::DEFAULT_REFRESH_TTL_SECS);

        let short_code_length = std::env::var("SHORT_CODE_LENGTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(LinkConfig::DEFAULT_SHORT_CODE_LENGTH)
            .clamp(
                LinkConfig::MIN_SHORT_CODE_LENGTH,
                LinkConfig::MAX_SHORT_CODE_LENGTH,
            );

        let redirect_status = match std::env::var("REDIRECT_STATUS") {
            Ok(value) => RedirectMode::parse(&value)?,
            Err(_) => RedirectMode::default(),
        };

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "standard".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'standard'. Supported values: none, standard"
                );
                TrustedProxyMode::Standard
            }
        };

        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            environment,
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            auth: AuthConfig {
                access_token_secret,
                refresh_token_secret,
                access_token_ttl_secs,
                refresh_token_ttl_secs,
            },
            links: LinkConfig {
                short_code_length,
                redirect_status,
            },
            analytics: AnalyticsConfig { trusted_proxy_mode },
            cors: CorsConfig { allowed_origins },
        })
    }
}

fn load_secret(var: &str, environment: Environment) -> anyhow::Result<String> {
    match std::env::var(var) {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ if environment.is_production() => {
            bail!("{var} must be set when APP_ENV=production")
        }
        _ => {
            tracing::warn!(
                "{var} not configured, generating a random secret (tokens will not survive restarts)"
            );
            Ok(crate::auth::tokens::generate_secret())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_mode_parses_supported_codes() {
        assert_eq!(RedirectMode::parse("301").unwrap(), RedirectMode::MovedPermanently);
        assert_eq!(RedirectMode::parse(" 302 ").unwrap(), RedirectMode::Found);
        assert_eq!(RedirectMode::parse("307").unwrap(), RedirectMode::TemporaryRedirect);
        assert_eq!(RedirectMode::parse("308").unwrap(), RedirectMode::PermanentRedirect);
        assert!(RedirectMode::parse("200").is_err());
    }

    #[test]
    fn default_redirect_is_found() {
        assert_eq!(RedirectMode::default().status_code(), StatusCode::FOUND);
    }
}
