use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use shortly::config::Config;
use shortly::storage;

#[derive(Parser)]
#[command(name = "shortly-admin")]
#[command(about = "Shortly account management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List accounts with their link counts and session state
    Accounts,
    /// Clear an account's refresh token, forcing it to log in again
    Revoke {
        /// Account email
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Accounts => {
            let accounts = storage.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<8} {:<40} {:<8} {:<9} {}",
                    "ID", "Email", "Links", "Session", "Created"
                );
                println!("{}", "-".repeat(90));
                for account in accounts {
                    let created = Utc
                        .timestamp_opt(account.created_at, 0)
                        .single()
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| account.created_at.to_string());
                    println!(
                        "{:<8} {:<40} {:<8} {:<9} {}",
                        account.id,
                        account.email,
                        account.link_count,
                        if account.has_session { "active" } else { "-" },
                        created
                    );
                }
            }
        }
        Commands::Revoke { email } => {
            let email = email.trim().to_lowercase();
            let Some(account) = storage.get_account_by_email(&email).await? else {
                bail!("No account registered for '{}'", email);
            };

            if account.refresh_token_hash.is_some() {
                storage.set_refresh_token(account.id, None).await?;
                println!("Revoked session for '{}'", email);
            } else {
                println!("'{}' has no active session", email);
            }
        }
    }

    Ok(())
}
