use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::config::Config;
use crate::db::pending::{self, Orders, TopUps};
use crate::error::AppError;
use crate::services::TransactionResolver;

#[derive(Parser)]
#[command(name = "costume-payments")]
#[command(about = "Costume rental checkout and payment reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Pending transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Settle a pending order or top-up as if a settlement notification arrived
    Resolve {
        #[arg(value_name = "ORDER_ID")]
        order_id: String,
        /// Paid amount, e.g. 150000.00
        #[arg(value_name = "GROSS_AMOUNT")]
        gross_amount: String,
    },

    /// Show a pending order or top-up
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_resolve(
    pool: &PgPool,
    order_id: &str,
    gross_amount: &str,
) -> anyhow::Result<()> {
    let resolver = TransactionResolver::new(pool.clone());
    let resolution = resolver.resolve(order_id, gross_amount).await?;

    println!("✓ {}: {}", order_id, resolution.label());
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

pub async fn handle_tx_show(pool: &PgPool, id: &str) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;

    match pending::find::<Orders>(&mut conn, id).await {
        Ok(order) => {
            println!("Order {}", id);
            println!("{}", serde_json::to_string_pretty(&order)?);
            return Ok(());
        }
        Err(AppError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    match pending::find::<TopUps>(&mut conn, id).await {
        Ok(top_up) => {
            println!("Top-up {}", id);
            println!("{}", serde_json::to_string_pretty(&top_up)?);
            Ok(())
        }
        Err(AppError::NotFound(_)) => {
            tracing::warn!("Pending transaction {} not found", id);
            anyhow::bail!("No order or top-up with id {}", id)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Database Max Connections: {}", config.database_max_connections);
    println!("  Payment Gateway URL: {}", config.gateway.base_url);
    println!("  Payment Server Key: {}", mask_secret(&config.gateway.server_key));
    println!("  Merchant Name: {}", config.gateway.merchant_name);
    println!(
        "  Gateway Circuit Breaker: {} failures, {}s reset, {}s timeout",
        config.gateway.failure_threshold,
        config.gateway.reset_timeout_secs,
        config.gateway.timeout_secs
    );

    config.validate()?;

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    if secret.chars().count() <= 10 {
        return "****".to_string();
    }
    format!("{}****", prefix)
}
