use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use costume_payments::cli::{Cli, Commands, DbCommands, TxCommands};
use costume_payments::config::Config;
use costume_payments::gateway::SnapClient;
use costume_payments::{cli, create_app, db, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) | None => serve(config).await,
        Some(Commands::Tx(TxCommands::Resolve {
            order_id,
            gross_amount,
        })) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_tx_resolve(&pool, &order_id, &gross_amount).await
        }
        Some(Commands::Tx(TxCommands::Show { id })) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_tx_show(&pool, &id).await
        }
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = SnapClient::from_config(&config.gateway);
    tracing::info!(
        "Payment gateway client initialized with URL: {}",
        config.gateway.base_url
    );

    let state = AppState::new(
        pool,
        Arc::new(gateway),
        config.gateway.server_key.clone(),
        config.gateway.merchant_name.clone(),
    );
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
