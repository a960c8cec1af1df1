//! # Salon Server
//!
//! Main binary for the booking backend:
//! - REST API (HTTP)
//! - WebSocket Gateway (appointment events)
//! - Admin commands (migrations, first admin account)
//!
//! ```bash
//! salon serve
//! salon migrate
//! salon create-admin -e owner@example.com
//! ```

use clap::{Parser, Subcommand};
use rand::{Rng, distr::Alphanumeric};
use salon_api::{AppState, build_router, mailer::Mailer, payments::PaymentClient};
use salon_common::{
    config::AppConfig, gateway_event::GatewayEvent, models::Role, scheduling::WorkingWindow,
};
use salon_db::{
    Database,
    repository::accounts,
    storage::ImageStore,
};
use salon_gateway::GatewayState;
use std::{net::SocketAddr, time::Instant};
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "salon")]
#[command(author, version, about = "Salon booking backend")]
struct Cli {
    /// Log as JSON lines instead of human-readable text
    #[arg(long, global = true, env = "SALON_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations, then serve the API and gateway (default)
    Serve {
        /// Don't run migrations on startup
        #[arg(long)]
        skip_migrations: bool,
    },
    /// Run database migrations and exit
    Migrate,
    /// Create an admin account
    CreateAdmin {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Password; a random one is generated and printed when omitted
        #[arg(short, long, env = "SALON_ADMIN_PASSWORD")]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = salon_common::config::init()?;

    init_tracing(cli.json_logs);

    match cli.command.unwrap_or(Commands::Serve {
        skip_migrations: false,
    }) {
        Commands::Serve { skip_migrations } => serve(config, skip_migrations).await,
        Commands::Migrate => {
            let db = Database::connect(config).await?;
            db.migrate().await
        }
        Commands::CreateAdmin { email, password } => {
            create_admin(config, &email, password).await
        }
    }
}

/// Structured logging; `RUST_LOG` overrides the default filter.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "salon_server=debug,salon_api=debug,salon_db=debug,salon_gateway=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    }
}

async fn serve(config: &'static AppConfig, skip_migrations: bool) -> anyhow::Result<()> {
    tracing::info!("Starting salon backend v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    if !skip_migrations {
        db.migrate().await?;
    }

    // === Shared event broadcast channel ===
    // The API publishes an event after each committed appointment write; the
    // gateway fans it out to identified sockets.
    let (gateway_tx, _) = broadcast::channel::<GatewayEvent>(1_024);

    // === Object Storage (S3-compatible) ===
    let images = ImageStore::new(&config.storage);
    images.ensure_bucket().await?;
    tracing::info!(bucket = %config.storage.bucket, "Object storage ready");

    let payments = PaymentClient::new(&config.payment)?;

    let mailer = match &config.smtp {
        Some(smtp) => match Mailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!(host = %smtp.host, "SMTP relay configured");
                Some(mailer)
            }
            Err(e) => {
                tracing::warn!("SMTP disabled, relay setup failed: {e}");
                None
            }
        },
        None => {
            tracing::info!("SMTP not configured, confirmation emails disabled");
            None
        }
    };

    let window =
        WorkingWindow::from_hours(config.schedule.opening_hour, config.schedule.closing_hour)?;

    // === REST API Server ===
    let api_state = AppState {
        db: db.clone(),
        gateway_tx: gateway_tx.clone(),
        images,
        payments,
        mailer,
        window,
        started_at: Instant::now(),
    };
    let api_router = build_router(api_state);
    let api_addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // === WebSocket Gateway ===
    let gateway_state = GatewayState::with_broadcast(db, gateway_tx);
    let gateway_router = salon_gateway::build_router(gateway_state);
    let gateway_addr = SocketAddr::new(config.server.host.parse()?, config.server.gateway_port);

    tracing::info!("REST API listening on http://{api_addr}");
    tracing::info!("Gateway listening on ws://{gateway_addr}");

    tokio::try_join!(
        // REST API
        async {
            let listener = tokio::net::TcpListener::bind(api_addr).await?;
            axum::serve(listener, api_router).await?;
            Ok::<_, anyhow::Error>(())
        },
        // WebSocket Gateway
        async {
            let listener = tokio::net::TcpListener::bind(gateway_addr).await?;
            axum::serve(listener, gateway_router).await?;
            Ok::<_, anyhow::Error>(())
        },
    )?;

    Ok(())
}

async fn create_admin(
    config: &'static AppConfig,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        anyhow::bail!("'{email}' is not an email address");
    }

    let db = Database::connect(config).await?;
    if accounts::find_by_email(&db.pg, &email).await?.is_some() {
        anyhow::bail!("An account for {email} already exists");
    }

    let generated = password.is_none();
    let password = password.unwrap_or_else(|| {
        rand::rng()
            .sample_iter(Alphanumeric)
            .take(20)
            .map(char::from)
            .collect()
    });
    if password.len() < 8 {
        anyhow::bail!("Password must be at least 8 characters");
    }

    let hash = salon_api::auth::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    let account =
        accounts::create_account(&db.pg, uuid::Uuid::now_v7(), &email, &hash, Role::Admin).await?;

    tracing::info!(account_id = %account.id, %email, "Admin account created");
    if generated {
        println!("Generated password for {email}: {password}");
    }
    Ok(())
}
