use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use licensor::config::Config;
use licensor::db::{SqliteLicenseStore, open_pool};
use licensor::email::{Notifier, ResendMailer};
use licensor::fulfillment::{FulfillmentSettings, OrderFulfillment};
use licensor::handlers;
use licensor::keys::generate_license_key;
use licensor::payments::PaypalClient;
use licensor::state::AppState;
use licensor::store::LicenseStore;

#[derive(Parser)]
#[command(name = "licensor", version, about = "License sales and verification server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print freshly generated license keys
    GenerateKey {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Command::GenerateKey { prefix, count } => {
            let prefix = prefix.unwrap_or_else(|| config.license_key_prefix.clone());
            for _ in 0..count {
                println!("{}", generate_license_key(&prefix));
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let licenses: Option<Arc<dyn LicenseStore>> = match open_pool(&config.database_path) {
        Ok(pool) => {
            tracing::info!(path = %config.database_path, "License store opened");
            Some(Arc::new(SqliteLicenseStore::new(pool)))
        }
        Err(e) => {
            tracing::warn!(
                path = %config.database_path,
                error = %e,
                "License store unavailable, store-backed endpoints will answer 503"
            );
            None
        }
    };

    if config.paypal.client_id.is_none() || config.paypal.client_secret.is_none() {
        tracing::warn!("PayPal credentials not configured, checkout is disabled");
    }
    let payments = Arc::new(PaypalClient::new(&config.paypal));

    let notifier: Option<Arc<dyn Notifier>> = match &config.email.resend_api_key {
        Some(key) => Some(Arc::new(ResendMailer::new(key.clone()))),
        None => {
            tracing::warn!("RESEND_API_KEY not set, emails will not be sent");
            None
        }
    };
    if config.email.admin_email.is_none() {
        tracing::warn!("ADMIN_EMAIL not set, sale notifications and contact form are disabled");
    }
    if config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY not set, POST /license is unguarded");
    }

    let fulfillment = OrderFulfillment::new(
        payments,
        licenses,
        notifier,
        FulfillmentSettings {
            license_key_prefix: config.license_key_prefix.clone(),
            email_from: config.email.from.clone(),
            admin_email: config.email.admin_email.clone(),
            verify_require_key: config.verify_require_key,
        },
    );

    let state = AppState::new(fulfillment, &config);
    let app = handlers::router(state, &config);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        environment = %config.paypal.environment,
        verify_require_key = config.verify_require_key,
        "Server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
