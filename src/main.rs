//! club-dues server binary.
//!
//! Loads configuration from the environment, picks a store, bootstraps the
//! first admin and serves the HTTP API until Ctrl+C.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use club_dues::adapters::http::{build_app, AppState, RouterOptions};
use club_dues::adapters::memory::InMemoryStore;
use club_dues::adapters::postgres::{
    run_migrations, PostgresCycleRepository, PostgresInvitationRepository,
    PostgresMemberDuesRepository, PostgresMemberRepository, PostgresPaymentRepository,
};
use club_dues::adapters::stripe::{StripeConfig, StripeWebhookGateway};
use club_dues::application::services::CycleDefaults;
use club_dues::application::{ClubServices, Repositories};
use club_dues::config::{AppConfig, DatabaseConfig};
use club_dues::domain::ClubError;

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

fn load_config() -> Result<AppConfig, Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let repos = match config.database.postgres_url() {
        Some(url) => postgres_repositories(url, &config.database).await?,
        None => {
            tracing::warn!("No database URL configured; using in-memory store");
            Repositories::shared(Arc::new(InMemoryStore::new()))
        }
    };

    let defaults = CycleDefaults {
        calendar: config.dues.calendar()?,
        currency: config.dues.currency()?,
        grace_days: config.dues.default_grace_days,
    };
    let services = ClubServices::new(repos, config.invitation.validity_days, defaults);

    if let Some(email) = config.admin.bootstrap_email.as_deref() {
        let admin = services
            .members
            .ensure_admin(
                email,
                &config.admin.bootstrap_first_name,
                &config.admin.bootstrap_last_name,
            )
            .await?;
        tracing::info!(member_id = %admin.id, "Bootstrap admin ready");
    }

    let gateway = StripeWebhookGateway::new(
        StripeConfig::new(config.payment.webhook_secret.clone())
            .with_tolerance_secs(config.payment.webhook_tolerance_secs)
            .with_require_livemode(config.payment.require_livemode),
    );
    let state = AppState::new(services, Arc::new(gateway));
    let options = RouterOptions {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = build_app(state, &options);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn postgres_repositories(
    url: &str,
    database: &DatabaseConfig,
) -> Result<Repositories, Box<dyn Error>> {
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(url)
        .await?;
    tracing::info!(
        max_connections = database.max_connections,
        "Connected to PostgreSQL"
    );

    if database.run_migrations {
        run_migrations(&pool).await.map_err(ClubError::from)?;
        tracing::info!("Migrations applied");
    }

    Ok(Repositories {
        invitations: Arc::new(PostgresInvitationRepository::new(pool.clone())),
        members: Arc::new(PostgresMemberRepository::new(pool.clone())),
        cycles: Arc::new(PostgresCycleRepository::new(pool.clone())),
        dues: Arc::new(PostgresMemberDuesRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
