use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom_core::config::Config;
use newsroom_core::crypto;
use newsroom_core::db::{AppState, create_pool, init_db, queries};
use newsroom_core::handlers;
use newsroom_core::jwt::TokenIssuer;
use newsroom_core::models::{AccountStatus, CreatePrincipal, Role};
use newsroom_core::rate_limit::{self, CodeRequestRateLimiter};

#[derive(Parser, Debug)]
#[command(name = "newsroom")]
#[command(about = "Session issuance and offline-sync core for the Newsroom content platform")]
struct Cli {
    /// Seed a dev admin account (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Create a first admin principal so the admin endpoints are reachable on a
/// fresh dev database. The generated password is printed exactly once.
fn seed_admin(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seed");

    let email =
        std::env::var("BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|_| "admin@newsroom.dev".into());

    if queries::get_principal_by_email(&conn, &email)
        .expect("Failed to check for existing admin")
        .is_some()
    {
        tracing::info!("Admin principal already exists, skipping seed");
        return;
    }

    let password = uuid::Uuid::new_v4().as_simple().to_string();
    let admin = queries::create_principal(
        &conn,
        &CreatePrincipal {
            email: email.clone(),
            name: "Bootstrap Admin".to_string(),
            phone: None,
            password_hash: crypto::hash_password(&password).expect("Failed to hash seed password"),
            role: Role::Admin,
            status: AccountStatus::Active,
            profile: None,
        },
    )
    .expect("Failed to create seed admin");

    tracing::info!("Seeded admin {} ({})", admin.id, email);
    tracing::info!("Seed admin password (dev only, shown once): {}", password);
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsroom_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get connection for schema init");
        init_db(&conn).expect("Failed to initialize schema");
    }

    let state = AppState {
        db: pool,
        issuer: TokenIssuer::new(&config.auth),
        auth: config.auth.clone(),
        code_rate_limiter: CodeRequestRateLimiter::default_for_codes(),
    };

    if cli.seed {
        if config.dev_mode {
            seed_admin(&state);
        } else {
            tracing::warn!("--seed is ignored outside dev mode");
        }
    }

    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(
            handlers::auth::router()
                .layer(rate_limit::strict_layer(config.rate_limit_strict_rpm)),
        )
        .merge(
            handlers::devices::router()
                .layer(rate_limit::standard_layer(config.rate_limit_standard_rpm)),
        )
        .merge(
            handlers::sync::router()
                .layer(rate_limit::standard_layer(config.rate_limit_standard_rpm)),
        )
        .merge(handlers::admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .expect("Failed to bind listen address");
    tracing::info!("Newsroom core listening on {}", config.addr());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    if cli.ephemeral && config.dev_mode {
        tracing::info!("Ephemeral mode: removing {}", config.database_path);
        let _ = std::fs::remove_file(&config.database_path);
    }
}
