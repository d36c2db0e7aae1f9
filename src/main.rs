use std::sync::Arc;

use career_intake::auth::{Authenticator, JwtAuthenticator, auth_routes};
use career_intake::catalog::Catalog;
use career_intake::config::ServiceConfig;
use career_intake::interview::ws::{AppState, interview_routes};
use career_intake::recommend::{HttpRecommendationProvider, RecommendationProvider};
use career_intake::store::{LibSqlBackend, SessionStore};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export INTAKE_SECRET_KEY=...");
        std::process::exit(1);
    });

    eprintln!("🎙 Career Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Interview WS: ws://0.0.0.0:{}/ws?token=...", config.port);
    eprintln!("   Auth API:     http://0.0.0.0:{}/api/auth", config.port);
    eprintln!("   Sessions API: http://0.0.0.0:{}/api/sessions", config.port);

    // ── Database ────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let store: Arc<dyn SessionStore> =
        Arc::new(LibSqlBackend::new_local(db_path).await.unwrap_or_else(|e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        }));
    eprintln!("   Database: {}", config.db_path);

    // ── Catalog ─────────────────────────────────────────────────────
    let catalog = Arc::new(Catalog::standard());
    eprintln!("   Questions: {}", catalog.total());

    // ── Auth ────────────────────────────────────────────────────────
    let jwt = Arc::new(JwtAuthenticator::new(
        config.secret_key.clone(),
        config.token_ttl_minutes,
    ));
    let authenticator: Arc<dyn Authenticator> = jwt.clone();

    // ── Recommendations ─────────────────────────────────────────────
    let recommender: Option<Arc<dyn RecommendationProvider>> = match &config.recommender_url {
        Some(url) => {
            eprintln!("   Recommender: {url}");
            Some(Arc::new(HttpRecommendationProvider::new(url.clone())))
        }
        None => {
            eprintln!("   Recommender: disabled");
            None
        }
    };

    // ── Server ──────────────────────────────────────────────────────
    let state = AppState {
        catalog,
        store: Arc::clone(&store),
        authenticator,
        recommender,
    };
    let app = interview_routes(state)
        .merge(auth_routes(store, jwt))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Career intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
