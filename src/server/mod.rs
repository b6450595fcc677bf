//! HTTP server: routes, CORS allow-list, startup.

pub mod routes;
pub mod state;

use anyhow::Result;
use colored::Colorize;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use state::{AppState, SharedState};

/// Maximum accepted request body
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/diag", get(routes::diag))
        .route("/api/mimichat", post(routes::chat))
        .layer(cors)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// CORS restricted to the configured origins. Requests without an `Origin`
/// header (curl, server-to-server) are unaffected.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: SharedState, port: u16) -> Result<()> {
    let app = router(state.clone());

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            eprintln!("\n{} Port {} is already in use.\n", "Error:".red(), port);
            eprintln!("Try a different port with:");
            eprintln!("  {}\n", "mimichat serve --port <PORT>".cyan());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        port,
        provider = state.config.provider.name(),
        model = state.config.model(),
        origins = state.config.allowed_origins.len(),
        "MimiChat server listening"
    );
    println!("{} http://localhost:{}", "Server running on".green(), port);
    println!("\nAPI Endpoints:");
    println!("  GET    /health           - Health check");
    println!("  GET    /diag             - Provider, model, key presence");
    println!("  POST   /api/mimichat     - Chat with Aromi");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
