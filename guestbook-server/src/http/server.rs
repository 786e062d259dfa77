//! Axum server setup
//!
//! Server skeleton with:
//! - List and introspection routes
//! - Static asset fallback
//! - Optional per-request tracing spans
//! - Graceful shutdown on SIGTERM/Ctrl+C, then pool release

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    pub bind_addr: SocketAddr,

    /// Directory served for every path no route claims (default: ./public)
    pub asset_dir: PathBuf,

    /// Record one tracing span per request
    pub trace_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            asset_dir: PathBuf::from("./public"),
            trace_requests: false,
        }
    }
}

/// Build the application router with all routes
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let app = Router::new()
        .merge(routes::lists::router())
        .merge(routes::introspect::router())
        .fallback_service(ServeDir::new(&config.asset_dir));

    let app = if config.trace_requests {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };

    app.with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// Both pools are closed once serving stops.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(primary, replica, ErrorPolicy::Substitute);
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    tracing::info!(
        assets = %config.asset_dir.display(),
        policy = %state.policy(),
        primary = state.primary().endpoint(),
        replica = state.replica().endpoint(),
        "guestbook configured"
    );
    let app = build_router(state.clone(), &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.close();
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use guestbook_store::{ConnectionPool, MemoryConnector, MemoryStore, PoolOptions};
    use tower::ServiceExt;

    use crate::policy::ErrorPolicy;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.asset_dir, PathBuf::from("./public"));
        assert!(!config.trace_requests);
    }

    fn state() -> AppState {
        let store = MemoryStore::new();
        let pool = || ConnectionPool::new(MemoryConnector::new(store.clone()), PoolOptions::default());
        AppState::new(pool(), pool(), ErrorPolicy::Substitute)
    }

    #[tokio::test]
    async fn unrouted_paths_fall_back_to_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>guestbook</h1>").unwrap();
        let config = ServerConfig {
            asset_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let app = build_router(state(), &config);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>guestbook</h1>");

        let response = app
            .oneshot(Request::builder().uri("/missing.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tracing_layer_is_transparent() {
        let config = ServerConfig {
            trace_requests: true,
            ..ServerConfig::default()
        };
        let app = build_router(state(), &config);

        let response = app
            .oneshot(Request::builder().uri("/lrange/k").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
