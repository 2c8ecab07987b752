//! Reference sync backend - REST API holding one snapshot per account.
//!
//! Accounts are identified by their bearer token. Data is kept in memory.
//!
//! # Endpoints
//!
//! - `GET /health`
//! - `GET /sync` - current snapshot, 404 if none
//! - `POST /sync` - replace the snapshot
//! - `DELETE /sync` - remove the snapshot

use crate::config::ServerConfig;
use crate::error::Result;
use crate::models::SyncSnapshot;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared server state
pub struct ServerState {
    snapshots: RwLock<HashMap<String, SyncSnapshot>>,
    started: Instant,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    /// Stored snapshot for an account token
    pub async fn snapshot(&self, token: &str) -> Option<SyncSnapshot> {
        self.snapshots.read().await.get(token).cloned()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub accounts: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message.to_string() })).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Create the API router
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/sync",
            get(fetch_handler).post(push_handler).delete(delete_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        accounts: state.snapshots.read().await.len(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

async fn fetch_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    };

    match state.snapshots.read().await.get(&token) {
        Some(snapshot) => Json(snapshot.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no data for account"),
    }
}

async fn push_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(snapshot): Json<SyncSnapshot>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    };

    debug!(
        "Storing snapshot: {} favorites, {} sessions",
        snapshot.favorites.len(),
        snapshot.practice_sessions.len()
    );
    state.snapshots.write().await.insert(token, snapshot);
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    };

    match state.snapshots.write().await.remove(&token) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no data for account"),
    }
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<ServerState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Start the sync server and run until Ctrl+C
pub async fn start_server(config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Starting sync server");
    info!("   Listening on: http://{}", addr);

    serve(listener, Arc::new(ServerState::new()), shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
