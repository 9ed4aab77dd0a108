//! Ambient HTTP/SSE server (not part of the distilled spec's scope, but
//! carried regardless per the ambient-stack policy): exposes the Entry
//! Dispatcher over HTTP, one session per client, streaming the Observation
//! Protocol as Server-Sent Events. Grounded on `cli/server/mod.rs`.

mod handlers;
mod session;
pub mod types;

pub use handlers::AppState;
pub use session::{Session, SessionManager, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
pub use types::{CreateSessionRequest, CreateSessionResponse, ErrorResponse, ExecuteRequest, HealthResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::entry::EntryDispatcher;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{session_id}", delete(handlers::delete_session))
        .route("/sessions/{session_id}/execute", post(handlers::execute))
        .with_state(state)
}

/// Binds to `port` (0 selects a random available port) and serves until the
/// process is killed. Runs forever; callers that need graceful shutdown
/// should cancel `AppState::shutdown_token` from elsewhere and drive axum's
/// `with_graceful_shutdown` themselves — that wiring is left to the
/// deployment, not this library function.
pub async fn serve(dispatcher: EntryDispatcher, port: u16) -> Result<()> {
    let (state, _shutdown_token) = AppState::new(Arc::new(dispatcher), DEFAULT_MAX_SESSIONS);
    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("sona HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_manager_is_exported() {
        let manager = SessionManager::new(5);
        assert_eq!(manager.count(), 0);
    }
}
