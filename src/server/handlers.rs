//! HTTP handlers for the eval/integration server. Grounded on
//! `cli/server/handlers.rs`'s health/session/execute trio, collapsed onto
//! this core's single dispatch operation.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::entry::EntryDispatcher;
use crate::events::{ObservationEvent, Observer};

use super::session::SessionManager;
use super::types::*;

pub struct AppState {
    pub dispatcher: Arc<EntryDispatcher>,
    pub session_manager: SessionManager,
    pub shutdown_token: CancellationToken,
}

impl AppState {
    pub fn new(dispatcher: Arc<EntryDispatcher>, max_sessions: usize) -> (Arc<Self>, CancellationToken) {
        let shutdown_token = CancellationToken::new();
        let state = Arc::new(Self {
            dispatcher,
            session_manager: SessionManager::new(max_sessions),
            shutdown_token: shutdown_token.clone(),
        });
        (state, shutdown_token)
    }
}

/// Forwards emitted events onto an unbounded channel, one SSE frame per event.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<ObservationEvent>,
}

impl Observer for ChannelObserver {
    fn emit(&self, event: ObservationEvent) {
        let _ = self.tx.send(event);
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let session = state.session_manager.create().map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::with_code(e, "SESSION_LIMIT_REACHED")),
        )
    })?;
    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id: session.id.clone() })))
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> StatusCode {
    if state.session_manager.remove(&session_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Streams the Observation Protocol event sequence for one utterance as
/// Server-Sent Events, ending with a `done` event carrying the final text
/// (or an `error` event on failure).
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)> {
    let session = state.session_manager.get(&session_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::with_code(
                format!("session '{session_id}' not found"),
                "SESSION_NOT_FOUND",
            )),
        )
    })?;
    session.touch().await;

    let exec_cancel = session.cancel.clone();
    let timeout_secs = req.timeout_secs();
    let timeout_cancel = exec_cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        if !timeout_cancel.is_cancelled() {
            tracing::warn!("execution timed out after {timeout_secs}s");
            timeout_cancel.cancel();
        }
    });

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ObservationEvent>();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Result<String, String>>();

    let dispatcher = state.dispatcher.clone();
    let utterance = req.utterance.clone();
    tokio::spawn(async move {
        let observer = ChannelObserver { tx: event_tx };
        let mut history = session.history.lock().await;
        let result = dispatcher.dispatch(&utterance, &mut *history, &session.cancel, &observer).await;
        let _ = done_tx.send(result.map_err(|e| e.user_visible_fallback()));
    });

    let event_stream = UnboundedReceiverStream::new(event_rx).map(|event| {
        Ok(Event::default().event("observation").json_data(&event).unwrap_or_else(|_| Event::default()))
    });

    let final_stream = async_stream::stream! {
        match done_rx.recv().await {
            Some(Ok(text)) => yield Ok(Event::default().event("done").data(text)),
            Some(Err(err)) => yield Ok(Event::default().event("error").data(err)),
            None => {}
        }
    };

    Ok(Sse::new(event_stream.chain(final_stream)).keep_alive(KeepAlive::default()))
}
