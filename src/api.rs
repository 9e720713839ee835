//! REST API for the drafting assistant
//!
//! Exposes chat sessions over HTTP. Each request is one user input; the
//! response carries the assistant messages it produced. A session accepts
//! one input at a time, so a second input while the first (typically a
//! commit) is still running is refused with 409. Sessions are dropped on
//! `DELETE` or after sitting idle longer than the configured limit.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DraftingError;
use crate::models::{Message, UserInput};
use crate::session::{ChatSession, SessionFactory};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Client-chosen id; non-UUID values map to a stable UUID
    pub session_id: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionReply {
    session_id: Uuid,
    pending: crate::draft::PendingField,
    messages: Vec<Message>,
}

type Reply = (StatusCode, Json<ApiResponse>);

fn error_reply(error: DraftingError) -> Reply {
    let status = match &error {
        DraftingError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DraftingError::SessionBusy(_) => StatusCode::CONFLICT,
        DraftingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// API State
/// =============================

struct LiveSession {
    session: Arc<Mutex<ChatSession>>,
    last_active: Instant,
}

#[derive(Clone)]
pub struct ApiState {
    factory: SessionFactory,
    sessions: Arc<RwLock<HashMap<Uuid, LiveSession>>>,
}

impl ApiState {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Look a session up and mark it active
    async fn session(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.write().await;
        let live = sessions.get_mut(&id)?;
        live.last_active = Instant::now();
        Some(Arc::clone(&live.session))
    }

    async fn insert(&self, id: Uuid, session: ChatSession) {
        self.sessions.write().await.insert(
            id,
            LiveSession {
                session: Arc::new(Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
    }

    /// Drop a session from memory. Its persisted transcript is kept.
    async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(live) => {
                live.session.lock().await.close();
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for at least `max_idle`. A session with an input
    /// in flight is never evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, live| {
            if live.last_active.elapsed() < max_idle {
                return true;
            }
            match live.session.try_lock() {
                Ok(session) => {
                    session.close();
                    info!(session_id = %id, "Evicting idle session");
                    false
                }
                Err(_) => true,
            }
        });
        before - sessions.len()
    }
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

fn session_id_from(value: &str) -> Uuid {
    let value = value.trim();
    Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Session Endpoints
/// =============================

async fn create_session(
    State(state): State<ApiState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Reply {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let id = match request.session_id.as_deref() {
        Some(v) if !v.trim().is_empty() => session_id_from(v),
        _ => Uuid::new_v4(),
    };

    // Resuming an existing session returns what it has said so far
    if let Some(existing) = state.session(id).await {
        let session = existing.lock().await;
        return (
            StatusCode::OK,
            Json(ApiResponse::success(SessionReply {
                session_id: id,
                pending: session.pending(),
                messages: session.transcript().to_vec(),
            })),
        );
    }

    let mut session = state.factory.create(id);
    let messages = session.start().await;
    let pending = session.pending();
    state.insert(id, session).await;

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(SessionReply {
            session_id: id,
            pending,
            messages,
        })),
    )
}

async fn session_input(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    Json(input): Json<UserInput>,
) -> Reply {
    let id = session_id_from(&raw_id);
    let Some(session) = state.session(id).await else {
        return error_reply(DraftingError::SessionNotFound(raw_id));
    };

    let Ok(mut guard) = session.try_lock_owned() else {
        warn!(session_id = %id, "Input rejected while previous input is in flight");
        return error_reply(DraftingError::SessionBusy(id.to_string()));
    };

    info!(session_id = %id, input = %input, "Session input");

    // Run on its own task so a dropped request cannot abandon a commit midway
    let outcome = tokio::spawn(async move {
        let messages = guard.handle(input).await;
        (messages, guard.pending())
    })
    .await;

    match outcome {
        Ok((messages, pending)) => (
            StatusCode::OK,
            Json(ApiResponse::success(SessionReply {
                session_id: id,
                pending,
                messages,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Session task failed: {}", e))),
        ),
    }
}

async fn session_transcript(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Reply {
    let id = session_id_from(&raw_id);

    if let Some(session) = state.session(id).await {
        let session = session.lock().await;
        return (
            StatusCode::OK,
            Json(ApiResponse::success(session.transcript().to_vec())),
        );
    }

    // Not live in this process; fall back to what was persisted
    match state.factory.transcripts().load_transcript(id).await {
        Ok(messages) if !messages.is_empty() => {
            (StatusCode::OK, Json(ApiResponse::success(messages)))
        }
        Ok(_) => error_reply(DraftingError::SessionNotFound(raw_id)),
        Err(e) => error_reply(e),
    }
}

async fn delete_session(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Reply {
    let id = session_id_from(&raw_id);
    if !state.remove(id).await {
        return error_reply(DraftingError::SessionNotFound(raw_id));
    }

    info!(session_id = %id, "Session closed");
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "session_id": id }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/input", post(session_input))
        .route("/api/sessions/:id/transcript", get(session_transcript))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    factory: SessionFactory,
    port: u16,
    session_idle: Duration,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = ApiState::new(factory);
    let router = create_router(state.clone());

    // Sweep idle sessions a few times per idle window
    let sweeper = state.clone();
    tokio::spawn(async move {
        let period = (session_idle / 4).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_idle(session_idle).await;
            if evicted > 0 {
                info!(evicted, "Idle sessions evicted");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
