//! HTTP transport for the web chat host
//!
//! Axum router exposing the survey as a small JSON API plus an embedded chat
//! widget. Conversations live in process memory in an LRU cache; idle entries
//! past the configured TTL are dropped when touched.

use crate::clients::{PromptRephraser, rephrase_messages};
use crate::config::Config;
use crate::conversation::{Conversation, Reply, Survey};
use crate::error::{ConferenceBotError, Result};
use crate::registry::{CategoryDefinition, CategoryRegistry};
use crate::sessions::ExportEnvelope;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

const CHAT_WIDGET: &str = include_str!("chat_widget.html");

struct SessionEntry {
    conversation: Conversation,
    last_seen: Instant,
}

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    survey: Survey,
    sessions: Arc<Mutex<LruCache<Uuid, SessionEntry>>>,
    ttl: Duration,
    rephraser: Option<Arc<dyn PromptRephraser>>,
}

impl HttpState {
    pub fn new(survey: Survey, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            survey,
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            rephraser: None,
        }
    }

    pub fn from_config(survey: Survey, config: &Config) -> Self {
        Self::new(
            survey,
            config.runtime.session_capacity,
            Duration::from_secs(config.runtime.session_ttl_sec),
        )
    }

    pub fn with_rephraser(mut self, rephraser: Arc<dyn PromptRephraser>) -> Self {
        self.rephraser = Some(rephraser);
        self
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn polish(&self, mut reply: Reply) -> Reply {
        if let Some(rephraser) = &self.rephraser {
            reply.messages = rephrase_messages(rephraser.as_ref(), reply.messages).await;
        }
        reply
    }
}

fn expired(entry: &SessionEntry, ttl: Duration) -> bool {
    entry.last_seen.elapsed() > ttl
}

/// Look up a live session, evicting it if it has idled past the TTL.
fn live_entry<'a>(
    sessions: &'a mut LruCache<Uuid, SessionEntry>,
    id: Uuid,
    ttl: Duration,
) -> Result<&'a mut SessionEntry> {
    let stale = sessions.peek(&id).map(|e| expired(e, ttl));
    match stale {
        None => Err(ConferenceBotError::SessionNotFound {
            session_id: id.to_string(),
        }),
        Some(true) => {
            sessions.pop(&id);
            tracing::info!(session_id = %id, "session expired");
            Err(ConferenceBotError::SessionNotFound {
                session_id: id.to_string(),
            })
        }
        Some(false) => sessions
            .get_mut(&id)
            .ok_or_else(|| ConferenceBotError::SessionNotFound {
                session_id: id.to_string(),
            }),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub reply: Reply,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn widget_handler() -> impl IntoResponse {
    Html(CHAT_WIDGET)
}

async fn create_session_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let (conversation, opening) = state.survey.start();
    let session_id = Uuid::new_v4();
    {
        let mut sessions = state.sessions.lock().await;
        let ttl = state.ttl;
        let stale: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, e)| expired(e, ttl))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            sessions.pop(&id);
        }
        if let Some((evicted, _)) = sessions.push(
            session_id,
            SessionEntry {
                conversation,
                last_seen: Instant::now(),
            },
        ) && evicted != session_id
        {
            tracing::warn!(session_id = %evicted, "session capacity reached, evicted least recent");
        }
    }
    tracing::info!(session_id = %session_id, "session started");

    let reply = state.polish(opening).await;
    (StatusCode::CREATED, Json(SessionCreated { session_id, reply }))
}

async fn message_handler(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<Reply>> {
    let reply = {
        let mut sessions = state.sessions.lock().await;
        let entry = live_entry(&mut sessions, id, state.ttl)?;
        entry.last_seen = Instant::now();
        entry.conversation.handle(&body.text)
    };
    Ok(Json(state.polish(reply).await))
}

async fn export_handler(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportEnvelope>> {
    let mut sessions = state.sessions.lock().await;
    let entry = live_entry(&mut sessions, id, state.ttl)?;
    let data = entry.conversation.export()?;
    Ok(Json(ExportEnvelope::new(id.to_string(), data)))
}

async fn delete_handler(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let removed = state.sessions.lock().await.pop(&id);
    match removed {
        Some(_) => {
            tracing::info!(session_id = %id, "session deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ConferenceBotError::SessionNotFound {
            session_id: id.to_string(),
        }),
    }
}

fn definitions(registry: &CategoryRegistry) -> Vec<&CategoryDefinition> {
    registry.all().iter().map(|c| c.as_ref()).collect()
}

async fn categories_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let catalog = state.survey.catalog();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "sectors": definitions(&catalog.sectors),
            "headwinds": definitions(&catalog.headwinds),
        })
        .to_string(),
    )
}

/// Build the application router
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(widget_handler))
        .route("/health", get(health_handler))
        .route("/categories", get(categories_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/:id", axum::routing::delete(delete_handler))
        .route("/sessions/:id/messages", post(message_handler))
        .route("/sessions/:id/export", get(export_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: HttpState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ttl: Duration) -> HttpState {
        HttpState::new(Survey::with_defaults().unwrap(), 2, ttl)
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_access() {
        let state = state(Duration::from_millis(0));
        let (conversation, _) = state.survey.start();
        let id = Uuid::new_v4();
        state.sessions.lock().await.put(
            id,
            SessionEntry {
                conversation,
                last_seen: Instant::now() - Duration::from_secs(1),
            },
        );
        let mut sessions = state.sessions.lock().await;
        assert!(matches!(
            live_entry(&mut sessions, id, state.ttl),
            Err(ConferenceBotError::SessionNotFound { .. })
        ));
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_bounds_sessions() {
        let state = state(Duration::from_secs(60));
        for _ in 0..3 {
            let _ = create_session_handler(State(state.clone())).await;
        }
        assert_eq!(state.active_sessions().await, 2);
    }
}
