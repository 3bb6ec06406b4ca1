//! Coaching session endpoints. Sessions live in memory for the life of the process.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use skipro_core::domain::coaching::{ChatTurn, Keyframe, MediaUpload};
use skipro_core::domain::goal::{grouped_goals, Discipline, GoalCategory, SkiGoal};
use skipro_core::session::{CoachingSession, SessionError, SessionSnapshot, MAX_UPLOAD_BYTES};

use crate::error::{ApiError, ApiJson};
use crate::AppState;

/// Room for a maximal clip after base64 expansion plus the JSON envelope.
pub const MAX_BODY_BYTES: usize = (MAX_UPLOAD_BYTES as usize / 3 + 1) * 4 + 64 * 1024;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

struct SessionEntry {
    session: Arc<Mutex<CoachingSession>>,
    last_touched: Instant,
}

/// In-memory sessions. Entries idle for longer than `ttl` are dropped by [`sweep`](Self::sweep).
pub struct SessionStore {
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::default(),
            ttl,
        }
    }

    pub fn from_env() -> Self {
        Self::new(skipro_core::config::secs_from_env(
            "SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        ))
    }

    async fn insert(&self, session: CoachingSession) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.write().await.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_touched: Instant::now(),
            },
        );
        id
    }

    /// Looks a session up and marks it as used.
    async fn touch(&self, id: Uuid) -> Option<Arc<Mutex<CoachingSession>>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id)?;
        entry.last_touched = Instant::now();
        Some(entry.session.clone())
    }

    async fn remove(&self, id: Uuid) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    /// Drops idle sessions and returns how many were removed. A request already
    /// holding an evicted session finishes normally.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.last_touched.elapsed() < self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = entries.len(), "evicted idle sessions");
        }
        evicted
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/goals", get(list_goals))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/discipline", post(select_discipline))
        .route("/api/sessions/:id/goal", post(select_goal))
        .route("/api/sessions/:id/weather/open", post(open_weather))
        .route("/api/sessions/:id/weather/close", post(close_weather))
        .route("/api/sessions/:id/media", post(upload_media))
        .route("/api/sessions/:id/keyframes", post(set_keyframes))
        .route("/api/sessions/:id/context", post(set_context))
        .route("/api/sessions/:id/analysis", post(analyze))
        .route("/api/sessions/:id/chat/open", post(open_chat))
        .route("/api/sessions/:id/chat/close", post(close_chat))
        .route("/api/sessions/:id/messages", post(send_message))
        .route("/api/sessions/:id/restart", post(restart))
}

#[derive(Debug, Deserialize)]
struct GoalsQuery {
    discipline: Option<Discipline>,
}

#[derive(Debug, Serialize)]
struct GoalGroup {
    category: GoalCategory,
    label: &'static str,
    goals: Vec<&'static SkiGoal>,
}

async fn list_goals(Query(query): Query<GoalsQuery>) -> Json<Vec<GoalGroup>> {
    let discipline = query.discipline.unwrap_or(Discipline::Ski);
    let groups = grouped_goals(discipline)
        .into_iter()
        .map(|(category, goals)| GoalGroup {
            category,
            label: category.label(),
            goals,
        })
        .collect();
    Json(groups)
}

#[derive(Debug, Serialize)]
struct CreatedSession {
    id: Uuid,
    session: SessionSnapshot,
}

async fn create_session(State(state): State<AppState>) -> Json<CreatedSession> {
    state.sessions.sweep().await;
    let session = CoachingSession::new();
    let snapshot = session.snapshot();
    let id = state.sessions.insert(session).await;
    tracing::info!(session_id = %id, "session created");
    Json(CreatedSession {
        id,
        session: snapshot,
    })
}

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Mutex<CoachingSession>>, ApiError> {
    state
        .sessions
        .touch(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))
}

async fn apply(
    state: &AppState,
    id: Uuid,
    transition: impl FnOnce(&mut CoachingSession) -> Result<(), SessionError>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(state, id).await?;
    let mut session = session.lock().await;
    transition(&mut *session)?;
    Ok(Json(session.snapshot()))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, |_| Ok(())).await
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sessions.remove(id).await {
        return Err(ApiError::NotFound(format!("session {id}")));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
struct DisciplineRequest {
    discipline: Discipline,
}

async fn select_discipline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<DisciplineRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, |s| s.select_discipline(req.discipline)).await
}

#[derive(Debug, Deserialize)]
struct GoalRequest {
    goal_id: String,
}

async fn select_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<GoalRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, |s| s.select_goal(&req.goal_id)).await
}

async fn open_weather(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, CoachingSession::open_weather).await
}

async fn close_weather(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, CoachingSession::close_weather).await
}

#[derive(Deserialize)]
struct MediaRequest {
    file_name: String,
    mime_type: String,
    /// Raw base64 or a `data:` URL.
    data_base64: String,
}

impl MediaRequest {
    fn into_upload(self) -> Result<MediaUpload, ApiError> {
        let data = match self.data_base64.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest.to_string(),
            _ => self.data_base64,
        };
        let size_bytes = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| ApiError::BadRequest(format!("video is not valid base64: {e}")))?
            .len() as u64;
        Ok(MediaUpload {
            file_name: self.file_name,
            mime_type: self.mime_type,
            size_bytes,
            data_base64: data,
        })
    }
}

async fn upload_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<MediaRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let upload = req.into_upload()?;
    apply(&state, id, |s| s.attach_media(upload)).await
}

#[derive(Debug, Deserialize)]
struct KeyframesRequest {
    keyframes: Vec<String>,
}

async fn set_keyframes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<KeyframesRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let frames = req
        .keyframes
        .into_iter()
        .map(|data_url| Keyframe { data_url })
        .collect();
    apply(&state, id, |s| s.set_keyframes(frames)).await
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

async fn set_context(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<TextRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, |s| s.set_user_context(req.text)).await
}

/// The session is locked only to start and to settle the attempt, so it can be
/// read (showing ANALYZING) or restarted while the AI call runs.
async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(&state, id).await?;
    let coach = &state.coach;

    let pending = coach.start_analysis(&mut *session.lock().await)?;
    let outcome = coach.run_analysis(&pending).await;
    let feedback = coach.settle_analysis(&mut *session.lock().await, &pending, outcome)?;
    if let Some(audio) = coach.narrate(&feedback.analysis).await {
        coach.attach_narration(&mut *session.lock().await, &pending, audio);
    }

    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn open_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, CoachingSession::open_chat).await
}

async fn close_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, CoachingSession::back_to_result).await
}

#[derive(Debug, Serialize)]
struct ChatReply {
    reply: ChatTurn,
    session: SessionSnapshot,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<TextRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let reply = state.coach.ask(&mut *session, &req.text).await?;
    Ok(Json(ChatReply {
        reply,
        session: session.snapshot(),
    }))
}

async fn restart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    apply(&state, id, |s| {
        s.restart();
        Ok(())
    })
    .await
}
