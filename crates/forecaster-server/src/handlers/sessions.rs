//! Session handlers - one independent workspace per client
//!
//! Sessions are kept in memory and dropped after a period of inactivity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use forecaster_core::{
    Attachment, FieldMap, SectionId, SectionSnapshot, SessionStore, Workspace,
};

/// A client session and its workspace
#[derive(Debug)]
pub struct ClientSession {
    pub created_at: Instant,
    pub last_activity: Instant,
    pub store: SessionStore,
}

impl ClientSession {
    fn new() -> Self {
        let mut store = SessionStore::new();
        store.initialize();
        Self {
            created_at: Instant::now(),
            last_activity: Instant::now(),
            store,
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// In-memory session manager
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, ClientSession>>,
    timeout: Duration,
    counter: AtomicU64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(crate::SESSION_TIMEOUT)
    }
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            counter: AtomicU64::new(0),
        }
    }

    /// Create a new session and return its ID
    pub async fn create_session(&self) -> String {
        // Unique session ID from timestamp + counter
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_le_bytes());
        hasher.update(count.to_le_bytes());
        let session_id = format!("fc_{}", &hex::encode(hasher.finalize())[..24]);

        let mut sessions = self.sessions.write().await;

        // Clean up expired sessions while we're here
        let timeout = self.timeout;
        sessions.retain(|_, s| !s.is_expired(timeout));

        sessions.insert(session_id.clone(), ClientSession::new());
        session_id
    }

    /// Run `f` against a live session's store, refreshing its activity time
    ///
    /// Returns `None` when the session is unknown or expired.
    pub async fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionStore) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        if sessions.get(session_id)?.is_expired(self.timeout) {
            sessions.remove(session_id);
            debug!(session_id = %session_id, "Session expired");
            return None;
        }

        let session = sessions.get_mut(session_id)?;
        session.touch();
        Some(f(&mut session.store))
    }

    /// Copy of a live session's workspace
    pub async fn snapshot(&self, session_id: &str) -> Option<Workspace> {
        self.with_session(session_id, |store| store.snapshot()).await
    }

    /// Delete a session
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    /// Get session info
    pub async fn get_session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|s| !s.is_expired(self.timeout))
            .map(|s| SessionInfo {
                session_id: session_id.to_string(),
                created_at_secs_ago: s.created_at.elapsed().as_secs(),
                last_activity_secs_ago: s.last_activity.elapsed().as_secs(),
            })
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| !s.is_expired(self.timeout))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Session info response
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at_secs_ago: u64,
    pub last_activity_secs_ago: u64,
}

/// Workspace contents as returned to clients
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub session_id: String,
    pub organization_name: String,
    pub sections: Vec<SectionSnapshot>,
    pub history_upload: Option<Attachment>,
}

impl WorkspaceResponse {
    fn new(session_id: &str, workspace: &Workspace) -> Self {
        Self {
            session_id: session_id.to_string(),
            organization_name: workspace.organization_name().to_string(),
            sections: workspace.sections(),
            history_upload: workspace.history_upload().cloned(),
        }
    }
}

/// Request to set the organization name
#[derive(Debug, Deserialize)]
pub struct SetOrganizationRequest {
    pub name: String,
}

/// POST /api/sessions - Create a new session with an empty workspace
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionInfo>, AppError> {
    let session_id = state.sessions.create_session().await;

    info!(session_id = %session_id, "Created session");

    let session_info = state
        .sessions
        .get_session_info(&session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;

    Ok(Json(session_info))
}

/// GET /api/sessions/:id - Current workspace
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let workspace = state
        .sessions
        .snapshot(&session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;

    Ok(Json(WorkspaceResponse::new(&session_id, &workspace)))
}

/// DELETE /api/sessions/:id - Drop a session
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state.sessions.delete_session(&session_id).await;

    debug!(session_id = %session_id, deleted = deleted, "Deleted session");

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// POST /api/sessions/:id/organization - Set the organization name (once)
pub async fn set_organization(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SetOrganizationRequest>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let workspace = state
        .sessions
        .with_session(&session_id, |store| {
            store.set_organization_name(&payload.name)?;
            Ok::<_, forecaster_core::Error>(store.snapshot())
        })
        .await
        .ok_or_else(AppError::session_not_found)??;

    Ok(Json(WorkspaceResponse::new(&session_id, &workspace)))
}

/// PUT /api/sessions/:id/sections/:section - Replace one section's fields
pub async fn submit_section(
    State(state): State<Arc<AppState>>,
    Path((session_id, section)): Path<(String, String)>,
    Json(values): Json<FieldMap>,
) -> Result<Json<SectionSnapshot>, AppError> {
    let section: SectionId = section.parse()?;

    let snapshot = state
        .sessions
        .with_session(&session_id, |store| {
            store.submit_section(section, &values)?;
            Ok::<_, forecaster_core::Error>(SectionSnapshot::of(
                &store.workspace().section(section),
            ))
        })
        .await
        .ok_or_else(AppError::session_not_found)??;

    Ok(Json(snapshot))
}

/// POST /api/sessions/:id/history - Attach an enrollment history file
///
/// Expects multipart form with:
/// - file: CSV or XLSX file (required, max 10MB)
pub async fn upload_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Attachment>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("File field has no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }

        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, content) = upload.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    let attachment = state
        .sessions
        .with_session(&session_id, |store| {
            store.attach_history(&file_name, &content)
        })
        .await
        .ok_or_else(AppError::session_not_found)??;

    Ok(Json(attachment))
}

/// POST /api/sessions/:id/reset - Discard everything in the workspace
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let workspace = state
        .sessions
        .with_session(&session_id, |store| store.reset())
        .await
        .ok_or_else(AppError::session_not_found)?;

    info!(session_id = %session_id, "Session reset");

    Ok(Json(WorkspaceResponse::new(&session_id, &workspace)))
}
