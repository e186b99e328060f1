//! Forecaster Web Server
//!
//! Axum-based REST API for the enrollment and growth forecaster.
//!
//! Each client creates its own session holding an independent workspace;
//! sessions live in memory and expire after 30 minutes of inactivity.
//!
//! Security features:
//! - Activation key gate on every API route (use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Upload size limits
//! - Sanitized error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use forecaster_core::{Error as CoreError, ValidationError};

mod handlers;

pub use handlers::SessionManager;
pub use forecaster_core::MAX_UPLOAD_SIZE;

/// Activation key used when none is configured
pub const DEFAULT_ACTIVATION_KEY: &str = "ENROLL-2026-PRO";

/// Environment variable holding the activation key
pub const ACTIVATION_KEY_ENV: &str = "FORECASTER_ACTIVATION_KEY";

/// Environment variable holding allowed CORS origins (comma-separated)
pub const ALLOWED_ORIGINS_ENV: &str = "FORECASTER_ALLOWED_ORIGINS";

/// Idle time after which a session is dropped
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Header carrying the activation key
const ACTIVATION_KEY_HEADER: &str = "x-activation-key";

/// Authorization header, accepted as `Bearer <key>`
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether the activation key is required (secure by default)
    pub require_auth: bool,
    /// Key clients must present in `X-Activation-Key` or `Authorization: Bearer`
    pub activation_key: String,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Idle time after which a session expires
    pub session_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            activation_key: DEFAULT_ACTIVATION_KEY.to_string(),
            allowed_origins: vec![],
            session_timeout: SESSION_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Read the activation key and CORS origins from the environment
    pub fn from_env() -> Self {
        let activation_key = std::env::var(ACTIVATION_KEY_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ACTIVATION_KEY.to_string());

        let allowed_origins = parse_origins(&std::env::var(ALLOWED_ORIGINS_ENV).unwrap_or_default());

        Self {
            activation_key,
            allowed_origins,
            ..Default::default()
        }
    }
}

/// Parse a comma-separated origin list, skipping blanks
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// One workspace per client session
    pub sessions: SessionManager,
}

/// Activation gate - requires the configured key on every API request
///
/// The key may be sent as `X-Activation-Key: <key>` or
/// `Authorization: Bearer <key>`. Comparison is constant-time.
async fn activation_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth || request.uri().path() == "/api/health" {
        return next.run(request).await;
    }

    let headers = request.headers();
    let key_valid = headers
        .get(ACTIVATION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .or_else(|| {
            headers
                .get(AUTHORIZATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer "))
                .map(str::trim)
        })
        .map(|key| validate_activation_key(key, &state.config.activation_key));

    match key_valid {
        Some(true) => next.run(request).await,
        Some(false) => {
            warn!(path = %request.uri().path(), "Rejected request - invalid activation key");
            unauthorized("Invalid activation key")
        }
        None => {
            warn!(path = %request.uri().path(), "Rejected request - no activation key");
            unauthorized("Activation key required")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Compare a provided key against the configured one in constant time
fn validate_activation_key(provided: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;

    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    // Lengths differ: reject without comparing contents
    if provided.len() != expected.len() {
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Create the application router
pub fn create_router(config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        sessions: SessionManager::new(config.session_timeout),
        config: config.clone(),
    });
    create_router_with_state(state)
}

/// Create the router around an existing state (for testing)
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/schema", get(handlers::get_schema))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            "/sessions/:id/organization",
            post(handlers::set_organization),
        )
        .route(
            "/sessions/:id/sections/:section",
            put(handlers::submit_section),
        )
        .route(
            "/sessions/:id/history",
            post(handlers::upload_history)
                // Leave room for multipart framing around a max-size file
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
        .route("/sessions/:id/reset", post(handlers::reset_session))
        // Forecast and reports
        .route("/sessions/:id/forecast", post(handlers::run_forecast))
        .route("/sessions/:id/report", get(handlers::download_report));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let allowed_headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(ACTIVATION_KEY_HEADER),
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            activation_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Activation gate disabled - do not expose to network!");
    }

    let app = create_router(config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    /// Session id unknown or expired
    pub fn session_not_found() -> Self {
        Self::not_found("Session not found or expired")
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::OrganizationAlreadySet(_) => Self::conflict(&err.to_string()),
            _ => Self::bad_request(&err.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::Render(e) => Self::unprocessable(&e.to_string()),
            other => anyhow::Error::from(other).into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
