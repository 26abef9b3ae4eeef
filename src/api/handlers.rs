//! HTTP request handlers

use super::assets::serve_static;
use super::types::{ChatForm, ChatRequest, ChatResponse, ErrorResponse, TurnsResponse};
use super::AppState;
use crate::render::render_page;
use crate::runtime::CoordinatorError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};

const POLL_PATH: &str = "/process";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Browser flow
        .route("/", get(serve_page))
        .route("/chat", post(submit_form))
        .route(POLL_PATH, get(process_pending))
        // JSON
        .route("/api/turns", get(list_turns))
        .route("/api/chat", post(submit_json))
        .route("/api/poll", post(poll_json))
        // Static assets
        .route("/static/*path", get(serve_static))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Browser Flow
// ============================================================

/// The chat page. Keeps refreshing through the poll while a reply is pending.
async fn serve_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let refresh = state.coordinator.is_busy().await.then_some(POLL_PATH);
    let history = state.coordinator.history().await?;
    Ok(Html(render_page(&history, refresh)))
}

/// Record the message and show the placeholder; the refresh drives the poll
async fn submit_form(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<Response, AppError> {
    let status = match state.coordinator.submit(&form.user_input).await {
        Ok(_) => StatusCode::OK,
        // Still show the page so the browser resumes polling
        Err(CoordinatorError::Busy) => StatusCode::CONFLICT,
        Err(e) => return Err(e.into()),
    };

    let history = state.coordinator.history().await?;
    Ok((status, Html(render_page(&history, Some(POLL_PATH)))).into_response())
}

/// Run the pending inference, then send the browser back to the page
async fn process_pending(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state.coordinator.poll().await?;
    Ok(Redirect::to("/"))
}

// ============================================================
// JSON API
// ============================================================

async fn list_turns(State(state): State<AppState>) -> Result<Json<TurnsResponse>, AppError> {
    turns_response(&state).await.map(Json)
}

async fn submit_json(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let pending_turn = state.coordinator.submit(&req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(ChatResponse { pending_turn })))
}

async fn poll_json(State(state): State<AppState>) -> Result<Json<TurnsResponse>, AppError> {
    state.coordinator.poll().await?;
    turns_response(&state).await.map(Json)
}

async fn turns_response(state: &AppState) -> Result<TurnsResponse, AppError> {
    Ok(TurnsResponse {
        turns: state.coordinator.history().await?,
        state: state.coordinator.status().await,
    })
}

async fn get_version() -> &'static str {
    concat!("lmchat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<CoordinatorError> for AppError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Busy => AppError::Conflict(e.to_string()),
            CoordinatorError::EmptyMessage => AppError::BadRequest(e.to_string()),
            CoordinatorError::Storage(_) | CoordinatorError::Integrity(_) => {
                tracing::error!(error = %e, "Request failed");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
