use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::collector::CollectorError;
use super::domain::CardId;
use super::repository::{RecommendationSink, RepositoryError, SessionRepository};
use super::service::{AdvisorService, AdvisorServiceError, RecommendationRequest, StartSession};
use super::session::SessionId;

pub const CATALOG_RETRY_MESSAGE: &str =
    "The card catalog is temporarily unavailable. Please try again in a moment.";

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ComparisonBody {
    pub card_ids: Vec<CardId>,
}

/// Router builder exposing catalog, recommendation and session endpoints.
pub fn advisor_router<R, S>(service: Arc<AdvisorService<R, S>>) -> Router
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    Router::new()
        .route("/api/v1/cards", get(cards_handler::<R, S>))
        .route(
            "/api/v1/recommendations",
            post(recommendations_handler::<R, S>),
        )
        .route("/api/v1/sessions", post(start_session_handler::<R, S>))
        .route(
            "/api/v1/sessions/:session_id",
            get(session_handler::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id/messages",
            post(message_handler::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id/comparison",
            post(comparison_handler::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id/results",
            post(results_handler::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id/restart",
            post(restart_handler::<R, S>),
        )
        .with_state(service)
}

/// HTTP status for a service error.
pub fn status_for(error: &AdvisorServiceError) -> StatusCode {
    match error {
        AdvisorServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AdvisorServiceError::Repository(RepositoryError::Conflict)
        | AdvisorServiceError::TurnInFlight => StatusCode::CONFLICT,
        AdvisorServiceError::Profile(_)
        | AdvisorServiceError::Collector(_)
        | AdvisorServiceError::Comparison(_)
        | AdvisorServiceError::ResultsNotReady => StatusCode::UNPROCESSABLE_ENTITY,
        AdvisorServiceError::Catalog(_) | AdvisorServiceError::AssistantUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AdvisorServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: AdvisorServiceError) -> Response {
    let status = status_for(&error);
    let message = match &error {
        AdvisorServiceError::Catalog(source) => {
            error!(error = %source, "catalog read failed");
            CATALOG_RETRY_MESSAGE.to_string()
        }
        AdvisorServiceError::Collector(CollectorError::EmptyInput) => {
            "message must not be empty".to_string()
        }
        other => other.to_string(),
    };
    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn cards_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.catalog() {
        Ok(cards) => (StatusCode::OK, axum::Json(json!({ "cards": cards }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recommendations_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.recommend(request) {
        Ok(results) => (StatusCode::OK, axum::Json(results)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn start_session_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    axum::Json(request): axum::Json<StartSession>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.start_session(request) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.session(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn message_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    Path(session_id): Path<String>,
    axum::Json(body): axum::Json<MessageBody>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    let id = SessionId(session_id);
    match service.handle_message(&id, &body.message).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn comparison_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    Path(session_id): Path<String>,
    axum::Json(body): axum::Json<ComparisonBody>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.compare(&SessionId(session_id), &body.card_ids) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn results_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.back_to_results(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn restart_handler<R, S>(
    State(service): State<Arc<AdvisorService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    match service.restart(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}
