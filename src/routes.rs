use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{ConfigInfo, ViewerPaths},
    error::{Result, ViewerError},
    models::{ModelCatalog, ModelListing, ModelSwitch},
    sessions::{CurrentSession, SessionDetail, SessionListing, SessionStore, SessionSwitch},
};

#[derive(Clone)]
pub struct AppState {
    pub paths: ViewerPaths,
    pub sessions: SessionStore,
    pub models: ModelCatalog,
}

impl AppState {
    pub fn new(paths: ViewerPaths) -> Self {
        // One gate for both documents: mutations in this process never interleave.
        let write_gate = Arc::new(Mutex::new(()));
        Self {
            sessions: SessionStore::new(paths.clone(), write_gate.clone()),
            models: ModelCatalog::new(paths.config_path.clone(), write_gate),
            paths,
        }
    }
}

async fn list_sessions(State(state): State<AppState>) -> Result<Json<SessionListing>> {
    Ok(Json(state.sessions.list_sessions().await?))
}

async fn get_session(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<String>,
) -> Result<Json<SessionDetail>> {
    Ok(Json(state.sessions.get_session(&session_id).await?))
}

async fn switch_session(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<String>,
) -> Result<Json<SessionSwitch>> {
    Ok(Json(state.sessions.switch_session(&session_id).await?))
}

async fn current_session(State(state): State<AppState>) -> Result<Json<CurrentSession>> {
    Ok(Json(state.sessions.get_current_session().await?))
}

async fn list_models(State(state): State<AppState>) -> Result<Json<ModelListing>> {
    Ok(Json(state.models.list_models().await?))
}

#[derive(Deserialize)]
struct SwitchModelRequest {
    #[serde(rename = "modelId")]
    model_id: Option<String>,
}

async fn switch_model(
    State(state): State<AppState>,
    body: std::result::Result<Json<SwitchModelRequest>, JsonRejection>,
) -> Result<Json<ModelSwitch>> {
    let model_id = match body {
        Ok(Json(req)) => req.model_id,
        Err(rejection) => {
            return Err(ViewerError::BadRequest(format!(
                "modelId is required ({})",
                rejection.body_text()
            )))
        }
    };
    Ok(Json(state.models.switch_model(model_id.as_deref()).await?))
}

async fn config_info(State(state): State<AppState>) -> Json<ConfigInfo> {
    Json(state.paths.describe().await)
}

async fn healthz() -> &'static str {
    "ok"
}

/// JSON API routes. Static UI hosting is layered on by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/config", get(config_info))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/switch", post(switch_session))
        .route("/api/current-session", get(current_session))
        .route("/api/models", get(list_models))
        .route("/api/models/switch", post(switch_model))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
