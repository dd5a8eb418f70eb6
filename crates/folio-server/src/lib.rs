//! Folio Project Server
//!
//! Serves the project resource the layout editor persists to. Layout writes
//! and form saves both go through `PATCH /projects/{id}` and only touch the
//! fields they carry.
//!
//! ## Routes
//!
//! ```text
//! GET    /health
//! GET    /projects
//! POST   /projects
//! GET    /projects/{id}
//! PATCH  /projects/{id}
//! DELETE /projects/{id}
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use folio_core::layout::LayoutDocument;
use folio_core::storage::{Project, ProjectBackend, ProjectPatch, StorageError};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3030;

/// Server settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Project directory; `None` uses the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Read `FOLIO_PORT` and `FOLIO_DATA_DIR`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("FOLIO_PORT").ok().as_deref(),
            std::env::var("FOLIO_DATA_DIR").ok().as_deref(),
        )
    }

    fn from_vars(port: Option<&str>, data_dir: Option<&str>) -> Self {
        let port = match port.map(str::parse) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                warn!("Invalid FOLIO_PORT, using {}: {}", DEFAULT_PORT, e);
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };
        Self {
            port,
            data_dir: data_dir.filter(|dir| !dir.is_empty()).map(PathBuf::from),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ProjectBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ProjectBackend>) -> Self {
        Self { backend }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A storage error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(StorageError);

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::Serialization(_) | StorageError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StorageError::Io(_) | StorageError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Body of `POST /projects`. The id is generated when omitted.
#[derive(Debug, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub layout_config: Option<String>,
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let mut ids = state.backend.list_projects().await?;
    ids.sort();
    Ok(Json(ids))
}

async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if let Some(layout) = &body.layout_config {
        validate_layout(layout)?;
    }
    let project = Project {
        id: body.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: body.title,
        description: body.description,
        category: body.category,
        technologies: body.technologies,
        layout_config: body.layout_config,
    };
    state.backend.create_project(&project).await?;
    info!("Created project {}", project.id);
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Project>> {
    Ok(Json(state.backend.get_project(&id).await?))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<Json<Project>> {
    if let Some(layout) = &patch.layout_config {
        validate_layout(layout)?;
    }
    let project = state.backend.update_project(&id, &patch).await?;
    info!("Updated project {}", id);
    Ok(Json(project))
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.backend.delete_project(&id).await?;
    info!("Deleted project {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Reject layout documents the editor could not load.
fn validate_layout(json: &str) -> Result<(), StorageError> {
    LayoutDocument::from_json(json)
        .map(|_| ())
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::from_vars(None, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_config_from_vars() {
        let config = ServerConfig::from_vars(Some("8080"), Some("/srv/folio"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/folio")));

        let config = ServerConfig::from_vars(Some("not-a-port"), Some(""));
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e| ApiError(e).into_response().status();
        assert_eq!(status(StorageError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(StorageError::Serialization("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StorageError::InvalidId("a/b".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StorageError::Io("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(StorageError::Other("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
