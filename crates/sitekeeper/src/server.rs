// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API for the lifecycle manager.
//!
//! A thin JSON front end: every route maps onto one [`LifecycleManager`]
//! operation and every [`Error`] onto a status code with an `{"error": ...}` body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::Error;
use crate::manager::LifecycleManager;
use crate::site::Site;

/// Shared state for HTTP handlers.
pub type AppState = Arc<LifecycleManager>;

impl Error {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ProvisionFailure(_)
            | Error::TeardownFailure(_)
            | Error::ContainerOperationFailure(_)
            | Error::RegistryIo(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `POST /api/sites`.
#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: String,
}

/// Response of `GET /api/sites`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListSitesResponse {
    /// Every registered site.
    pub sites: Vec<Site>,
}

/// Response of `POST /api/sites`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSiteResponse {
    /// Human readable outcome.
    pub message: String,
    /// The new site.
    pub site: Site,
}

/// Response carrying only a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human readable outcome.
    pub message: String,
}

/// Build the axum router.
pub fn router(manager: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/version", get(version))
        .route("/api/sites", get(list_sites).post(create_site))
        .route("/api/sites/{id}", get(get_site).delete(delete_site))
        .route("/api/sites/{id}/stop", post(stop_site))
        .route("/api/sites/{id}/start", post(start_site))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

async fn index() -> Json<Value> {
    Json(json!({ "message": "sitekeeper" }))
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// GET /api/version
async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /api/sites
async fn list_sites(State(manager): State<AppState>) -> Json<ListSitesResponse> {
    Json(ListSitesResponse {
        sites: manager.list().await,
    })
}

/// POST /api/sites
async fn create_site(
    State(manager): State<AppState>,
    body: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> Result<Json<CreateSiteResponse>, Error> {
    let Json(req) = body.map_err(|e| Error::Validation(e.body_text()))?;
    let site = manager.create(&req.name, &req.description).await?;
    Ok(Json(CreateSiteResponse {
        message: "Site created successfully".to_string(),
        site,
    }))
}

/// GET /api/sites/{id}
async fn get_site(
    State(manager): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Site>, Error> {
    Ok(Json(manager.get(&id).await?))
}

/// DELETE /api/sites/{id}
async fn delete_site(
    State(manager): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    manager.delete(&id).await?;
    Ok(message(format!("Site {id} deleted successfully")))
}

/// POST /api/sites/{id}/stop
async fn stop_site(
    State(manager): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    manager.stop(&id).await?;
    Ok(message(format!("Site {id} stopped successfully")))
}

/// POST /api/sites/{id}/start
async fn start_site(
    State(manager): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    manager.start(&id).await?;
    Ok(message(format!("Site {id} started successfully")))
}

fn message(message: String) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}
