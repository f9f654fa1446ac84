//! HTTP surface over [`ProjectService`].
//!
//! The store is synchronous, so the service sits behind a tokio mutex and
//! each handler holds the lock for one service call.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dbtree_core::{Project, Resolution};
use dbtree_store::{Fields, ProjectError, ProjectService, Store};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ApiError;

const DUPLICATE_MESSAGE: &str = "Project with this name already exists";

#[derive(Clone)]
pub struct AppState {
    service: Arc<Mutex<ProjectService<Store>>>,
}

impl AppState {
    pub fn new(service: ProjectService<Store>) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ByUserQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Serialize)]
struct MergedProject {
    #[serde(flatten)]
    project: Project,
    message: &'static str,
    merged: bool,
}

impl MergedProject {
    /// Stored attributes named like the marker keys are left out of the
    /// response so each key appears once.
    fn new(mut project: Project) -> Self {
        project.attributes.remove("message");
        project.attributes.remove("merged");
        Self {
            project,
            message: DUPLICATE_MESSAGE,
            merged: true,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/projects",
            get(list_projects).post(create_project).put(update_projects),
        )
        .route("/projects/by-user", get(list_projects_by_user))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: &Config, service: ProjectService<Store>) -> anyhow::Result<()> {
    let app = build_router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = state.service.lock().await.find_all()?;
    Ok(Json(projects))
}

async fn list_projects_by_user(
    State(state): State<AppState>,
    query: Result<Query<ByUserQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let projects = state
        .service
        .lock()
        .await
        .find_all_by_user_id(&query.user_id)?;
    let message = if projects.is_empty() {
        format!("No projects found with user ID {}", query.user_id)
    } else {
        format!("Projects with user ID {} found", query.user_id)
    };
    Ok(Json(json!({ "message": message, "data": projects })))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    match state.service.lock().await.find_by_id(&id)? {
        Some(project) => Ok(Json(project)),
        None => Err(ProjectError::not_found(&id).into()),
    }
}

async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<Project>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(candidate) = payload?;
    let resolution = state.service.lock().await.create(candidate)?;
    Ok(match resolution {
        Resolution::Created(project) => (StatusCode::CREATED, Json(project)).into_response(),
        Resolution::Merged(project) => Json(MergedProject::new(project)).into_response(),
    })
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Fields>, JsonRejection>,
) -> Result<Json<Project>, ApiError> {
    let Json(patch) = payload?;
    let project = state.service.lock().await.update(&id, patch)?;
    Ok(Json(project))
}

async fn update_projects(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Fields>>, JsonRejection>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let Json(patches) = payload?;
    let projects = state.service.lock().await.update_many(patches)?;
    Ok(Json(projects))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.lock().await.remove(&id)?;
    Ok(Json(json!({
        "message": format!("Project {id} deleted successfully"),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::util::ServiceExt;

    fn app() -> Router {
        let store = Store::open_in_memory().unwrap();
        build_router(AppState::new(ProjectService::new(store)))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_merge() {
        let app = app();
        let (status, first) = send(
            &app,
            json_request(
                "POST",
                "/projects",
                json!({"name": "P", "userId": "u1", "sqlServers": [{"name": "S2"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(first.get("merged").is_none());
        let id = first["id"].as_str().unwrap().to_string();

        let (status, second) = send(
            &app,
            json_request(
                "POST",
                "/projects",
                json!({"name": "P", "sqlServers": [{"name": "S1"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["merged"], true);
        assert_eq!(second["message"], DUPLICATE_MESSAGE);
        assert_eq!(second["id"], id.as_str());
        assert_eq!(second["userId"], "u1");
        assert_eq!(second["sqlServers"][0]["name"], "S1");
        assert_eq!(second["sqlServers"][1]["name"], "S2");
    }

    #[tokio::test]
    async fn test_merge_marker_keys_are_not_duplicated() {
        let app = app();
        send(
            &app,
            json_request(
                "POST",
                "/projects",
                json!({"name": "P", "message": "mine", "merged": false}),
            ),
        )
        .await;

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/projects", json!({"name": "P"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let raw = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(raw.matches("\"merged\"").count(), 1);
        assert_eq!(raw.matches("\"message\"").count(), 1);

        let body: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(body["merged"], true);
        assert_eq!(body["message"], DUPLICATE_MESSAGE);
    }

    #[tokio::test]
    async fn test_create_ignores_submitted_updated_at() {
        let (status, body) = send(
            &app(),
            json_request(
                "POST",
                "/projects",
                json!({"name": "P", "updatedAt": "1999-01-01T00:00:00.000Z"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["createdAt"].is_string());
        assert!(body.get("updatedAt").is_none());
    }

    #[tokio::test]
    async fn test_create_without_name_is_bad_request() {
        let app = app();
        let (status, body) =
            send(&app, json_request("POST", "/projects", json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name is required");

        let (status, body) =
            send(&app, json_request("POST", "/projects", json!({"userId": "u"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_list_and_by_user() {
        let app = app();
        for (name, user) in [("A", "u1"), ("B", "u2"), ("C", "u1")] {
            send(
                &app,
                json_request("POST", "/projects", json!({"name": name, "userId": user})),
            )
            .await;
        }

        let (status, all) = send(&app, get_request("/projects")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (status, body) = send(&app, get_request("/projects/by-user?userId=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Projects with user ID u1 found");
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "C"]);

        let (_, body) = send(&app, get_request("/projects/by-user?userId=nobody")).await;
        assert_eq!(body["message"], "No projects found with user ID nobody");
        assert_eq!(body["data"], json!([]));

        let (status, _) = send(&app, get_request("/projects/by-user")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (status, body) = send(&app(), get_request("/projects/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project with ID nope not found");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        let (_, created) =
            send(&app, json_request("POST", "/projects", json!({"name": "P"}))).await;
        let id = created["id"].as_str().unwrap().to_string();
        let uri = format!("/projects/{id}");

        let (status, updated) = send(
            &app,
            json_request(
                "PUT",
                &uri,
                json!({"description": "d", "sqlServers": [{"name": "b"}, {"name": "a"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "d");
        assert_eq!(updated["sqlServers"][0]["name"], "a");
        assert!(updated["updatedAt"].is_string());

        let (status, body) = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            format!("Project {id} deleted successfully")
        );

        let (status, _) = send(&app, get_request(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bulk_update_requires_ids() {
        let app = app();
        let (_, created) =
            send(&app, json_request("POST", "/projects", json!({"name": "P"}))).await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/projects",
                json!([{"id": created["id"], "owner": "x"}, {"owner": "y"}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Each project update must include an id");

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/projects",
                json!([{"id": created["id"], "owner": "x"}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["owner"], "x");
    }
}
