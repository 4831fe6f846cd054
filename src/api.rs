//! HTTP endpoints for the community.
//!
//! Every response is JSON: `{"ok":true,"data":...}` on success and
//! `{"ok":false,"error":"..."}` otherwise.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::community::{
    Community, DeleteRequest, EditReply, FeedQuery, NewQuestion, NewReply, ProfileSync,
    ProfileUpdate,
};
use crate::error::Error;
use crate::identity::generate_keypair;

type AppState = Arc<Community>;

/// Error wrapper rendering [`Error`] as a JSON response.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            Error::RelayRejected { .. } => StatusCode::BAD_GATEWAY,
            err => {
                error!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "ok": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult {
    Ok(Json(json!({ "ok": true, "data": data })).into_response())
}

fn created<T: Serialize>(data: T) -> ApiResult {
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "data": data }))).into_response())
}

/// Response body for the `/healthz` endpoint.
#[derive(Serialize, Deserialize)]
struct Health {
    /// Always "ok" when the server is running.
    status: String,
}

/// Build the router with every community endpoint.
pub fn router(community: Arc<Community>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/keys", get(keys))
        .route("/api/questions", post(create_question).get(list_questions))
        .route("/api/feed", get(feed))
        .route("/api/replies", post(create_reply).get(list_replies))
        .route("/api/replies-by-author", get(replies_by_author))
        .route("/api/replies/edit", post(edit_reply))
        .route("/api/replies/delete", post(delete))
        .route("/api/delete", post(delete))
        .route("/api/clear-all", post(clear_all))
        .route("/api/profile", post(publish_profile))
        .route("/api/profile/sync", post(sync_profile))
        .route("/api/profile/:pubkey", get(fetch_profile))
        .route("/api/stats", get(stats))
        .route("/api/relays", get(relays))
        .route("/api/test-relay", get(test_relay))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(community)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn serve_http(
    addr: SocketAddr,
    community: Arc<Community>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "http listening");
    axum::serve(listener, router(community).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

async fn keys() -> ApiResult {
    ok(generate_keypair())
}

async fn create_question(State(c): State<AppState>, Json(req): Json<NewQuestion>) -> ApiResult {
    created(c.create_question(req).await?)
}

#[derive(Deserialize)]
struct QuestionParams {
    subject: Option<String>,
    author: Option<String>,
}

async fn list_questions(
    State(c): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> ApiResult {
    ok(c.list_questions(params.subject, params.author).await?)
}

async fn feed(State(c): State<AppState>, Query(query): Query<FeedQuery>) -> ApiResult {
    ok(c.feed(query).await?)
}

async fn create_reply(State(c): State<AppState>, Json(req): Json<NewReply>) -> ApiResult {
    created(c.create_reply(req).await?)
}

#[derive(Deserialize)]
struct ReplyParams {
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

async fn list_replies(State(c): State<AppState>, Query(params): Query<ReplyParams>) -> ApiResult {
    ok(c.list_replies(params.parent_id.as_deref().unwrap_or_default()).await?)
}

#[derive(Deserialize)]
struct AuthorParams {
    author: Option<String>,
}

async fn replies_by_author(
    State(c): State<AppState>,
    Query(params): Query<AuthorParams>,
) -> ApiResult {
    ok(c.list_replies_by_author(params.author.as_deref().unwrap_or_default())
        .await?)
}

async fn edit_reply(State(c): State<AppState>, Json(req): Json<EditReply>) -> ApiResult {
    created(c.edit_reply(req).await?)
}

async fn delete(State(c): State<AppState>, Json(req): Json<DeleteRequest>) -> ApiResult {
    created(c.delete(req).await?)
}

#[derive(Deserialize)]
struct ClearParams {
    #[serde(default)]
    nsec: String,
}

async fn clear_all(State(c): State<AppState>, Json(req): Json<ClearParams>) -> ApiResult {
    ok(c.clear_all(&req.nsec).await?)
}

async fn sync_profile(State(c): State<AppState>, Json(req): Json<ProfileSync>) -> ApiResult {
    ok(c.sync_profile(req)?)
}

async fn publish_profile(State(c): State<AppState>, Json(req): Json<ProfileUpdate>) -> ApiResult {
    created(c.publish_profile(req).await?)
}

async fn fetch_profile(State(c): State<AppState>, Path(pubkey): Path<String>) -> ApiResult {
    match c.fetch_profile(&pubkey).await? {
        Some(record) => ok(record),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "ok": false, "error": "Profile not found" })),
        )
            .into_response()),
    }
}

async fn stats(State(c): State<AppState>) -> ApiResult {
    ok(c.stats().await?)
}

async fn relays(State(c): State<AppState>) -> ApiResult {
    ok(json!({ "relays": c.relays(), "scope": c.scope() }))
}

async fn test_relay(State(c): State<AppState>) -> ApiResult {
    ok(c.probe().await?)
}
