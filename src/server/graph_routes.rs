//! Read-only graph endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::state::{GuardedQueryService, ServerState};
use crate::cache::CachedPayload;
use crate::query::{ArtistGraphParams, GraphQueryError};
use crate::reconcile::ArtistId;

pub const CACHE_OUTCOME_HEADER: &str = "x-cache";
const DEFAULT_LIVE_TOP_GENRES: usize = 10;

#[derive(Deserialize, Debug)]
struct LiveTopGenresParams {
    count: Option<usize>,
}

impl IntoResponse for GraphQueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            GraphQueryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GraphQueryError::ArtistNotFound(_) => StatusCode::NOT_FOUND,
            GraphQueryError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            GraphQueryError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Graph query failed: {}", self);
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Cached payloads are already JSON text; send them as-is and report how
/// the cache answered.
fn payload_response(payload: CachedPayload) -> Response {
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        payload.body,
    )
        .into_response();
    response.headers_mut().insert(
        CACHE_OUTCOME_HEADER,
        HeaderValue::from_static(payload.outcome.as_str()),
    );
    response
}

fn respond(result: Result<CachedPayload, GraphQueryError>) -> Response {
    match result {
        Ok(payload) => payload_response(payload),
        Err(err) => err.into_response(),
    }
}

async fn get_sync(State(service): State<GuardedQueryService>) -> Response {
    match service.sync_info() {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_artist_graph(
    State(service): State<GuardedQueryService>,
    Query(params): Query<ArtistGraphParams>,
) -> Response {
    respond(service.artist_graph(&params))
}

async fn get_related_artists(
    State(service): State<GuardedQueryService>,
    Path(id): Path<ArtistId>,
) -> Response {
    respond(service.related_artists(id))
}

async fn get_top_genres(State(service): State<GuardedQueryService>) -> Response {
    respond(service.top_genres())
}

async fn get_live_top_genres(
    State(service): State<GuardedQueryService>,
    Query(params): Query<LiveTopGenresParams>,
) -> Response {
    respond(service.top_genres_live(params.count.unwrap_or(DEFAULT_LIVE_TOP_GENRES)))
}

pub fn make_graph_routes(state: ServerState) -> Router {
    Router::new()
        .route("/sync", get(get_sync))
        .route("/artists", get(get_artist_graph))
        .route("/artists/{id}/related", get(get_related_artists))
        .route("/top-genres", get(get_top_genres))
        .route("/top-genres/live", get(get_live_top_genres))
        .with_state(state)
}
