use axum::{
    Router,
    routing::get,
    extract::{State, Json},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use crate::api::query::{AssetRecord, PairRecord, QueryFacade};
use crate::observability::metrics;
use crate::types::timestamp::Timestamp;

pub struct ApiState {
    pub query: QueryFacade,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/assets", get(list_assets))
        .route("/pairs", get(list_pairs))
        .route("/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_assets(State(state): State<Arc<ApiState>>) -> Json<Vec<AssetRecord>> {
    Json(state.query.list_assets())
}

async fn list_pairs(State(state): State<Arc<ApiState>>) -> Json<Vec<PairRecord>> {
    Json(state.query.list_pairs())
}

#[derive(Serialize)]
struct StatusResponse {
    sequence: u64,
    published_at: Option<String>,
    /// Seconds since the snapshot was published.
    age_secs: Option<u64>,
    asset_records: usize,
    pair_records: usize,
    protocols: Vec<String>,
}

async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let snapshot = state.query.store().get();
    let published = (snapshot.sequence > 0).then_some(snapshot.published_at);

    Json(StatusResponse {
        sequence: snapshot.sequence,
        published_at: published.map(|t| t.to_string()),
        age_secs: published.map(|t| (Timestamp::now() - t).as_secs()),
        asset_records: snapshot.asset_records.len(),
        pair_records: snapshot.pair_records.len(),
        protocols: snapshot.protocols().into_iter().map(str::to_string).collect(),
    })
}

async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
