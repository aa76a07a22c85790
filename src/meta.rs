use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state;

pub(crate) async fn index() -> (HeaderMap, Json<Value>) {
    let mut headers = HeaderMap::new();
    headers.insert("Docker-Distribution-API-Version", "registry/2.0".parse().unwrap());
    (headers, Json(json!({})))
}

#[derive(Deserialize)]
pub(crate) struct CatalogQueryParams {
    n: Option<usize>,
    last: Option<String>,
}

pub(crate) async fn catalog(
    State(state): State<Arc<state::App>>,
    Query(params): Query<CatalogQueryParams>,
) -> Json<Value> {
    let repos = state
        .manifests
        .list_repos(params.n, params.last.as_deref())
        .unwrap_or_default();
    Json(json!({ "repositories": repos }))
}
