//! GET /v2/<name>/tags/list[?n=&last=] (spec.md §6, §4.3 list_tags).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

use crate::errors::{ErrorCode, OciErrorResponse};
use crate::state;

#[derive(Deserialize)]
pub(crate) struct TagsQuery {
    pub(crate) n: Option<usize>,
    pub(crate) last: Option<String>,
}

pub(crate) async fn list_tags(
    State(state): State<Arc<state::App>>,
    repo: String,
    Query(params): Query<TagsQuery>,
) -> Response<Body> {
    match state.manifests.list_tags(&repo, params.n, params.last.as_deref()) {
        Ok(tags) => {
            let body = serde_json::json!({ "name": repo, "tags": tags });
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }
        Err(_) => OciErrorResponse::new(ErrorCode::NameUnknown).to_response(),
    }
}
