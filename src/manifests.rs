//! Thin HTTP handlers for the manifest endpoints (spec.md §6, end-7/9
//! plus GET/HEAD by tag or digest). Validation and storage semantics
//! live in `manifeststore`.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::StatusCode, response::Response};
use bytes::Bytes;

use crate::errors::{ErrorCode, OciErrorResponse};
use crate::state;

fn location_header(host: &str, repo: &str, digest: &str) -> String {
    format!("http://{}/v2/{}/manifests/{}", host, repo, digest)
}

pub(crate) async fn put_manifest(
    State(state): State<Arc<state::App>>,
    repo: String,
    reference: String,
    content_type: String,
    body: Bytes,
) -> Response<Body> {
    match state.manifests.put(&repo, &reference, &content_type, &body).await {
        Ok(outcome) => Response::builder()
            .status(StatusCode::CREATED)
            .header("Location", location_header(&state.host, &repo, &outcome.digest))
            .header("Docker-Content-Digest", outcome.digest.as_str())
            .header("Content-Type", content_type)
            .body(Body::empty())
            .unwrap(),
        Err(e) => OciErrorResponse::from(e).to_response(),
    }
}

pub(crate) async fn get_manifest(
    State(state): State<Arc<state::App>>,
    repo: String,
    reference: String,
) -> Response<Body> {
    match state.manifests.get(&repo, &reference) {
        Ok((bytes, content_type, digest)) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Length", bytes.len().to_string())
            .header("Docker-Content-Digest", digest.as_str())
            .header("Content-Type", content_type)
            .body(Body::from(bytes))
            .unwrap(),
        Err(_) => {
            log::debug!("manifests/get: unknown manifest {}/{}", repo, reference);
            OciErrorResponse::new(ErrorCode::ManifestUnknown).to_response()
        }
    }
}

pub(crate) async fn head_manifest(
    State(state): State<Arc<state::App>>,
    repo: String,
    reference: String,
) -> Response<Body> {
    match state.manifests.get(&repo, &reference) {
        Ok((bytes, content_type, digest)) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Length", bytes.len().to_string())
            .header("Docker-Content-Digest", digest.as_str())
            .header("Content-Type", content_type)
            .body(Body::empty())
            .unwrap(),
        Err(_) => OciErrorResponse::new(ErrorCode::ManifestUnknown).to_response(),
    }
}

pub(crate) async fn delete_manifest(
    State(state): State<Arc<state::App>>,
    repo: String,
    reference: String,
) -> Response<Body> {
    match state.manifests.delete(&repo, &reference) {
        Ok(()) => Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(Body::empty())
            .unwrap(),
        Err(e) => OciErrorResponse::from(e).to_response(),
    }
}
