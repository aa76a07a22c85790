//! Thin HTTP handlers for the blob endpoints (spec.md §6, end-2/4/5/6).
//! All state-machine logic lives in `blobstore`; this module only does
//! extraction, header plumbing, and error-code translation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::blobstore::UploadStart;
use crate::errors::{BlobError, ErrorCode, OciErrorResponse};
use crate::state;

fn location_header(host: &str, repo: &str, digest: &str) -> String {
    format!("http://{}/v2/{}/blobs/{}", host, repo, digest)
}

pub(crate) async fn get_blob(
    State(state): State<Arc<state::App>>,
    repo: String,
    digest: String,
) -> Response<Body> {
    match state.blobs.open(&digest).await {
        Ok(file) => {
            let len = file
                .metadata()
                .await
                .map(|m| m.len())
                .unwrap_or_default();
            let stream = ReaderStream::new(file);
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Length", len.to_string())
                .header("Docker-Content-Digest", digest.as_str())
                .header("Content-Type", "application/octet-stream")
                .body(Body::from_stream(stream))
                .unwrap()
        }
        Err(_) => {
            log::debug!("blobs/get: unknown blob {}/{}", repo, digest);
            OciErrorResponse::new(ErrorCode::BlobUnknown).to_response()
        }
    }
}

pub(crate) async fn head_blob(
    State(state): State<Arc<state::App>>,
    repo: String,
    digest: String,
) -> Response<Body> {
    match state.blobs.metadata(&digest) {
        Ok(metadata) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Length", metadata.len().to_string())
            .header("Docker-Content-Digest", digest.as_str())
            .header("Content-Type", "application/octet-stream")
            .body(Body::empty())
            .unwrap(),
        Err(_) => {
            log::debug!("blobs/head: unknown blob {}/{}", repo, digest);
            OciErrorResponse::new(ErrorCode::BlobUnknown).to_response()
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct InitUploadQuery {
    digest: Option<String>,
}

pub(crate) async fn init_upload(
    State(state): State<Arc<state::App>>,
    repo: String,
    Query(params): Query<InitUploadQuery>,
) -> Response<Body> {
    match state.blobs.begin_upload(params.digest.as_deref()).await {
        Ok(UploadStart::Mounted { digest }) => Response::builder()
            .status(StatusCode::CREATED)
            .header("Location", location_header(&state.host, &repo, &digest))
            .header("Docker-Content-Digest", digest.as_str())
            .body(Body::empty())
            .unwrap(),
        Ok(UploadStart::Created { upload_id }) => Response::builder()
            .status(StatusCode::ACCEPTED)
            .header(
                "Location",
                format!("http://{}/v2/{}/blobs/uploads/{}", state.host, repo, upload_id),
            )
            .header("Range", "0-0")
            .header("Docker-Upload-UUID", upload_id)
            .body(Body::empty())
            .unwrap(),
        Err(e) => blob_error_response(e),
    }
}

fn parse_content_range(headers: &axum::http::HeaderMap) -> Result<Option<(u64, u64)>, BlobError> {
    let Some(value) = headers.get("Content-Range") else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| BlobError::InvalidRange)?;
    let (start, end) = value.split_once('-').ok_or(BlobError::InvalidRange)?;
    let start = start.parse::<u64>().map_err(|_| BlobError::InvalidRange)?;
    let end = end.parse::<u64>().map_err(|_| BlobError::InvalidRange)?;
    Ok(Some((start, end)))
}

pub(crate) async fn append_upload(
    State(state): State<Arc<state::App>>,
    repo: String,
    upload_id: String,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let content_range = match parse_content_range(&headers) {
        Ok(r) => r,
        Err(e) => return blob_error_response(e),
    };

    match state.blobs.append(&upload_id, &body, content_range).await {
        Ok(size) => Response::builder()
            .status(StatusCode::ACCEPTED)
            .header(
                "Location",
                format!("http://{}/v2/{}/blobs/uploads/{}", state.host, repo, upload_id),
            )
            .header("Range", format!("0-{}", size.saturating_sub(1)))
            .header("Docker-Upload-UUID", &upload_id)
            .body(Body::empty())
            .unwrap(),
        Err(e) => blob_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct FinalizeUploadQuery {
    digest: Option<String>,
}

/// The distribution spec permits a trailing-bytes body on the finalizing
/// PUT; this system does not append it (spec.md §6, §9) — append first
/// via PATCH, then finalize.
pub(crate) async fn finalize_upload(
    State(state): State<Arc<state::App>>,
    repo: String,
    upload_id: String,
    Query(params): Query<FinalizeUploadQuery>,
) -> Response<Body> {
    let Some(digest) = params.digest else {
        return blob_error_response(BlobError::DigestInvalid);
    };

    match state.blobs.finalize(&upload_id, &digest).await {
        Ok(actual_digest) => Response::builder()
            .status(StatusCode::CREATED)
            .header("Location", location_header(&state.host, &repo, &actual_digest))
            .header("Docker-Content-Digest", actual_digest.as_str())
            .body(Body::empty())
            .unwrap(),
        Err(e) => blob_error_response(e),
    }
}

fn blob_error_response(e: BlobError) -> Response<Body> {
    OciErrorResponse::from(e).to_response()
}
