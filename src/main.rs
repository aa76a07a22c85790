use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use clap::Parser;
use tower_http::cors::CorsLayer;

mod args;
mod blobs;
mod blobstore;
mod digest;
mod errors;
mod gc;
mod manifests;
mod manifeststore;
mod media_types;
mod meta;
mod paths;
mod state;
mod tags;
mod walker;

use errors::{ErrorCode, OciErrorResponse};

/// Where in the slash-containing `<name>` segment a known suffix starts.
/// Axum's path syntax can't express "arbitrary-depth segment, then one
/// of several fixed tails" (spec.md §4.1), so the catch-all route below
/// hands the whole remainder here instead of relying on path params.
enum Route {
    Manifest { repo: String, reference: String },
    UploadInit { repo: String },
    UploadChunk { repo: String, upload_id: String },
    Blob { repo: String, digest: String },
    TagsList { repo: String },
    NotFound,
}

fn parse_route(rest: &str) -> Route {
    const TAGS_LIST: &str = "/tags/list";
    const MANIFESTS: &str = "/manifests/";
    const UPLOADS: &str = "/blobs/uploads/";
    const BLOBS: &str = "/blobs/";

    if let Some(repo) = rest.strip_suffix(TAGS_LIST) {
        if !repo.is_empty() {
            return Route::TagsList { repo: repo.to_string() };
        }
    }

    if let Some(idx) = rest.rfind(MANIFESTS) {
        let repo = &rest[..idx];
        let reference = &rest[idx + MANIFESTS.len()..];
        if !repo.is_empty() && !reference.is_empty() {
            return Route::Manifest {
                repo: repo.to_string(),
                reference: reference.to_string(),
            };
        }
    }

    if let Some(idx) = rest.rfind(UPLOADS) {
        let repo = &rest[..idx];
        let after = &rest[idx + UPLOADS.len()..];
        if !repo.is_empty() {
            return if after.is_empty() {
                Route::UploadInit { repo: repo.to_string() }
            } else {
                Route::UploadChunk {
                    repo: repo.to_string(),
                    upload_id: after.to_string(),
                }
            };
        }
    }

    if let Some(idx) = rest.rfind(BLOBS) {
        let repo = &rest[..idx];
        let digest = &rest[idx + BLOBS.len()..];
        if !repo.is_empty() && !digest.is_empty() {
            return Route::Blob {
                repo: repo.to_string(),
                digest: digest.to_string(),
            };
        }
    }

    Route::NotFound
}

fn not_found() -> Response<Body> {
    OciErrorResponse::new(ErrorCode::NameUnknown).to_response()
}

async fn dispatch_get(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
    Query(tags_query): Query<tags::TagsQuery>,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::Manifest { repo, reference } => {
            manifests::get_manifest(State(state), repo, reference).await
        }
        Route::Blob { repo, digest } => blobs::get_blob(State(state), repo, digest).await,
        Route::TagsList { repo } => {
            tags::list_tags(State(state), repo, Query(tags_query)).await
        }
        _ => not_found(),
    }
}

async fn dispatch_head(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::Manifest { repo, reference } => {
            manifests::head_manifest(State(state), repo, reference).await
        }
        Route::Blob { repo, digest } => blobs::head_blob(State(state), repo, digest).await,
        _ => not_found(),
    }
}

async fn dispatch_post(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
    Query(upload_query): Query<blobs::InitUploadQuery>,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::UploadInit { repo } => {
            blobs::init_upload(State(state), repo, Query(upload_query)).await
        }
        _ => not_found(),
    }
}

async fn dispatch_patch(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::UploadChunk { repo, upload_id } => {
            blobs::append_upload(State(state), repo, upload_id, headers, body).await
        }
        _ => not_found(),
    }
}

async fn dispatch_put(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Query(finalize_query): Query<blobs::FinalizeUploadQuery>,
    body: Bytes,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::UploadChunk { repo, upload_id } => {
            blobs::finalize_upload(State(state), repo, upload_id, Query(finalize_query)).await
        }
        Route::Manifest { repo, reference } => {
            let content_type = headers
                .get("Content-Type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            manifests::put_manifest(State(state), repo, reference, content_type, body).await
        }
        _ => not_found(),
    }
}

async fn dispatch_delete(
    State(state): State<Arc<state::App>>,
    Path(rest): Path<String>,
) -> Response<Body> {
    match parse_route(&rest) {
        Route::Manifest { repo, reference } => {
            manifests::delete_manifest(State(state), repo, reference).await
        }
        _ => not_found(),
    }
}

async fn gc_handler(State(state): State<Arc<state::App>>) -> Response<Body> {
    let root = state.root.clone();
    match tokio::task::spawn_blocking(move || gc::bulk_gc(&root)).await {
        Ok(Ok(report)) => {
            let body = serde_json::json!({
                "status": "success",
                "removed_blobs": report.removed_blobs,
            });
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }
        Ok(Err(e)) => OciErrorResponse::from(e).to_response(),
        Err(e) => {
            log::error!("gc: task panicked: {}", e);
            OciErrorResponse::new(ErrorCode::InternalError).to_response()
        }
    }
}

async fn catch_all_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = args::Args::parse();
    log::info!("starting registry on {}", args.host);

    let shared_state = Arc::new(state::new_app(&args));

    let app = Router::new()
        .route("/v2/", get(meta::index))
        .route("/v2/_catalog", get(meta::catalog))
        .route("/v2/gc", post(gc_handler))
        .route(
            "/v2/{*rest}",
            get(dispatch_get)
                .head(dispatch_head)
                .post(dispatch_post)
                .patch(dispatch_patch)
                .put(dispatch_put)
                .delete(dispatch_delete),
        )
        .route("/{*path}", get(catch_all_not_found))
        .layer(CorsLayer::permissive())
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&args.host).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
