use axum::{body::Body, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    #[serde(rename = "BLOB_UNKNOWN")]
    BlobUnknown,
    #[serde(rename = "BLOB_UPLOAD_UNKNOWN")]
    BlobUploadUnknown,
    #[serde(rename = "BLOB_UPLOAD_INVALID")]
    BlobUploadInvalid,
    #[serde(rename = "DIGEST_INVALID")]
    DigestInvalid,
    #[serde(rename = "MANIFEST_UNKNOWN")]
    ManifestUnknown,
    #[serde(rename = "MANIFEST_INVALID")]
    ManifestInvalid,
    #[serde(rename = "NAME_UNKNOWN")]
    NameUnknown,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::BlobUnknown
            | ErrorCode::BlobUploadUnknown
            | ErrorCode::ManifestUnknown
            | ErrorCode::NameUnknown => StatusCode::NOT_FOUND,
            ErrorCode::DigestInvalid
            | ErrorCode::BlobUploadInvalid
            | ErrorCode::ManifestInvalid => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OciError {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OciErrorResponse {
    pub errors: Vec<OciError>,
}

impl OciErrorResponse {
    pub(crate) fn new(code: ErrorCode) -> Self {
        Self {
            errors: vec![OciError { code, detail: None }],
        }
    }

    pub(crate) fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            errors: vec![OciError {
                code,
                detail: Some(detail.into()),
            }],
        }
    }

    pub(crate) fn to_response(&self) -> Response {
        let status = self
            .errors
            .first()
            .map(|e| e.code.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let json = serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"errors":[{"code":"INTERNAL_ERROR"}]}"#.to_string());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(json))
            .unwrap()
    }
}

impl IntoResponse for OciErrorResponse {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

/// Failure sentinels raised by the blob store (C2).
#[derive(Debug)]
pub(crate) enum BlobError {
    UploadUnknown,
    InvalidRange,
    DigestInvalid,
    Io(std::io::Error),
}

impl From<std::io::Error> for BlobError {
    fn from(e: std::io::Error) -> Self {
        BlobError::Io(e)
    }
}

impl From<BlobError> for OciErrorResponse {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::UploadUnknown => OciErrorResponse::new(ErrorCode::BlobUploadUnknown),
            BlobError::InvalidRange => OciErrorResponse::with_detail(
                ErrorCode::BlobUploadInvalid,
                "content-range does not match current upload size",
            ),
            BlobError::DigestInvalid => OciErrorResponse::with_detail(
                ErrorCode::DigestInvalid,
                "digest does not match uploaded content",
            ),
            BlobError::Io(e) => {
                OciErrorResponse::with_detail(ErrorCode::InternalError, e.to_string())
            }
        }
    }
}

/// Failure sentinels raised by the manifest store (C3).
#[derive(Debug)]
pub(crate) enum ManifestError {
    Unsupported(String),
    InvalidJson(String),
    Unknown,
    Io(std::io::Error),
}

impl From<std::io::Error> for ManifestError {
    fn from(e: std::io::Error) -> Self {
        ManifestError::Io(e)
    }
}

impl From<ManifestError> for OciErrorResponse {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::Unsupported(detail) => {
                OciErrorResponse::with_detail(ErrorCode::ManifestInvalid, detail)
            }
            ManifestError::InvalidJson(detail) => {
                OciErrorResponse::with_detail(ErrorCode::ManifestInvalid, detail)
            }
            ManifestError::Unknown => OciErrorResponse::new(ErrorCode::ManifestUnknown),
            ManifestError::Io(e) => {
                // Delete path treats internal failures as a catch-all MANIFEST_INVALID, per spec.md §4.5.
                OciErrorResponse::with_detail(ErrorCode::ManifestInvalid, e.to_string())
            }
        }
    }
}

/// Failure sentinel raised by the garbage collector (C5) bulk sweep.
#[derive(Debug)]
pub(crate) struct GcError(pub std::io::Error);

impl From<std::io::Error> for GcError {
    fn from(e: std::io::Error) -> Self {
        GcError(e)
    }
}

impl From<GcError> for OciErrorResponse {
    fn from(e: GcError) -> Self {
        OciErrorResponse::with_detail(ErrorCode::InternalError, e.0.to_string())
    }
}
