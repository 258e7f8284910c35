//! Response builders and request helpers shared by all routes
//!
//! Every response carries permissive CORS headers; the game client is
//! served from a different origin.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::types::QuizError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted JSON body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Same text as `error`; older game clients read this field
    pub msg: String,
    pub code: &'static str,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        r#"{"error":"Serialization failed","msg":"Serialization failed","code":"INTERNAL_ERROR"}"#.to_string()
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(full_body(json))
        .unwrap()
}

/// JSON error body with the status the error maps to.
/// Server-side failures are logged and their details withheld.
pub fn error_response(err: &QuizError) -> Response<BoxBody> {
    let status = err.status_code();
    let message = if status.is_server_error() {
        error!("Request failed: {}", err);
        match err {
            QuizError::Database(_) => "Service temporarily unavailable, please retry".to_string(),
            _ => "Internal server error".to_string(),
        }
    } else {
        err.to_string()
    };

    json_response(
        status,
        &ErrorResponse {
            msg: message.clone(),
            error: message,
            code: err.code(),
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Read and decode a JSON body, refusing anything over [`MAX_BODY_BYTES`]
pub async fn parse_json_body<T: DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, QuizError> {
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                QuizError::Http("Request body too large".into())
            } else {
                QuizError::Http(format!("Failed to read body: {}", e))
            }
        })?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| QuizError::Http(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}
