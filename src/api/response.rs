use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::file_store::FileStoreError;
use crate::services::uploads::{batch_status, BatchStatus, FileOutcome};
use crate::services::ServiceError;
use crate::storage::models::Tier;

// ============================================================================
// JSend status enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

// ============================================================================
// JSend success envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }
}

// ============================================================================
// JSend paginated envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JSendPaginated<T: Serialize> {
    pub data: PaginatedData<T>,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize)]
pub struct PaginatedData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

impl<T: Serialize> JSendPaginated<T> {
    pub fn success(items: Vec<T>, pagination: Pagination) -> Json<JSendPaginated<T>> {
        Json(JSendPaginated {
            data: PaginatedData { items, pagination },
            status: JSendStatus::Success,
        })
    }
}

// ============================================================================
// JSend fail envelope (client errors, 4xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendFail {
    pub data: FailData,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
    /// Machine-readable details next to the message (limit counters, per-file results)
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl JSendFail {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
        details: Map<String, Value>,
    ) -> (StatusCode, Json<JSendFail>) {
        (
            status_code,
            Json(JSendFail {
                data: FailData {
                    message: message.into(),
                    details,
                },
                status: JSendStatus::Fail,
            }),
        )
    }
}

// ============================================================================
// JSend error envelope (server errors, 5xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendError {
    pub message: String,
    pub status: JSendStatus,
}

impl JSendError {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<JSendError>) {
        (
            status_code,
            Json(JSendError {
                message: message.into(),
                status: JSendStatus::Error,
            }),
        )
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

const INTERNAL_MESSAGE: &str = "Internal server error";
const PAYMENT_MESSAGE: &str = "The payment could not be processed. Please try again later.";

/// A JSend-compatible error that can be either a fail (4xx) or error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    /// A fail carrying extra fields in `data`
    Detailed(StatusCode, String, Map<String, Value>),
    /// A 5xx whose public message hides `detail` unless dev mode is on
    Error(StatusCode, String, Option<String>),
}

/// Internal detail of a 5xx response, picked up by [`expose_error_details`].
#[derive(Debug, Clone)]
struct ErrorDetail(String);

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, msg) => JSendFail::response(code, msg, Map::new()).into_response(),
            ApiError::Detailed(code, msg, details) => {
                JSendFail::response(code, msg, details).into_response()
            }
            ApiError::Error(code, msg, detail) => {
                let mut response = JSendError::response(code, msg).into_response();
                if let Some(detail) = detail {
                    response.extensions_mut().insert(ErrorDetail(detail));
                }
                response
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNAUTHORIZED, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::FORBIDDEN, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::CONFLICT, message.into())
    }

    pub fn limit_exceeded(current: u32, limit: u32, tier: Tier) -> Self {
        let mut details = Map::new();
        details.insert("code".into(), Value::from("LIMIT_EXCEEDED"));
        details.insert("current".into(), Value::from(current));
        details.insert("limit".into(), Value::from(limit));
        details.insert("tier".into(), Value::from(tier.as_u8()));
        ApiError::Detailed(
            StatusCode::BAD_REQUEST,
            format!("You have reached your publication limit ({current}/{limit})"),
            details,
        )
    }

    /// 400 for a batch upload where no file could be stored.
    pub fn batch_failed(results: &[FileOutcome]) -> Self {
        let mut details = Map::new();
        details.insert(
            "results".into(),
            serde_json::to_value(results).unwrap_or(Value::Null),
        );
        ApiError::Detailed(StatusCode::BAD_REQUEST, "No file could be stored".into(), details)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Error(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_MESSAGE.into(),
            Some(detail.into()),
        )
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::LimitExceeded {
                current,
                limit,
                tier,
            } => ApiError::limit_exceeded(current, limit, tier),
            ServiceError::FileStore(e) => e.into(),
            ServiceError::Gateway(e) => {
                tracing::error!(error = %e, "Payment gateway call failed");
                ApiError::Error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PAYMENT_MESSAGE.into(),
                    Some(e.to_string()),
                )
            }
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "Database operation failed");
                ApiError::internal(e.to_string())
            }
            ServiceError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                ApiError::internal(detail)
            }
        }
    }
}

impl From<FileStoreError> for ApiError {
    fn from(e: FileStoreError) -> Self {
        match e {
            FileStoreError::NotFound(_) | FileStoreError::InvalidKey(_) => {
                ApiError::not_found("File not found")
            }
            FileStoreError::Forbidden(_) => ApiError::forbidden("Access denied"),
            other => {
                tracing::error!(error = %other, "File store operation failed");
                ApiError::internal(other.to_string())
            }
        }
    }
}

/// Replace generic 5xx messages with their internal detail. Only layered
/// when `DEV_MODE` is on.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() {
        let status = response.status();
        return JSendError::response(status, detail).into_response();
    }
    response
}

// ============================================================================
// Success helpers
// ============================================================================

/// `201 Created` with a JSend success body.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<JSend<T>>) {
    (StatusCode::CREATED, JSend::success(data))
}

/// Response for a request that stored files one by one: 201 when nothing
/// failed, 207 when something was created despite failures, 400 when
/// nothing was created at all.
pub fn batch<T: Serialize>(
    data: T,
    results: &[FileOutcome],
    created_any: bool,
) -> Result<(StatusCode, Json<JSend<T>>), ApiError> {
    match batch_status(results) {
        BatchStatus::AllSucceeded => Ok(created(data)),
        _ if created_any => Ok((StatusCode::MULTI_STATUS, JSend::success(data))),
        _ => Err(ApiError::batch_failed(results)),
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with JSend errors.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Expected a JSON body (Content-Type: application/json)".into()
                    }
                    other => format!("Could not read request body: {}", other.body_text()),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Reword serde_qs messages for clients: Rust type names become plain words.
fn friendly_query_error(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    for (rust, plain) in [
        ("u32", "non-negative integer"),
        ("u64", "non-negative integer"),
        ("i64", "integer"),
        ("provided string was not `true` or `false`", "expected true or false"),
    ] {
        cleaned = cleaned.replace(rust, plain);
    }
    format!("Invalid query parameter: {cleaned}")
}
