use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::response::ApiError;
use crate::auth::CurrentUser;
use crate::file_store::{FileStore, StoredContent};
use crate::services::library;
use crate::AppState;

fn stream_response(content: StoredContent, cache_control: &'static str) -> Response {
    let mime_type = content.mime_type.clone();
    let size = content.size;
    let body = Body::from_stream(ReaderStream::new(content.reader));

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    response
}

async fn open(store: &dyn FileStore, key: &str) -> Result<StoredContent, ApiError> {
    store.open(key).await.map_err(|e| {
        tracing::debug!(key = %key, error = %e, "Stored file not served");
        ApiError::from(e)
    })
}

/// Publication attachment by blob id.
/// Route: GET /files/:id
pub async fn serve_blob(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let content = open(state.attachments.as_ref(), &id).await?;
    // Blob ids are never reused, so the content can be cached for good
    Ok(stream_response(content, "public, max-age=31536000, immutable"))
}

/// Library document by storage key. Keys resolving outside the library
/// root are refused with 403; private files are 404 unless the caller owns
/// them or is an admin.
/// Routes: GET /biblioteca/files/*key, GET /acerca-de/files/*key
pub async fn serve_library_file(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let content = open(state.library.as_ref(), &key).await?;
    let file = library::visible_by_key(&state, &key, viewer.as_ref().map(|v| &v.0))?;
    let cache_control = if file.publico {
        "public, max-age=3600"
    } else {
        "private, max-age=3600"
    };
    let mut response = stream_response(content, cache_control);

    if let Ok(value) = format!("inline; filename=\"{}\"", file.nombre.replace('"', "")).parse() {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
