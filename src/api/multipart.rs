use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use super::response::ApiError;
use crate::file_store::Upload;
use crate::services::uploads::FileOutcome;

/// A multipart body split into text fields and file parts.
/// Files over the size limit are not kept; they are reported in `rejected`.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<Upload>,
    pub rejected: Vec<FileOutcome>,
}

/// The request body limit surfaces as a multipart read error.
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Request body is too large");
    }
    ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart, max_file_size: u64) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            let name = field.name().unwrap_or("").to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(multipart_error)?;

                    if data.len() as u64 > max_file_size {
                        tracing::debug!(file = %file_name, size = data.len(), "Rejected oversized upload");
                        form.rejected.push(FileOutcome::failed(
                            file_name,
                            format!("File exceeds maximum upload size of {max_file_size} bytes"),
                        ));
                        continue;
                    }
                    if data.is_empty() {
                        form.rejected.push(FileOutcome::failed(file_name, "File is empty"));
                        continue;
                    }

                    // Content-Type from the part, else guessed from the name
                    let mime_type = content_type
                        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
                        .unwrap_or_else(|| {
                            mime_guess::from_path(&file_name)
                                .first_or_octet_stream()
                                .to_string()
                        });

                    form.files.push(Upload {
                        original_name: file_name,
                        mime_type,
                        data,
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid field {name}: {e}")))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Parse a field holding JSON (e.g. `enlacesExternos`).
    pub fn json_field<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.field(name).map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| ApiError::bad_request(format!("{name} must be valid JSON: {e}"))),
            None => Ok(None),
        }
    }
}
