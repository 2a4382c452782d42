use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::UploadReceipt;

/// POST /upload-pdf: multipart `file` plus an optional `doc_id` text field.
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut doc_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await?;
                file = Some((name, bytes.to_vec()));
            }
            Some("doc_id") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    doc_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let (name, bytes) = file.ok_or_else(|| ApiError::bad_request("missing multipart field `file`"))?;
    tracing::info!(file = %name, size = bytes.len(), "received PDF upload");

    let doc_id = state.ingestion.ingest_bytes(bytes, doc_id).await?;
    Ok(Json(UploadReceipt { doc_id }))
}
