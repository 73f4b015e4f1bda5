use std::collections::BTreeMap;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppState;
use crate::db::models::NewDocument;
use crate::db::repository::{DocumentHandle, DocumentStore};
use crate::db::schema::{check_property_names, is_valid_identifier};
use crate::error::AppError;
use crate::models::document::{DocumentRecord, PropertyValue};
use crate::search::mapper::to_record;
use crate::storage::client::StorageClient;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const DEFAULT_FILE_NAME: &str = "untitled";

/// A parsed document upload.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<Vec<u8>>,
    pub document_class: Option<String>,
    /// Every other text field of the form.
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Core create logic, independent of the HTTP layer.
///
/// Uploads the content blob, then creates the document. If the document
/// can't be created the blob is removed again.
pub async fn process_create(state: &AppState, upload: DocumentUpload) -> Result<String, AppError> {
    let store = state.document_store.as_ref();
    let storage = state.storage_client.as_ref();

    // 1. Validate the form
    let content = upload
        .content
        .ok_or_else(|| AppError::BadRequest("No file field found in request".into()))?;

    let document_class = upload
        .document_class
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("documentClass is required".into()))?;

    if !is_valid_identifier(&document_class) || !state.accepts_document_class(&document_class) {
        return Err(AppError::BadRequest(format!(
            "Unknown document class '{document_class}'"
        )));
    }

    check_property_names(upload.properties.keys().map(String::as_str))?;

    // 2. Upload content
    let id = uuid::Uuid::new_v4().to_string();
    let content_key = format!("{}{}", state.content_key_prefix, id);
    let mime_type = upload
        .content_type
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let content_size = i64::try_from(content.len()).unwrap_or(i64::MAX);

    storage.put_object(&content_key, content, &mime_type).await?;

    // 3. Create the document
    let doc = NewDocument {
        id: id.clone(),
        name: upload
            .file_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        document_class,
        mime_type: Some(mime_type),
        creator: state.principal.clone(),
        content_key: Some(content_key.clone()),
        content_size,
        properties: upload.properties,
    };

    if let Err(e) = store.create(doc).await {
        if let Err(cleanup) = storage.delete_object(&content_key).await {
            tracing::warn!("Failed to remove orphaned content '{content_key}': {cleanup}");
        }
        return Err(e);
    }

    tracing::info!("Created document '{id}'");
    Ok(id)
}

/// Fetch a document as a record.
pub async fn process_get(store: &dyn DocumentStore, id: &str) -> Result<DocumentRecord, AppError> {
    let doc = store
        .fetch(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document '{id}'")))?;
    to_record(&doc)
}

/// Delete a document and release its content.
pub async fn process_delete(
    store: &dyn DocumentStore,
    storage: &dyn StorageClient,
    id: &str,
) -> Result<(), AppError> {
    let removed = store
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document '{id}'")))?;

    if let Some(key) = removed.content_key() {
        if let Err(e) = storage.delete_object(key).await {
            tracing::warn!("Document '{id}' deleted but its content '{key}' was not: {e}");
        }
    }

    tracing::info!("Deleted document '{id}'");
    Ok(())
}

/// Axum handler for `POST /api/documents`.
///
/// Accepts a multipart form with a `file` part and a `documentClass` field.
/// Any other text field becomes a custom property. Responds with the new id.
pub async fn create_document_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, AppError> {
    let mut upload = DocumentUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                upload.content = Some(data.to_vec());
            }
            "documentClass" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {e}")))?;
                upload.document_class = Some(value.trim().to_string());
            }
            "" => continue,
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {e}")))?;
                upload.properties.insert(name, PropertyValue::Text(value));
            }
        }
    }

    process_create(&state, upload).await
}

/// Axum handler for `GET /api/documents/{id}`.
pub async fn get_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, AppError> {
    let record = process_get(state.document_store.as_ref(), &id).await?;
    Ok(Json(record))
}

/// Axum handler for `DELETE /api/documents/{id}`.
pub async fn delete_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    process_delete(
        state.document_store.as_ref(),
        state.storage_client.as_ref(),
        &id,
    )
    .await?;
    Ok(StatusCode::OK)
}

/// Axum handler for `GET /api/documents/{id}/content`.
///
/// Serves the document's content with its recorded mime type.
pub async fn get_content_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let doc = state
        .document_store
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document '{id}'")))?;

    let key = doc
        .content_key()
        .ok_or_else(|| AppError::NotFound(format!("Document '{id}' has no content")))?;

    let data = state
        .storage_client
        .get_object(key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content of document '{id}'")))?;

    let content_type = doc
        .mime_type()?
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
