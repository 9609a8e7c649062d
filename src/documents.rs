// src/documents.rs

//! Document uploads. Metadata goes through the store; the bytes are written to
//! the uploads directory under a generated name.

use std::path::Path;

use actix_multipart::Multipart;
use actix_web::http::header::{
    Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
};
use actix_web::{web, HttpResponse};
use chrono::Local;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{Document, DocumentType};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/documents")
            .route("", web::get().to(list_documents))
            .route("", web::post().to(upload_document))
            .route("/{document_id}", web::get().to(get_document))
            .route("/{document_id}", web::delete().to(delete_document))
            .route("/{document_id}/download", web::get().to(download_document)),
    );
}

/// Keeps letters, digits, dots, dashes and underscores so the stored name is
/// safe on any filesystem.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn stored_file_name(original: &str) -> String {
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_file_name(original)
    )
}

fn multipart_error(e: actix_multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid upload: {e}"))
}

/// GET /api/documents
pub async fn list_documents(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.store.list::<Document>().await))
}

/// GET /api/documents/{document_id}
pub async fn get_document(
    data: web::Data<AppState>,
    document_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let document = data
        .store
        .get::<Document>(&document_id)
        .await
        .ok_or(ApiError::NotFound("Document"))?;
    Ok(HttpResponse::Ok().json(document))
}

/// POST /api/documents
/// multipart/form-data with a `file` part and a `type` field.
pub async fn upload_document(
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let limit = data.config.max_upload_bytes;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut doc_type: Option<String> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::BadRequest(format!(
                    "File is larger than {} bytes",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "file" => {
                let name = file_name.unwrap_or_else(|| "upload".to_string());
                file = Some((name, bytes));
            }
            "type" => doc_type = Some(String::from_utf8_lossy(&bytes).into_owned()),
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let (original_name, bytes) = file.ok_or(ApiError::bad_request("No file uploaded"))?;
    let doc_type: DocumentType = doc_type
        .ok_or(ApiError::bad_request("Document type is required"))?
        .parse()
        .map_err(ApiError::BadRequest)?;

    let stored_name = stored_file_name(&original_name);
    let uploads_dir = &data.config.uploads_dir;
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to prepare uploads directory: {e}")))?;
    let target = uploads_dir.join(&stored_name);
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save file: {e}")))?;

    let saved = data
        .store
        .transaction(|db| {
            let document = Document {
                id: db.next_id::<Document>(),
                name: original_name,
                doc_type,
                upload_date: Local::now().date_naive(),
                file_path: stored_name,
                file_size: bytes.len() as u64,
            };
            db.insert(document.clone())?;
            Ok::<_, ApiError>(document)
        })
        .await;

    match saved {
        Ok(document) => {
            info!("Document uploaded: {} ({} bytes)", document.id, document.file_size);
            Ok(HttpResponse::Created().json(document))
        }
        Err(e) => {
            remove_file_quietly(&target).await;
            Err(e)
        }
    }
}

/// GET /api/documents/{document_id}/download
/// Streams the stored bytes back under the original file name.
pub async fn download_document(
    data: web::Data<AppState>,
    document_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let document = data
        .store
        .get::<Document>(&document_id)
        .await
        .ok_or(ApiError::NotFound("Document"))?;

    let path = data.config.uploads_dir.join(&document.file_path);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("File for document {} is missing: {}", document.id, path.display());
            return Err(ApiError::NotFound("File"));
        }
        Err(e) => return Err(ApiError::Internal(format!("Failed to read file: {e}"))),
    };

    let content_type = mime_guess::from_path(&document.name).first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .content_type(content_type.essence_str())
        .insert_header(attachment_disposition(&document.name))
        .body(bytes))
}

/// `filename` alone for ASCII names; otherwise an ASCII fallback plus the
/// UTF-8 `filename*` (RFC 5987).
fn attachment_disposition(name: &str) -> ContentDisposition {
    let mut parameters = Vec::with_capacity(2);
    if name.is_ascii() {
        parameters.push(DispositionParam::Filename(name.to_string()));
    } else {
        let fallback: String = name
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        parameters.push(DispositionParam::Filename(fallback));
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: name.as_bytes().to_vec(),
        }));
    }
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

/// DELETE /api/documents/{document_id}
pub async fn delete_document(
    data: web::Data<AppState>,
    document_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let document = data
        .store
        .delete::<Document>(&document_id)
        .await?
        .ok_or(ApiError::NotFound("Document"))?;
    remove_file_quietly(&data.config.uploads_dir.join(&document.file_path)).await;
    info!("Document deleted: {}", document.id);
    Ok(HttpResponse::NoContent().finish())
}

async fn remove_file_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}
