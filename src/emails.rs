// src/emails.rs

use actix_web::{web, HttpResponse};
use chrono::Local;
use log::info;
use serde_json::json;

use crate::app_state::AppState;
use crate::email_intake::{self, ConvertEmailRequest};
use crate::error::ApiError;
use crate::models::{
    Client, CreateEmailRequest, Email, SendEmailRequest, UpdateEmailStatusRequest,
};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/emails")
            .route("", web::get().to(list_emails))
            .route("", web::post().to(import_email))
            // static segments first, or "/{email_id}" would claim them
            .route("/fetch", web::post().to(fetch_emails))
            .route("/send", web::post().to(send_email))
            .route("/{email_id}", web::get().to(get_email))
            .route("/{email_id}", web::delete().to(delete_email))
            .route("/{email_id}/status", web::patch().to(update_email_status))
            .route("/{email_id}/analyze", web::post().to(analyze_email))
            .route("/{email_id}/convert", web::post().to(convert_email))
            .route("/{email_id}/revert", web::post().to(revert_email)),
    );
}

/// GET /api/emails
/// Newest first.
pub async fn list_emails(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut emails = data.store.list::<Email>().await;
    emails.sort_by(|a, b| b.received_date.cmp(&a.received_date));
    Ok(HttpResponse::Ok().json(emails))
}

/// GET /api/emails/{email_id}
pub async fn get_email(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = data
        .store
        .get::<Email>(&email_id)
        .await
        .ok_or(ApiError::NotFound("Email"))?;
    Ok(HttpResponse::Ok().json(email))
}

/// POST /api/emails
pub async fn import_email(
    data: web::Data<AppState>,
    payload: web::Json<CreateEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = email_intake::import_email(&data.store, payload.into_inner()).await?;
    info!("Email imported: {} from {}", email.id, email.from);
    Ok(HttpResponse::Created().json(email))
}

/// DELETE /api/emails/{email_id}
/// A task created from the email stays.
pub async fn delete_email(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.store
        .delete::<Email>(&email_id)
        .await?
        .ok_or(ApiError::NotFound("Email"))?;
    info!("Email deleted: {}", email_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Email deleted successfully" })))
}

/// PATCH /api/emails/{email_id}/status
pub async fn update_email_status(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
    payload: web::Json<UpdateEmailStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = email_intake::update_status(&data.store, &email_id, payload.status).await?;
    Ok(HttpResponse::Ok().json(email))
}

/// POST /api/emails/fetch
/// Pulls unseen messages from the mailbox and stores the ones not seen before.
pub async fn fetch_emails(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let fetched = data.mailbox.fetch_unseen().await?;
    let outcome = email_intake::save_fetched(&data.store, fetched).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/emails/{email_id}/analyze
/// The analysis is returned to the caller and never stored.
pub async fn analyze_email(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = data
        .store
        .get::<Email>(&email_id)
        .await
        .ok_or(ApiError::NotFound("Email"))?;
    let clients = data.store.list::<Client>().await;

    let analysis = data.analyzer.analyze(&email, &clients).await?;
    let analysis = email_intake::reconcile_analysis(analysis, &email, &clients);
    info!(
        "Analyzed email {}: type {:?}, client {:?}",
        email.id, analysis.email_type, analysis.matching_client
    );
    Ok(HttpResponse::Ok().json(analysis))
}

/// POST /api/emails/{email_id}/convert
pub async fn convert_email(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
    payload: web::Json<ConvertEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let conversion = email_intake::convert_email(
        &data.store,
        &email_id,
        payload.into_inner(),
        Local::now().date_naive(),
    )
    .await?;
    Ok(HttpResponse::Created().json(conversion))
}

/// POST /api/emails/{email_id}/revert
pub async fn revert_email(
    data: web::Data<AppState>,
    email_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = email_intake::revert_conversion(&data.store, &email_id).await?;
    Ok(HttpResponse::Ok().json(email))
}

/// POST /api/emails/send
/// Records the outgoing message; delivery is handled outside this service.
pub async fn send_email(
    data: web::Data<AppState>,
    payload: web::Json<SendEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = email_intake::record_sent(
        &data.store,
        data.config.mailbox_address(),
        payload.into_inner(),
    )
    .await?;
    info!("Recorded sent email {} to {:?}", email.id, email.to);
    Ok(HttpResponse::Created().json(email))
}
