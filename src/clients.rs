// src/clients.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{is_blank, Client, CreateClientRequest, UpdateClientRequest};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/clients")
            .route("", web::get().to(list_clients))
            .route("", web::post().to(create_client))
            .route("/{client_id}", web::get().to(get_client))
            .route("/{client_id}", web::put().to(update_client))
            .route("/{client_id}", web::delete().to(delete_client)),
    );
}

/// GET /api/clients
pub async fn list_clients(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.store.list::<Client>().await))
}

/// GET /api/clients/{client_id}
pub async fn get_client(
    data: web::Data<AppState>,
    client_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let client = data
        .store
        .get::<Client>(&client_id)
        .await
        .ok_or(ApiError::NotFound("Client"))?;
    Ok(HttpResponse::Ok().json(client))
}

/// POST /api/clients
pub async fn create_client(
    data: web::Data<AppState>,
    payload: web::Json<CreateClientRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    debug!("Received create_client request: {:?}", req);
    if is_blank(&req.name) || is_blank(&req.address) {
        return Err(ApiError::bad_request("name and address are required"));
    }

    let client = data
        .store
        .transaction(|db| {
            let client = Client {
                id: req
                    .id
                    .filter(|id| !is_blank(id))
                    .unwrap_or_else(|| db.next_id::<Client>()),
                name: req.name,
                address: req.address,
                contact_person: req.contact_person,
                phone: req.phone,
                email: req.email,
            };
            db.insert(client.clone())?;
            Ok::<_, ApiError>(client)
        })
        .await?;

    info!("Client created: {}", client.id);
    Ok(HttpResponse::Created().json(client))
}

/// PUT /api/clients/{client_id}
/// Merges the provided fields into the stored client.
pub async fn update_client(
    data: web::Data<AppState>,
    client_id: web::Path<String>,
    payload: web::Json<UpdateClientRequest>,
) -> Result<HttpResponse, ApiError> {
    let changes = payload.into_inner();
    if changes.name.as_deref().is_some_and(is_blank)
        || changes.address.as_deref().is_some_and(is_blank)
    {
        return Err(ApiError::bad_request("name and address cannot be empty"));
    }

    let client = data
        .store
        .update::<Client, _>(&client_id, |client| changes.apply(client))
        .await?
        .ok_or(ApiError::NotFound("Client"))?;
    Ok(HttpResponse::Ok().json(client))
}

/// DELETE /api/clients/{client_id}
/// Tasks and bills that reference the client are left as they are.
pub async fn delete_client(
    data: web::Data<AppState>,
    client_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.store
        .delete::<Client>(&client_id)
        .await?
        .ok_or(ApiError::NotFound("Client"))?;
    info!("Client deleted: {}", client_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Client deleted successfully" })))
}
