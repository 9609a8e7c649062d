// src/bills.rs

use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{is_blank, Bill, CreateBillRequest, UpdateBillRequest};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("", web::get().to(list_bills))
            .route("", web::post().to(create_bill))
            .route("/{bill_id}", web::get().to(get_bill))
            .route("/{bill_id}", web::put().to(update_bill))
            .route("/{bill_id}", web::delete().to(delete_bill)),
    );
}

fn check_amount(amount: f64) -> Result<(), ApiError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid amount: {amount}")))
    }
}

/// GET /api/bills
pub async fn list_bills(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.store.list::<Bill>().await))
}

/// GET /api/bills/{bill_id}
pub async fn get_bill(
    data: web::Data<AppState>,
    bill_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let bill = data
        .store
        .get::<Bill>(&bill_id)
        .await
        .ok_or(ApiError::NotFound("Bill"))?;
    Ok(HttpResponse::Ok().json(bill))
}

/// POST /api/bills
pub async fn create_bill(
    data: web::Data<AppState>,
    payload: web::Json<CreateBillRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    if is_blank(&req.client_id) {
        return Err(ApiError::bad_request("clientId is required"));
    }
    check_amount(req.amount)?;

    let bill = data
        .store
        .transaction(|db| {
            let bill = Bill {
                id: req
                    .id
                    .filter(|id| !is_blank(id))
                    .unwrap_or_else(|| db.next_id::<Bill>()),
                client_id: req.client_id,
                amount: req.amount,
                due_date: req.due_date,
                status: req.status,
            };
            db.insert(bill.clone())?;
            Ok::<_, ApiError>(bill)
        })
        .await?;

    info!("Bill created: {} ({:.2})", bill.id, bill.amount);
    Ok(HttpResponse::Created().json(bill))
}

/// PUT /api/bills/{bill_id}
pub async fn update_bill(
    data: web::Data<AppState>,
    bill_id: web::Path<String>,
    payload: web::Json<UpdateBillRequest>,
) -> Result<HttpResponse, ApiError> {
    let changes = payload.into_inner();
    if changes.client_id.as_deref().is_some_and(is_blank) {
        return Err(ApiError::bad_request("clientId cannot be empty"));
    }
    if let Some(amount) = changes.amount {
        check_amount(amount)?;
    }

    let bill = data
        .store
        .update::<Bill, _>(&bill_id, |bill| changes.apply(bill))
        .await?
        .ok_or(ApiError::NotFound("Bill"))?;
    Ok(HttpResponse::Ok().json(bill))
}

/// DELETE /api/bills/{bill_id}
pub async fn delete_bill(
    data: web::Data<AppState>,
    bill_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.store
        .delete::<Bill>(&bill_id)
        .await?
        .ok_or(ApiError::NotFound("Bill"))?;
    info!("Bill deleted: {}", bill_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Bill deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::test_support::{seeded_state, test_app};

    #[actix_web::test]
    async fn negative_amounts_are_rejected() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/bills")
            .set_json(json!({
                "clientId": "c1",
                "amount": -5.0,
                "dueDate": "2024-06-01",
                "status": "due"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/bills/b1")
            .set_json(json!({ "amount": -1.0 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn mark_bill_paid() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::put()
            .uri("/api/bills/b4")
            .set_json(json!({ "status": "paid" }))
            .to_request();
        let bill: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(bill["status"], "paid");
        assert_eq!(bill["amount"], 250.0);
        assert_eq!(bill["dueDate"], "2023-12-15");
    }

    #[actix_web::test]
    async fn duplicate_id_is_a_bad_request() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/bills")
            .set_json(json!({
                "id": "b1",
                "clientId": "c1",
                "amount": 10.0,
                "dueDate": "2024-06-01",
                "status": "due"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
