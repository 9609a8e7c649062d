// src/employees.rs

use actix_web::{web, HttpResponse};
use chrono::{Datelike, Local, NaiveDate, Weekday};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{is_blank, CreateEmployeeRequest, Employee, UpdateEmployeeRequest};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employees")
            .route("", web::get().to(list_employees))
            .route("", web::post().to(create_employee))
            // before "/{employee_id}" so "available" is not taken for an id
            .route("/available", web::get().to(available_employees))
            .route("/{employee_id}", web::get().to(get_employee))
            .route("/{employee_id}", web::put().to(update_employee))
            .route("/{employee_id}", web::delete().to(delete_employee)),
    );
}

/// GET /api/employees
pub async fn list_employees(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.store.list::<Employee>().await))
}

/// GET /api/employees/{employee_id}
pub async fn get_employee(
    data: web::Data<AppState>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee = data
        .store
        .get::<Employee>(&employee_id)
        .await
        .ok_or(ApiError::NotFound("Employee"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// POST /api/employees
pub async fn create_employee(
    data: web::Data<AppState>,
    payload: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    if is_blank(&req.name) {
        return Err(ApiError::bad_request("name is required"));
    }

    let employee = data
        .store
        .transaction(|db| {
            let employee = Employee {
                id: req
                    .id
                    .filter(|id| !is_blank(id))
                    .unwrap_or_else(|| db.next_id::<Employee>()),
                name: req.name,
                role: req.role,
                avatar_url: req.avatar_url,
                availability: req.availability,
            };
            db.insert(employee.clone())?;
            Ok::<_, ApiError>(employee)
        })
        .await?;

    info!("Employee created: {}", employee.id);
    Ok(HttpResponse::Created().json(employee))
}

/// PUT /api/employees/{employee_id}
pub async fn update_employee(
    data: web::Data<AppState>,
    employee_id: web::Path<String>,
    payload: web::Json<UpdateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    let changes = payload.into_inner();
    if changes.name.as_deref().is_some_and(is_blank) {
        return Err(ApiError::bad_request("name cannot be empty"));
    }

    let employee = data
        .store
        .update::<Employee, _>(&employee_id, |employee| changes.apply(employee))
        .await?
        .ok_or(ApiError::NotFound("Employee"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// DELETE /api/employees/{employee_id}
pub async fn delete_employee(
    data: web::Data<AppState>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.store
        .delete::<Employee>(&employee_id)
        .await?
        .ok_or(ApiError::NotFound("Employee"))?;
    info!("Employee deleted: {}", employee_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Weekday name, e.g. `monday` or `Mon`.
    pub day: Option<String>,
    pub date: Option<NaiveDate>,
}

impl AvailabilityQuery {
    fn weekday(&self, today: NaiveDate) -> Result<Weekday, ApiError> {
        if let Some(day) = &self.day {
            return day
                .trim()
                .parse::<Weekday>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown weekday: {day}")));
        }
        Ok(self.date.unwrap_or(today).weekday())
    }
}

/// GET /api/employees/available?day=monday | ?date=YYYY-MM-DD
/// Employees scheduled to work on the given weekday (today when omitted).
pub async fn available_employees(
    data: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, ApiError> {
    let day = query.weekday(Local::now().date_naive())?;
    let available: Vec<Employee> = data
        .store
        .list::<Employee>()
        .await
        .into_iter()
        .filter(|e| e.availability.is_available(day))
        .collect();
    Ok(HttpResponse::Ok().json(available))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::test_support::{seeded_state, test_app};

    #[actix_web::test]
    async fn availability_filters_by_weekday() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;

        // Seed: only Frank Spade (e3) works saturdays.
        let req = test::TestRequest::get()
            .uri("/api/employees/available?day=saturday")
            .to_request();
        let available: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = available.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["e3"]);

        // 2024-05-03 is a Friday: e2, e3, e4.
        let req = test::TestRequest::get()
            .uri("/api/employees/available?date=2024-05-03")
            .to_request();
        let available: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(available.len(), 3);
    }

    #[actix_web::test]
    async fn unknown_weekday_is_a_bad_request() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;
        let req = test::TestRequest::get()
            .uri("/api/employees/available?day=someday")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn create_with_partial_availability() {
        let (state, _dir) = seeded_state();
        let app = test::init_service(test_app(state)).await;
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(json!({ "name": "Hanna Hecke", "availability": { "sunday": true } }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["availability"]["sunday"], true);
        assert_eq!(created["availability"]["monday"], false);
    }
}
