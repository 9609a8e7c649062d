// src/tasks.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::email_intake;
use crate::error::ApiError;
use crate::models::{
    is_blank, Client, CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest,
    UpdateTaskStatusRequest,
};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/{task_id}", web::get().to(get_task))
            .route("/{task_id}", web::put().to(update_task))
            .route("/{task_id}", web::delete().to(delete_task))
            .route("/{task_id}/status", web::patch().to(update_task_status)),
    );
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub client_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.client_id.as_ref().map_or(true, |c| &task.client_id == c)
            && self.status.map_or(true, |s| task.status == s)
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |e| task.assigned_to.contains(e))
    }
}

/// GET /api/tasks?clientId=&status=&assignedTo=
pub async fn list_tasks(
    data: web::Data<AppState>,
    filter: web::Query<TaskFilter>,
) -> Result<HttpResponse, ApiError> {
    let tasks: Vec<Task> = data
        .store
        .list::<Task>()
        .await
        .into_iter()
        .filter(|t| filter.matches(t))
        .collect();
    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = data
        .store
        .get::<Task>(&task_id)
        .await
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(HttpResponse::Ok().json(task))
}

fn unknown_client(client_id: &str) -> ApiError {
    ApiError::BadRequest(format!("Client {} does not exist", client_id))
}

/// POST /api/tasks
pub async fn create_task(
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    debug!("Received create_task request: {:?}", req);
    if is_blank(&req.title) || is_blank(&req.client_id) {
        return Err(ApiError::bad_request("title and clientId are required"));
    }

    let task = data
        .store
        .transaction(|db| {
            if !db.contains::<Client>(&req.client_id) {
                return Err(unknown_client(&req.client_id));
            }
            let task = Task {
                id: req
                    .id
                    .filter(|id| !is_blank(id))
                    .unwrap_or_else(|| db.next_id::<Task>()),
                title: req.title,
                client_id: req.client_id,
                assigned_to: req.assigned_to,
                due_date: req.due_date,
                status: req.status.unwrap_or_default(),
                description: req.description,
                contact_person: req.contact_person,
            };
            db.insert(task.clone())?;
            Ok(task)
        })
        .await?;

    info!("Task created: {} for client {}", task.id, task.client_id);
    Ok(HttpResponse::Created().json(task))
}

/// PUT /api/tasks/{task_id}
pub async fn update_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let changes = payload.into_inner();
    if changes.title.as_deref().is_some_and(is_blank) {
        return Err(ApiError::bad_request("title cannot be empty"));
    }

    let task = data
        .store
        .transaction(|db| {
            if let Some(client_id) = &changes.client_id {
                if !db.contains::<Client>(client_id) {
                    return Err(unknown_client(client_id));
                }
            }
            let task = db
                .get_mut::<Task>(&task_id)
                .ok_or(ApiError::NotFound("Task"))?;
            changes.apply(task);
            Ok(task.clone())
        })
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// PATCH /api/tasks/{task_id}/status
pub async fn update_task_status(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let status = payload.into_inner().status;
    let task = data
        .store
        .update::<Task, _>(&task_id, |task| task.status = status)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    info!("Task {} is now {:?}", task.id, task.status);
    Ok(HttpResponse::Ok().json(task))
}

/// DELETE /api/tasks/{task_id}
/// An email converted into this task goes back to `read`.
pub async fn delete_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = email_intake::delete_task(&data.store, &task_id).await?;
    info!("Task deleted: {}", task.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}
