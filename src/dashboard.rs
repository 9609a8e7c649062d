// src/dashboard.rs

use actix_web::{web, HttpResponse};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::app_state::AppState;
use crate::calendar::week_bounds;
use crate::error::ApiError;
use crate::models::{BillStatus, EmailKind, EmailStatus, Employee, Task, TaskStatus};
use crate::store::Database;

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub open: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub task_counts: TaskCounts,
    pub tasks_today: Vec<Task>,
    pub overdue_tasks: Vec<Task>,
    pub tasks_this_week: usize,
    pub outstanding_amount: f64,
    pub overdue_bills: usize,
    pub unread_emails: usize,
    pub available_employees: Vec<Employee>,
}

/// Computes the overview shown on the start page for `today`.
pub fn summarize(db: &Database, today: NaiveDate) -> DashboardSummary {
    // 1) task counts per status
    let mut task_counts = TaskCounts::default();
    for task in &db.tasks {
        match task.status {
            TaskStatus::Open => task_counts.open += 1,
            TaskStatus::InProgress => task_counts.in_progress += 1,
            TaskStatus::Completed => task_counts.completed += 1,
        }
    }

    // 2) today, overdue, this week
    let tasks_today: Vec<Task> = db
        .tasks
        .iter()
        .filter(|t| t.due_date == today)
        .cloned()
        .collect();
    let overdue_tasks: Vec<Task> = db
        .tasks
        .iter()
        .filter(|t| t.due_date < today && t.status != TaskStatus::Completed)
        .cloned()
        .collect();
    let (monday, sunday) = week_bounds(today);
    let tasks_this_week = db
        .tasks
        .iter()
        .filter(|t| (monday..=sunday).contains(&t.due_date))
        .count();

    // 3) bills
    let outstanding_amount: f64 = db
        .bills
        .iter()
        .filter(|b| b.status != BillStatus::Paid)
        .map(|b| b.amount)
        .sum();
    let overdue_bills = db.bills.iter().filter(|b| b.is_overdue(today)).count();

    // 4) inbox and staffing
    let unread_emails = db
        .emails
        .iter()
        .filter(|e| e.kind == EmailKind::Received && e.status == EmailStatus::Unread)
        .count();
    let available_employees: Vec<Employee> = db
        .employees
        .iter()
        .filter(|e| e.availability.is_available(today.weekday()))
        .cloned()
        .collect();

    DashboardSummary {
        date: today,
        task_counts,
        tasks_today,
        overdue_tasks,
        tasks_this_week,
        outstanding_amount,
        overdue_bills,
        unread_emails,
        available_employees,
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(get_dashboard));
}

/// GET /api/dashboard
pub async fn get_dashboard(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let db = data.store.snapshot().await;
    Ok(HttpResponse::Ok().json(summarize(&db, Local::now().date_naive())))
}
