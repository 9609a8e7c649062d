use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::Task;

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct CalendarRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<CalendarDay>,
}

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Days::new(u64::from(day.weekday().num_days_from_monday()));
    (monday, monday + Days::new(6))
}

/// Tasks due within `from..=to`, one entry per day that has any, earliest first.
pub fn group_by_day(tasks: Vec<Task>, from: NaiveDate, to: NaiveDate) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    for task in tasks.into_iter().filter(|t| (from..=to).contains(&t.due_date)) {
        days.entry(task.due_date).or_default().push(task);
    }
    days.into_iter()
        .map(|(date, tasks)| CalendarDay { date, tasks })
        .collect()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/calendar", web::get().to(get_calendar));
}

/// GET /api/calendar?from=YYYY-MM-DD&to=YYYY-MM-DD
/// Defaults to the current week.
pub async fn get_calendar(
    data: web::Data<AppState>,
    query: web::Query<CalendarQuery>,
) -> Result<HttpResponse, ApiError> {
    let (monday, sunday) = week_bounds(Local::now().date_naive());
    let from = query.from.unwrap_or(monday);
    let to = query.to.unwrap_or(sunday);
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "from ({from}) must not be after to ({to})"
        )));
    }

    let tasks = data.store.list::<Task>().await;
    Ok(HttpResponse::Ok().json(CalendarRange {
        from,
        to,
        days: group_by_day(tasks, from, to),
    }))
}
