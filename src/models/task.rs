use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Completed,
}

/// A schedulable unit of work for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub client_id: String,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub id: Option<String>,
    pub title: String,
    pub client_id: String,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub due_date: NaiveDate,
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub description: String,
    pub contact_person: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub client_id: Option<String>,
    pub assigned_to: Option<Vec<String>>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub description: Option<String>,
    pub contact_person: Option<String>,
}

impl UpdateTaskRequest {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(client_id) = self.client_id {
            task.client_id = client_id;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if self.contact_person.is_some() {
            task.contact_person = self.contact_person;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}
