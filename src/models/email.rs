use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Unread,
    Read,
    Converted,
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmailStatus::Unread => "unread",
            EmailStatus::Read => "read",
            EmailStatus::Converted => "converted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot change email status from {from} to {to}")]
pub struct InvalidTransition {
    pub from: EmailStatus,
    pub to: EmailStatus,
}

impl EmailStatus {
    /// Transitions reachable through a plain status update.
    ///
    /// `Converted` is entered only by converting the email into a task and
    /// left only by reverting that conversion, so both directions are
    /// refused here. Nothing goes back to `Unread` once it has been read.
    pub fn manual_transition(self, to: EmailStatus) -> Result<EmailStatus, InvalidTransition> {
        use EmailStatus::*;
        match (self, to) {
            (Unread, Unread) | (Unread, Read) | (Read, Read) => Ok(to),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    #[default]
    Received,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub subject: String,
    pub content: String,
    #[serde(deserialize_with = "deserialize_received_date")]
    pub received_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EmailStatus,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: EmailKind,
    /// Set exactly while `status` is `Converted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
}

/// RFC 3339, or the older `YYYY-MM-DD HH:mm` form (no offset, read as UTC).
pub fn parse_received_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_received_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_received_date(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid receivedDate: {raw:?}")))
}

/// Manual import of an email that did not come through the mailbox fetch.
#[derive(Debug, Deserialize)]
pub struct CreateEmailRequest {
    pub from: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmailStatusRequest {
    pub status: EmailStatus,
}
