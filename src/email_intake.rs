// src/email_intake.rs

//! Email → task pipeline: saving fetched mail without duplicates, matching
//! senders to clients, and converting/reverting emails as single store
//! transactions so an email is `converted` exactly while its task exists.

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::ai_analyzer::EmailAnalysis;
use crate::email_fetcher::{extract_keywords, FetchedEmail};
use crate::error::ApiError;
use crate::models::{
    is_blank, Client, CreateEmailRequest, Email, EmailKind, EmailStatus, SendEmailRequest, Task,
    TaskStatus,
};
use crate::store::{JsonStore, StoreError};

/// Two emails with the same sender and subject received closer together
/// than this are treated as the same message. Messages without a usable
/// `Date` header are stamped with the fetch time, so a later refetch of one
/// that is still unseen falls outside the window and is stored again.
pub const DUPLICATE_WINDOW_SECS: i64 = 60;

fn same_message(existing: &Email, candidate: &FetchedEmail) -> bool {
    existing.from == candidate.from
        && existing.subject == candidate.subject
        && (existing.received_date - candidate.received_date)
            .num_seconds()
            .abs()
            < DUPLICATE_WINDOW_SECS
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
    pub emails: Vec<Email>,
}

/// Stores a fetched batch as unread emails, skipping duplicates of stored
/// mail and of earlier messages in the same batch.
pub async fn save_fetched(
    store: &JsonStore,
    fetched: Vec<FetchedEmail>,
) -> Result<FetchOutcome, StoreError> {
    let total = fetched.len();
    let saved = store
        .transaction(|db| {
            let mut saved = Vec::new();
            for candidate in fetched {
                if db.emails.iter().any(|e| same_message(e, &candidate)) {
                    debug!("Skipping duplicate from {}: {}", candidate.from, candidate.subject);
                    continue;
                }
                let email = Email {
                    id: db.next_id::<Email>(),
                    from: candidate.from,
                    to: candidate.to,
                    subject: candidate.subject,
                    content: candidate.content,
                    received_date: candidate.received_date,
                    status: EmailStatus::Unread,
                    keywords: candidate.keywords,
                    attachments: candidate.attachments,
                    kind: EmailKind::Received,
                    related_task_id: None,
                };
                db.insert(email.clone())?;
                saved.push(email);
            }
            Ok::<_, StoreError>(saved)
        })
        .await?;

    info!("Fetched {} email(s), saved {}", total, saved.len());
    Ok(FetchOutcome {
        fetched: total,
        saved: saved.len(),
        skipped: total - saved.len(),
        emails: saved,
    })
}

pub async fn import_email(store: &JsonStore, req: CreateEmailRequest) -> Result<Email, ApiError> {
    if is_blank(&req.from) || is_blank(&req.subject) {
        return Err(ApiError::bad_request("from and subject are required"));
    }
    let keywords = if req.keywords.is_empty() {
        extract_keywords(&req.subject, &req.content)
    } else {
        req.keywords
    };

    let email = store
        .transaction(|db| {
            let email = Email {
                id: db.next_id::<Email>(),
                from: req.from,
                to: None,
                subject: req.subject,
                content: req.content,
                received_date: Utc::now(),
                status: EmailStatus::Unread,
                keywords,
                attachments: req.attachments,
                kind: EmailKind::Received,
                related_task_id: None,
            };
            db.insert(email.clone())?;
            Ok::<_, ApiError>(email)
        })
        .await?;
    Ok(email)
}

/// Logs an outgoing message. Delivery itself happens outside this service.
pub async fn record_sent(
    store: &JsonStore,
    from: String,
    req: SendEmailRequest,
) -> Result<Email, ApiError> {
    if is_blank(&req.to) {
        return Err(ApiError::bad_request("recipient is required"));
    }
    if is_blank(&req.subject) {
        return Err(ApiError::bad_request("subject is required"));
    }

    store
        .transaction(|db| {
            let email = Email {
                id: db.next_id::<Email>(),
                from,
                to: Some(req.to),
                subject: req.subject,
                content: req.content,
                received_date: Utc::now(),
                status: EmailStatus::Read,
                keywords: Vec::new(),
                attachments: Vec::new(),
                kind: EmailKind::Sent,
                related_task_id: None,
            };
            db.insert(email.clone())?;
            Ok::<_, ApiError>(email)
        })
        .await
}

pub async fn update_status(
    store: &JsonStore,
    email_id: &str,
    status: EmailStatus,
) -> Result<Email, ApiError> {
    store
        .transaction(|db| {
            let email = db
                .get_mut::<Email>(email_id)
                .ok_or(ApiError::NotFound("Email"))?;
            email.status = email.status.manual_transition(status)?;
            Ok::<_, ApiError>(email.clone())
        })
        .await
}

/* -------------------------------------------------------------------------- */
/* Client matching                                                            */
/* -------------------------------------------------------------------------- */

/// The bare address of a `Name <addr>` sender.
pub fn sender_address(from: &str) -> &str {
    match (from.find('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => from[start + 1..end].trim(),
        _ => from.trim(),
    }
}

fn sender_name(from: &str) -> Option<&str> {
    let name = from.split('<').next()?.trim().trim_matches('"').trim();
    (!name.is_empty() && !name.contains('@')).then_some(name)
}

/// Finds the client an email most likely came from: exact address match
/// first, then a client name contained in the sender's display name.
pub fn match_client<'a>(from: &str, clients: &'a [Client]) -> Option<&'a Client> {
    let address = sender_address(from);
    let by_address = clients.iter().find(|c| {
        c.email
            .as_deref()
            .is_some_and(|e| !address.is_empty() && e.trim().eq_ignore_ascii_case(address))
    });
    if by_address.is_some() {
        return by_address;
    }

    let name = sender_name(from)?.to_lowercase();
    clients
        .iter()
        .filter(|c| !is_blank(&c.name))
        .find(|c| name.contains(&c.name.trim().to_lowercase()))
}

/// Drops a `matchingClient` the model invented and fills a missing one from
/// the sender or the extracted customer email.
pub fn reconcile_analysis(
    mut analysis: EmailAnalysis,
    email: &Email,
    clients: &[Client],
) -> EmailAnalysis {
    if let Some(id) = &analysis.matching_client {
        if !clients.iter().any(|c| &c.id == id) {
            warn!("AI suggested unknown client {} for email {}", id, email.id);
            analysis.matching_client = None;
        }
    }

    if analysis.matching_client.is_none() {
        analysis.matching_client = match_client(&email.from, clients)
            .or_else(|| {
                analysis
                    .customer_email
                    .as_deref()
                    .and_then(|addr| match_client(addr, clients))
            })
            .map(|c| c.id.clone());
    }
    analysis
}

/* -------------------------------------------------------------------------- */
/* Conversion                                                                 */
/* -------------------------------------------------------------------------- */

/// Caller-edited task fields for a conversion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertEmailRequest {
    pub title: String,
    pub client_id: String,
    #[serde(default)]
    pub description: String,
    pub contact_person: Option<String>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub struct Conversion {
    pub task: Task,
    pub email: Email,
}

/// Creates the task and marks the email converted in one transaction.
pub async fn convert_email(
    store: &JsonStore,
    email_id: &str,
    req: ConvertEmailRequest,
    today: NaiveDate,
) -> Result<Conversion, ApiError> {
    if is_blank(&req.title) {
        return Err(ApiError::bad_request("title is required"));
    }
    if is_blank(&req.client_id) {
        return Err(ApiError::bad_request("clientId is required"));
    }

    let conversion = store
        .transaction(|db| {
            let email = db.get::<Email>(email_id).ok_or(ApiError::NotFound("Email"))?;
            if email.kind == EmailKind::Sent {
                return Err(ApiError::bad_request("Sent emails cannot be converted"));
            }
            if email.status == EmailStatus::Converted {
                return Err(ApiError::BadRequest(format!(
                    "Email {} is already converted to task {}",
                    email_id,
                    email.related_task_id.as_deref().unwrap_or("?")
                )));
            }
            if !db.contains::<Client>(&req.client_id) {
                return Err(ApiError::BadRequest(format!(
                    "Client {} does not exist",
                    req.client_id
                )));
            }

            let task = Task {
                id: db.next_id::<Task>(),
                title: req.title,
                client_id: req.client_id,
                assigned_to: req.assigned_to,
                due_date: req.due_date.unwrap_or(today),
                status: req.status.unwrap_or_default(),
                description: req.description,
                contact_person: req.contact_person,
            };
            db.insert(task.clone())?;

            let email = db
                .get_mut::<Email>(email_id)
                .ok_or(ApiError::NotFound("Email"))?;
            email.status = EmailStatus::Converted;
            email.related_task_id = Some(task.id.clone());

            Ok(Conversion {
                task,
                email: email.clone(),
            })
        })
        .await?;

    info!(
        "Converted email {} into task {}",
        conversion.email.id, conversion.task.id
    );
    Ok(conversion)
}

/// Deletes the linked task and puts the email back to `read`, in one transaction.
pub async fn revert_conversion(store: &JsonStore, email_id: &str) -> Result<Email, ApiError> {
    let email = store
        .transaction(|db| {
            let (status, related_task_id) = db
                .get::<Email>(email_id)
                .map(|e| (e.status, e.related_task_id.clone()))
                .ok_or(ApiError::NotFound("Email"))?;
            if status != EmailStatus::Converted {
                return Err(ApiError::BadRequest(format!(
                    "Email {} has not been converted",
                    email_id
                )));
            }

            if let Some(task_id) = related_task_id {
                if db.remove::<Task>(&task_id).is_none() {
                    warn!("Task {} linked from email {} was already gone", task_id, email_id);
                }
            }

            let email = db
                .get_mut::<Email>(email_id)
                .ok_or(ApiError::NotFound("Email"))?;
            email.status = EmailStatus::Read;
            email.related_task_id = None;
            Ok(email.clone())
        })
        .await?;

    info!("Reverted conversion of email {}", email.id);
    Ok(email)
}

/// Deletes a task; any email converted into it goes back to `read`.
pub async fn delete_task(store: &JsonStore, task_id: &str) -> Result<Task, ApiError> {
    store
        .transaction(|db| {
            let task = db.remove::<Task>(task_id).ok_or(ApiError::NotFound("Task"))?;
            for email in db
                .emails
                .iter_mut()
                .filter(|e| e.related_task_id.as_deref() == Some(task_id))
            {
                info!("Task {} deleted, email {} back to read", task_id, email.id);
                email.status = EmailStatus::Read;
                email.related_task_id = None;
            }
            Ok::<_, ApiError>(task)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use crate::test_support::{fetched, sample_client, unread_email};
    use chrono::{Duration, TimeZone};

    fn store_with(clients: Vec<Client>, emails: Vec<Email>) -> JsonStore {
        JsonStore::in_memory(Database {
            clients,
            emails,
            ..Database::default()
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn convert_req(title: &str, client_id: &str) -> ConvertEmailRequest {
        ConvertEmailRequest {
            title: title.into(),
            client_id: client_id.into(),
            description: "Hecke vorne und hinten".into(),
            contact_person: Some("Herr Johnson".into()),
            assigned_to: vec!["e1".into()],
            due_date: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn fetching_the_same_message_twice_stores_it_once() {
        let store = store_with(vec![], vec![]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

        let first = save_fetched(&store, vec![fetched("a@example.com", "Angebot", at)])
            .await
            .unwrap();
        let second = save_fetched(
            &store,
            vec![fetched("a@example.com", "Angebot", at + Duration::seconds(20))],
        )
        .await
        .unwrap();

        assert_eq!(first.saved, 1);
        assert_eq!(second.saved, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.list::<Email>().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicates_inside_one_batch_are_dropped() {
        let store = store_with(vec![], vec![]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let outcome = save_fetched(
            &store,
            vec![
                fetched("a@example.com", "Angebot", at),
                fetched("a@example.com", "Angebot", at),
                fetched("a@example.com", "Termin", at),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.saved, 2);
        let ids: Vec<_> = outcome.emails.iter().map(|e| e.id.clone()).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(outcome.emails.iter().all(|e| e.status == EmailStatus::Unread));
    }

    #[tokio::test]
    async fn same_subject_outside_the_window_is_a_new_email() {
        let store = store_with(vec![], vec![]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let outcome = save_fetched(
            &store,
            vec![
                fetched("a@example.com", "Angebot", at),
                fetched("a@example.com", "Angebot", at + Duration::seconds(61)),
            ],
        )
        .await
        .unwrap();
        assert_eq!(outcome.saved, 2);
    }

    #[tokio::test]
    async fn convert_then_revert_round_trip() {
        let store = store_with(
            vec![sample_client("c1", "Alice Johnson", Some("alice@example.com"))],
            vec![unread_email("em1", "Alice Johnson <alice@example.com>")],
        );

        let conversion = convert_email(&store, "em1", convert_req("Hecke schneiden", "c1"), today())
            .await
            .unwrap();
        assert_eq!(conversion.task.title, "Hecke schneiden");
        assert_eq!(conversion.task.client_id, "c1");
        assert_eq!(conversion.task.description, "Hecke vorne und hinten");
        assert_eq!(conversion.task.status, TaskStatus::Open);
        assert_eq!(conversion.task.due_date, today());
        assert_eq!(conversion.email.status, EmailStatus::Converted);
        assert_eq!(
            conversion.email.related_task_id.as_deref(),
            Some(conversion.task.id.as_str())
        );
        assert_eq!(store.list::<Task>().await.len(), 1);

        let reverted = revert_conversion(&store, "em1").await.unwrap();
        assert_eq!(reverted.status, EmailStatus::Read);
        assert!(reverted.related_task_id.is_none());
        assert!(store.list::<Task>().await.is_empty());
    }

    #[tokio::test]
    async fn converting_twice_is_rejected_without_a_second_task() {
        let store = store_with(
            vec![sample_client("c1", "Alice Johnson", None)],
            vec![unread_email("em1", "alice@example.com")],
        );
        convert_email(&store, "em1", convert_req("Rasen", "c1"), today())
            .await
            .unwrap();
        let err = convert_email(&store, "em1", convert_req("Rasen", "c1"), today())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(store.list::<Task>().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_client_leaves_email_untouched() {
        let store = store_with(vec![], vec![unread_email("em1", "alice@example.com")]);
        let err = convert_email(&store, "em1", convert_req("Rasen", "c404"), today())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Client c404 does not exist");
        let email = store.get::<Email>("em1").await.unwrap();
        assert_eq!(email.status, EmailStatus::Unread);
        assert!(store.list::<Task>().await.is_empty());
    }

    #[tokio::test]
    async fn revert_requires_a_converted_email() {
        let store = store_with(vec![], vec![unread_email("em1", "alice@example.com")]);
        let err = revert_conversion(&store, "em1").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(matches!(
            revert_conversion(&store, "nope").await.unwrap_err(),
            ApiError::NotFound("Email")
        ));
    }

    #[tokio::test]
    async fn deleting_a_converted_task_releases_the_email() {
        let store = store_with(
            vec![sample_client("c1", "Alice Johnson", None)],
            vec![unread_email("em1", "alice@example.com")],
        );
        let conversion = convert_email(&store, "em1", convert_req("Rasen", "c1"), today())
            .await
            .unwrap();

        delete_task(&store, &conversion.task.id).await.unwrap();

        let email = store.get::<Email>("em1").await.unwrap();
        assert_eq!(email.status, EmailStatus::Read);
        assert!(email.related_task_id.is_none());
        assert!(matches!(
            delete_task(&store, &conversion.task.id).await.unwrap_err(),
            ApiError::NotFound("Task")
        ));
    }

    #[tokio::test]
    async fn status_updates_follow_the_state_machine() {
        let store = store_with(vec![], vec![unread_email("em1", "alice@example.com")]);
        let email = update_status(&store, "em1", EmailStatus::Read).await.unwrap();
        assert_eq!(email.status, EmailStatus::Read);

        let err = update_status(&store, "em1", EmailStatus::Unread).await.unwrap_err();
        assert!(matches!(err, ApiError::Transition(_)));
    }

    #[tokio::test]
    async fn manual_import_tags_keywords_when_none_given() {
        let store = store_with(vec![], vec![]);
        let email = import_email(
            &store,
            CreateEmailRequest {
                from: "kunde@example.com".into(),
                subject: "Beschwerde".into(),
                content: "Der Rasen ist nicht gemäht.".into(),
                keywords: vec![],
                attachments: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(email.keywords, vec!["Beschwerde"]);
        assert_eq!(email.kind, EmailKind::Received);
        assert!(email.id.starts_with("em"));
    }

    #[test]
    fn sender_matching_prefers_address_then_name() {
        let clients = vec![
            sample_client("c1", "Alice Johnson", Some("alice@example.com")),
            sample_client("c2", "Bob Williams", Some("bob@example.com")),
        ];

        assert_eq!(
            match_client("Someone Else <ALICE@example.com>", &clients).map(|c| c.id.as_str()),
            Some("c1")
        );
        assert_eq!(
            match_client("\"Bob Williams\" <bobby@other.org>", &clients).map(|c| c.id.as_str()),
            Some("c2")
        );
        assert!(match_client("stranger@example.com", &clients).is_none());
    }

    #[test]
    fn reconcile_replaces_invented_client_ids() {
        let clients = vec![sample_client("c1", "Alice Johnson", Some("alice@example.com"))];
        let email = unread_email("em1", "Alice Johnson <alice@example.com>");
        let analysis = EmailAnalysis {
            matching_client: Some("c999".into()),
            ..EmailAnalysis::default()
        };

        let reconciled = reconcile_analysis(analysis, &email, &clients);
        assert_eq!(reconciled.matching_client.as_deref(), Some("c1"));
    }

    #[test]
    fn reconcile_uses_extracted_customer_email() {
        let clients = vec![sample_client("c2", "Bob Williams", Some("bob@example.com"))];
        let email = unread_email("em1", "forwarder@example.com");
        let analysis = EmailAnalysis {
            customer_email: Some("bob@example.com".into()),
            ..EmailAnalysis::default()
        };

        let reconciled = reconcile_analysis(analysis, &email, &clients);
        assert_eq!(reconciled.matching_client.as_deref(), Some("c2"));
    }
}
