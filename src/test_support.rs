// src/test_support.rs

//! Shared fixtures for handler and pipeline tests.

use std::sync::Arc;

use actix_web::body::BoxBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, Error};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use tempfile::TempDir;

use crate::ai_analyzer::{AnalysisError, EmailAnalysis, EmailAnalyzer};
use crate::app_state::AppState;
use crate::config::{Config, GeminiConfig, ImapConfig};
use crate::email_fetcher::{FetchedEmail, MailError, MailSource};
use crate::models::{Client, Email, EmailKind, EmailStatus};
use crate::seed::sample_database;
use crate::store::{Database, JsonStore};

/// Hands out the same batch on every fetch, like a mailbox whose messages stay unseen.
pub struct StaticMailSource(pub Vec<FetchedEmail>);

#[async_trait]
impl MailSource for StaticMailSource {
    async fn fetch_unseen(&self) -> Result<Vec<FetchedEmail>, MailError> {
        Ok(self.0.clone())
    }
}

pub struct FailingMailSource;

#[async_trait]
impl MailSource for FailingMailSource {
    async fn fetch_unseen(&self) -> Result<Vec<FetchedEmail>, MailError> {
        Err(MailError::NotConfigured)
    }
}

pub struct StubAnalyzer(pub EmailAnalysis);

#[async_trait]
impl EmailAnalyzer for StubAnalyzer {
    async fn analyze(&self, _email: &Email, _clients: &[Client]) -> Result<EmailAnalysis, AnalysisError> {
        Ok(self.0.clone())
    }
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        data_file: dir.path().join("database.json"),
        uploads_dir: dir.path().join("uploads"),
        frontend_origin: "http://localhost:3000".into(),
        seed_sample_data: false,
        max_upload_bytes: 1024 * 1024,
        imap: ImapConfig {
            host: "imap.invalid".into(),
            port: 993,
            user: Some("office@greenbros.test".into()),
            password: None,
            mailbox: "INBOX".into(),
        },
        gemini: GeminiConfig {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
        },
    }
}

fn state_with(db: Database) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        store: Arc::new(JsonStore::in_memory(db)),
        config: test_config(&dir),
        mailbox: Arc::new(StaticMailSource(Vec::new())),
        analyzer: Arc::new(StubAnalyzer(EmailAnalysis::default())),
    };
    (state, dir)
}

/// No records. The temp dir holds uploads and must outlive the test.
pub fn empty_state() -> (AppState, TempDir) {
    state_with(Database::default())
}

/// Sample clients, employees, tasks and bills dated around today.
pub fn seeded_state() -> (AppState, TempDir) {
    state_with(sample_database(Local::now().date_naive()))
}

pub fn test_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<BoxBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .configure(crate::api_routes)
}

pub fn sample_client(id: &str, name: &str, email: Option<&str>) -> Client {
    Client {
        id: id.into(),
        name: name.into(),
        address: "Musterstraße 1".into(),
        contact_person: None,
        phone: None,
        email: email.map(str::to_string),
    }
}

pub fn unread_email(id: &str, from: &str) -> Email {
    Email {
        id: id.into(),
        from: from.into(),
        to: None,
        subject: "Gartenpflege".into(),
        content: "Bitte um Rückruf.".into(),
        received_date: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        status: EmailStatus::Unread,
        keywords: vec!["Sonstiges".into()],
        attachments: Vec::new(),
        kind: EmailKind::Received,
        related_task_id: None,
    }
}

pub fn fetched(from: &str, subject: &str, received_date: DateTime<Utc>) -> FetchedEmail {
    FetchedEmail {
        from: from.into(),
        to: Some("office@greenbros.test".into()),
        subject: subject.into(),
        content: "Hallo, ich hätte gern ein Angebot.".into(),
        received_date,
        keywords: vec!["Preisanfrage".into()],
        attachments: Vec::new(),
    }
}
