// src/store.rs

//! Flat JSON file record store.
//!
//! The whole database lives in memory behind one async mutex and is written
//! back to disk after every mutation (temp file + rename). Mutations run on a
//! draft copy; the draft only replaces the live data once it has been
//! persisted, which makes [`JsonStore::transaction`] all-or-nothing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use log::{debug, info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{Bill, Client, Document, Email, Employee, Task};
use crate::seed;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("database file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{label} with id {id} already exists")]
    DuplicateId { label: &'static str, id: String },
}

/// Every collection, exactly as serialized to the database file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub clients: Vec<Client>,
    pub employees: Vec<Employee>,
    pub tasks: Vec<Task>,
    pub bills: Vec<Bill>,
    pub documents: Vec<Document>,
    pub emails: Vec<Email>,
}

/// A flat record kept in one of the [`Database`] collections.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + 'static {
    /// Human readable name used in error messages ("Task not found").
    const LABEL: &'static str;
    /// Prefix of generated ids (`t1712345678901`).
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;
    fn collection(db: &Database) -> &Vec<Self>;
    fn collection_mut(db: &mut Database) -> &mut Vec<Self>;
}

macro_rules! impl_record {
    ($ty:ty, $field:ident, $label:literal, $prefix:literal) => {
        impl Record for $ty {
            const LABEL: &'static str = $label;
            const ID_PREFIX: &'static str = $prefix;

            fn id(&self) -> &str {
                &self.id
            }

            fn collection(db: &Database) -> &Vec<Self> {
                &db.$field
            }

            fn collection_mut(db: &mut Database) -> &mut Vec<Self> {
                &mut db.$field
            }
        }
    };
}

impl_record!(Client, clients, "Client", "c");
impl_record!(Employee, employees, "Employee", "e");
impl_record!(Task, tasks, "Task", "t");
impl_record!(Bill, bills, "Bill", "b");
impl_record!(Document, documents, "Document", "d");
impl_record!(Email, emails, "Email", "em");

impl Database {
    pub fn get<R: Record>(&self, id: &str) -> Option<&R> {
        R::collection(self).iter().find(|r| r.id() == id)
    }

    pub fn get_mut<R: Record>(&mut self, id: &str) -> Option<&mut R> {
        R::collection_mut(self).iter_mut().find(|r| r.id() == id)
    }

    pub fn contains<R: Record>(&self, id: &str) -> bool {
        self.get::<R>(id).is_some()
    }

    /// Type prefix plus the current time in milliseconds, bumped past any id
    /// already taken in the collection.
    pub fn next_id<R: Record>(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let candidate = format!("{}{}", R::ID_PREFIX, millis);
            if !self.contains::<R>(&candidate) {
                return candidate;
            }
            millis += 1;
        }
    }

    pub fn insert<R: Record>(&mut self, record: R) -> Result<(), StoreError> {
        if self.contains::<R>(record.id()) {
            return Err(StoreError::DuplicateId {
                label: R::LABEL,
                id: record.id().to_string(),
            });
        }
        R::collection_mut(self).push(record);
        Ok(())
    }

    pub fn remove<R: Record>(&mut self, id: &str) -> Option<R> {
        let records = R::collection_mut(self);
        let index = records.iter().position(|r| r.id() == id)?;
        Some(records.remove(index))
    }
}

pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<Database>,
}

impl JsonStore {
    /// Opens the database file, creating it (optionally with sample data) when missing.
    pub async fn open(path: impl Into<PathBuf>, seed_sample_data: bool) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let db: Database = serde_json::from_slice(&bytes)?;
                info!(
                    "Loaded {} ({} clients, {} tasks, {} emails)",
                    path.display(),
                    db.clients.len(),
                    db.tasks.len(),
                    db.emails.len()
                );
                db
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let db = if seed_sample_data {
                    seed::sample_database(Local::now().date_naive())
                } else {
                    Database::default()
                };
                write_file(&path, &db).await?;
                info!("Initialized new database at {}", path.display());
                db
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(db: Database) -> Self {
        Self {
            path: None,
            data: Mutex::new(db),
        }
    }

    pub async fn snapshot(&self) -> Database {
        self.data.lock().await.clone()
    }

    pub async fn list<R: Record>(&self) -> Vec<R> {
        R::collection(&*self.data.lock().await).clone()
    }

    pub async fn get<R: Record>(&self, id: &str) -> Option<R> {
        self.data.lock().await.get::<R>(id).cloned()
    }

    /// Runs `f` against a draft of the database. The draft is persisted and
    /// becomes the live state only when `f` succeeds; on error nothing changes.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Database) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut live = self.data.lock().await;
        let mut draft = live.clone();
        let out = f(&mut draft)?;
        if let Some(path) = &self.path {
            write_file(path, &draft).await?;
        }
        *live = draft;
        Ok(out)
    }

    /// Applies `f` to the record with `id`. `Ok(None)` when there is no such record.
    pub async fn update<R, F>(&self, id: &str, f: F) -> Result<Option<R>, StoreError>
    where
        R: Record,
        F: FnOnce(&mut R),
    {
        self.transaction(|db| {
            Ok(db.get_mut::<R>(id).map(|record| {
                f(record);
                record.clone()
            }))
        })
        .await
    }

    pub async fn delete<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        self.transaction(|db| Ok(db.remove::<R>(id))).await
    }
}

async fn write_file(path: &Path, db: &Database) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(db)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client(id: &str, name: &str) -> Client {
        Client {
            id: id.into(),
            name: name.into(),
            address: "Eichenweg 1".into(),
            contact_person: None,
            phone: None,
            email: None,
        }
    }

    #[test]
    fn next_id_skips_taken_ids() {
        let mut db = Database::default();
        let first = db.next_id::<Client>();
        assert!(first.starts_with('c'));
        db.insert(client(&first, "A")).unwrap();

        let second = db.next_id::<Client>();
        assert_ne!(first, second);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut db = Database::default();
        db.insert(client("c1", "A")).unwrap();
        let err = db.insert(client("c1", "B")).unwrap_err();
        assert_eq!(err.to_string(), "Client with id c1 already exists");
    }

    #[tokio::test]
    async fn failed_transaction_leaves_data_untouched() {
        let store = JsonStore::in_memory(Database::default());
        let result: Result<(), StoreError> = store
            .transaction(|db| {
                db.insert(client("c1", "A"))?;
                db.insert(client("c1", "A again"))
            })
            .await;

        assert!(result.is_err());
        assert!(store.list::<Client>().await.is_empty());
    }

    #[tokio::test]
    async fn mutations_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("database.json");

        let store = JsonStore::open(&path, false).await.unwrap();
        store
            .transaction(|db| db.insert(client("c9", "Gärtnerei Müller")))
            .await
            .unwrap();
        store
            .update::<Client, _>("c9", |c| c.phone = Some("555-0199".into()))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(&path, false).await.unwrap();
        let stored = reopened.get::<Client>("c9").await.unwrap();
        assert_eq!(stored.name, "Gärtnerei Müller");
        assert_eq!(stored.phone.as_deref(), Some("555-0199"));
    }

    #[tokio::test]
    async fn opens_files_with_minute_precision_email_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let legacy = r#"{
            "clients": [],
            "emails": [{
                "id": "em1",
                "from": "Alice Johnson <alice@example.com>",
                "subject": "Angebot Rasenpflege",
                "content": "Was kostet das?",
                "receivedDate": "2024-05-01 10:00",
                "status": "unread",
                "keywords": ["Preisanfrage"],
                "attachments": [],
                "type": "received"
            }]
        }"#;
        tokio::fs::write(&path, legacy).await.unwrap();

        let store = JsonStore::open(&path, true).await.unwrap();
        let email = store.get::<Email>("em1").await.unwrap();
        assert_eq!(email.received_date.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(store.list::<Task>().await.is_empty());

        // the next write upgrades the row and the file still opens
        store
            .update::<Email, _>("em1", |e| e.status = crate::models::EmailStatus::Read)
            .await
            .unwrap();
        drop(store);
        let reopened = JsonStore::open(&path, false).await.unwrap();
        assert_eq!(reopened.get::<Email>("em1").await.unwrap().received_date, email.received_date);
    }

    #[tokio::test]
    async fn new_file_is_seeded_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");

        let store = JsonStore::open(&path, true).await.unwrap();
        let db = store.snapshot().await;
        assert!(!db.clients.is_empty());
        assert!(!db.tasks.is_empty());
        assert!(path.exists());
        // sample dates hang off the server's local day
        assert_eq!(db, seed::sample_database(Local::now().date_naive()));
    }

    #[tokio::test]
    async fn delete_returns_removed_record_once() {
        let store = JsonStore::in_memory(Database::default());
        let bill = Bill {
            id: "b1".into(),
            client_id: "c1".into(),
            amount: 150.0,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            status: crate::models::BillStatus::Due,
        };
        store.transaction(|db| db.insert(bill)).await.unwrap();

        assert!(store.delete::<Bill>("b1").await.unwrap().is_some());
        assert!(store.delete::<Bill>("b1").await.unwrap().is_none());
    }
}
