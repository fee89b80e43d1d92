use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use rusqlite_migration::{Migrations, M};

use crate::shared::classification::{
    ClassificationOutcome, ClassificationRun, ClassifiedImage, TargetStatus,
};
use crate::shared::user_id::UserId;
use crate::storage::domain::result_store::{
    PersistenceError, RecordId, ResultStore, RunRecord, StoredRecord,
};

/// Run history in a SQLite database, one row per classification run.
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

fn apply_migrations(conn: &mut Connection) -> Result<(), PersistenceError> {
    let migrations = Migrations::new(vec![M::up(
        "CREATE TABLE runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            target_name TEXT NOT NULL,
            target_url TEXT,
            target_status TEXT NOT NULL,
            matched TEXT NOT NULL,
            unmatched_with_person TEXT NOT NULL,
            no_person_detected TEXT NOT NULL
        );
        CREATE INDEX idx_runs_user_created ON runs (user_id, created_at);",
    )]);
    migrations
        .to_latest(conn)
        .map_err(|e| PersistenceError::Database(format!("Failed to apply migrations: {e}")))
}

impl SqliteResultStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Database(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| PersistenceError::Database(format!("Failed to open database: {e}")))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PersistenceError::Database(format!("Failed to open database: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, PersistenceError> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Database("Poisoned lock".into()))
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|e| PersistenceError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, PersistenceError> {
    serde_json::from_str(text).map_err(|e| PersistenceError::Deserialization(e.to_string()))
}

/// Raw column values; decoding happens outside the rusqlite row callback.
struct RunRow {
    id: i64,
    user_id: String,
    created_at: String,
    target_name: String,
    target_url: Option<String>,
    target_status: String,
    matched: String,
    unmatched_with_person: String,
    no_person_detected: String,
}

impl RunRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            created_at: row.get(2)?,
            target_name: row.get(3)?,
            target_url: row.get(4)?,
            target_status: row.get(5)?,
            matched: row.get(6)?,
            unmatched_with_person: row.get(7)?,
            no_person_detected: row.get(8)?,
        })
    }

    fn decode(self) -> Result<StoredRecord, PersistenceError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| PersistenceError::Deserialization(format!("created_at: {e}")))?
            .with_timezone(&Utc);
        let target_status: TargetStatus = from_json(&self.target_status)?;
        let partitions = [
            (ClassificationOutcome::Matched, &self.matched),
            (ClassificationOutcome::UnmatchedWithPerson, &self.unmatched_with_person),
            (ClassificationOutcome::NoPersonDetected, &self.no_person_detected),
        ];
        let mut items = Vec::new();
        for (outcome, json) in partitions {
            let images: Vec<ClassifiedImage> = from_json(json)?;
            items.extend(images.into_iter().map(|image| (outcome, image)));
        }

        Ok(StoredRecord {
            id: RecordId(self.id),
            record: RunRecord {
                user_id: UserId::new(self.user_id),
                run: ClassificationRun::assemble(
                    created_at,
                    ClassifiedImage::new(self.target_name, self.target_url),
                    target_status,
                    items,
                ),
            },
        })
    }
}

impl ResultStore for SqliteResultStore {
    fn insert(&self, record: &RunRecord) -> Result<RecordId, PersistenceError> {
        let run = &record.run;
        // Fixed-width UTC timestamps keep text ordering chronological.
        let created_at = run.created_at().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO runs (user_id, created_at, target_name, target_url, target_status,
                               matched, unmatched_with_person, no_person_detected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.user_id.as_str(),
                created_at,
                run.target().name,
                run.target().url,
                to_json(&run.target_status())?,
                to_json(run.matched())?,
                to_json(run.unmatched_with_person())?,
                to_json(run.no_person_detected())?,
            ],
        )
        .map_err(|e| PersistenceError::Database(format!("Failed to insert run: {e}")))?;
        Ok(RecordId(conn.last_insert_rowid()))
    }

    fn list(&self, user_id: &UserId) -> Result<Vec<StoredRecord>, PersistenceError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, created_at, target_name, target_url, target_status,
                        matched, unmatched_with_person, no_person_detected
                 FROM runs WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| PersistenceError::Database(format!("Failed to prepare statement: {e}")))?;
        let rows = stmt
            .query_map(params![user_id.as_str()], RunRow::read)
            .map_err(|e| PersistenceError::Database(format!("Failed to query runs: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::Database(format!("Failed to read run: {e}")))?;
        rows.into_iter().map(RunRow::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, minute, 0).unwrap()
    }

    fn record(user: &str, created_at: DateTime<Utc>, target: &str) -> RunRecord {
        RunRecord {
            user_id: UserId::new(user),
            run: ClassificationRun::assemble(
                created_at,
                ClassifiedImage::new(target, Some(format!("file:///{target}"))),
                TargetStatus::SignatureExtracted,
                vec![
                    (
                        ClassificationOutcome::Matched,
                        ClassifiedImage::new("a.jpg", Some("file:///a.jpg".into())),
                    ),
                    (
                        ClassificationOutcome::UnmatchedWithPerson,
                        ClassifiedImage::new("b.jpg", None),
                    ),
                    (
                        ClassificationOutcome::NoPersonDetected,
                        ClassifiedImage::new("c.jpg", Some("file:///c.jpg".into())),
                    ),
                ],
            ),
        }
    }

    #[test]
    fn test_insert_then_list_round_trips_run() {
        let store = SqliteResultStore::in_memory().unwrap();
        let original = record("alice", at(0), "me.jpg");

        let id = store.insert(&original).unwrap();
        let listed = store.list(&UserId::new("alice")).unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].record, original);
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = SqliteResultStore::in_memory().unwrap();
        store.insert(&record("alice", at(1), "middle.jpg")).unwrap();
        store.insert(&record("alice", at(2), "newest.jpg")).unwrap();
        store.insert(&record("alice", at(0), "oldest.jpg")).unwrap();

        let targets: Vec<String> = store
            .list(&UserId::new("alice"))
            .unwrap()
            .into_iter()
            .map(|r| r.record.run.target().name.clone())
            .collect();

        assert_eq!(targets, vec!["newest.jpg", "middle.jpg", "oldest.jpg"]);
    }

    #[test]
    fn test_sub_second_ordering() {
        let store = SqliteResultStore::in_memory().unwrap();
        let base = at(0);
        store.insert(&record("alice", base + Duration::nanoseconds(900), "later.jpg")).unwrap();
        store.insert(&record("alice", base + Duration::nanoseconds(5), "earlier.jpg")).unwrap();

        let listed = store.list(&UserId::new("alice")).unwrap();
        assert_eq!(listed[0].record.run.target().name, "later.jpg");
    }

    #[test]
    fn test_same_timestamp_falls_back_to_insertion_order() {
        let store = SqliteResultStore::in_memory().unwrap();
        let first = store.insert(&record("alice", at(0), "first.jpg")).unwrap();
        let second = store.insert(&record("alice", at(0), "second.jpg")).unwrap();

        let ids: Vec<RecordId> = store
            .list(&UserId::new("alice"))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_list_is_scoped_to_user() {
        let store = SqliteResultStore::in_memory().unwrap();
        store.insert(&record("alice", at(0), "a.jpg")).unwrap();
        store.insert(&record("bob", at(1), "b.jpg")).unwrap();

        assert_eq!(store.list(&UserId::new("alice")).unwrap().len(), 1);
        assert_eq!(store.list(&UserId::new("bob")).unwrap().len(), 1);
        assert!(store.list(&UserId::new("carol")).unwrap().is_empty());
    }

    #[test]
    fn test_file_database_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("results.sqlite3");

        {
            let store = SqliteResultStore::open(&path).unwrap();
            store.insert(&record("alice", at(0), "me.jpg")).unwrap();
        }
        let reopened = SqliteResultStore::open(&path).unwrap();

        assert_eq!(reopened.list(&UserId::new("alice")).unwrap().len(), 1);
    }
}
