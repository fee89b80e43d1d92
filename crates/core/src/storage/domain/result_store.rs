use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::classification::ClassificationRun;
use crate::shared::user_id::UserId;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(String),
    #[error("failed to serialize run: {0}")]
    Serialization(String),
    #[error("failed to deserialize stored run: {0}")]
    Deserialization(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A classification run plus who asked for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub user_id: UserId,
    pub run: ClassificationRun,
}

/// A [`RunRecord`] as read back from a [`ResultStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: RunRecord,
}

/// Domain interface for per-user run history.
pub trait ResultStore: Send + Sync {
    fn insert(&self, record: &RunRecord) -> Result<RecordId, PersistenceError>;

    /// All records for `user_id`, newest first.
    fn list(&self, user_id: &UserId) -> Result<Vec<StoredRecord>, PersistenceError>;
}
