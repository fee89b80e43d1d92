use std::sync::Arc;

use crate::shared::classification::ClassificationRun;
use crate::shared::isolation::run_isolated;
use crate::shared::user_id::UserId;
use crate::storage::domain::result_store::{PersistenceError, RecordId, ResultStore, RunRecord};

/// Writes finished classification runs to a [`ResultStore`].
pub struct RunRecorder {
    store: Arc<dyn ResultStore>,
}

impl RunRecorder {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        user_id: &UserId,
        run: &ClassificationRun,
    ) -> Result<RecordId, PersistenceError> {
        let record = RunRecord {
            user_id: user_id.clone(),
            run: run.clone(),
        };
        let id = self.store.insert(&record)?;
        log::debug!("Recorded run {id} for {user_id}");
        Ok(id)
    }

    /// Like [`record`](Self::record), but a failure (or a panicking store) is
    /// logged and reported as `None`; the run itself is unaffected.
    pub fn record_best_effort(&self, user_id: &UserId, run: &ClassificationRun) -> Option<RecordId> {
        match run_isolated(|| self.record(user_id, run)) {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                log::warn!("Failed to record run for {user_id}: {e}");
                None
            }
            Err(panic) => {
                log::warn!("Failed to record run for {user_id}: {panic}");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shared::classification::{ClassificationOutcome, ClassifiedImage, TargetStatus};
    use crate::storage::domain::result_store::StoredRecord;
    use crate::storage::infrastructure::sqlite_result_store::SqliteResultStore;
    use chrono::Utc;
    use std::sync::Mutex;

    pub enum Failure {
        Error,
        Panic,
    }

    /// Result store whose writes always fail.
    pub struct BrokenResultStore {
        pub failure: Failure,
        pub attempts: Mutex<usize>,
    }

    impl BrokenResultStore {
        pub fn new(failure: Failure) -> Self {
            Self {
                failure,
                attempts: Mutex::new(0),
            }
        }
    }

    impl ResultStore for BrokenResultStore {
        fn insert(&self, _record: &RunRecord) -> Result<RecordId, PersistenceError> {
            *self.attempts.lock().unwrap() += 1;
            match self.failure {
                Failure::Error => Err(PersistenceError::Database("disk full".into())),
                Failure::Panic => panic!("driver crashed"),
            }
        }

        fn list(&self, _user_id: &UserId) -> Result<Vec<StoredRecord>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    fn run() -> ClassificationRun {
        ClassificationRun::assemble(
            Utc::now(),
            ClassifiedImage::new("me.jpg", None),
            TargetStatus::SignatureExtracted,
            vec![(
                ClassificationOutcome::Matched,
                ClassifiedImage::new("a.jpg", Some("file:///a.jpg".into())),
            )],
        )
    }

    #[test]
    fn test_record_persists_run_for_user() {
        let store = Arc::new(SqliteResultStore::in_memory().unwrap());
        let recorder = RunRecorder::new(store.clone());
        let user = UserId::new("alice");
        let run = run();

        let id = recorder.record(&user, &run).unwrap();

        let listed = store.list(&user).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].record.run, run);
    }

    #[test]
    fn test_record_propagates_persistence_error() {
        let recorder = RunRecorder::new(Arc::new(BrokenResultStore::new(Failure::Error)));
        let result = recorder.record(&UserId::new("alice"), &run());
        assert!(matches!(result, Err(PersistenceError::Database(_))));
    }

    #[test]
    fn test_best_effort_swallows_error() {
        let store = Arc::new(BrokenResultStore::new(Failure::Error));
        let recorder = RunRecorder::new(store.clone());

        assert_eq!(recorder.record_best_effort(&UserId::new("alice"), &run()), None);
        assert_eq!(*store.attempts.lock().unwrap(), 1);
    }

    #[test]
    fn test_best_effort_survives_panicking_store() {
        let recorder = RunRecorder::new(Arc::new(BrokenResultStore::new(Failure::Panic)));
        assert_eq!(recorder.record_best_effort(&UserId::new("alice"), &run()), None);
    }
}
