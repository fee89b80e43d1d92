use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::RecvTimeoutError;

use crate::pipeline::classify_gallery_use_case::{ClassifierOptions, GalleryClassifier};
use crate::pipeline::pipeline_executor::{
    ClassificationExecutor, ClassificationRequest, ClassificationResponse, DispatchConfig,
    DispatchError,
};
use crate::pipeline::run_recorder::RunRecorder;
use crate::shared::isolation::run_isolated;

/// Executes classification requests on a bounded worker pool.
///
/// Layout: `caller --request--> pool [classify (par_iter) → record] --result--> caller`
///
/// Gallery items of a request fan out on the same pool, so the pool size
/// bounds the total CPU spent on classification across concurrent requests.
pub struct ThreadedClassificationExecutor {
    pool: rayon::ThreadPool,
    classifier: Arc<GalleryClassifier>,
    recorder: Arc<RunRecorder>,
}

impl ThreadedClassificationExecutor {
    pub fn new(
        classifier: GalleryClassifier,
        recorder: RunRecorder,
        options: &ClassifierOptions,
    ) -> Result<Self, DispatchError> {
        let threads = options.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("findme-worker-{i}"))
            .build()
            .map_err(|e| DispatchError::Pool(e.to_string()))?;
        log::debug!("Classification pool started with {threads} threads");
        Ok(Self {
            pool,
            classifier: Arc::new(classifier),
            recorder: Arc::new(recorder),
        })
    }
}

impl ClassificationExecutor for ThreadedClassificationExecutor {
    fn execute(
        &self,
        request: ClassificationRequest,
        config: DispatchConfig,
    ) -> Result<ClassificationResponse, DispatchError> {
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let classifier = Arc::clone(&self.classifier);
        let recorder = Arc::clone(&self.recorder);
        let cancelled = Arc::clone(&config.cancelled);
        let mut logger = config.logger;

        self.pool.spawn(move || {
            let attempt = run_isolated(|| {
                classifier.execute(
                    &request.user_id,
                    &request.target,
                    &request.gallery,
                    logger.as_mut(),
                    &cancelled,
                )
            });
            let result = match attempt {
                Ok(Ok(_)) if cancelled.load(Ordering::Relaxed) => Err(DispatchError::Cancelled),
                Ok(Ok(run)) => {
                    let record_id = recorder.record_best_effort(&request.user_id, &run);
                    Ok(ClassificationResponse { record_id, run })
                }
                Ok(Err(_)) => Err(DispatchError::Cancelled),
                Err(panic) => Err(DispatchError::WorkerFailed(panic)),
            };
            // The caller may have given up already.
            let _ = result_tx.send(result);
        });

        match result_rx.recv_timeout(config.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                config.cancelled.store(true, Ordering::Relaxed);
                log::warn!("Classification timed out after {:?}", config.timeout);
                Err(DispatchError::TimedOut(config.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::WorkerLost),
        }
    }
}
