use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::auth::domain::auth_provider::Identity;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::classification::ClassificationRun;
use crate::shared::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::shared::gallery_image::GalleryImage;
use crate::shared::user_id::UserId;
use crate::storage::domain::result_store::RecordId;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("failed to start worker pool: {0}")]
    Pool(String),
    #[error("classification timed out after {0:?}")]
    TimedOut(Duration),
    #[error("classification was cancelled")]
    Cancelled,
    #[error("classification worker failed: {0}")]
    WorkerFailed(String),
    #[error("classification worker exited without a result")]
    WorkerLost,
}

/// Per-request dispatch settings.
pub struct DispatchConfig {
    pub timeout: Duration,
    /// Raised by the caller to abandon the request, and by the executor
    /// when the timeout expires.
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl DispatchConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

/// One classification job: who asked, the target, and the gallery.
pub struct ClassificationRequest {
    pub user_id: UserId,
    pub target: GalleryImage,
    pub gallery: Vec<GalleryImage>,
}

impl ClassificationRequest {
    pub fn new(identity: Identity, target: GalleryImage, gallery: Vec<GalleryImage>) -> Self {
        Self {
            user_id: identity.user_id,
            target,
            gallery,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResponse {
    /// `None` when the run could not be recorded.
    pub record_id: Option<RecordId>,
    #[serde(flatten)]
    pub run: ClassificationRun,
}

/// Runs classification requests away from the calling thread.
///
/// This is a port; infrastructure provides concrete implementations.
pub trait ClassificationExecutor: Send + Sync {
    fn execute(
        &self,
        request: ClassificationRequest,
        config: DispatchConfig,
    ) -> Result<ClassificationResponse, DispatchError>;
}
