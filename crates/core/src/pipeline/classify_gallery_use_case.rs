use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;

use crate::detection::domain::face_model::FaceModel;
use crate::detection::domain::face_model_adapter::FaceModelAdapter;
use crate::detection::domain::face_signature::FaceSignature;
use crate::imaging::domain::image_normalizer::ImageNormalizer;
use crate::pipeline::pipeline_logger::{stage, PipelineLogger};
use crate::shared::classification::{
    ClassificationOutcome, ClassificationRun, ClassifiedImage, TargetStatus,
};
use crate::shared::gallery_image::GalleryImage;
use crate::shared::isolation::run_isolated;
use crate::shared::user_id::UserId;
use crate::storage::domain::blob_store::{BlobKey, BlobStore, StorageError};

/// Tunables for a classification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierOptions {
    /// Worker threads for the gallery phase. 0 = one per available core.
    pub threads: usize,
}

impl ClassifierOptions {
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("classification was cancelled")]
pub struct Cancelled;

/// What the target phase produced.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetSignature {
    Present(FaceSignature),
    /// Nothing to compare against; carries the reason.
    Absent(TargetStatus),
}

impl TargetSignature {
    pub fn status(&self) -> TargetStatus {
        match self {
            TargetSignature::Present(_) => TargetStatus::SignatureExtracted,
            TargetSignature::Absent(status) => *status,
        }
    }
}

type StageTimings = Vec<(&'static str, f64)>;

/// Everything one gallery worker hands back for the merge step.
struct ItemReport {
    outcome: ClassificationOutcome,
    image: ClassifiedImage,
    faces: Option<usize>,
    timings: StageTimings,
}

/// Forwards each finished item to the logger as workers complete.
struct Progress<'a> {
    logger: &'a mut dyn PipelineLogger,
    completed: usize,
}

impl Progress<'_> {
    fn finished(&mut self, report: &ItemReport, total: usize) {
        replay(self.logger, &report.timings);
        if let Some(faces) = report.faces {
            self.logger.metric("faces_per_image", faces as f64);
        }
        self.completed += 1;
        self.logger.progress(self.completed, total);
    }
}

fn timed<T>(timings: &mut StageTimings, stage: &'static str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = f();
    timings.push((stage, started.elapsed().as_secs_f64() * 1000.0));
    value
}

/// Splits a gallery into images showing the target person, images showing
/// someone else, and images with nobody in them.
///
/// No gallery item can fail the run: decode and encoding failures fall back
/// to a partition, and a panic inside one item's processing is caught at the
/// item boundary.
pub struct GalleryClassifier {
    normalizer: Arc<dyn ImageNormalizer>,
    model: FaceModelAdapter,
    blob_store: Arc<dyn BlobStore>,
}

impl GalleryClassifier {
    pub fn new(
        normalizer: Arc<dyn ImageNormalizer>,
        model: Arc<dyn FaceModel>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            normalizer,
            model: FaceModelAdapter::new(model),
            blob_store,
        }
    }

    /// Classifies `gallery` against `target`.
    ///
    /// Gallery items fan out on the current rayon pool. Items not yet started
    /// when `cancelled` is raised are skipped and the run is discarded.
    pub fn execute(
        &self,
        user: &UserId,
        target: &GalleryImage,
        gallery: &[GalleryImage],
        logger: &mut dyn PipelineLogger,
        cancelled: &AtomicBool,
    ) -> Result<ClassificationRun, Cancelled> {
        let created_at = Utc::now();

        let mut target_timings = StageTimings::new();
        let target_signature = self.target_signature(target, &mut target_timings);
        let target_url = self.store(
            target,
            BlobKey::for_target(user, created_at, target),
            &mut target_timings,
        );
        replay(logger, &target_timings);
        logger.info(&format!(
            "Target {}: {:?}",
            target.name(),
            target_signature.status()
        ));

        let total = gallery.len();
        let progress = Mutex::new(Progress {
            logger,
            completed: 0,
        });
        let reports = gallery
            .par_iter()
            .enumerate()
            .map(|(index, image)| {
                if cancelled.load(Ordering::Relaxed) {
                    return None;
                }
                let report = self.process_item(user, created_at, index, image, &target_signature);
                progress
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .finished(&report, total);
                Some(report)
            })
            .collect::<Option<Vec<ItemReport>>>();
        let logger = progress
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .logger;
        let reports = reports.ok_or(Cancelled)?;

        let run = ClassificationRun::assemble(
            created_at,
            ClassifiedImage::new(target.name(), target_url),
            target_signature.status(),
            reports.into_iter().map(|r| (r.outcome, r.image)),
        );

        log::info!(
            "Classified {} images for {user}: {} matched, {} with other people, {} without people",
            run.len(),
            run.matched().len(),
            run.unmatched_with_person().len(),
            run.no_person_detected().len()
        );
        if run.unstored_count() > 0 {
            log::warn!("{} images could not be stored", run.unstored_count());
        }
        logger.summary();
        Ok(run)
    }

    /// Signature of the first face in the target. Any failure leaves the
    /// run without a signature rather than failing it.
    fn target_signature(
        &self,
        target: &GalleryImage,
        timings: &mut StageTimings,
    ) -> TargetSignature {
        let attempt = run_isolated(|| {
            let mut local = StageTimings::new();
            let signature = self.extract_target(target, &mut local);
            (signature, local)
        });
        match attempt {
            Ok((signature, local)) => {
                timings.extend(local);
                signature
            }
            Err(panic) => {
                log::warn!("Target {}: {panic}; matching disabled", target.name());
                TargetSignature::Absent(TargetStatus::Unreadable)
            }
        }
    }

    fn extract_target(&self, target: &GalleryImage, timings: &mut StageTimings) -> TargetSignature {
        let image = match timed(timings, stage::NORMALIZE, || {
            self.normalizer.normalize(target.bytes())
        }) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Target {}: {e}; matching disabled", target.name());
                return TargetSignature::Absent(TargetStatus::Unreadable);
            }
        };

        let regions = match timed(timings, stage::DETECT, || self.model.detect_faces(&image)) {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("Target {}: {e}; matching disabled", target.name());
                return TargetSignature::Absent(TargetStatus::Unreadable);
            }
        };

        // Only the first face is used; any others in the target are ignored.
        let Some(first) = regions.first() else {
            log::info!("No face in target {}; matching disabled", target.name());
            return TargetSignature::Absent(TargetStatus::NoFaceDetected);
        };
        if regions.len() > 1 {
            log::debug!(
                "Target {} has {} faces, using the first",
                target.name(),
                regions.len()
            );
        }

        match timed(timings, stage::ENCODE, || self.model.encode(&image, first)) {
            Ok(signature) => TargetSignature::Present(signature),
            Err(e) => {
                log::warn!("Target {}: {e}; matching disabled", target.name());
                TargetSignature::Absent(TargetStatus::EncodingFailed)
            }
        }
    }

    fn process_item(
        &self,
        user: &UserId,
        created_at: DateTime<Utc>,
        index: usize,
        image: &GalleryImage,
        target: &TargetSignature,
    ) -> ItemReport {
        let attempt = run_isolated(|| {
            let mut timings = StageTimings::new();
            let (outcome, faces) = self.classify_item(image, target, &mut timings);
            (outcome, faces, timings)
        });
        let (outcome, faces, mut timings) = match attempt {
            Ok(classified) => classified,
            Err(panic) => {
                log::warn!("{}: {panic}; classifying as no person", image.name());
                (ClassificationOutcome::NoPersonDetected, None, StageTimings::new())
            }
        };

        let url = self.store(
            image,
            BlobKey::for_gallery_item(user, created_at, index, image),
            &mut timings,
        );

        ItemReport {
            outcome,
            image: ClassifiedImage::new(image.name(), url),
            faces,
            timings,
        }
    }

    /// Outcome for one gallery image plus the number of faces found in it.
    fn classify_item(
        &self,
        image: &GalleryImage,
        target: &TargetSignature,
        timings: &mut StageTimings,
    ) -> (ClassificationOutcome, Option<usize>) {
        let normalized = match timed(timings, stage::NORMALIZE, || {
            self.normalizer.normalize(image.bytes())
        }) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::warn!("{}: {e}; classifying as no person", image.name());
                return (ClassificationOutcome::NoPersonDetected, None);
            }
        };

        let regions = match timed(timings, stage::DETECT, || {
            self.model.detect_faces(&normalized)
        }) {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("{}: {e}; classifying as no person", image.name());
                return (ClassificationOutcome::NoPersonDetected, None);
            }
        };
        let faces = Some(regions.len());

        if regions.is_empty() {
            return (ClassificationOutcome::NoPersonDetected, faces);
        }
        let TargetSignature::Present(target_signature) = target else {
            return (ClassificationOutcome::UnmatchedWithPerson, faces);
        };

        for region in &regions {
            let signature = match timed(timings, stage::ENCODE, || {
                self.model.encode(&normalized, region)
            }) {
                Ok(signature) => signature,
                Err(e) => {
                    log::warn!("{}: {e}; skipping face", image.name());
                    continue;
                }
            };
            if timed(timings, stage::MATCH, || {
                self.model.matches(target_signature, &signature)
            }) {
                return (ClassificationOutcome::Matched, faces);
            }
        }
        (ClassificationOutcome::UnmatchedWithPerson, faces)
    }

    /// Stores `image` and returns its URL, or `None` if storing failed.
    fn store(
        &self,
        image: &GalleryImage,
        key: Result<BlobKey, StorageError>,
        timings: &mut StageTimings,
    ) -> Option<String> {
        let result = timed(timings, stage::STORE, || {
            key.and_then(|key| {
                run_isolated(|| self.blob_store.put(image.bytes(), &key))
                    .unwrap_or_else(|panic| Err(StorageError::Unavailable(panic)))
            })
        });
        match result {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Failed to store {}: {e}", image.name());
                None
            }
        }
    }
}

fn replay(logger: &mut dyn PipelineLogger, timings: &StageTimings) {
    for (stage, ms) in timings {
        logger.timing(stage, *ms);
    }
}
