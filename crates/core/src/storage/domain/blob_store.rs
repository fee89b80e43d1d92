use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::shared::gallery_image::GalleryImage;
use crate::shared::user_id::UserId;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),
    #[error("failed to write blob {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Domain interface for durable image storage.
///
/// Shared across gallery worker threads; implementations handle their own
/// concurrency.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns a URL it can be fetched from.
    fn put(&self, bytes: &[u8], key: &BlobKey) -> Result<String, StorageError>;
}

/// A relative, `/`-separated storage key with no empty, `.` or `..` segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn parse(key: &str) -> Result<Self, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('/')
            && !key.contains('\\')
            && key
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if valid {
            Ok(Self(key.to_string()))
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    /// `<user>/<run stamp>/<index>-<name>`; the index keeps duplicate
    /// display names apart.
    pub fn for_gallery_item(
        user: &UserId,
        run_started: DateTime<Utc>,
        index: usize,
        image: &GalleryImage,
    ) -> Result<Self, StorageError> {
        Self::parse(&format!(
            "{user}/{}/{index:04}-{}",
            run_stamp(run_started),
            image.sanitized_name()
        ))
    }

    /// `<user>/<run stamp>/target-<name>`.
    pub fn for_target(
        user: &UserId,
        run_started: DateTime<Utc>,
        image: &GalleryImage,
    ) -> Result<Self, StorageError> {
        Self::parse(&format!(
            "{user}/{}/target-{}",
            run_stamp(run_started),
            image.sanitized_name()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filesystem- and URL-safe UTC timestamp with nanosecond precision.
fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%9fZ").to_string()
}
