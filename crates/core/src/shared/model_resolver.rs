use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// A model file the application can fetch on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub file_name: &'static str,
    pub url: &'static str,
}

pub const DETECTION_MODEL: ModelSpec = ModelSpec {
    file_name: YOLO_MODEL_NAME,
    url: YOLO_MODEL_URL,
};

pub const EMBEDDING_MODEL: ModelSpec = ModelSpec {
    file_name: EMBEDDING_MODEL_NAME,
    url: EMBEDDING_MODEL_URL,
};

/// Locates model files, downloading them into the cache when missing.
///
/// Resolution order:
/// 1. Cache directory
/// 2. Bundled directory (development / pre-packaged installs)
/// 3. Download from the model's URL into the cache
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    pub fn new(cache_dir: PathBuf, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    /// Resolver rooted at the platform cache directory.
    pub fn with_default_cache(bundled_dir: Option<PathBuf>) -> Result<Self, ModelResolveError> {
        Ok(Self::new(model_cache_dir()?, bundled_dir))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns a local path to `spec`, downloading only if no copy exists.
    pub fn resolve(
        &self,
        spec: &ModelSpec,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(found) = self.find_local(spec) {
            return Ok(found);
        }

        fs::create_dir_all(&self.cache_dir).map_err(ModelResolveError::CacheDir)?;
        let dest = self.cache_dir.join(spec.file_name);
        log::info!("Downloading {} from {}", spec.file_name, spec.url);
        download(spec.url, &dest, progress)?;
        Ok(dest)
    }

    fn find_local(&self, spec: &ModelSpec) -> Option<PathBuf> {
        let cached = self.cache_dir.join(spec.file_name);
        if cached.exists() {
            return Some(cached);
        }
        self.bundled_dir
            .as_ref()
            .map(|dir| dir.join(spec.file_name))
            .filter(|path| path.exists())
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FindMe/models/`
/// - Linux: `$XDG_CACHE_HOME/FindMe/models/` or `~/.cache/FindMe/models/`
/// - Windows: `%LOCALAPPDATA%/FindMe/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `dest` through a `.part` file renamed on success.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = stream_to(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn stream_to(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;
    let mut buf = vec![0u8; 1024 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FAKE: ModelSpec = ModelSpec {
        file_name: "fake.onnx",
        url: "http://invalid.nonexistent.example.com/fake.onnx",
    };

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("fake.onnx"), b"cached").unwrap();
        fs::write(bundled.join("fake.onnx"), b"bundled").unwrap();

        let resolver = ModelResolver::new(cache.clone(), Some(bundled));
        let path = resolver.resolve(&FAKE, None).unwrap();

        assert_eq!(path, cache.join("fake.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("fake.onnx"), b"bundled").unwrap();

        let resolver = ModelResolver::new(tmp.path().join("cache"), Some(bundled.clone()));
        let path = resolver.resolve(&FAKE, None).unwrap();

        assert_eq!(path, bundled.join("fake.onnx"));
        assert_eq!(fs::read(path).unwrap(), b"bundled");
    }

    #[test]
    fn test_resolve_missing_everywhere_attempts_download() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::new(tmp.path().join("cache"), None);

        let result = resolver.resolve(&FAKE, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(tmp.path().join("cache").exists());
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_failure_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
