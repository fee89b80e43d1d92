use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::domain::blob_store::{BlobKey, BlobStore, StorageError};

/// Stores blobs as plain files under a root directory.
///
/// Writes go to a `.part` sibling first and are renamed into place, so a
/// reader never sees a half-written image.
pub struct FileBlobStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    /// Serve URLs as `<base_url>/<key>` instead of `file://` paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn path_for(&self, key: &BlobKey) -> PathBuf {
        key.segments()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn url_for(&self, key: &BlobKey, path: &Path) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("file://{}", path.display()),
        }
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, bytes: &[u8], key: &BlobKey) -> Result<String, StorageError> {
        let write_err = |source| StorageError::Write {
            key: key.to_string(),
            source,
        };

        let dest = self.path_for(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut part = dest.clone().into_os_string();
        part.push(".part");
        let part = PathBuf::from(part);

        if let Err(e) = fs::write(&part, bytes) {
            let _ = fs::remove_file(&part);
            return Err(write_err(e));
        }
        if let Err(e) = fs::rename(&part, &dest) {
            let _ = fs::remove_file(&part);
            return Err(write_err(e));
        }

        log::debug!("Stored {} bytes at {}", bytes.len(), dest.display());
        Ok(self.url_for(key, &dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> BlobKey {
        BlobKey::parse(s).unwrap()
    }

    #[test]
    fn test_put_writes_file_and_returns_file_url() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path());

        let url = store.put(b"jpeg", &key("alice/run/0000-a.jpg")).unwrap();

        let expected = dir.path().join("alice").join("run").join("0000-a.jpg");
        assert_eq!(fs::read(&expected).unwrap(), b"jpeg");
        assert_eq!(url, format!("file://{}", expected.display()));
    }

    #[test]
    fn test_put_uses_base_url_when_configured() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path()).with_base_url("https://cdn.example.com/");

        let url = store.put(b"x", &key("alice/run/target-me.png")).unwrap();

        assert_eq!(url, "https://cdn.example.com/alice/run/target-me.png");
    }

    #[test]
    fn test_put_overwrites_existing_blob() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path());
        let k = key("u/r/a.jpg");

        store.put(b"old", &k).unwrap();
        store.put(b"new", &k).unwrap();

        assert_eq!(fs::read(dir.path().join("u/r/a.jpg")).unwrap(), b"new");
        assert!(!dir.path().join("u/r/a.jpg.part").exists());
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not_a_dir");
        fs::write(&root, b"").unwrap();
        let store = FileBlobStore::new(&root);

        let result = store.put(b"x", &key("u/r/a.jpg"));

        assert!(matches!(result, Err(StorageError::Write { .. })));
    }
}
