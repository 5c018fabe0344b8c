//! Object storage on the local filesystem.
//!
//! Objects are written under a root directory at their namespaced path
//! (`{root}/categories/pasta.jpg`) and served from a configurable public base
//! URL, so a static file server pointed at the root resolves every URL.
//!
//! ## Example
//!
//! ```rust,ignore
//! use carte_db::file_storage::FilesystemStorage;
//!
//! let storage = FilesystemStorage::new("/var/carte/objects", "https://cdn.example.com/o");
//! storage.validate().await?;
//! let reference = storage.upload("categories/pasta.jpg", &bytes, Some("image/jpeg")).await?;
//! let url = storage.resolve_url(&reference).await?;
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use carte_core::config::StorageConfig;
use carte_core::{Error, ObjectStorage, Result, StorageRef};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::images::{file_url, path_from_url};

/// Filesystem-backed [`ObjectStorage`].
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Build from the `storage` configuration section.
    ///
    /// Fails with [`Error::Config`] when no filesystem root is configured.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let root = config
            .root
            .clone()
            .ok_or_else(|| Error::Config("storage.root is not set".to_string()))?;
        Ok(Self::new(root, config.public_base_url.clone()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path to a file below the root, rejecting escapes.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::Storage(format!("invalid object path: {}", path)));
        }
        Ok(self.root.join(relative))
    }

    /// Validate that the root can be written, read, and cleaned up.
    ///
    /// Run at startup to catch permission errors and missing mounts early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.root.join(".health-check");
        let test_file = test_dir.join("probe.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }

    async fn write_atomic(&self, full_path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            e
        })?;

        // rw-r--r--
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }
}

fn io_to_storage(e: std::io::Error) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait]
impl ObjectStorage for FilesystemStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StorageRef> {
        let full_path = self.full_path(path)?;
        debug!(
            storage_path = %path,
            full_path = %full_path.display(),
            size = bytes.len(),
            content_type,
            "file_storage: write"
        );

        self.write_atomic(&full_path, bytes).await.map_err(|e| match e {
            Error::Io(io) => io_to_storage(io),
            other => other,
        })?;

        Ok(StorageRef::new(path))
    }

    async fn resolve_url(&self, reference: &StorageRef) -> Result<String> {
        let full_path = self.full_path(&reference.path)?;
        if !fs::try_exists(&full_path).await.map_err(io_to_storage)? {
            return Err(Error::Storage(format!(
                "object does not exist: {}",
                reference.path
            )));
        }
        Ok(file_url(&self.public_base_url, &reference.path))
    }

    async fn delete_url(&self, url: &str) -> Result<()> {
        let path = path_from_url(&self.public_base_url, url)
            .ok_or_else(|| Error::Storage(format!("not a storage URL: {}", url)))?;
        let full_path = self.full_path(&path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(storage_path = %path, "file_storage: delete");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::Storage(format!(
                "object does not exist: {}",
                path
            ))),
            Err(e) => Err(io_to_storage(e)),
        }
    }
}
