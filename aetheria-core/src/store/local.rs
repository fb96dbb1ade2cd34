//! Filesystem object store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::{ObjectHandle, ObjectStore};
use crate::encoding::{media_type_for_path, EncodedImage};
use crate::error::{AetheriaError, Result};

/// Stores objects as files under a root directory.
///
/// Retrieval addresses are `{public_base_url}/{path}`; whoever serves
/// `public_base_url` is expected to read back through [`ObjectStore::get_object`].
///
/// Only the bytes are written. The media type handed back by `get_object`
/// is derived from the path extension, so it comes back in canonical form:
/// an object stored as `image/jpg` under `*.jpg` reads back as `image/jpeg`,
/// and an unrecognised extension reads back as `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store path under the root, rejecting anything that could
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && !path.contains('\\')
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !safe {
            warn!(path, "Rejected object path");
            return Err(AetheriaError::ObjectStore(format!(
                "invalid object path '{path}'"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, path: &str, image: &EncodedImage) -> Result<ObjectHandle> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AetheriaError::ObjectStore(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    AetheriaError::ObjectStore(format!("object already exists at '{path}'"))
                }
                _ => AetheriaError::ObjectStore(format!("failed to open '{path}': {e}")),
            })?;

        write_or_discard(file, &target, image.bytes())
            .await
            .map_err(|e| AetheriaError::ObjectStore(format!("failed to write '{path}': {e}")))?;

        debug!(path, bytes = image.len(), "Stored object on disk");
        Ok(ObjectHandle {
            path: path.to_string(),
        })
    }

    fn public_url(&self, handle: &ObjectHandle) -> String {
        format!("{}/{}", self.public_base_url, handle.path)
    }

    async fn get_object(&self, path: &str) -> Result<Option<EncodedImage>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(EncodedImage::new(media_type_for_path(&target), bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AetheriaError::ObjectStore(format!(
                "failed to read '{path}': {e}"
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Write `bytes` to a freshly created file, removing it again if the write
/// does not complete so the path stays free.
async fn write_or_discard<W>(mut writer: W, target: &Path, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(writer);
        if let Err(cleanup) = tokio::fs::remove_file(target).await {
            warn!(path = %target.display(), error = %cleanup, "Failed to remove partial object");
        }
        return Err(e);
    }
    Ok(())
}
