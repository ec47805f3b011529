use crate::error::BlobError;
use crate::ports::blob::{BlobStore, ByteStream};
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// Blob store on the local filesystem, rooted at one directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: Arc<PathBuf>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing anything that could escape it.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        if key.is_empty() || !key_is_valid(relative) {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn key_is_valid(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write<'a>(&self, key: &str, body: ByteStream<'a>) -> Result<u64, BlobError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = async {
            let mut body_reader = StreamReader::new(body);
            let mut file = BufWriter::new(File::create(&path).await?);
            let written = tokio::io::copy(&mut body_reader, &mut file).await?;
            file.flush().await?;
            Ok::<_, io::Error>(written)
        }
        .await;

        match result {
            Ok(written) => Ok(written),
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e.into())
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError> {
        let path = self.resolve(prefix)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(BlobError::NotFound(key.to_string()));
        }
        if path != local_path {
            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&path, local_path).await?;
        }
        Ok(())
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        if path != local_path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(local_path, &path).await?;
        }
        Ok(())
    }
}
