use crate::error::BlobError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use std::path::Path;

pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Keyed artifact storage. Keys are `/`-separated paths relative to the store root.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `body` into `key`, returning the number of bytes written
    async fn write<'a>(&self, key: &str, body: ByteStream<'a>) -> Result<u64, BlobError>;

    async fn exists(&self, key: &str) -> Result<bool, BlobError>;

    /// Remove `prefix` and everything below it. Missing keys are not an error.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), BlobError>;

    /// Download a blob to a local path
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), BlobError>;

    /// Upload a local file to a key
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), BlobError>;
}
