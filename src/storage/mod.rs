mod memory;
mod s3;

pub use memory::MemoryClient;
pub use s3::S3Client;

use async_trait::async_trait;
use bytes::Bytes;
use md5::{Digest, Md5};
use thiserror::Error;

/// Result type for storage-client calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Failure of a single storage operation.
///
/// Workers never propagate these; they are folded into an
/// `Outcome::Failed` value so one failed call cannot abort the remaining
/// iterations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bucket or object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Bucket already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Bucket still contains objects
    #[error("not empty: {0}")]
    NotEmpty(String),

    /// Transport or service failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Client for an S3-compatible object-storage endpoint.
///
/// Implementations must be safe to call concurrently from multiple worker
/// tasks and must return a distinguishable error on failure rather than
/// panicking.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn create_bucket(&self, bucket: &str) -> ClientResult<()>;

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> ClientResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes>;

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()>;

    async fn delete_bucket(&self, bucket: &str) -> ClientResult<()>;

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>>;

    async fn list_buckets(&self) -> ClientResult<Vec<String>>;
}

/// Hex MD5 digest of an object body, used to verify read-back integrity
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Deterministic payload for a given key, so reads can be verified without
/// carrying the written bytes around.
pub fn payload_for(key: &str, size: usize) -> Bytes {
    let seed = key.as_bytes();
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let take = seed.len().min(size - data.len());
        data.extend_from_slice(&seed[..take]);
    }
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest_is_stable() {
        let data = b"hello world";
        assert_eq!(content_digest(data), content_digest(data));
        assert_ne!(content_digest(data), content_digest(b"hello worle"));
    }

    #[test]
    fn test_payload_deterministic_and_sized() {
        let a = payload_for("bucket/key-1", 100);
        let b = payload_for("bucket/key-1", 100);
        let c = payload_for("bucket/key-2", 100);

        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_payload_smaller_than_key() {
        let p = payload_for("some-long-key-name", 4);
        assert_eq!(p.len(), 4);
        assert_eq!(&p[..], b"some");
    }
}
