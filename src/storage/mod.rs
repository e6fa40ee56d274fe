//! Object storage seam. Media bytes never pass through this service,
//! clients talk to the bucket with presigned URLs.

pub mod s3;

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignVerb {
    Get,
    Put,
    Delete,
}

impl PresignVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Time-limited URL granting `verb` on `key`
    fn presign(&self, key: &str, verb: PresignVerb, ttl: Duration) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
