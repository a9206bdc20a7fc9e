//! Storage contracts describing post and media persistence adapters.

use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::domain::posts::PostRecord;

/// Failure taxonomy shared by every storage adapter. Each variant reaches the
/// user as a single message string; nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("required field `{field}` is missing")]
    Validation { field: &'static str },
    #[error("media upload failed: {message}")]
    Upload { message: String },
    #[error("store write failed: {message}")]
    Write { message: String },
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Where a freshly created post lands in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrdering {
    /// `list_all` returns date-descending output; new posts are prepended.
    Recency,
    /// `list_all` returns insertion order; new posts are appended.
    Insertion,
}

/// A validated post awaiting its store-assigned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub date: Date,
    pub excerpt: Option<String>,
    pub image: Option<String>,
}

/// Durable post storage.
///
/// Slug uniqueness is deliberately not enforced: duplicate slugs are accepted
/// by every backend. Deleting an unknown id succeeds as a no-op.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PostRecord>, StoreError>;

    async fn create(&self, post: NewPost) -> Result<PostRecord, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    fn ordering(&self) -> FeedOrdering;
}

/// Named buckets for uploaded assets: cover media attached to a post, and
/// inline media referenced from the editor's body HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBucket {
    Cover,
    Inline,
}

impl MediaBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Inline => "inline",
        }
    }

    /// Default path prefix used when the caller does not supply one.
    pub fn default_prefix(self) -> &'static str {
        match self {
            Self::Cover => "covers",
            Self::Inline => "media",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown media bucket `{0}`")]
pub struct UnknownBucket(pub String);

impl FromStr for MediaBucket {
    type Err = UnknownBucket;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cover" => Ok(Self::Cover),
            "inline" => Ok(Self::Inline),
            other => Err(UnknownBucket(other.to_string())),
        }
    }
}

/// Result of storing a media payload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMedia {
    pub bucket: MediaBucket,
    pub stored_path: String,
    pub public_url: String,
    pub checksum: String,
    pub size_bytes: i64,
}

/// Binary asset storage with publicly resolvable URLs.
///
/// Uploads carry no retry policy: a failed upload aborts the enclosing create
/// so no post is persisted referencing a broken media URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        bucket: MediaBucket,
        path_prefix: &str,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredMedia, StoreError>;

    /// Remove a stored asset. Missing objects are treated as success.
    async fn delete(&self, bucket: MediaBucket, stored_path: &str) -> Result<(), StoreError>;
}
