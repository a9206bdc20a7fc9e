//! The file-backed post store: one JSON array, rewritten wholesale.
//!
//! This is the early-iteration backend. Every mutation reads the full array,
//! edits it in memory, and writes the whole document back through a sibling
//! temp file plus rename so a crashed write never leaves a torn array behind.
//! Ordering is insertion order; new posts are appended.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::application::store::{FeedOrdering, NewPost, PostStore, StoreError};
use crate::domain::posts::PostRecord;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the whole array. A missing file is an empty store; an
    /// unreadable or unparsable file is `Unavailable`.
    async fn read_all(&self) -> Result<Vec<PostRecord>, StoreError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::unavailable(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_slice(&raw).map_err(|err| {
            StoreError::unavailable(format!("failed to parse {}: {err}", self.path.display()))
        })
    }

    /// Serialize and rewrite the whole array atomically.
    async fn write_all(&self, posts: &[PostRecord]) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec_pretty(posts)
            .map_err(|err| StoreError::write(format!("failed to serialize posts: {err}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|err| {
                    StoreError::write(format!("failed to create {}: {err}", parent.display()))
                })?;
            }
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, &serialized).await.map_err(|err| {
            StoreError::write(format!("failed to write {}: {err}", staging.display()))
        })?;
        fs::rename(&staging, &self.path).await.map_err(|err| {
            StoreError::write(format!("failed to replace {}: {err}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), posts = posts.len(), "post file rewritten");
        Ok(())
    }
}

#[async_trait]
impl PostStore for JsonFileStore {
    async fn list_all(&self) -> Result<Vec<PostRecord>, StoreError> {
        self.read_all().await
    }

    async fn create(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        let mut posts = self.read_all().await?;

        let record = PostRecord {
            id: Uuid::new_v4(),
            title: post.title,
            slug: post.slug,
            content: post.content,
            category: post.category,
            author: post.author,
            date: post.date,
            excerpt: post.excerpt,
            image: post.image,
        };

        posts.push(record.clone());
        self.write_all(&posts).await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut posts = self.read_all().await?;
        let before = posts.len();
        posts.retain(|post| post.id != id);

        // Unknown ids are a no-op; skip the rewrite entirely.
        if posts.len() == before {
            return Ok(());
        }

        self.write_all(&posts).await
    }

    fn ordering(&self) -> FeedOrdering {
        FeedOrdering::Insertion
    }
}
