//! The in-memory post list backing the list view.
//!
//! The feed is the only shared mutable state in the service: handlers read a
//! snapshot and mutate it exclusively through [`FeedService`], mirroring a
//! view that owns its list and exposes callback-based mutation to children.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::store::{FeedOrdering, PostStore, StoreError};
use crate::domain::posts::{CategoryGroup, PostRecord, group_by_category};

/// A snapshot of the list view state: the posts plus an error indicator set
/// when the last load found the store unavailable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostFeed {
    pub posts: Vec<PostRecord>,
    pub error: Option<String>,
}

pub struct FeedService {
    store: Arc<dyn PostStore>,
    feed: RwLock<PostFeed>,
}

impl FeedService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self {
            store,
            feed: RwLock::new(PostFeed::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.store
    }

    /// Refresh from the store. An unreadable store surfaces as an empty list
    /// plus an error message rather than a failed response.
    pub async fn load(&self) -> PostFeed {
        let loaded = match self.store.list_all().await {
            Ok(posts) => PostFeed { posts, error: None },
            Err(err) => {
                warn!(error = %err, "post store unavailable; serving empty feed");
                PostFeed {
                    posts: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        };

        let mut feed = self.feed.write().await;
        *feed = loaded.clone();
        loaded
    }

    pub async fn snapshot(&self) -> PostFeed {
        self.feed.read().await.clone()
    }

    pub async fn grouped(&self) -> Vec<CategoryGroup> {
        let feed = self.feed.read().await;
        group_by_category(&feed.posts)
    }

    /// Place a freshly created record where the backend's ordering dictates:
    /// prepended under recency ordering, appended under insertion ordering.
    pub async fn insert_created(&self, record: PostRecord) {
        let mut feed = self.feed.write().await;
        match self.store.ordering() {
            FeedOrdering::Recency => feed.posts.insert(0, record),
            FeedOrdering::Insertion => feed.posts.push(record),
        }
        feed.error = None;
    }

    /// Optimistically remove the post, then confirm with the store. On
    /// failure the prior list is restored and the error message retained.
    /// Deleting an id the store no longer has still succeeds (no-op there).
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let prior = {
            let mut feed = self.feed.write().await;
            let prior = feed.posts.clone();
            feed.posts.retain(|post| post.id != id);
            prior
        };

        match self.store.delete(id).await {
            Ok(()) => {
                metrics::counter!("foglio_posts_deleted_total").increment(1);
                info!(%id, "post deleted");
                Ok(())
            }
            Err(err) => {
                warn!(%id, error = %err, "delete failed; restoring feed");
                let mut feed = self.feed.write().await;
                feed.posts = prior;
                feed.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use time::macros::date;
    use tokio::sync::Mutex;

    use super::*;
    use crate::application::store::NewPost;

    struct InMemoryStore {
        posts: Mutex<Vec<PostRecord>>,
        ordering: FeedOrdering,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl InMemoryStore {
        fn new(ordering: FeedOrdering) -> Self {
            Self {
                posts: Mutex::new(Vec::new()),
                ordering,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PostStore for InMemoryStore {
        async fn list_all(&self) -> Result<Vec<PostRecord>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("refusing reads"));
            }
            Ok(self.posts.lock().await.clone())
        }

        async fn create(&self, post: NewPost) -> Result<PostRecord, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::write("refusing writes"));
            }
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
            self.posts.lock().await.push(record.clone());
            Ok(record)
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::write("refusing writes"));
            }
            self.posts.lock().await.retain(|post| post.id != id);
            Ok(())
        }

        fn ordering(&self) -> FeedOrdering {
            self.ordering
        }
    }

    fn record(title: &str) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: title.to_lowercase(),
            content: "body".to_string(),
            category: "notes".to_string(),
            author: "ada".to_string(),
            date: date!(2024 - 06 - 01),
            excerpt: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn unavailable_store_yields_empty_feed_with_error() {
        let store = Arc::new(InMemoryStore::new(FeedOrdering::Insertion));
        store.fail_reads.store(true, Ordering::SeqCst);

        let service = FeedService::new(store);
        let feed = service.load().await;

        assert!(feed.posts.is_empty());
        assert!(feed.error.is_some());
    }

    #[tokio::test]
    async fn created_posts_land_where_ordering_dictates() {
        for (ordering, expect_first) in [
            (FeedOrdering::Recency, "Second"),
            (FeedOrdering::Insertion, "First"),
        ] {
            let store = Arc::new(InMemoryStore::new(ordering));
            let service = FeedService::new(store);

            service.insert_created(record("First")).await;
            service.insert_created(record("Second")).await;

            let feed = service.snapshot().await;
            assert_eq!(feed.posts.len(), 2);
            assert_eq!(feed.posts[0].title, expect_first);

            let occurrences = feed.posts.iter().filter(|p| p.title == "Second").count();
            assert_eq!(occurrences, 1);
        }
    }

    #[tokio::test]
    async fn failed_delete_restores_the_prior_list() {
        let store = Arc::new(InMemoryStore::new(FeedOrdering::Insertion));
        let service = FeedService::new(store.clone());

        let keep = record("Keep");
        let doomed = record("Doomed");
        store.posts.lock().await.push(keep.clone());
        store.posts.lock().await.push(doomed.clone());
        service.load().await;

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = service.delete(doomed.id).await;

        assert!(matches!(result, Err(StoreError::Write { .. })));
        let feed = service.snapshot().await;
        assert_eq!(feed.posts.len(), 2);
        assert!(feed.posts.iter().any(|post| post.id == doomed.id));
        assert!(feed.error.is_some());
    }

    #[tokio::test]
    async fn successful_delete_removes_exactly_the_target() {
        let store = Arc::new(InMemoryStore::new(FeedOrdering::Insertion));
        let service = FeedService::new(store.clone());

        let keep = record("Keep");
        let doomed = record("Doomed");
        store.posts.lock().await.push(keep.clone());
        store.posts.lock().await.push(doomed.clone());
        service.load().await;

        service.delete(doomed.id).await.expect("delete succeeds");

        let feed = service.snapshot().await;
        assert_eq!(feed.posts.len(), 1);
        assert_eq!(feed.posts[0].id, keep.id);
        assert!(store.posts.lock().await.iter().all(|p| p.id != doomed.id));
    }

    #[tokio::test]
    async fn deleting_unknown_id_is_a_noop_success() {
        let store = Arc::new(InMemoryStore::new(FeedOrdering::Insertion));
        let service = FeedService::new(store.clone());
        store.posts.lock().await.push(record("Keep"));
        service.load().await;

        service.delete(Uuid::new_v4()).await.expect("no-op delete");
        assert_eq!(service.snapshot().await.posts.len(), 1);
    }
}
