//! Post composition: a typed draft, slug derivation, and the submit flow.
//!
//! A submit either resets the form (success) or retains the draft and an
//! error message (failure, so the user can retry). Required-field validation
//! runs before any store call, and a cover upload, when present, must
//! complete before the record create is issued.

use bytes::Bytes;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::application::store::{MediaBucket, MediaStore, NewPost, PostStore, StoreError};
use crate::domain::posts::{PostRecord, derive_excerpt};
use crate::domain::slug::derive_slug;

const DRAFT_DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

/// Fields the composer form exposes. Updates go through [`PostDraft::set_field`]
/// keyed by this enum rather than by untyped property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Slug,
    Content,
    Category,
    Author,
    Date,
    Excerpt,
}

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    #[error("date `{0}` is not a calendar date (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Editable post metadata and body. The slug tracks the title until it is
/// set explicitly, after which the manual value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub date: Option<Date>,
    pub excerpt: String,
    pub image: Option<String>,
    slug_overridden: bool,
    raw_date: String,
}

impl PostDraft {
    pub fn set_field(&mut self, field: DraftField, value: &str) {
        match field {
            DraftField::Title => {
                self.title = value.to_string();
                if !self.slug_overridden {
                    self.slug = derive_slug(value);
                }
            }
            DraftField::Slug => {
                // A manual override is authoritative; it is stored verbatim
                // rather than re-run through derivation.
                self.slug = value.trim().to_string();
                self.slug_overridden = true;
            }
            DraftField::Content => self.content = value.to_string(),
            DraftField::Category => self.category = value.to_string(),
            DraftField::Author => self.author = value.to_string(),
            DraftField::Date => {
                self.raw_date = value.trim().to_string();
                self.date = Date::parse(&self.raw_date, DRAFT_DATE_FORMAT).ok();
            }
            DraftField::Excerpt => self.excerpt = value.to_string(),
        }
    }

    /// First required field that is still empty, if any. Title, slug, author,
    /// category, and content must all be present before a submit may proceed.
    pub fn missing_required(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            return Some("title");
        }
        if self.slug.trim().is_empty() {
            return Some("slug");
        }
        if self.author.trim().is_empty() {
            return Some("author");
        }
        if self.category.trim().is_empty() {
            return Some("category");
        }
        if self.content.trim().is_empty() {
            return Some("content");
        }
        None
    }

    fn validated(&self) -> Result<NewPost, ComposerError> {
        if let Some(field) = self.missing_required() {
            return Err(ComposerError::MissingField(field));
        }
        if !self.raw_date.is_empty() && self.date.is_none() {
            return Err(ComposerError::InvalidDate(self.raw_date.clone()));
        }

        let excerpt = if self.excerpt.trim().is_empty() {
            Some(derive_excerpt(&self.content))
        } else {
            Some(self.excerpt.trim().to_string())
        };

        Ok(NewPost {
            title: self.title.trim().to_string(),
            slug: self.slug.clone(),
            content: self.content.clone(),
            category: self.category.trim().to_string(),
            author: self.author.trim().to_string(),
            date: self
                .date
                .unwrap_or_else(|| OffsetDateTime::now_utc().date()),
            excerpt,
            image: self.image.clone(),
        })
    }
}

/// A cover asset captured by the form, uploaded ahead of the create call.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub original_name: String,
    pub data: Bytes,
}

/// The composer session. On success the draft resets; on failure the draft
/// and an error message are retained so the user can retry.
#[derive(Debug)]
pub struct Composer {
    draft: PostDraft,
    error: Option<String>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self {
            draft: PostDraft::default(),
            error: None,
        }
    }

    pub fn with_draft(draft: PostDraft) -> Self {
        Self { draft, error: None }
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut PostDraft {
        &mut self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a submit may start: every required field must be present.
    /// Callers use this to disable the submit control while a request is
    /// pending; an exclusive borrow keeps concurrent submits structurally
    /// impossible here.
    pub fn can_submit(&self) -> bool {
        self.draft.missing_required().is_none()
    }

    /// Run the submit flow: validate, upload the cover if one was attached,
    /// then create the record. Upload strictly precedes create; an upload
    /// failure leaves no record behind.
    pub async fn submit(
        &mut self,
        posts: &dyn PostStore,
        media: &dyn MediaStore,
        cover: Option<CoverUpload>,
    ) -> Result<PostRecord, ComposerError> {
        let mut new_post = match self.draft.validated() {
            Ok(post) => post,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        if let Some(cover) = cover {
            let bucket = MediaBucket::Cover;
            match media
                .upload(
                    bucket,
                    bucket.default_prefix(),
                    &cover.original_name,
                    cover.data,
                )
                .await
            {
                Ok(stored) => {
                    metrics::counter!("foglio_media_uploads_total").increment(1);
                    new_post.image = Some(stored.public_url);
                }
                Err(err) => {
                    warn!(error = %err, "cover upload failed; create aborted");
                    return Err(self.fail(err.into()));
                }
            }
        }

        match posts.create(new_post).await {
            Ok(record) => {
                metrics::counter!("foglio_posts_created_total").increment(1);
                info!(slug = %record.slug, id = %record.id, "post created");
                self.reset();
                Ok(record)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn fail(&mut self, err: ComposerError) -> ComposerError {
        self.error = Some(err.to_string());
        err
    }

    fn reset(&mut self) {
        self.draft = PostDraft::default();
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::application::store::{FeedOrdering, StoredMedia};

    #[derive(Default)]
    struct CountingPostStore {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl PostStore for CountingPostStore {
        async fn list_all(&self) -> Result<Vec<PostRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn create(&self, post: NewPost) -> Result<PostRecord, StoreError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(PostRecord {
                id: Uuid::new_v4(),
                title: post.title,
                slug: post.slug,
                content: post.content,
                category: post.category,
                author: post.author,
                date: post.date,
                excerpt: post.excerpt,
                image: post.image,
            })
        }

        async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
            Ok(())
        }

        fn ordering(&self) -> FeedOrdering {
            FeedOrdering::Recency
        }
    }

    struct FailingMediaStore;

    #[async_trait]
    impl MediaStore for FailingMediaStore {
        async fn upload(
            &self,
            _bucket: MediaBucket,
            _path_prefix: &str,
            _original_name: &str,
            _data: Bytes,
        ) -> Result<StoredMedia, StoreError> {
            Err(StoreError::upload("bucket rejected the object"))
        }

        async fn delete(&self, _bucket: MediaBucket, _path: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct AcceptingMediaStore;

    #[async_trait]
    impl MediaStore for AcceptingMediaStore {
        async fn upload(
            &self,
            bucket: MediaBucket,
            path_prefix: &str,
            _original_name: &str,
            data: Bytes,
        ) -> Result<StoredMedia, StoreError> {
            Ok(StoredMedia {
                bucket,
                stored_path: format!("{path_prefix}/1-abcd1234.png"),
                public_url: format!("http://localhost/media/{}/x.png", bucket.as_str()),
                checksum: "00".to_string(),
                size_bytes: data.len() as i64,
            })
        }

        async fn delete(&self, _bucket: MediaBucket, _path: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn filled_draft() -> PostDraft {
        let mut draft = PostDraft::default();
        draft.set_field(DraftField::Title, "Hello, World!  2024");
        draft.set_field(DraftField::Author, "ada");
        draft.set_field(DraftField::Category, "engineering");
        draft.set_field(DraftField::Content, "<p>Body text</p>");
        draft
    }

    #[test]
    fn title_changes_regenerate_slug_until_overridden() {
        let mut draft = PostDraft::default();
        draft.set_field(DraftField::Title, "First Title");
        assert_eq!(draft.slug, "first-title");

        draft.set_field(DraftField::Title, "Second Title");
        assert_eq!(draft.slug, "second-title");

        draft.set_field(DraftField::Slug, "custom-slug");
        draft.set_field(DraftField::Title, "Third Title");
        assert_eq!(draft.slug, "custom-slug");
    }

    #[test]
    fn manual_slug_is_kept_verbatim() {
        let mut draft = PostDraft::default();
        draft.set_field(DraftField::Title, "First Title");
        draft.set_field(DraftField::Slug, "My Slug");
        assert_eq!(draft.slug, "My Slug");

        draft.set_field(DraftField::Title, "Second Title");
        assert_eq!(draft.slug, "My Slug");
    }

    #[tokio::test]
    async fn missing_required_field_never_issues_create() {
        let store = Arc::new(CountingPostStore::default());
        for omit in [
            DraftField::Title,
            DraftField::Author,
            DraftField::Category,
            DraftField::Content,
        ] {
            let mut draft = filled_draft();
            draft.set_field(omit, "");

            let mut composer = Composer::with_draft(draft);
            assert!(!composer.can_submit());
            let result = composer
                .submit(store.as_ref(), &AcceptingMediaStore, None)
                .await;

            assert!(matches!(result, Err(ComposerError::MissingField(_))));
        }
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_upload_prevents_create_and_retains_draft() {
        let store = Arc::new(CountingPostStore::default());
        let mut composer = Composer::with_draft(filled_draft());

        let cover = CoverUpload {
            original_name: "cover.PNG".to_string(),
            data: Bytes::from_static(b"pixels"),
        };
        let result = composer
            .submit(store.as_ref(), &FailingMediaStore, Some(cover))
            .await;

        assert!(matches!(result, Err(ComposerError::Store(StoreError::Upload { .. }))));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert_eq!(composer.draft().title, "Hello, World!  2024");
        assert!(composer.error().is_some());
    }

    #[tokio::test]
    async fn failed_submit_can_be_retried() {
        let store = Arc::new(CountingPostStore::default());
        let mut composer = Composer::with_draft(filled_draft());

        let cover = CoverUpload {
            original_name: "cover.png".to_string(),
            data: Bytes::from_static(b"pixels"),
        };
        composer
            .submit(store.as_ref(), &FailingMediaStore, Some(cover.clone()))
            .await
            .expect_err("upload fails");

        // The retained draft is still submittable; a retry succeeds.
        assert!(composer.can_submit());
        let record = composer
            .submit(store.as_ref(), &AcceptingMediaStore, Some(cover))
            .await
            .expect("retry succeeds");

        assert_eq!(record.slug, "hello-world-2024");
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert!(composer.error().is_none());
    }

    #[tokio::test]
    async fn successful_submit_resets_the_form() {
        let store = Arc::new(CountingPostStore::default());
        let mut composer = Composer::with_draft(filled_draft());
        assert!(composer.can_submit());

        let record = composer
            .submit(store.as_ref(), &AcceptingMediaStore, None)
            .await
            .expect("create succeeds");

        assert_eq!(record.slug, "hello-world-2024");
        assert_eq!(record.excerpt.as_deref(), Some("Body text"));
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(composer.draft(), &PostDraft::default());
        assert!(composer.error().is_none());
    }

    #[tokio::test]
    async fn cover_url_lands_on_the_created_record() {
        let store = Arc::new(CountingPostStore::default());
        let mut composer = Composer::with_draft(filled_draft());

        let cover = CoverUpload {
            original_name: "cover.png".to_string(),
            data: Bytes::from_static(b"pixels"),
        };
        let record = composer
            .submit(store.as_ref(), &AcceptingMediaStore, Some(cover))
            .await
            .expect("create succeeds");

        assert_eq!(
            record.image.as_deref(),
            Some("http://localhost/media/cover/x.png")
        );
    }
}
