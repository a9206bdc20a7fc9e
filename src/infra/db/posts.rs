use async_trait::async_trait;
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::application::store::{FeedOrdering, NewPost, PostStore, StoreError};
use crate::domain::posts::PostRecord;

use super::{PostgresStore, map_read_error, map_write_error};

// Runtime-checked queries keep the crate buildable without a live database;
// the row shape is pinned by this struct instead of a compile-time macro.
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub date: Date,
    pub excerpt: Option<String>,
    pub image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            category: row.category,
            author: row.author,
            date: row.date,
            excerpt: row.excerpt,
            image: row.image,
        }
    }
}

const SELECT_ALL: &str = "\
    SELECT id, title, slug, content, category, author, date, excerpt, image \
    FROM posts \
    ORDER BY date DESC, created_at DESC";

const INSERT_ONE: &str = "\
    INSERT INTO posts (id, title, slug, content, category, author, date, excerpt, image) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
    RETURNING id, title, slug, content, category, author, date, excerpt, image";

const DELETE_ONE: &str = "DELETE FROM posts WHERE id = $1";

#[async_trait]
impl PostStore for PostgresStore {
    async fn list_all(&self) -> Result<Vec<PostRecord>, StoreError> {
        let rows: Vec<PostRow> = sqlx::query_as(SELECT_ALL)
            .fetch_all(self.pool())
            .await
            .map_err(map_read_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn create(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        let row: PostRow = sqlx::query_as(INSERT_ONE)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(&post.category)
            .bind(&post.author)
            .bind(post.date)
            .bind(&post.excerpt)
            .bind(&post.image)
            .fetch_one(self.pool())
            .await
            .map_err(map_write_error)?;

        Ok(PostRecord::from(row))
    }

    // Deleting an id the table does not hold affects zero rows and succeeds.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(DELETE_ONE)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_write_error)?;

        Ok(())
    }

    fn ordering(&self) -> FeedOrdering {
        FeedOrdering::Recency
    }
}
