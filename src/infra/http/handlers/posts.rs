use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::composer::{Composer, CoverUpload, DraftField};
use crate::application::feed::PostFeed;
use crate::domain::posts::{KNOWN_CATEGORIES, PostRecord, format_human_date};
use crate::infra::http::AppState;
use crate::infra::http::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub content: String,
    pub category: String,
    pub author: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Pre-uploaded cover URL, when the asset already lives in a bucket.
    #[serde(default)]
    pub image: Option<String>,
}

/// Reload the feed from the backing store and return it. A store outage
/// yields an empty list with the `error` field set rather than a failure
/// status, so listings degrade instead of breaking.
pub async fn list_posts(State(state): State<AppState>) -> Json<PostFeed> {
    Json(state.feed.load().await)
}

#[derive(Debug, Serialize)]
pub struct GroupedPostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub date_display: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryGroupView {
    pub category: String,
    pub posts: Vec<GroupedPostView>,
}

pub async fn grouped_posts(State(state): State<AppState>) -> Json<Vec<CategoryGroupView>> {
    state.feed.load().await;
    let groups = state
        .feed
        .grouped()
        .await
        .into_iter()
        .map(|group| CategoryGroupView {
            category: group.category,
            posts: group
                .posts
                .into_iter()
                .map(|post| GroupedPostView {
                    date_display: format_human_date(post.date),
                    post,
                })
                .collect(),
        })
        .collect();
    Json(groups)
}

/// Category choices the composer form seeds its picker with. Free-text
/// categories are still accepted on create.
pub async fn known_categories() -> Json<Vec<&'static str>> {
    Json(KNOWN_CATEGORIES.to_vec())
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostRecord>), ApiError> {
    let mut composer = Composer::new();
    apply_request(&mut composer, &request);

    let record = composer
        .submit(state.feed.store().as_ref(), state.media.as_ref(), None)
        .await?;
    state.feed.insert_created(record.clone()).await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Multipart variant of the create flow. Text parts carry the draft fields;
/// an optional `cover` file part is uploaded before the record is written.
pub async fn compose_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostRecord>), ApiError> {
    let mut composer = Composer::new();
    let mut cover = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "cover" {
            let original_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "cover".to_string());
            let data = field.bytes().await.map_err(|err| {
                ApiError::bad_request(format!("failed to read cover upload: {err}"))
            })?;
            cover = Some(CoverUpload {
                original_name,
                data,
            });
            continue;
        }

        let draft_field = match name.as_str() {
            "title" => DraftField::Title,
            "slug" => DraftField::Slug,
            "content" => DraftField::Content,
            "category" => DraftField::Category,
            "author" => DraftField::Author,
            "date" => DraftField::Date,
            "excerpt" => DraftField::Excerpt,
            other => {
                return Err(ApiError::bad_request(format!(
                    "unknown form field `{other}`"
                )));
            }
        };
        let value = field
            .text()
            .await
            .map_err(|err| ApiError::bad_request(format!("failed to read `{name}`: {err}")))?;
        composer.draft_mut().set_field(draft_field, &value);
    }

    let record = composer
        .submit(state.feed.store().as_ref(), state.media.as_ref(), cover)
        .await?;
    state.feed.insert_created(record.clone()).await;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.feed.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn apply_request(composer: &mut Composer, request: &CreatePostRequest) {
    let draft = composer.draft_mut();
    draft.set_field(DraftField::Title, &request.title);
    if let Some(slug) = &request.slug {
        draft.set_field(DraftField::Slug, slug);
    }
    draft.set_field(DraftField::Content, &request.content);
    draft.set_field(DraftField::Category, &request.category);
    draft.set_field(DraftField::Author, &request.author);
    if let Some(date) = &request.date {
        draft.set_field(DraftField::Date, date);
    }
    if let Some(excerpt) = &request.excerpt {
        draft.set_field(DraftField::Excerpt, excerpt);
    }
    draft.image = request.image.clone();
}
