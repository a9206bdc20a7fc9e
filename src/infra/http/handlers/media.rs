use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::application::store::{MediaBucket, MediaStore, StoredMedia};
use crate::infra::http::AppState;
use crate::infra::http::error::ApiError;

/// Accept one `file` part and store it under the named bucket. Responds with
/// the stored path, public URL and checksum of the written object.
pub async fn upload_media(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredMedia>), ApiError> {
    let bucket: MediaBucket = bucket
        .parse()
        .map_err(|_| ApiError::not_found(format!("unknown media bucket `{bucket}`")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(format!("failed to read upload: {err}")))?;

        let stored = state
            .media
            .upload(bucket, bucket.default_prefix(), &original_name, data)
            .await?;
        metrics::counter!("foglio_media_uploads_total").increment(1);
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(ApiError::bad_request("multipart field `file` is required"))
}

pub async fn serve_media(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bucket: MediaBucket = bucket
        .parse()
        .map_err(|_| ApiError::not_found(format!("unknown media bucket `{bucket}`")))?;
    let absolute = state
        .media
        .absolute_path(bucket, &path)
        .map_err(|_| ApiError::not_found(format!("no such object `{path}`")))?;

    let body = match tokio::fs::read(&absolute).await {
        Ok(body) => body,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("no such object `{path}`")));
        }
        Err(err) => {
            return Err(crate::application::store::StoreError::unavailable(format!(
                "failed to read media object: {err}"
            ))
            .into());
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        body,
    )
        .into_response())
}
