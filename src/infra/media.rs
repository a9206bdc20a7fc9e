//! Filesystem-backed media buckets with publicly resolvable URLs.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use sha2::{Digest, Sha256};
use slug::slugify;
use time::OffsetDateTime;
use tokio::{fs, io::AsyncWriteExt};
use url::Url;
use uuid::Uuid;

use crate::application::store::{MediaBucket, MediaStore, StoreError, StoredMedia};

const DEFAULT_EXTENSION: &str = "bin";
const RANDOM_SUFFIX_LEN: usize = 8;

/// Bucketed asset storage rooted at a directory, one subdirectory per bucket.
/// Public URLs resolve under `<public_base>/media/<bucket>/<stored_path>`.
pub struct MediaStorage {
    root: PathBuf,
    public_base: Url,
}

impl MediaStorage {
    /// Initialise storage, creating the bucket directories if necessary.
    pub fn new(root: PathBuf, public_base: Url) -> Result<Self, std::io::Error> {
        for bucket in [MediaBucket::Cover, MediaBucket::Inline] {
            std::fs::create_dir_all(root.join(bucket.as_str()))?;
        }
        Ok(Self { root, public_base })
    }

    /// Stream a payload into the bucket. The partial file is removed when the
    /// stream fails mid-flight so the bucket never holds torn objects.
    pub async fn store_stream<S>(
        &self,
        bucket: MediaBucket,
        path_prefix: &str,
        original_name: &str,
        payload: S,
    ) -> Result<StoredMedia, StoreError>
    where
        S: futures::Stream<Item = Result<Bytes, StoreError>>,
    {
        let stored_path = build_stored_path(path_prefix, original_name);
        let absolute = self.resolve(bucket, &stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::upload(err.to_string()))?;
        }

        let mut file = fs::File::create(&absolute)
            .await
            .map_err(|err| StoreError::upload(err.to_string()))?;
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        pin_mut!(payload);
        while let Some(chunk_result) = payload.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            if chunk.is_empty() {
                continue;
            }

            total_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                return Err(StoreError::upload(err.to_string()));
            }
            hasher.update(&chunk);
        }

        file.flush()
            .await
            .map_err(|err| StoreError::upload(err.to_string()))?;

        let checksum = hex::encode(hasher.finalize());
        let size_bytes = i64::try_from(total_bytes)
            .map_err(|_| StoreError::upload("payload size exceeds supported range"))?;

        Ok(StoredMedia {
            bucket,
            public_url: self.public_url(bucket, &stored_path)?,
            stored_path,
            checksum,
            size_bytes,
        })
    }

    /// Absolute filesystem path for a stored object.
    pub fn absolute_path(
        &self,
        bucket: MediaBucket,
        stored_path: &str,
    ) -> Result<PathBuf, StoreError> {
        self.resolve(bucket, stored_path)
    }

    fn public_url(&self, bucket: MediaBucket, stored_path: &str) -> Result<String, StoreError> {
        self.public_base
            .join(&format!("media/{}/{stored_path}", bucket.as_str()))
            .map(String::from)
            .map_err(|err| StoreError::upload(format!("failed to build public URL: {err}")))
    }

    /// Reject absolute paths and parent-directory components so a stored
    /// path can never escape its bucket.
    fn resolve(&self, bucket: MediaBucket, stored_path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StoreError::upload(format!(
                "invalid stored path `{stored_path}`"
            )));
        }

        Ok(self.root.join(bucket.as_str()).join(relative))
    }
}

#[async_trait]
impl MediaStore for MediaStorage {
    async fn upload(
        &self,
        bucket: MediaBucket,
        path_prefix: &str,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredMedia, StoreError> {
        let payload = stream::once(async move { Ok::<_, StoreError>(data) });
        self.store_stream(bucket, path_prefix, original_name, payload)
            .await
    }

    async fn delete(&self, bucket: MediaBucket, stored_path: &str) -> Result<(), StoreError> {
        let absolute = self.resolve(bucket, stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::write(err.to_string())),
        }
    }
}

/// Compose a stored path from the prefix, current timestamp, and a random
/// suffix, preserving the original extension lower-cased (or `bin` when the
/// name has none).
fn build_stored_path(path_prefix: &str, original_name: &str) -> String {
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    let suffix: String = Uuid::new_v4().simple().to_string()[..RANDOM_SUFFIX_LEN].to_string();
    let extension = normalized_extension(original_name);

    let prefix = path_prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{millis}-{suffix}.{extension}")
    } else {
        format!("{}/{millis}-{suffix}.{extension}", slugify(prefix))
    }
}

fn normalized_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, MediaStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = MediaStorage::new(
            dir.path().to_path_buf(),
            Url::parse("http://localhost:3000/").expect("url"),
        )
        .expect("storage");
        (dir, storage)
    }

    #[tokio::test]
    async fn stored_path_keeps_prefix_and_lowercased_extension() {
        let (_dir, storage) = storage();

        let stored = storage
            .upload(
                MediaBucket::Cover,
                "covers",
                "Sunset Photo.JPG",
                Bytes::from_static(b"pixels"),
            )
            .await
            .expect("upload");

        assert!(stored.stored_path.starts_with("covers/"));
        assert!(stored.stored_path.ends_with(".jpg"));
        assert_eq!(stored.size_bytes, 6);
        assert!(
            stored
                .public_url
                .starts_with("http://localhost:3000/media/cover/covers/")
        );

        let absolute = storage
            .absolute_path(MediaBucket::Cover, &stored.stored_path)
            .expect("path");
        assert_eq!(tokio::fs::read(absolute).await.expect("read"), b"pixels");
    }

    #[tokio::test]
    async fn missing_extension_falls_back_to_bin() {
        let (_dir, storage) = storage();

        let stored = storage
            .upload(
                MediaBucket::Inline,
                "media",
                "payload",
                Bytes::from_static(b"blob"),
            )
            .await
            .expect("upload");

        assert!(stored.stored_path.ends_with(".bin"));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let (_dir, storage) = storage();

        let err = storage
            .absolute_path(MediaBucket::Cover, "../escape.jpg")
            .expect_err("rejected");
        assert!(matches!(err, StoreError::Upload { .. }));
    }

    #[tokio::test]
    async fn deleting_missing_object_succeeds() {
        let (_dir, storage) = storage();
        storage
            .delete(MediaBucket::Inline, "media/0-deadbeef.png")
            .await
            .expect("no-op delete");
    }

    #[tokio::test]
    async fn checksum_matches_payload() {
        let (_dir, storage) = storage();

        let stored = storage
            .upload(
                MediaBucket::Cover,
                "covers",
                "a.png",
                Bytes::from_static(b"pixels"),
            )
            .await
            .expect("upload");

        let expected = hex::encode(Sha256::digest(b"pixels"));
        assert_eq!(stored.checksum, expected);
    }
}
