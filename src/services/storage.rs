use crate::api::backend::BlobStore;
use crate::api::models::{UploadFile, extension_for, extension_of};
use crate::app::DEFAULT_AVATAR_BUCKET;
use crate::error::ApiError;
use percent_encoding::percent_decode_str;
use std::sync::Arc;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Profile image upload and cleanup in the backend's blob storage.
pub struct StorageService<S> {
    store: Option<Arc<S>>,
    bucket: String,
}

impl<S: BlobStore> StorageService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store: Some(store),
            bucket: DEFAULT_AVATAR_BUCKET.to_string(),
        }
    }

    /// A service with no backend behind it; uploads fail with
    /// [`ApiError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self {
            store: None,
            bucket: DEFAULT_AVATAR_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn upload_profile_image(&self, file: UploadFile, user_id: &str) -> Result<String, ApiError> {
        let store = self.store.as_ref().ok_or(ApiError::NotConfigured)?;
        let ext = file_extension(&file);
        let key = object_key(user_id, &ext, crate::utils::unix_millis());
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        store.upload(&self.bucket, &key, file.bytes, &content_type).await?;
        log::info!("Uploaded profile image {key}");
        Ok(store.public_url(&self.bucket, &key))
    }

    /// Best-effort removal of a previously uploaded image. Never fails.
    pub async fn delete_profile_image(&self, url: &str) {
        let Some(key) = object_key_from_url(url, &self.bucket) else {
            log::warn!("Not deleting {url}: no /{}/ segment in the URL", self.bucket);
            return;
        };
        let Some(store) = &self.store else {
            log::warn!("Not deleting {key}: storage is not configured");
            return;
        };
        match store.remove(&self.bucket, &[key.clone()]).await {
            Ok(()) => log::info!("Deleted profile image {key}"),
            Err(err) => log::warn!("Failed to delete profile image {key}: {err}"),
        }
    }
}

fn file_extension(file: &UploadFile) -> String {
    extension_of(&file.file_name)
        .or_else(|| {
            file.content_type
                .as_deref()
                .and_then(extension_for)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// `{user_id}-{millis}.{ext}`; distinct per user and upload instant.
pub fn object_key(user_id: &str, ext: &str, millis: u128) -> String {
    format!("{user_id}-{millis}.{ext}")
}

/// The object key following `/{bucket}/` in a public URL, without any
/// query string or fragment, percent-decoded back to the stored name.
pub fn object_key_from_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("/{bucket}/");
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let start = without_query.find(&marker)? + marker.len();
    let key = &without_query[start..];
    if key.is_empty() {
        return None;
    }
    Some(percent_decode_str(key).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use std::sync::atomic::Ordering;

    fn png(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.into(),
            content_type: Some("image/png".into()),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn upload_returns_public_url_for_user_keyed_object() {
        let backend = Arc::new(FakeBackend::new());
        let svc = StorageService::new(Arc::clone(&backend));

        let url = svc.upload_profile_image(png("Me.PNG"), "coach-1").await.unwrap();

        let upload = &backend.calls_for("upload")[0];
        assert_eq!(upload.target, "profile-images");
        assert_eq!(upload.param("content_type"), Some("image/png"));
        assert_eq!(upload.param("len"), Some("4"));
        let key = upload.param("key").unwrap();
        assert!(key.starts_with("coach-1-"), "{key}");
        assert!(key.ends_with(".png"), "{key}");
        assert_eq!(url, format!("https://fake.local/storage/v1/object/public/profile-images/{key}"));
    }

    #[tokio::test]
    async fn upload_without_backend_is_an_explicit_error() {
        let svc: StorageService<FakeBackend> = StorageService::unconfigured();
        assert!(matches!(
            svc.upload_profile_image(png("a.png"), "coach-1").await,
            Err(ApiError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn upload_failure_propagates() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_uploads.store(true, Ordering::SeqCst);
        let svc = StorageService::new(backend);
        assert!(matches!(
            svc.upload_profile_image(png("a.png"), "coach-1").await,
            Err(ApiError::Status { status: 413, .. })
        ));
    }

    #[tokio::test]
    async fn delete_without_bucket_segment_makes_no_call() {
        let backend = Arc::new(FakeBackend::new());
        let svc = StorageService::new(Arc::clone(&backend));
        svc.delete_profile_image("https://cdn.example.com/avatars/coach-1.png").await;
        svc.delete_profile_image("not a url").await;
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_key_and_swallows_errors() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_removes.store(true, Ordering::SeqCst);
        let svc = StorageService::new(Arc::clone(&backend));
        svc.delete_profile_image(
            "https://demo.example.co/storage/v1/object/public/profile-images/coach-1-17.png?t=1",
        )
        .await;

        let removes = backend.calls_for("remove");
        assert_eq!(removes.len(), 1);
        assert_eq!(removes[0].param("key"), Some("coach-1-17.png"));
    }

    #[test]
    fn extension_falls_back_to_content_type_then_bin() {
        let mut file = png("avatar");
        assert_eq!(file_extension(&file), "png");
        file.content_type = None;
        assert_eq!(file_extension(&file), "bin");
        assert_eq!(object_key("u1", "jpg", 1700000000000), "u1-1700000000000.jpg");
    }

    #[test]
    fn key_from_url_needs_something_after_the_bucket() {
        assert_eq!(object_key_from_url("https://x/profile-images/", "profile-images"), None);
        assert_eq!(
            object_key_from_url("https://x/profile-images/a/b.png#frag", "profile-images").as_deref(),
            Some("a/b.png")
        );
        assert_eq!(
            object_key_from_url("https://x/profile-images/coach%201%2Bme.png?t=3", "profile-images").as_deref(),
            Some("coach 1+me.png")
        );
    }

    #[tokio::test]
    async fn delete_sends_the_decoded_key() {
        let backend = Arc::new(FakeBackend::new());
        let svc = StorageService::new(Arc::clone(&backend));
        svc.delete_profile_image("https://demo.example.co/storage/v1/object/public/profile-images/a%20b.png")
            .await;
        assert_eq!(backend.calls_for("remove")[0].param("key"), Some("a b.png"));
    }
}
