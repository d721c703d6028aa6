use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// StorageService
///
/// Abstract contract for the object storage layer holding post images. The
/// real S3 client serves production and the Dockerized MinIO setup; the mock
/// keeps handler tests off the network.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision MinIO automatically; harmless in production.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary signed URL allowing a client to upload a post
    /// image directly to the bucket, constrained to `content_type` and a short
    /// expiry.
    ///
    /// # Arguments
    /// * `key`: The object key under the `posts/` prefix.
    /// * `content_type`: The image MIME type (e.g. "image/jpeg").
    async fn presign_image_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// Concrete implementation over the AWS SDK. `force_path_style(true)` keeps
/// the client compatible with MinIO and other S3 gateways.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the client from the AppConfig credentials.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // for MinIO-style gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent, so this is safe to call on every startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn presign_image_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        // 10-minute expiry; enough for an image upload, short enough to limit misuse.
        let expires_in = Duration::from_secs(600);

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The signature binds this Content-Type; mismatched uploads fail.
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in).unwrap())
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Strips directory navigation segments from a user-influenced key to prevent
/// path traversal.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// Test double for `StorageService`. Returns deterministic local-style URLs so
/// handler tests can assert on the upload flow without S3.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in the mock.
    }

    async fn presign_image_upload(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: simulated failure".to_string());
        }

        let sanitized_key = sanitize_key(key);

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitized_key
        ))
    }
}

/// StorageState
///
/// The shared handle to the storage service in the app state.
pub type StorageState = Arc<dyn StorageService>;
