use async_trait::async_trait;
use aws_sdk_s3 as s3;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Key prefix under which every uploaded blob is stored in the bucket.
const UPLOAD_PREFIX: &str = "uploads";

/// StorageError
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no blob named {0}")]
    NotFound(String),
    #[error("invalid blob name {0}")]
    InvalidName(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

// 1. StorageService Contract
/// StorageService
///
/// The Blob Store contract. `store` must only return once the bytes are durable,
/// because the returned filename is written to the repository right after.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup
    /// to provision the bucket in MinIO.
    async fn ensure_bucket_exists(&self);

    /// Persists `bytes` and returns the generated filename handle.
    ///
    /// # Arguments
    /// * `original_filename`: The client-supplied name, sanitized into the handle.
    /// * `bytes`: The file payload.
    async fn store(&self, original_filename: &str, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Resolves a handle previously returned by `store`.
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, StorageError>;
}

/// sanitize_filename
///
/// Reduces a client-supplied filename to a single safe path segment: only ASCII
/// alphanumerics, `.`, `_` and `-` survive, whitespace runs become `_`, runs of
/// `.` become a single `.`, and leading or trailing `.`/`_` are stripped.
/// Directory components are dropped.
pub fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    let mut pending_gap = false;
    for ch in base.chars() {
        if ch.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')) {
            continue;
        }
        if pending_gap && !cleaned.is_empty() {
            cleaned.push('_');
        }
        pending_gap = false;
        // A run of dots collapses to one, so no handle ever contains "..".
        if ch == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(ch);
    }

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// generate_filename
///
/// Produces a collision-free handle: `{uuid}_{sanitized}`, or just `{uuid}` when
/// nothing of the original name survives sanitization.
pub fn generate_filename(original: &str) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    let sanitized = sanitize_filename(original);
    if sanitized.is_empty() {
        unique
    } else {
        format!("{unique}_{sanitized}")
    }
}

/// Rejects lookups that could escape the upload prefix.
fn validate_handle(filename: &str) -> Result<(), StorageError> {
    if filename.is_empty()
        || filename.contains(['/', '\\'])
        || filename.contains("..")
    {
        return Err(StorageError::InvalidName(filename.to_string()));
    }
    Ok(())
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// `StorageService` backed by an S3-compatible bucket (MinIO locally).
/// `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the S3 client using credentials and configuration from AppConfig.
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
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }

    fn object_key(filename: &str) -> String {
        format!("{UPLOAD_PREFIX}/{filename}")
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent for our purposes; an "already owned" error is ignored.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket: {:?}", e);
        }
    }

    async fn store(&self, original_filename: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let filename = generate_filename(original_filename);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(Self::object_key(&filename))
            .body(s3::primitives::ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(filename)
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        validate_handle(filename)?;

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(Self::object_key(filename))
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_no_such_key() => StorageError::NotFound(filename.to_string()),
                _ => StorageError::Backend(e.to_string()),
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(data.into_bytes().to_vec())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory `StorageService`. Blobs live in a shared map so clones observe the
/// same contents.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of blobs currently held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, filename: &str) -> bool {
        self.blobs.read().await.contains_key(filename)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn store(&self, original_filename: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let filename = generate_filename(original_filename);
        self.blobs.write().await.insert(filename.clone(), bytes);
        Ok(filename)
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        validate_handle(filename)?;

        self.blobs
            .read()
            .await
            .get(filename)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(filename.to_string()))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
