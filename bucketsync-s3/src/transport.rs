//! Blocking S3 client used by the engine's worker threads.
//!
//! The engine is thread-based, so each call is driven to completion on a
//! private tokio runtime owned by the transport. Worker threads call
//! `block_on` concurrently; the multi-thread runtime multiplexes them over
//! one shared connection pool.

use crate::error::{S3Error, S3Result};
use crate::options::S3Options;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, Length};
use bucketsync_engine::{
    BackendError, BackendResult, ObjectBody, ObjectEntry, RetryMode, RetryPolicy, StorageBackend,
};
use tokio::runtime::Runtime;
use tracing::debug;

/// [`StorageBackend`] over a single S3 bucket.
///
/// None of the trait methods may be called from inside an async context:
/// they block on the transport's own runtime and would panic there.
pub struct S3Transport {
    bucket: String,
    client: S3Client,
    runtime: Runtime,
}

impl S3Transport {
    /// Resolves credentials and region, then builds the client.
    pub fn connect(options: &S3Options) -> S3Result<Self> {
        if options.bucket.trim().is_empty() {
            return Err(S3Error::Config("bucket name is empty".into()));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("bucketsync-s3")
            .build()?;

        let client = runtime.block_on(build_client(options));
        debug!(
            bucket = %options.bucket,
            endpoint = ?options.endpoint_override,
            "S3 client ready"
        );

        Ok(Self {
            bucket: options.bucket.clone(),
            client,
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_async(&self, key: &str, body: ObjectBody) -> BackendResult<()> {
        let len = body.len();
        let stream = match body {
            // Streaming from the path keeps the body rewindable for SDK retries.
            ObjectBody::File { path, len, .. } => ByteStream::read_from()
                .path(&path)
                .length(Length::Exact(len))
                .build()
                .await
                .map_err(|e| BackendError::Transfer(format!("failed to stream {key}: {e}")))?,
            ObjectBody::Bytes(bytes) => ByteStream::from(bytes),
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(len as i64)
            .body(stream)
            .send()
            .await
            .map_err(|e| {
                BackendError::Transfer(format!(
                    "upload failed for {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!("uploaded {len} bytes to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn exists_async(&self, key: &str) -> BackendResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(BackendError::Transfer(format!(
                        "head object failed for {key}: {}",
                        DisplayErrorContext(&service_err)
                    )))
                }
            }
        }
    }

    async fn get_async(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(BackendError::Transfer(format!(
                    "download failed for {key}: {}",
                    DisplayErrorContext(&service_err)
                )));
            }
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| BackendError::Transfer(format!("failed to read body for {key}: {e}")))?;
        let bytes = body.into_bytes().to_vec();
        debug!("downloaded {} bytes from s3://{}/{key}", bytes.len(), self.bucket);
        Ok(Some(bytes))
    }

    async fn list_async(&self, prefix: Option<&str>) -> BackendResult<Vec<ObjectEntry>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    BackendError::Transfer(format!(
                        "list failed for prefix {}: {}",
                        prefix.unwrap_or(""),
                        DisplayErrorContext(&e)
                    ))
                })?;

            entries.extend(resp.contents().iter().filter_map(|obj| {
                obj.key().map(|key| ObjectEntry {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                })
            }));

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(
            "listed {} objects under s3://{}/{}",
            entries.len(),
            self.bucket,
            prefix.unwrap_or("")
        );
        Ok(entries)
    }

    async fn bucket_exists_async(&self) -> BackendResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(BackendError::Transfer(format!(
                        "head bucket failed for {}: {}",
                        self.bucket,
                        DisplayErrorContext(&service_err)
                    )))
                }
            }
        }
    }
}

impl StorageBackend for S3Transport {
    fn put(&self, key: &str, body: ObjectBody) -> BackendResult<()> {
        self.runtime.block_on(self.put_async(key, body))
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        self.runtime.block_on(self.exists_async(key))
    }

    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.runtime.block_on(self.get_async(key))
    }

    fn list_tree(&self, prefix: Option<&str>) -> BackendResult<Vec<ObjectEntry>> {
        self.runtime.block_on(self.list_async(prefix))
    }

    fn bucket_exists(&self) -> BackendResult<bool> {
        self.runtime.block_on(self.bucket_exists_async())
    }
}

async fn build_client(options: &S3Options) -> S3Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(retry_config(&options.retry))
        .timeout_config(timeout_config(&options.retry));

    if let Some(region) = &options.region {
        loader = loader.region(aws_types::region::Region::new(region.clone()));
    }
    if let Some(profile) = &options.profile_name {
        loader = loader.profile_name(profile);
    }
    if let Some(creds) = &options.credentials {
        loader = loader.credentials_provider(aws_credential_types::Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            creds.session_token.clone(),
            None,
            "bucketsync-static",
        ));
    }

    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &options.endpoint_override {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    S3Client::from_conf(builder.build())
}

/// Maps the engine's retry policy onto the SDK's retry strategy.
pub fn retry_config(policy: &RetryPolicy) -> RetryConfig {
    let base = match policy.mode {
        RetryMode::Standard => RetryConfig::standard(),
        RetryMode::Adaptive => RetryConfig::adaptive(),
    };
    base.with_max_attempts(policy.max_attempts.max(1))
        .with_initial_backoff(policy.initial_backoff())
        .with_max_backoff(policy.max_backoff())
}

pub fn timeout_config(policy: &RetryPolicy) -> TimeoutConfig {
    TimeoutConfig::builder()
        .connect_timeout(policy.connect_timeout())
        .read_timeout(policy.read_timeout())
        .build()
}
