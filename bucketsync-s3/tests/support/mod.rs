//! Shared helpers for integration tests against a local MinIO.

#![allow(dead_code)]

use bucketsync_s3::{S3Options, S3Transport, StaticCredentials};
use uuid::Uuid;

pub const ENDPOINT: &str = "http://localhost:9000";
pub const BUCKET: &str = "bucketsync-test";

/// Options pointing at local MinIO (docker-compose.test.yml).
pub fn test_options() -> S3Options {
    S3Options::new(BUCKET)
        .with_region("us-east-1")
        .with_endpoint(ENDPOINT)
        .with_credentials(StaticCredentials::new(
            "bucketsync-test",
            "bucketsync-test-secret",
        ))
}

pub fn test_transport() -> S3Transport {
    S3Transport::connect(&test_options()).unwrap()
}

/// Per-test unique key prefix so runs never see each other's objects.
pub fn unique_prefix() -> String {
    format!("test-runs/{}", Uuid::new_v4())
}
