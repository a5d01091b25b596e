//! S3-compatible object store
//!
//! Works against AWS S3 and S3-interoperable services (MinIO, the GCS XML API)
//! through `storage.endpoint`. A `PutObject` replaces the whole object
//! atomically, which is the write guarantee the pipeline relies on.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult, validate_key};
use crate::config::StorageSection;
use crate::error::{PipelineError, PipelineResult};

/// Region used when the configuration does not name one
const DEFAULT_REGION: &str = "us-east-1";

/// Object store backed by one S3 bucket
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Store {
    /// Build a client from the storage section and the default AWS credential chain
    pub async fn connect(
        storage: &StorageSection,
        bucket: impl Into<String>,
    ) -> PipelineResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(PipelineError::config("S3 bucket name is empty"));
        }

        let region = storage
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()));
        if let Some(profile) = &storage.profile {
            loader = loader.profile_name(profile);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &storage.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            region,
        })
    }
}

fn backend_error(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{}: {}", context, e))
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    fn zone(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    let service = e.into_service_error();
                    if service.is_no_such_bucket() {
                        StorageError::ZoneNotFound(self.bucket.clone())
                    } else {
                        backend_error("ListObjectsV2", service)
                    }
                })?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ObjectMeta {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object.last_modified().and_then(to_chrono),
                });
            }

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend_error("GetObject", service)
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| backend_error("GetObject body", e))?;
        Ok(body.into_bytes())
    }

    async fn write(&self, key: &str, data: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/octet-stream")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| backend_error("PutObject", e.into_service_error()))?;
        Ok(())
    }

    async fn exists(&self) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service = e.into_service_error();
                if service.is_not_found() {
                    Ok(false)
                } else {
                    Err(backend_error("HeadBucket", service))
                }
            }
        }
    }

    async fn create(&self) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| backend_error("CreateBucket", e.into_service_error()))?;
        Ok(())
    }
}
