use crate::cli::EndpointConfig;
use crate::storage::{ClientError, ClientResult, StorageClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use bytes::Bytes;
use tracing::debug;

/// AWS SDK client against an S3-compatible endpoint.
///
/// Built with path-style addressing and a custom endpoint URL so it works
/// against in-cluster gateways as well as AWS itself. Cloning is cheap; each
/// worker task gets its own handle.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Build a client from endpoint configuration, resolving credentials
    /// from the configured environment variables.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let access_key = std::env::var(&endpoint.access_key_env)
            .context(format!("Environment variable {} not set", endpoint.access_key_env))?;
        let secret_key = std::env::var(&endpoint.secret_key_env)
            .context(format!("Environment variable {} not set", endpoint.secret_key_env))?;

        let creds = Credentials::new(access_key, secret_key, None, None, "ha-eval");

        let mut builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(endpoint.region.clone()))
            .credentials_provider(creds)
            .force_path_style(endpoint.force_path_style);

        if let Some(url) = &endpoint.url {
            builder = builder.endpoint_url(url);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

/// Map an SDK service error onto the client error taxonomy by error code
fn map_err<E>(err: SdkError<E>, target: &str) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err.code() {
        Some("NoSuchBucket") | Some("NoSuchKey") => ClientError::NotFound(target.to_string()),
        Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
            ClientError::AlreadyExists(target.to_string())
        }
        Some("BucketNotEmpty") => ClientError::NotEmpty(target.to_string()),
        _ => ClientError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl StorageClient for S3Client {
    async fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        debug!("S3 CreateBucket: {}", bucket);
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_err(e, bucket))?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> ClientResult<()> {
        debug!("S3 PutObject: {}/{}", bucket, key);
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_err(e, &format!("{}/{}", bucket, key)))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        debug!("S3 GetObject: {}/{}", bucket, key);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_err(e, &format!("{}/{}", bucket, key)))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| ClientError::Backend(format!("failed to read body: {}", e)))?;

        Ok(body.into_bytes())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        debug!("S3 DeleteObject: {}/{}", bucket, key);
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_err(e, &format!("{}/{}", bucket, key)))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        debug!("S3 DeleteBucket: {}", bucket);
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_err(e, bucket))?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);
            if let Some(token) = &continuation {
                req = req.continuation_token(token);
            }

            let output = req.send().await.map_err(|e| map_err(e, bucket))?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    keys.push(key.to_string());
                }
            }

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn list_buckets(&self) -> ClientResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_err(e, "list-buckets"))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(String::from))
            .collect())
    }
}
