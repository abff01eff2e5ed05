use super::{BlobStore, DeleteError, ObjectStat, ObjectStream, RemoteError, RemoteResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use http::{Method, StatusCode};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::sync::Arc;
use std::time::Duration;
use stowage_core::BackendProperties;

/// Lifetime of the signed requests used for bucket administration.
const BUCKET_REQUEST_TTL: Duration = Duration::from_secs(60);
const DEFAULT_REGION: &str = "us-east-1";

/// S3-compatible client (MinIO, DigitalOcean Spaces, AWS S3, ...)
///
/// Object operations go through `object_store`. Bucket administration is not
/// part of that API, so those requests are presigned with the same
/// credentials and sent directly.
#[derive(Clone)]
pub struct S3BlobStore {
    builder: AmazonS3Builder,
    endpoint: String,
    region: String,
    default_bucket: String,
    default_store: Arc<AmazonS3>,
    http: reqwest::Client,
}

impl S3BlobStore {
    /// Create a client for the backend block.
    ///
    /// `endpoint` is the server URL (e.g. "http://localhost:9000" for MinIO);
    /// plain http is allowed when the endpoint uses it. Requests are
    /// path-style: `{endpoint}/{bucket}/{key}`.
    pub fn new(props: &BackendProperties) -> RemoteResult<Self> {
        let endpoint = props.endpoint.trim_end_matches('/').to_string();
        let access_key = props
            .access_key
            .clone()
            .ok_or_else(|| RemoteError::Config("access key not configured".to_string()))?;
        let secret_key = props
            .secret_key
            .clone()
            .ok_or_else(|| RemoteError::Config("secret key not configured".to_string()))?;

        let allow_http = endpoint.starts_with("http://");
        let builder = AmazonS3Builder::from_env()
            .with_endpoint(endpoint.clone())
            .with_allow_http(allow_http)
            .with_region(props.region.clone())
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key)
            .with_virtual_hosted_style_request(false);

        let default_bucket = props.bucket_name.clone();
        let default_store = Arc::new(Self::build(&builder, &default_bucket)?);

        Ok(S3BlobStore {
            builder,
            endpoint,
            region: props.region.clone(),
            default_bucket,
            default_store,
            http: reqwest::Client::new(),
        })
    }

    fn build(builder: &AmazonS3Builder, bucket: &str) -> RemoteResult<AmazonS3> {
        builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))
    }

    /// Store bound to `bucket`; the configured bucket's store is reused.
    fn store_for(&self, bucket: &str) -> RemoteResult<Arc<AmazonS3>> {
        if bucket == self.default_bucket {
            Ok(Arc::clone(&self.default_store))
        } else {
            Self::build(&self.builder, bucket).map(Arc::new)
        }
    }

    /// Send a signed request against the bucket itself (`{endpoint}/{bucket}/`).
    async fn bucket_request(
        &self,
        method: Method,
        bucket: &str,
        body: Option<String>,
    ) -> RemoteResult<reqwest::Response> {
        let store = self.store_for(bucket)?;
        let url = store
            .signed_url(method.clone(), &Path::default(), BUCKET_REQUEST_TTL)
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.body(body);
        }
        request
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))
    }

    fn map_error(bucket: &str, key: &str, err: ObjectStoreError) -> RemoteError {
        match err {
            ObjectStoreError::NotFound { .. } => RemoteError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            other => RemoteError::Request(other.to_string()),
        }
    }

    async fn unexpected(response: reqwest::Response, action: &str, bucket: &str) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        RemoteError::Request(format!(
            "{} {} returned {}: {}",
            action, bucket, status, body
        ))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn bucket_exists(&self, bucket: &str) -> RemoteResult<bool> {
        let response = self.bucket_request(Method::HEAD, bucket, None).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::unexpected(response, "HeadBucket", bucket).await),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> RemoteResult<()> {
        // Outside us-east-1 S3 wants the region spelled out in the body.
        let body = (self.region != DEFAULT_REGION).then(|| {
            format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint>\
                 </CreateBucketConfiguration>",
                self.region
            )
        });

        let response = self.bucket_request(Method::PUT, bucket, body).await?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(bucket = %bucket, "Bucket created");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT && text.contains("BucketAlreadyOwnedByYou") {
            return Ok(());
        }
        Err(RemoteError::Request(format!(
            "CreateBucket {} returned {}: {}",
            bucket, status, text
        )))
    }

    async fn remove_bucket(&self, bucket: &str) -> RemoteResult<()> {
        let response = self.bucket_request(Method::DELETE, bucket, None).await?;
        match response.status() {
            status if status.is_success() => {
                tracing::info!(bucket = %bucket, "Bucket removed");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(RemoteError::BucketNotFound(bucket.to_string())),
            _ => Err(Self::unexpected(response, "DeleteBucket", bucket).await),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> RemoteResult<()> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;
        result
            .map(|_| ())
            .map_err(|e| Self::map_error(bucket, key, e))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStream> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key);

        let result: ObjectResult<_> = store.get(&location).await;
        let result = result.map_err(|e| Self::map_error(bucket, key, e))?;

        Ok(result
            .into_stream()
            .map(|chunk| chunk.map_err(|e| RemoteError::Request(e.to_string())))
            .boxed())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStat> {
        let store = self.store_for(bucket)?;
        let meta = store
            .head(&Path::from(key))
            .await
            .map_err(|e| Self::map_error(bucket, key, e))?;

        Ok(ObjectStat {
            size: meta.size,
            last_modified: Some(meta.last_modified),
            e_tag: meta.e_tag,
        })
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> RemoteResult<()> {
        let store = self.store_for(bucket)?;
        let result: ObjectResult<_> = store.delete(&Path::from(key)).await;
        result.map_err(|e| Self::map_error(bucket, key, e))
    }

    fn remove_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxStream<'a, DeleteError> {
        let store = match self.store_for(bucket) {
            Ok(store) => store,
            Err(e) => {
                let message = e.to_string();
                return stream::iter(keys.into_iter().map(move |key| DeleteError {
                    object_name: Some(key),
                    message: message.clone(),
                }))
                .boxed();
            }
        };

        stream::once(async move {
            let paths = keys.into_iter().map(|key| Ok(Path::from(key)));
            let locations = stream::iter(paths).boxed();
            store
                .delete_stream(locations)
                .filter_map(|result| async move {
                    result.err().map(|e| DeleteError {
                        object_name: match &e {
                            ObjectStoreError::NotFound { path, .. } => Some(path.clone()),
                            _ => None,
                        },
                        message: e.to_string(),
                    })
                })
                .collect::<Vec<_>>()
                .await
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> RemoteResult<String> {
        let store = self.store_for(bucket)?;
        let url_result: ObjectResult<_> = store
            .signed_url(Method::GET, &Path::from(key), expires_in)
            .await;

        url_result
            .map(|url| url.to_string())
            .map_err(|e| RemoteError::Request(e.to_string()))
    }
}
