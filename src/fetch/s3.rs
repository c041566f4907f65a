//! `s3://` sources.
//!
//! `s3://bucket/path/to/helmfile.yaml` reads one object with the default AWS
//! credential chain. Optional query parameters:
//! - `region`: bucket region, overriding the environment
//! - `version`: object version id

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use url::Url;

use super::{take_query_param, FetchError, Getter, Request};

/// Bucket and key addressed by an S3 source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
    pub region: Option<String>,
    pub version: Option<String>,
}

impl S3Location {
    /// Split an `s3://` URL into its parts.
    pub fn parse(source: &Url) -> Result<Self, FetchError> {
        let mut url = source.clone();
        let region = take_query_param(&mut url, "region");
        let version = take_query_param(&mut url, "version");

        let invalid = |message: &str| FetchError::InvalidSource {
            url: source.to_string(),
            message: message.to_string(),
        };

        let bucket = url.host_str().unwrap_or_default().to_string();
        let key = urlencoding::decode(url.path().trim_start_matches('/'))
            .map_err(|_| invalid("object key is not valid UTF-8"))?
            .into_owned();

        if bucket.is_empty() || key.is_empty() {
            return Err(invalid("expected s3://<bucket>/<key>"));
        }

        Ok(Self {
            bucket,
            key,
            region,
            version,
        })
    }
}

/// Reads objects with the AWS SDK.
#[derive(Debug, Clone, Default)]
pub struct S3Getter;

impl S3Getter {
    /// Create a new S3 getter
    pub fn new() -> Self {
        Self
    }

    async fn create_client(region: Option<&str>) -> Client {
        let config = if let Some(region_str) = region {
            aws_config::defaults(BehaviorVersion::latest())
                .region(aws_sdk_s3::config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::defaults(BehaviorVersion::latest())
                .load()
                .await
        };

        Client::new(&config)
    }
}

#[async_trait]
impl Getter for S3Getter {
    async fn get_file(&self, request: &Request) -> Result<(), FetchError> {
        let location = S3Location::parse(&request.source)?;
        let s3_error = |message: String| FetchError::S3 {
            url: request.source.to_string(),
            message,
        };

        let client = Self::create_client(location.region.as_deref()).await;
        let object = client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .set_version_id(location.version.clone())
            .send()
            .await
            .map_err(|e| s3_error(DisplayErrorContext(e).to_string()))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| s3_error(e.to_string()))?
            .into_bytes();

        tokio::fs::write(&request.destination, &body)
            .await
            .map_err(|e| FetchError::io(&request.destination, e))?;

        Ok(())
    }
}
