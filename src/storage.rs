use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    types::ObjectCannedAcl,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::S3Config;

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Uploads a publicly readable object and returns its URL.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
}

impl Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        // Custom endpoints (MinIO and friends) only speak path-style addressing.
        let conf = S3ConfigBuilder::from(&shared)
            .force_path_style(cfg.endpoint.is_some())
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            endpoint: cfg.endpoint.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(public_url(&self.bucket, self.endpoint.as_deref(), key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

pub fn public_url(bucket: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(ep) => format!("{}/{}/{}", ep.trim_end_matches('/'), bucket, key),
        None => format!("https://{bucket}.s3.amazonaws.com/{key}"),
    }
}

/// `posts/<unix-millis>-<uuid>.<ext>`
pub fn image_key(content_type: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("posts/{}-{}.{}", millis, Uuid::new_v4(), ext)
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
