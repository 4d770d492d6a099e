use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::S3Config;

pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Blob storage for uploaded images. Keys are opaque, `/`-separated paths.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    /// `None` when nothing is stored under `key`.
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>>;
}

// ---- S3 / MinIO ----

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>> {
        let out = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(anyhow::Error::new(e).context("s3 get_object")),
        };

        let content_type = out
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = out
            .body
            .collect()
            .await
            .context("s3 read object body")?
            .into_bytes();
        Ok(Some(StoredObject { body, content_type }))
    }
}

// ---- local directory ----

/// Stores each object as a file under `root`, with its content type in a
/// `.ct` sidecar file.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create {}", root.display()))?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        anyhow::ensure!(
            rel.components().all(|c| matches!(c, Component::Normal(_))),
            "invalid object key {key:?}"
        );
        Ok(self.root.join(rel))
    }
}

fn sidecar(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".ct");
    PathBuf::from(s)
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        tokio::fs::write(sidecar(&path), content_type)
            .await
            .with_context(|| format!("write content type for {}", path.display()))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>> {
        let path = self.object_path(key)?;
        let body = match tokio::fs::read(&path).await {
            Ok(b) => Bytes::from(b),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(anyhow::Error::new(e).context(format!("read {}", path.display()))),
        };
        let content_type = tokio::fs::read_to_string(sidecar(&path))
            .await
            .unwrap_or_else(|_| "application/octet-stream".into());
        Ok(Some(StoredObject { body, content_type }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStorage {
        objects: RwLock<HashMap<String, (Bytes, String)>>,
    }

    #[async_trait]
    impl StorageClient for MemoryStorage {
        async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
            self.objects
                .write()
                .await
                .insert(key.to_string(), (body, content_type.to_string()));
            Ok(())
        }

        async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>> {
            Ok(self
                .objects
                .read()
                .await
                .get(key)
                .map(|(body, ct)| StoredObject {
                    body: body.clone(),
                    content_type: ct.clone(),
                }))
        }
    }
}
