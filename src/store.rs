use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::model::{InsightRecord, PostRecord, UserConfig};

const CONFIG_COLLECTION: &str = "config";
const INSIGHT_COLLECTION: &str = "insight";
const POST_COLLECTION: &str = "linkedin_post";

/// Persistence for user configs and generated records.
///
/// Writes are all-or-nothing: a failed `put_*` leaves no readable document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_config(&self, user_id: &str) -> anyhow::Result<Option<UserConfig>>;
    async fn put_config(&self, config: &UserConfig) -> anyhow::Result<()>;
    async fn get_insight(&self, id: &str) -> anyhow::Result<Option<InsightRecord>>;
    async fn put_insight(&self, record: &InsightRecord) -> anyhow::Result<()>;
    async fn get_post(&self, id: &str) -> anyhow::Result<Option<PostRecord>>;
    async fn put_post(&self, record: &PostRecord) -> anyhow::Result<()>;
}

/// One JSON file per document under `<base_dir>/<collection>/<key>.json`.
#[derive(Debug, Clone)]
pub struct LocalFsDocumentStore {
    base_dir: PathBuf,
}

impl LocalFsDocumentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `None` when `key` cannot name a document.
    fn document_path(&self, collection: &str, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.base_dir.join(collection).join(format!("{key}.json")))
    }

    fn writable_path(&self, collection: &str, key: &str) -> anyhow::Result<PathBuf> {
        self.document_path(collection, key)
            .ok_or_else(|| anyhow::anyhow!("invalid document key: {key:?}"))
    }
}

#[async_trait]
impl DocumentStore for LocalFsDocumentStore {
    async fn get_config(&self, user_id: &str) -> anyhow::Result<Option<UserConfig>> {
        let Some(path) = self.document_path(CONFIG_COLLECTION, user_id) else {
            return Ok(None);
        };
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn put_config(&self, config: &UserConfig) -> anyhow::Result<()> {
        let path = self.writable_path(CONFIG_COLLECTION, &config.user_id)?;
        write_json_atomic(&path, config)
            .await
            .context("write config document")
    }

    async fn get_insight(&self, id: &str) -> anyhow::Result<Option<InsightRecord>> {
        let Some(path) = self.document_path(INSIGHT_COLLECTION, id) else {
            return Ok(None);
        };
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn put_insight(&self, record: &InsightRecord) -> anyhow::Result<()> {
        let path = self.writable_path(INSIGHT_COLLECTION, &record.id)?;
        write_json_atomic(&path, record)
            .await
            .context("write insight document")
    }

    async fn get_post(&self, id: &str) -> anyhow::Result<Option<PostRecord>> {
        let Some(path) = self.document_path(POST_COLLECTION, id) else {
            return Ok(None);
        };
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn put_post(&self, record: &PostRecord) -> anyhow::Result<()> {
        let path = self.writable_path(POST_COLLECTION, &record.id)?;
        write_json_atomic(&path, record)
            .await
            .context("write post document")
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
    }
    Ok(())
}
