use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Article, FeedlySettings, FetchResult};

/// Maximum entries requested per folder.
pub const FOLDER_PAGE_SIZE: usize = 20;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Articles in `folder` published after `newer_than`, in feed order.
    async fn fetch_folder(
        &self,
        account: &FeedlySettings,
        folder: &str,
        newer_than: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Article>>;
}

/// Fetches `folders` one after another and keeps folder order.
pub async fn fetch_folders(
    source: &dyn FeedSource,
    account: &FeedlySettings,
    folders: &[String],
    newer_than: DateTime<Utc>,
) -> anyhow::Result<FetchResult> {
    let mut articles = Vec::new();
    for folder in folders {
        let found = source
            .fetch_folder(account, folder, newer_than)
            .await
            .with_context(|| format!("fetch folder {folder}"))?;
        tracing::info!(folder = %folder, articles = found.len(), "fetched folder");
        articles.extend(found);
    }
    Ok(FetchResult { articles })
}

#[derive(Debug, Clone)]
pub struct FeedlyClient {
    client: reqwest::Client,
    base_url: String,
}

impl FeedlyClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build http client")?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    fn stream_ids_url(
        &self,
        account: &FeedlySettings,
        folder: &str,
        newer_than: DateTime<Utc>,
    ) -> anyhow::Result<url::Url> {
        let stream_id = format!("user/{}/category/{folder}", account.user);
        url::Url::parse_with_params(
            &format!("{}/v3/streams/ids", self.base_url),
            &[
                ("streamId", stream_id),
                ("newerThan", newer_than.timestamp_millis().to_string()),
                ("count", FOLDER_PAGE_SIZE.to_string()),
            ],
        )
        .with_context(|| format!("build stream ids url for folder {folder}"))
    }
}

#[async_trait]
impl FeedSource for FeedlyClient {
    async fn fetch_folder(
        &self,
        account: &FeedlySettings,
        folder: &str,
        newer_than: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Article>> {
        let auth = format!("OAuth {}", account.access_token);

        let ids_url = self.stream_ids_url(account, folder, newer_than)?;
        let response = self
            .client
            .get(ids_url.clone())
            .header(reqwest::header::AUTHORIZATION, &auth)
            .send()
            .await
            .with_context(|| format!("GET {ids_url}"))?;
        let ids: StreamIds = read_json(response).await.context("read stream ids")?;
        if ids.ids.is_empty() {
            return Ok(Vec::new());
        }

        let entries_url = format!("{}/v3/entries/.mget", self.base_url);
        let response = self
            .client
            .post(&entries_url)
            .header(reqwest::header::AUTHORIZATION, &auth)
            .json(&ids.ids)
            .send()
            .await
            .with_context(|| format!("POST {entries_url}"))?;
        let entries: Vec<Entry> = read_json(response).await.context("read entries")?;

        Ok(entries.into_iter().map(Entry::into_article).collect())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> anyhow::Result<T> {
    let status = response.status();
    let raw = response.text().await.context("read response body")?;
    if !status.is_success() {
        anyhow::bail!("Feedly API error ({status}): {raw}");
    }
    serde_json::from_str(&raw).context("parse json")
}

#[derive(Debug, Deserialize)]
struct StreamIds {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    #[serde(default)]
    origin_id: Option<String>,
    #[serde(default)]
    canonical_url: Option<String>,
    #[serde(default)]
    alternate: Vec<Link>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<TextContent>,
    #[serde(default)]
    content: Option<TextContent>,
    #[serde(default)]
    full_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    #[serde(default)]
    content: String,
}

impl Entry {
    fn into_article(self) -> Article {
        let url = self
            .alternate
            .into_iter()
            .next()
            .map(|link| link.href)
            .or(self.canonical_url)
            .or(self.origin_id)
            .unwrap_or_default();
        let content = self
            .full_content
            .or_else(|| self.content.map(|c| c.content))
            .unwrap_or_default();
        Article {
            url,
            title: self.title.unwrap_or_default(),
            summary: self.summary.map(|s| s.content).unwrap_or_default(),
            content,
        }
    }
}
