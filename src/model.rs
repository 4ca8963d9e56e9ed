use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One feed entry, normalized. Missing summary/content are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub content: String,
}

impl Article {
    /// Renders the per-article prompt block.
    pub fn fragment(&self) -> String {
        format!(
            "URL: {}\nTitle: {}\nSummary: {}\nContent: {}\n",
            self.url, self.title, self.summary, self.content
        )
    }
}

/// Articles gathered by one fetch step, in folder then feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub articles: Vec<Article>,
}

impl FetchResult {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.articles.iter().map(|a| a.url.clone()).collect()
    }

    pub fn fragments(&self) -> Vec<String> {
        self.articles.iter().map(Article::fragment).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub user_id: String,
    pub feedly: FeedlySettings,
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub google: EmailSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedlySettings {
    pub user: String,
    pub access_token: String,
    #[serde(default)]
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiSettings {
    pub api_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    #[serde(default)]
    pub email_username: String,
    #[serde(default)]
    pub email_password: String,
    #[serde(default)]
    pub email_recipient: String,
}

impl EmailSettings {
    pub fn recipient(&self) -> &str {
        if self.email_recipient.trim().is_empty() {
            &self.email_username
        } else {
            &self.email_recipient
        }
    }
}

impl UserConfig {
    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.feedly.access_token = mask(&out.feedly.access_token);
        out.openai.api_key = mask(&out.openai.api_key);
        out.google.email_password = mask(&out.google.email_password);
        out
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    pub id: String,
    pub user_id: String,
    pub insights: String,
    pub urls: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub user_id: String,
    pub insight_ids: Vec<String>,
    pub post: String,
    pub image: String,
    pub urls: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "InsightRequest::default_days")]
    pub days: u32,
    #[serde(default)]
    pub email: bool,
}

impl InsightRequest {
    pub fn default_days() -> u32 {
        1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "PostRequest::default_days")]
    pub days: u32,
    #[serde(default)]
    pub insight_ids: Vec<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub post_prompt: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
}

impl PostRequest {
    pub fn default_days() -> u32 {
        2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightOutcome {
    pub id: String,
    pub insights: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub id: String,
    pub post: String,
    pub urls: Vec<String>,
    pub image: String,
}
