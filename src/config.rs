use std::time::Duration;

use anyhow::Context as _;

/// Process-wide settings read from `FEEDSIGHT_*` environment variables.
///
/// Per-user credentials live in the document store, not here.
#[derive(Debug, Clone)]
pub struct Settings {
    pub feed_api_url: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub image_model: String,
    pub max_tokens: usize,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Settings {
    pub fn default_feed_api_url() -> String {
        "https://cloud.feedly.com".to_owned()
    }
    pub fn default_openai_base_url() -> String {
        "https://api.openai.com/v1".to_owned()
    }
    pub fn default_openai_model() -> String {
        "gpt-4o-mini".to_owned()
    }
    pub fn default_image_model() -> String {
        "dall-e-3".to_owned()
    }
    pub fn default_max_tokens() -> usize {
        4092
    }
    pub fn default_request_timeout() -> Duration {
        Duration::from_secs(300)
    }
    pub fn default_smtp_host() -> String {
        "smtp.gmail.com".to_owned()
    }
    pub fn default_smtp_port() -> u16 {
        587
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let max_tokens = match get("FEEDSIGHT_MAX_TOKENS") {
            Some(raw) => parse_positive(&raw)
                .with_context(|| format!("invalid FEEDSIGHT_MAX_TOKENS={raw:?}"))?,
            None => Self::default_max_tokens(),
        };
        let request_timeout = match get("FEEDSIGHT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                parse_positive(&raw)
                    .with_context(|| format!("invalid FEEDSIGHT_REQUEST_TIMEOUT_SECS={raw:?}"))?
                    as u64,
            ),
            None => Self::default_request_timeout(),
        };
        let smtp_port = match get("FEEDSIGHT_SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid FEEDSIGHT_SMTP_PORT={raw:?}"))?,
            None => Self::default_smtp_port(),
        };

        Ok(Self {
            feed_api_url: get("FEEDSIGHT_FEED_API_URL").unwrap_or_else(Self::default_feed_api_url),
            openai_base_url: get("FEEDSIGHT_OPENAI_BASE_URL")
                .unwrap_or_else(Self::default_openai_base_url),
            openai_model: get("FEEDSIGHT_OPENAI_MODEL").unwrap_or_else(Self::default_openai_model),
            image_model: get("FEEDSIGHT_IMAGE_MODEL").unwrap_or_else(Self::default_image_model),
            max_tokens,
            request_timeout,
            api_key: get("FEEDSIGHT_API_KEY"),
            smtp_host: get("FEEDSIGHT_SMTP_HOST").unwrap_or_else(Self::default_smtp_host),
            smtp_port,
        })
    }
}

fn parse_positive(raw: &str) -> anyhow::Result<usize> {
    let value: usize = raw.parse().context("not an unsigned integer")?;
    if value == 0 {
        anyhow::bail!("must be > 0");
    }
    Ok(value)
}
