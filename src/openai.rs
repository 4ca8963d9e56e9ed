use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::llm::{Completer, ImageGenerator};

const IMAGE_PROMPT_MAX_CHARS: usize = 4000;

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

pub fn images_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/images/generations")
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    image_model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            image_model: image_model.into(),
            temperature: 0.2,
        })
    }
}

#[async_trait]
impl Completer for OpenAiClient {
    async fn complete(
        &self,
        api_key: &str,
        instructions: &str,
        input: &str,
    ) -> anyhow::Result<String> {
        tracing::debug!(model = %self.model, input_chars = input.len(), "openai completion");
        responses_text(
            &self.client,
            &responses_endpoint(&self.base_url),
            api_key,
            &self.model,
            instructions,
            input,
            self.temperature,
        )
        .await
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(model = %self.image_model, "openai image generation");
        images_url(
            &self.client,
            &images_endpoint(&self.base_url),
            api_key,
            &self.image_model,
            prompt,
        )
        .await
    }
}

pub async fn responses_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    instructions: &str,
    input: &str,
    temperature: f32,
) -> anyhow::Result<String> {
    let mut body = serde_json::json!({
        "model": model,
        "instructions": instructions,
        "input": input,
        "text": { "format": { "type": "text" } },
        "store": false,
    });

    // GPT-5 family models reject sampling params like `temperature`.
    if !model.starts_with("gpt-5")
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("temperature".to_owned(), serde_json::json!(temperature));
    }

    let value = post_json(client, endpoint, api_key, &body).await?;
    extract_output_text(&value).context("extract output text")
}

pub async fn images_url(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> anyhow::Result<String> {
    let prompt: String = prompt.chars().take(IMAGE_PROMPT_MAX_CHARS).collect();
    let body = serde_json::json!({
        "model": model,
        "prompt": prompt,
        "n": 1,
        "size": "1024x1024",
    });

    let value = post_json(client, endpoint, api_key, &body).await?;
    value
        .pointer("/data/0/url")
        .and_then(|v| v.as_str())
        .filter(|url| !url.trim().is_empty())
        .map(str::to_owned)
        .ok_or_else(|| anyhow::anyhow!("missing `data[0].url` in image response"))
}

async fn post_json(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read OpenAI response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("OpenAI API error ({status}): {message}");
    }

    serde_json::from_str(&raw).context("parse OpenAI response")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `output` array in response"))?;

    let text = output
        .iter()
        .filter(|item| item.get("type").and_then(|v| v.as_str()) == Some("message"))
        .filter_map(|item| item.get("content").and_then(|v| v.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|v| v.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect::<String>();

    if text.trim().is_empty() {
        anyhow::bail!("OpenAI output text is empty");
    }
    Ok(text)
}
