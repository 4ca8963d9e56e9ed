use async_trait::async_trait;

/// Text completion: `instructions` is the system role, `input` the prompt body.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, api_key: &str, instructions: &str, input: &str)
    -> anyhow::Result<String>;
}

/// Image generation returning a URL to the produced image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, api_key: &str, prompt: &str) -> anyhow::Result<String>;
}
