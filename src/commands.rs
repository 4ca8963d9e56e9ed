use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{ConfigPutArgs, ConfigShowArgs, InsightsArgs, PostArgs};
use crate::config::Settings;
use crate::model::{InsightRequest, PostRequest, UserConfig};
use crate::pipeline::Pipelines;
use crate::store::{DocumentStore, LocalFsDocumentStore};

fn pipelines(data_dir: &str) -> anyhow::Result<Pipelines> {
    let settings = Settings::from_env().context("load settings")?;
    let store: Arc<dyn DocumentStore> = Arc::new(LocalFsDocumentStore::new(data_dir));
    Pipelines::from_settings(&settings, store)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

pub async fn insights(data_dir: &str, args: InsightsArgs) -> anyhow::Result<()> {
    let request = InsightRequest {
        user_id: args.user_id,
        days: args.days,
        email: args.email,
    };
    let outcome = pipelines(data_dir)?.generate_insights(&request).await?;
    print_json(&outcome)
}

pub async fn post(data_dir: &str, args: PostArgs) -> anyhow::Result<()> {
    let request = PostRequest {
        user_id: args.user_id,
        days: args.days,
        insight_ids: args.insight_ids,
        role: args.role,
        post_prompt: args.post_prompt,
        image_prompt: args.image_prompt,
    };
    let outcome = pipelines(data_dir)?.generate_post(&request).await?;
    print_json(&outcome)
}

pub async fn config_put(data_dir: &str, args: ConfigPutArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("read config file: {}", args.file))?;
    let config: UserConfig = serde_json::from_str(&raw).context("parse user config")?;
    if config.user_id.trim().is_empty() {
        anyhow::bail!("userId is required in {}", args.file);
    }

    LocalFsDocumentStore::new(data_dir)
        .put_config(&config)
        .await
        .context("store user config")?;
    tracing::info!(
        user_id = %config.user_id,
        folders = config.feedly.folders.len(),
        "config stored"
    );
    Ok(())
}

pub async fn config_show(data_dir: &str, args: ConfigShowArgs) -> anyhow::Result<()> {
    let config = LocalFsDocumentStore::new(data_dir)
        .get_config(&args.user_id)
        .await
        .context("load user config")?
        .ok_or_else(|| anyhow::anyhow!("no config found for user {}", args.user_id))?;
    print_json(&config.redacted())
}
