use chrono::Utc;

use super::{Pipelines, log_failure, lookback, require_user_id};
use crate::error::PipelineError;
use crate::feed;
use crate::model::{InsightRecord, PostOutcome, PostRecord, PostRequest, UserConfig};
use crate::prompts;

/// Material a post is written from.
#[derive(Debug)]
struct PostSource {
    text: String,
    urls: Vec<String>,
    count: usize,
    insight_ids: Vec<String>,
    from_insights: bool,
}

impl Pipelines {
    /// Writes one post from stored insights (when `insight_ids` is set) or
    /// from fresh articles of the first folder, then illustrates and persists
    /// it. The prompt is sent in a single call and never batched.
    pub async fn generate_post(&self, request: &PostRequest) -> Result<PostOutcome, PipelineError> {
        let result = self.run_post(request).await;
        if let Err(err) = &result {
            log_failure(&request.user_id, "post", err);
        }
        result
    }

    async fn run_post(&self, request: &PostRequest) -> Result<PostOutcome, PipelineError> {
        let user_id = require_user_id(&request.user_id)?;
        let newer_than = lookback(request.days)?;
        let config = self.load_config(user_id).await?;

        let source = if request.insight_ids.is_empty() {
            self.fresh_source(&config, newer_than).await?
        } else {
            self.reuse_source(user_id, &request.insight_ids).await?
        };

        let prompt = prompts::post_prompt(
            &source.text,
            source.count,
            source.from_insights,
            request.post_prompt.as_deref(),
        );
        let role = request
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(prompts::POST_ROLE);
        tracing::info!(
            user_id,
            sources = source.count,
            from_insights = source.from_insights,
            "generating post"
        );

        let api_key = &config.openai.api_key;
        let post = self
            .completer
            .complete(api_key, role, &prompt)
            .await
            .map_err(PipelineError::upstream("completion"))?;
        let image = self
            .images
            .generate_image(
                api_key,
                &prompts::image_prompt(request.image_prompt.as_deref(), &post),
            )
            .await
            .map_err(PipelineError::upstream("image generation"))?;

        let record = PostRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            insight_ids: source.insight_ids,
            post,
            image,
            urls: source.urls,
            timestamp: Utc::now(),
        };
        self.store
            .put_post(&record)
            .await
            .map_err(PipelineError::PostPersistFailed)?;
        tracing::info!(user_id, post_id = %record.id, "post persisted");

        Ok(PostOutcome {
            id: record.id,
            post: record.post,
            urls: record.urls,
            image: record.image,
        })
    }

    async fn fresh_source(
        &self,
        config: &UserConfig,
        newer_than: chrono::DateTime<Utc>,
    ) -> Result<PostSource, PipelineError> {
        let Some(folder) = config.feedly.folders.first() else {
            return Err(PipelineError::NoArticlesFound);
        };
        let fetched = feed::fetch_folders(
            self.feed.as_ref(),
            &config.feedly,
            std::slice::from_ref(folder),
            newer_than,
        )
        .await
        .map_err(PipelineError::upstream("feed fetch"))?;
        if fetched.is_empty() {
            return Err(PipelineError::NoArticlesFound);
        }

        Ok(PostSource {
            text: fetched.fragments().concat(),
            urls: fetched.urls(),
            count: fetched.len(),
            insight_ids: Vec::new(),
            from_insights: false,
        })
    }

    /// Unknown or foreign ids are skipped.
    async fn reuse_source(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<PostSource, PipelineError> {
        let mut found: Vec<InsightRecord> = Vec::new();
        for id in ids {
            let id = id.trim();
            let record = self
                .store
                .get_insight(id)
                .await
                .map_err(PipelineError::upstream("insight lookup"))?;
            match record {
                Some(record) if record.user_id == user_id => found.push(record),
                Some(_) => {
                    tracing::warn!(
                        user_id,
                        insight_id = id,
                        "insight belongs to another user; skipping"
                    );
                }
                None => {
                    tracing::warn!(user_id, insight_id = id, "insight not found; skipping");
                }
            }
        }
        if found.is_empty() {
            return Err(PipelineError::NoArticlesFound);
        }

        let text = found
            .iter()
            .map(|record| {
                format!(
                    "Insight:\n{}\nURLs:\n{}\n\n",
                    record.insights,
                    record.urls.join("\n")
                )
            })
            .collect::<String>();
        Ok(PostSource {
            text,
            urls: found.iter().flat_map(|r| r.urls.iter().cloned()).collect(),
            count: found.len(),
            insight_ids: found.into_iter().map(|r| r.id).collect(),
            from_insights: true,
        })
    }
}
