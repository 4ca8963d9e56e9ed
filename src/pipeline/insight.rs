use chrono::Utc;

use super::{Pipelines, log_failure, lookback, require_user_id};
use crate::aggregate::aggregate;
use crate::batch;
use crate::error::PipelineError;
use crate::feed;
use crate::mail;
use crate::model::{InsightOutcome, InsightRecord, InsightRequest, UserConfig};
use crate::prompts;

impl Pipelines {
    /// Fetches every configured folder, condenses the articles into one
    /// insight narrative, persists it and optionally emails it.
    pub async fn generate_insights(
        &self,
        request: &InsightRequest,
    ) -> Result<InsightOutcome, PipelineError> {
        let result = self.run_insights(request).await;
        if let Err(err) = &result {
            log_failure(&request.user_id, "insights", err);
        }
        result
    }

    async fn run_insights(
        &self,
        request: &InsightRequest,
    ) -> Result<InsightOutcome, PipelineError> {
        let user_id = require_user_id(&request.user_id)?;
        let newer_than = lookback(request.days)?;
        let config = self.load_config(user_id).await?;

        let fetched = feed::fetch_folders(
            self.feed.as_ref(),
            &config.feedly,
            &config.feedly.folders,
            newer_than,
        )
        .await
        .map_err(PipelineError::upstream("feed fetch"))?;
        if fetched.is_empty() {
            return Err(PipelineError::NoArticlesFound);
        }

        let preamble = prompts::insight_preamble(fetched.len());
        let batches = batch::pack(
            &preamble,
            &fetched.fragments(),
            self.max_tokens,
            self.estimator.as_ref(),
        );
        tracing::info!(
            user_id,
            articles = fetched.len(),
            batches = batches.len(),
            max_tokens = self.max_tokens,
            "generating insights"
        );

        let insights = aggregate(
            self.completer.as_ref(),
            &config.openai.api_key,
            prompts::INSIGHT_ROLE,
            &batches,
        )
        .await
        .map_err(PipelineError::upstream("completion"))?;

        let record = InsightRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            insights,
            urls: fetched.urls(),
            timestamp: Utc::now(),
        };
        self.store
            .put_insight(&record)
            .await
            .map_err(PipelineError::InsightPersistFailed)?;
        tracing::info!(user_id, insight_id = %record.id, "insight persisted");

        if request.email {
            self.email_insights(&config, &record).await;
        }

        Ok(InsightOutcome {
            id: record.id,
            insights: record.insights,
            urls: record.urls,
        })
    }

    /// Best effort: failures are logged and never fail the run.
    async fn email_insights(&self, config: &UserConfig, record: &InsightRecord) {
        if config.google.email_username.trim().is_empty() {
            tracing::warn!(
                user_id = %config.user_id,
                "email requested but no mailbox is configured; skipping"
            );
            return;
        }

        let body = mail::insight_body(&record.urls, &record.insights);
        match self
            .mailer
            .send(&config.google, prompts::EMAIL_SUBJECT, &body)
            .await
        {
            Ok(()) => tracing::info!(user_id = %config.user_id, "insights emailed"),
            Err(err) => tracing::warn!(
                user_id = %config.user_id,
                stage = "email",
                ?err,
                "email delivery failed; continuing"
            ),
        }
    }
}
