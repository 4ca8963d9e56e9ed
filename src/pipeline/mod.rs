//! Insight and post generation for one user request.
//!
//! Each call builds its own state; nothing is shared between requests except
//! the injected collaborators.

mod insight;
mod post;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::error::PipelineError;
use crate::feed::{FeedSource, FeedlyClient};
use crate::llm::{Completer, ImageGenerator};
use crate::mail::{Mailer, SmtpMailer};
use crate::model::UserConfig;
use crate::openai::OpenAiClient;
use crate::store::DocumentStore;
use crate::tokens::{Cl100k, TokenEstimator};

#[derive(Clone)]
pub struct Pipelines {
    store: Arc<dyn DocumentStore>,
    feed: Arc<dyn FeedSource>,
    completer: Arc<dyn Completer>,
    images: Arc<dyn ImageGenerator>,
    mailer: Arc<dyn Mailer>,
    estimator: Arc<dyn TokenEstimator>,
    max_tokens: usize,
}

impl Pipelines {
    /// Batches are sized with exact `cl100k_base` token counts unless
    /// another estimator is supplied via [`Pipelines::with_estimator`].
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feed: Arc<dyn FeedSource>,
        completer: Arc<dyn Completer>,
        images: Arc<dyn ImageGenerator>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            feed,
            completer,
            images,
            mailer,
            estimator: Arc::new(Cl100k::new()?),
            max_tokens: Settings::default_max_tokens(),
        })
    }

    /// Wires the Feedly, OpenAI and SMTP clients described by `settings`.
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn DocumentStore>,
    ) -> anyhow::Result<Self> {
        let openai = Arc::new(OpenAiClient::new(
            settings.openai_base_url.clone(),
            settings.openai_model.clone(),
            settings.image_model.clone(),
        )?);
        let feed = Arc::new(FeedlyClient::new(settings.feed_api_url.clone())?);
        let mailer = Arc::new(SmtpMailer::new(settings.smtp_host.clone(), settings.smtp_port));
        let pipelines = Self::new(store, feed, openai.clone(), openai, mailer)?;
        Ok(pipelines.with_max_tokens(settings.max_tokens))
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn load_config(&self, user_id: &str) -> Result<UserConfig, PipelineError> {
        self.store
            .get_config(user_id)
            .await
            .map_err(PipelineError::upstream("config lookup"))?
            .ok_or_else(|| PipelineError::ConfigNotFound {
                user_id: user_id.to_owned(),
            })
    }
}

fn require_user_id(user_id: &str) -> Result<&str, PipelineError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(PipelineError::InvalidRequest("userId is required".to_owned()));
    }
    Ok(user_id)
}

/// Start of the lookback window ending now.
fn lookback(days: u32) -> Result<DateTime<Utc>, PipelineError> {
    if days == 0 {
        return Err(PipelineError::InvalidRequest("days must be >= 1".to_owned()));
    }
    chrono::Duration::try_days(i64::from(days))
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| PipelineError::InvalidRequest(format!("days is out of range: {days}")))
}

fn log_failure(user_id: &str, operation: &str, err: &PipelineError) {
    match err {
        PipelineError::NoArticlesFound | PipelineError::ConfigNotFound { .. } => {
            tracing::info!(user_id, operation, code = err.code(), "{err}");
        }
        PipelineError::InvalidRequest(_) => {
            tracing::warn!(user_id, operation, code = err.code(), "{err}");
        }
        _ => {
            tracing::error!(user_id, operation, code = err.code(), ?err, "pipeline failed");
        }
    }
}
