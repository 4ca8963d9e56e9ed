use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no config found for user {user_id}")]
    ConfigNotFound { user_id: String },

    #[error("no articles found")]
    NoArticlesFound,

    #[error("persist insight")]
    InsightPersistFailed(#[source] anyhow::Error),

    #[error("persist post")]
    PostPersistFailed(#[source] anyhow::Error),

    #[error("{stage} failed")]
    UpstreamCallFailed {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl PipelineError {
    pub fn upstream(stage: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::UpstreamCallFailed { stage, source }
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid-request",
            Self::ConfigNotFound { .. } => "no-config-found",
            Self::NoArticlesFound => "no-articles-found",
            Self::InsightPersistFailed(_) => "insights-failed",
            Self::PostPersistFailed(_) => "post-failed",
            Self::UpstreamCallFailed { .. } => "upstream-failed",
            Self::Unauthorized => "unauthorized",
            Self::DeadlineExceeded => "deadline-exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_stage_and_source() {
        let err = PipelineError::upstream("completion")(anyhow::anyhow!("503 from model"));
        assert_eq!(err.code(), "upstream-failed");
        assert_eq!(err.to_string(), "completion failed");
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(source, "503 from model");
    }
}
