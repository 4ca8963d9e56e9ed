use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use serde::Serialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{AppState, auth};
use crate::error::PipelineError;
use crate::model::{InsightRequest, PostRequest};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/insights", get(generate_insights))
        .route("/insights/post", post(generate_post))
        .route("/insights/:id", get(get_insight))
        .route("/posts/:id", get(get_post))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    NotFound,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "not-found", "record not found".to_owned()),
            Self::Pipeline(err) => (status_for(err), err.code(), err.to_string()),
        };
        let body = json!({
            "status": "Error",
            "message": code,
            "detail": detail,
        });
        (status, Json(body)).into_response()
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PipelineError::Unauthorized => StatusCode::UNAUTHORIZED,
        PipelineError::ConfigNotFound { .. } | PipelineError::NoArticlesFound => {
            StatusCode::NOT_FOUND
        }
        PipelineError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::InsightPersistFailed(_)
        | PipelineError::PostPersistFailed(_)
        | PipelineError::UpstreamCallFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ok(results: impl Serialize) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "results": results,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

async fn generate_insights(
    State(state): State<AppState>,
    query: Result<Query<InsightRequest>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(request) = query.map_err(|err| PipelineError::InvalidRequest(err.body_text()))?;
    let outcome = state
        .run("insights", &request.user_id, state.pipelines.generate_insights(&request))
        .await?;
    Ok(ok(outcome))
}

async fn generate_post(
    State(state): State<AppState>,
    body: Result<Json<PostRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|err| PipelineError::InvalidRequest(err.body_text()))?;
    let outcome = state
        .run("post", &request.user_id, state.pipelines.generate_post(&request))
        .await?;
    Ok(ok(outcome))
}

async fn get_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let record = state
        .pipelines
        .store()
        .get_insight(&id)
        .await
        .map_err(|err| {
            tracing::error!(insight_id = %id, ?err, "insight lookup failed");
            PipelineError::upstream("insight lookup")(err)
        })?
        .ok_or(ApiError::NotFound)?;
    Ok(ok(record))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let record = state
        .pipelines
        .store()
        .get_post(&id)
        .await
        .map_err(|err| {
            tracing::error!(post_id = %id, ?err, "post lookup failed");
            PipelineError::upstream("post lookup")(err)
        })?
        .ok_or(ApiError::NotFound)?;
    Ok(ok(record))
}

fn parse_record_id(raw: &str) -> Result<String, PipelineError> {
    let id = raw.trim();
    uuid::Uuid::parse_str(id)
        .map_err(|err| PipelineError::InvalidRequest(format!("invalid record id: {err}")))?;
    Ok(id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            status_for(&PipelineError::NoArticlesFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&PipelineError::ConfigNotFound {
                user_id: "u".to_owned()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&PipelineError::InsightPersistFailed(anyhow::anyhow!("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&PipelineError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&PipelineError::DeadlineExceeded),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn parse_record_id_requires_uuid() {
        assert!(parse_record_id("not-a-uuid").is_err());
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_record_id(&format!(" {id} ")).unwrap(), id);
    }
}
