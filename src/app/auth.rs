use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};

use super::AppState;
use super::routes::ApiError;
use crate::error::PipelineError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `x-api-key` does not match the configured key.
/// Passes everything through when no key is configured.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    match presented {
        Some(key) if keys_match(key, expected) => next.run(req).await,
        _ => {
            tracing::warn!(
                path = %req.uri().path(),
                "rejected request with missing or wrong api key"
            );
            ApiError::from(PipelineError::Unauthorized).into_response()
        }
    }
}

/// Comparison time does not depend on where the keys first differ.
fn keys_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::keys_match;

    #[test]
    fn keys_match_requires_exact_equality() {
        assert!(keys_match("secret", "secret"));
        assert!(!keys_match("secret", "secreT"));
        assert!(!keys_match("secret", "secret2"));
        assert!(!keys_match("", "secret"));
    }
}
