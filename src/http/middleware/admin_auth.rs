use crate::error::{ErrorEnvelope, ErrorPayload};
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const INTERNAL_API_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Guards pricing-config mutations. Internal callers present the shared key
/// in `X-Internal-Api-Key`; everyone else gets the standard error envelope.
pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if provided != expected {
        let envelope = ErrorEnvelope {
            error: ErrorPayload {
                code: "UNAUTHORIZED".to_string(),
                message: "missing or invalid internal API key".to_string(),
                details: None,
            },
        };
        return (StatusCode::UNAUTHORIZED, Json(envelope)).into_response();
    }

    next.run(request).await
}
