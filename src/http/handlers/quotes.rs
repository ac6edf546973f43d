use crate::domain::quote::QuoteInput;
use crate::pricing::calculator::calculate_quote;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_quote(
    State(state): State<AppState>,
    Json(input): Json<QuoteInput>,
) -> impl IntoResponse {
    let cfg = match state.config_store.get_active().await {
        Ok(cfg) => cfg,
        Err(e) => return (e.status(), Json(e.envelope())).into_response(),
    };
    match calculate_quote(&input, &cfg) {
        Ok(quote) => (axum::http::StatusCode::OK, Json(quote)).into_response(),
        Err(e) => (e.status(), Json(e.envelope())).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
