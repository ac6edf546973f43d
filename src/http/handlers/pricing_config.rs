use crate::pricing::config::PricingConfigPatch;
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

pub async fn get_pricing_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.config_store.get_active().await {
        Ok(cfg) => (axum::http::StatusCode::OK, Json(cfg)).into_response(),
        Err(e) => (e.status(), Json(e.envelope())).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePricingConfigRequest {
    #[serde(flatten)]
    pub patch: PricingConfigPatch,
    pub reason: String,
}

pub async fn update_pricing_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdatePricingConfigRequest>,
) -> impl IntoResponse {
    let actor = headers
        .get("X-Actor")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("internal");
    match state
        .config_store
        .update(req.patch, &req.reason, actor)
        .await
    {
        Ok(cfg) => {
            tracing::info!(actor, reason = %req.reason, "pricing config updated");
            (axum::http::StatusCode::OK, Json(cfg)).into_response()
        }
        Err(e) => (e.status(), Json(e.envelope())).into_response(),
    }
}

pub async fn get_pricing_config_history(State(state): State<AppState>) -> impl IntoResponse {
    match state.config_store.history().await {
        Ok(history) => (axum::http::StatusCode::OK, Json(history)).into_response(),
        Err(e) => (e.status(), Json(e.envelope())).into_response(),
    }
}
