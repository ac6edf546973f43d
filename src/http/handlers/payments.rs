use crate::domain::quote::QuoteInput;
use crate::error::CoreError;
use crate::pricing::calculator::calculate_quote;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

fn fail(e: CoreError) -> Response {
    (e.status(), Json(e.envelope())).into_response()
}

/// Books the deposit for a shipment. The quote is re-priced server-side from
/// the same inputs as `POST /quotes`; clients never submit totals.
pub async fn create_deposit(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    Json(input): Json<QuoteInput>,
) -> impl IntoResponse {
    let cfg = match state.config_store.get_active().await {
        Ok(cfg) => cfg,
        Err(e) => return fail(e),
    };
    let quote = match calculate_quote(&input, &cfg) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    match state.coordinator.create_deposit(shipment_id, &quote).await {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub payment_method_ref: String,
}

pub async fn confirm_deposit(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> impl IntoResponse {
    match state
        .coordinator
        .confirm_deposit(shipment_id, &req.payment_method_ref)
        .await
    {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}

pub async fn create_final_charge(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.coordinator.create_final_charge(shipment_id).await {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}

pub async fn confirm_final(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> impl IntoResponse {
    match state
        .coordinator
        .confirm_final(shipment_id, &req.payment_method_ref)
        .await
    {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.coordinator.cancel_payment(shipment_id).await {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.ledger.find(shipment_id).await {
        Ok(Some(record)) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Ok(None) => fail(CoreError::not_found(format!(
            "no payment record for shipment {shipment_id}"
        ))),
        Err(e) => fail(e),
    }
}

pub async fn refund_eligibility(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.coordinator.refund_eligibility(shipment_id).await {
        Ok(eligibility) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({
                "eligible": eligibility.eligible,
                "max_refundable_cents": eligibility.max_refundable_cents,
                "reason_code": eligibility.reason_code,
            })),
        )
            .into_response(),
        Err(e) => fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount_cents: i64,
    pub reason: String,
}

pub async fn process_refund(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    Json(req): Json<RefundRequest>,
) -> impl IntoResponse {
    match state
        .coordinator
        .process_refund(shipment_id, req.amount_cents, &req.reason)
        .await
    {
        Ok(record) => (axum::http::StatusCode::OK, Json(record)).into_response(),
        Err(e) => fail(e),
    }
}
