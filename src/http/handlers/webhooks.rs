use crate::service::reconciler::ReconcileOutcome;
use crate::webhook::event::parse_event;
use crate::webhook::signature::verify_signature;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

pub const SIGNATURE_HEADER: &str = "Gateway-Signature";

/// Webhook intake: verify the signature over the raw body, parse, hand to
/// the reconciler. Stale and dropped events still answer 200 so the gateway
/// stops redelivering them; only signature and parse failures are client
/// errors.
pub async fn receive_payment_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if let Err(e) = verify_signature(&body, signature, &state.webhook_secret) {
        return (e.status(), Json(e.envelope())).into_response();
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => return (e.status(), Json(e.envelope())).into_response(),
    };

    match state.reconciler.apply(&event).await {
        Ok(outcome) => {
            let received = match outcome {
                ReconcileOutcome::Applied => "applied",
                ReconcileOutcome::Stale => "stale",
                ReconcileOutcome::Dropped => "dropped",
                ReconcileOutcome::UnknownShipment => "unknown_shipment",
            };
            (
                axum::http::StatusCode::OK,
                Json(serde_json::json!({ "received": received })),
            )
                .into_response()
        }
        Err(e) => {
            // Redelivery is safe; the event is idempotent by construction.
            tracing::error!(event_id = event.id, error = %e, "webhook processing failed");
            (e.status(), Json(e.envelope())).into_response()
        }
    }
}
