use crate::domain::payment::{PaymentRecord, PaymentState};
use crate::domain::ports::PaymentLedger;
use crate::error::CoreError;
use anyhow::anyhow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentRecordsRepo {
    pub pool: PgPool,
}

fn row_to_record(r: sqlx::postgres::PgRow) -> Result<PaymentRecord, CoreError> {
    let state_text: String = r.get("state");
    let state = PaymentState::parse(&state_text)
        .ok_or_else(|| CoreError::Internal(anyhow!("unknown payment state in row: {state_text}")))?;
    Ok(PaymentRecord {
        shipment_id: r.get("shipment_id"),
        total_amount: r.get("total_amount"),
        deposit_amount: r.get("deposit_amount"),
        final_amount: r.get("final_amount"),
        currency: r.get("currency"),
        deposit_intent_id: r.get("deposit_intent_id"),
        deposit_status: r.get("deposit_status"),
        final_intent_id: r.get("final_intent_id"),
        final_status: r.get("final_status"),
        refunded_amount: r.get("refunded_amount"),
        state,
        version: r.get("version"),
        last_event_id: r.get("last_event_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl PaymentLedger for PaymentRecordsRepo {
    async fn find(&self, shipment_id: Uuid) -> Result<Option<PaymentRecord>, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT shipment_id, total_amount, deposit_amount, final_amount, currency,
                   deposit_intent_id, deposit_status, final_intent_id, final_status,
                   refunded_amount, state, version, last_event_id, created_at, updated_at
            FROM payment_records
            WHERE shipment_id = $1
            "#,
        )
        .bind(shipment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    async fn insert(&self, record: &PaymentRecord) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_records (
                shipment_id, total_amount, deposit_amount, final_amount, currency,
                deposit_intent_id, deposit_status, final_intent_id, final_status,
                refunded_amount, state, version, last_event_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now(), now())
            ON CONFLICT (shipment_id) DO NOTHING
            "#,
        )
        .bind(record.shipment_id)
        .bind(record.total_amount)
        .bind(record.deposit_amount)
        .bind(record.final_amount)
        .bind(record.currency.clone())
        .bind(record.deposit_intent_id.clone())
        .bind(record.deposit_status.clone())
        .bind(record.final_intent_id.clone())
        .bind(record.final_status.clone())
        .bind(record.refunded_amount)
        .bind(record.state.as_str())
        .bind(record.version)
        .bind(record.last_event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, record: &PaymentRecord, expected_version: i32) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                deposit_intent_id = $2,
                deposit_status = $3,
                final_intent_id = $4,
                final_status = $5,
                refunded_amount = $6,
                state = $7,
                last_event_id = $8,
                version = version + 1,
                updated_at = now()
            WHERE shipment_id = $1 AND version = $9
            "#,
        )
        .bind(record.shipment_id)
        .bind(record.deposit_intent_id.clone())
        .bind(record.deposit_status.clone())
        .bind(record.final_intent_id.clone())
        .bind(record.final_status.clone())
        .bind(record.refunded_amount)
        .bind(record.state.as_str())
        .bind(record.last_event_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
