use crate::domain::ports::PricingConfigStore;
use crate::error::CoreError;
use crate::pricing::config::{ConfigChange, PricingConfig, PricingConfigPatch};
use anyhow::anyhow;
use sqlx::{PgPool, Row};

const ACTIVE_CONFIG_ID: &str = "active";

#[derive(Clone)]
pub struct PricingConfigRepo {
    pub pool: PgPool,
}

impl PricingConfigRepo {
    /// Seed the active row on first boot so `get_active` always has one row
    /// to read.
    pub async fn ensure_seeded(&self) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO pricing_config (config_id, is_active, payload, updated_at)
            VALUES ($1, TRUE, $2, now())
            ON CONFLICT (config_id) DO NOTHING
            "#,
        )
        .bind(ACTIVE_CONFIG_ID)
        .bind(serde_json::to_value(PricingConfig::default()).map_err(anyhow::Error::from)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PricingConfigStore for PricingConfigRepo {
    async fn get_active(&self) -> Result<PricingConfig, CoreError> {
        let row = sqlx::query(
            "SELECT payload FROM pricing_config WHERE config_id = $1 AND is_active",
        )
        .bind(ACTIVE_CONFIG_ID)
        .fetch_one(&self.pool)
        .await?;

        let payload: serde_json::Value = row.get("payload");
        serde_json::from_value(payload)
            .map_err(|e| CoreError::Internal(anyhow!("corrupt pricing config row: {e}")))
    }

    async fn update(
        &self,
        patch: PricingConfigPatch,
        reason: &str,
        actor: &str,
    ) -> Result<PricingConfig, CoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT payload FROM pricing_config WHERE config_id = $1 AND is_active FOR UPDATE",
        )
        .bind(ACTIVE_CONFIG_ID)
        .fetch_one(tx.as_mut())
        .await?;
        let old: PricingConfig = serde_json::from_value(row.get("payload"))
            .map_err(|e| CoreError::Internal(anyhow!("corrupt pricing config row: {e}")))?;

        let next = old.apply(&patch);
        next.validate()?;

        sqlx::query(
            r#"
            INSERT INTO pricing_config_history (config_id, old_payload, new_payload, reason, actor)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(ACTIVE_CONFIG_ID)
        .bind(serde_json::to_value(&old).map_err(anyhow::Error::from)?)
        .bind(serde_json::to_value(&next).map_err(anyhow::Error::from)?)
        .bind(reason)
        .bind(actor)
        .execute(tx.as_mut())
        .await?;

        sqlx::query(
            "UPDATE pricing_config SET payload = $2, updated_at = now() WHERE config_id = $1",
        )
        .bind(ACTIVE_CONFIG_ID)
        .bind(serde_json::to_value(&next).map_err(anyhow::Error::from)?)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn history(&self) -> Result<Vec<ConfigChange>, CoreError> {
        let rows = sqlx::query(
            r#"
            SELECT old_payload, new_payload, reason, actor, changed_at
            FROM pricing_config_history
            WHERE config_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(ACTIVE_CONFIG_ID)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ConfigChange {
                    old: serde_json::from_value(r.get("old_payload"))
                        .map_err(|e| CoreError::Internal(anyhow!("corrupt history row: {e}")))?,
                    new: serde_json::from_value(r.get("new_payload"))
                        .map_err(|e| CoreError::Internal(anyhow!("corrupt history row: {e}")))?,
                    reason: r.get("reason"),
                    actor: r.get("actor"),
                    changed_at: r.get("changed_at"),
                })
            })
            .collect()
    }
}
