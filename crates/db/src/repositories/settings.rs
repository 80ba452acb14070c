use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use quotedesk_core::domain::settings::GeneralSettings;
use quotedesk_core::errors::ApplicationError;
use quotedesk_core::ports::SettingsProvider;

use super::{decode_decimal, decode_u32, RepositoryError};
use crate::DbPool;

/// Reads the single `general_settings` row, falling back to configured defaults
/// when nobody has saved settings yet.
pub struct SqlSettingsProvider {
    pool: DbPool,
    fallback: GeneralSettings,
}

impl SqlSettingsProvider {
    pub fn new(pool: DbPool, fallback: GeneralSettings) -> Self {
        Self { pool, fallback }
    }

    pub async fn save(&self, settings: &GeneralSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO general_settings (id, validity_days, max_installments,
                                           min_installment_value, interest_free_threshold,
                                           interest_rate_per_installment, updated_at)
             VALUES (1, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 validity_days = excluded.validity_days,
                 max_installments = excluded.max_installments,
                 min_installment_value = excluded.min_installment_value,
                 interest_free_threshold = excluded.interest_free_threshold,
                 interest_rate_per_installment = excluded.interest_rate_per_installment,
                 updated_at = excluded.updated_at",
        )
        .bind(i64::from(settings.validity_days))
        .bind(i64::from(settings.max_installments))
        .bind(settings.min_installment_value.to_string())
        .bind(i64::from(settings.interest_free_threshold))
        .bind(settings.interest_rate_per_installment.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self) -> Result<Option<GeneralSettings>, RepositoryError> {
        let row = sqlx::query(
            "SELECT validity_days, max_installments, min_installment_value,
                    interest_free_threshold, interest_rate_per_installment
             FROM general_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let validity_days: i64 =
            row.try_get("validity_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let max_installments: i64 =
            row.try_get("max_installments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let min_installment_value: String = row
            .try_get("min_installment_value")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let interest_free_threshold: i64 = row
            .try_get("interest_free_threshold")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let interest_rate: String = row
            .try_get("interest_rate_per_installment")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(GeneralSettings {
            validity_days: decode_u32("validity_days", validity_days)?,
            max_installments: decode_u32("max_installments", max_installments)?,
            min_installment_value: decode_decimal("min_installment_value", &min_installment_value)?,
            interest_free_threshold: decode_u32("interest_free_threshold", interest_free_threshold)?,
            interest_rate_per_installment: decode_decimal(
                "interest_rate_per_installment",
                &interest_rate,
            )?,
        }))
    }
}

#[async_trait]
impl SettingsProvider for SqlSettingsProvider {
    async fn get(&self) -> Result<GeneralSettings, ApplicationError> {
        Ok(self.load().await?.unwrap_or_else(|| self.fallback.clone()))
    }
}
