//! Database repository for anonymous trial usage.

use crate::db::{errors::Result, models::trials::TrialUsageDBResponse};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct TrialUsage {
    pub origin: String,
    pub used_at: DateTime<Utc>,
}

impl From<TrialUsage> for TrialUsageDBResponse {
    fn from(trial: TrialUsage) -> Self {
        Self {
            origin: trial.origin,
            used_at: trial.used_at,
        }
    }
}

pub struct Trials<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Trials<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Record trial usage for an origin. Idempotent: returns true only when
    /// this call inserted the row.
    #[instrument(skip(self), fields(origin = %origin), err)]
    pub async fn record(&mut self, origin: &str) -> Result<bool> {
        let result = sqlx::query("INSERT INTO trial_usage (origin) VALUES ($1) ON CONFLICT (origin) DO NOTHING")
            .bind(origin)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(origin = %origin), err)]
    pub async fn has_used(&mut self, origin: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, TrialUsage>("SELECT origin, used_at FROM trial_usage WHERE origin = $1")
            .bind(origin)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.is_some())
    }
}
