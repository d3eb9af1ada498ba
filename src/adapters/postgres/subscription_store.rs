//! PostgreSQL subscription store.
//!
//! One row per user in the `subscriptions` table. Writes run in a
//! transaction with `SELECT ... FOR UPDATE` so the staleness check and the
//! write are atomic under concurrent webhook deliveries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{
    BillingError, SubscriptionPatch, SubscriptionRecord, SubscriptionStatus, SubscriptionTier,
};
use crate::ports::{SubscriptionStore, UpsertOutcome};

/// sqlx-backed implementation of the subscription store.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw database row for a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    external_customer_id: Option<String>,
    external_subscription_id: Option<String>,
    last_external_subscription_id: Option<String>,
    tier: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = BillingError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| BillingError::Persistence(format!("corrupt user_id: {}", e)))?;
        let tier = SubscriptionTier::parse(&row.tier)
            .ok_or_else(|| BillingError::Persistence(format!("unknown tier '{}'", row.tier)))?;
        let status = SubscriptionStatus::parse(&row.status)
            .ok_or_else(|| BillingError::Persistence(format!("unknown status '{}'", row.status)))?;

        Ok(SubscriptionRecord {
            user_id,
            external_customer_id: row.external_customer_id,
            external_subscription_id: row.external_subscription_id,
            last_external_subscription_id: row.last_external_subscription_id,
            tier,
            status,
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_BY_USER_FOR_UPDATE: &str = r#"
    SELECT user_id, external_customer_id, external_subscription_id,
           last_external_subscription_id, tier, status, current_period_end,
           created_at, updated_at
    FROM subscriptions
    WHERE user_id = $1
    FOR UPDATE
"#;

const SELECT_BY_SUBSCRIPTION_FOR_UPDATE: &str = r#"
    SELECT user_id, external_customer_id, external_subscription_id,
           last_external_subscription_id, tier, status, current_period_end,
           created_at, updated_at
    FROM subscriptions
    WHERE external_subscription_id = $1
       OR last_external_subscription_id = $1
    FOR UPDATE
"#;

const INSERT_RECORD: &str = r#"
    INSERT INTO subscriptions
        (user_id, external_customer_id, external_subscription_id,
         last_external_subscription_id, tier, status, current_period_end,
         created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#;

const UPDATE_RECORD: &str = r#"
    UPDATE subscriptions
    SET external_customer_id = $2,
        external_subscription_id = $3,
        last_external_subscription_id = $4,
        tier = $5,
        status = $6,
        current_period_end = $7,
        updated_at = $8
    WHERE user_id = $1
"#;

impl PostgresSubscriptionStore {
    async fn write_record(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &SubscriptionRecord,
        insert: bool,
    ) -> Result<(), BillingError> {
        if insert {
            sqlx::query(INSERT_RECORD)
                .bind(record.user_id.as_str())
                .bind(&record.external_customer_id)
                .bind(&record.external_subscription_id)
                .bind(&record.last_external_subscription_id)
                .bind(record.tier.as_str())
                .bind(record.status.as_str())
                .bind(record.current_period_end.as_ref().map(|t| *t.as_datetime()))
                .bind(*record.created_at.as_datetime())
                .bind(*record.updated_at.as_datetime())
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;
        } else {
            sqlx::query(UPDATE_RECORD)
                .bind(record.user_id.as_str())
                .bind(&record.external_customer_id)
                .bind(&record.external_subscription_id)
                .bind(&record.last_external_subscription_id)
                .bind(record.tier.as_str())
                .bind(record.status.as_str())
                .bind(record.current_period_end.as_ref().map(|t| *t.as_datetime()))
                .bind(*record.updated_at.as_datetime())
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn get(&self, user_id: &UserId) -> Result<SubscriptionRecord, BillingError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, external_customer_id, external_subscription_id,
                   last_external_subscription_id, tier, status,
                   current_period_end, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(SubscriptionRecord::default_free(user_id.clone())),
        }
    }

    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<SubscriptionRow> = sqlx::query_as(SELECT_BY_USER_FOR_UPDATE)
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let outcome = match row {
            Some(row) => {
                let existing: SubscriptionRecord = row.try_into()?;
                if !event_time.is_after(&existing.updated_at) {
                    return Ok(UpsertOutcome::Stale);
                }
                let next = existing.apply(patch, event_time);
                Self::write_record(&mut tx, &next, false).await?;
                UpsertOutcome::Applied(next)
            }
            None => {
                let next =
                    SubscriptionRecord::default_free(user_id.clone()).apply(patch, event_time);
                // A concurrent insert for the same user surfaces as a
                // unique violation; the provider retries the delivery.
                Self::write_record(&mut tx, &next, true).await?;
                UpsertOutcome::Applied(next)
            }
        };

        tx.commit().await.map_err(db_error)?;
        Ok(outcome)
    }

    async fn upsert_by_external_subscription_id(
        &self,
        subscription_id: &str,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<SubscriptionRow> = sqlx::query_as(SELECT_BY_SUBSCRIPTION_FOR_UPDATE)
            .bind(subscription_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let row = match row {
            Some(row) => row,
            None => return Ok(UpsertOutcome::NotFound),
        };

        let existing: SubscriptionRecord = row.try_into()?;
        if !event_time.is_after(&existing.updated_at) {
            return Ok(UpsertOutcome::Stale);
        }

        let next = existing.apply(patch, event_time);
        Self::write_record(&mut tx, &next, false).await?;
        tx.commit().await.map_err(db_error)?;

        Ok(UpsertOutcome::Applied(next))
    }
}

fn db_error(err: sqlx::Error) -> BillingError {
    BillingError::Persistence(err.to_string())
}
