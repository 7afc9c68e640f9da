//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The `webhook_events` primary key is the idempotency guard. Claims are a
//! single `INSERT ... ON CONFLICT DO UPDATE` so two concurrent deliveries of
//! the same event can never both win.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ClaimResult, ProcessingOutcome, WebhookEventRecord, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a webhook event.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    payload: String,
    received_at: DateTime<Utc>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    outcome: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    attempts: i32,
    last_error: Option<String>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let outcome = row
            .outcome
            .as_deref()
            .map(|s| {
                ProcessingOutcome::parse(s).ok_or_else(|| {
                    DomainError::database(format!("Invalid outcome value: {}", s))
                })
            })
            .transpose()?;

        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            outcome,
            claimed_at: row.claimed_at.map(Timestamp::from_datetime),
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            last_error: row.last_error,
        })
    }
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, err))
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn claim(
        &self,
        record: WebhookEventRecord,
        lease: Duration,
    ) -> Result<ClaimResult, DomainError> {
        let now = Timestamp::now();
        let stale_before = *now.as_datetime() - lease;

        // Inserts a fresh row, or retakes an unprocessed row whose claim has
        // lapsed. Returns nothing when the row is processed or still leased.
        let claimed: Option<(i32,)> = sqlx::query_as(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, payload, received_at, processed, claimed_at, attempts
            ) VALUES ($1, $2, $3, $4, FALSE, $4, 1)
            ON CONFLICT (event_id) DO UPDATE SET
                claimed_at = EXCLUDED.claimed_at,
                attempts = webhook_events.attempts + 1
            WHERE webhook_events.processed = FALSE
              AND (webhook_events.claimed_at IS NULL OR webhook_events.claimed_at <= $5)
            RETURNING attempts
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(now.as_datetime())
        .bind(stale_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("claim webhook event", e))?;

        if let Some((attempts,)) = claimed {
            return Ok(ClaimResult::Claimed {
                attempt: u32::try_from(attempts).unwrap_or(1),
            });
        }

        let processed: Option<(bool,)> =
            sqlx::query_as("SELECT processed FROM webhook_events WHERE event_id = $1")
                .bind(&record.event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("read webhook event", e))?;

        match processed {
            Some((true,)) => Ok(ClaimResult::AlreadyProcessed),
            Some((false,)) => Ok(ClaimResult::InFlight),
            None => Err(DomainError::new(
                ErrorCode::InternalError,
                format!("webhook event {} vanished during claim", record.event_id),
            )),
        }
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        outcome: ProcessingOutcome,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET
                processed = TRUE,
                processed_at = $2,
                outcome = $3,
                claimed_at = NULL,
                last_error = NULL
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(Timestamp::now().as_datetime())
        .bind(outcome.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark webhook event processed", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("no webhook event {}", event_id),
            ));
        }
        Ok(())
    }

    async fn release(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE webhook_events SET
                claimed_at = NULL,
                last_error = $2
            WHERE event_id = $1 AND processed = FALSE
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("release webhook event", e))?;
        Ok(())
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, payload, received_at, processed, processed_at,
                   outcome, claimed_at, attempts, last_error
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(outcome: Option<&str>) -> WebhookEventRow {
        WebhookEventRow {
            event_id: "evt_1".into(),
            event_type: "invoice.paid".into(),
            payload: "{}".into(),
            received_at: Utc::now(),
            processed: outcome.is_some(),
            processed_at: outcome.map(|_| Utc::now()),
            outcome: outcome.map(str::to_string),
            claimed_at: None,
            attempts: 2,
            last_error: None,
        }
    }

    #[test]
    fn row_converts_to_record() {
        let record = WebhookEventRecord::try_from(row(Some("transition_rejected"))).unwrap();
        assert!(record.processed);
        assert_eq!(record.outcome, Some(ProcessingOutcome::TransitionRejected));
        assert_eq!(record.attempts, 2);
    }

    #[test]
    fn unknown_outcome_is_a_database_error() {
        let err = WebhookEventRecord::try_from(row(Some("exploded"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
