//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Writes use optimistic concurrency on the `version` column. The unique key
//! `(remote_subscription_id, remote_item_id)` turns racing creates for the
//! same remote item into `DuplicateSubscription`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    BillingPeriod, BillingState, PaymentStatus, Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, PriceId, ProductId, SubscriptionId, Timestamp,
};
use crate::ports::SubscriptionRepository;

const REMOTE_ITEM_CONSTRAINT: &str = "subscriptions_remote_item_key";

const SELECT_COLUMNS: &str = r#"
    SELECT id, customer_id, product_id, price_id, remote_subscription_id, remote_item_id,
           status, quantity, current_period_start, current_period_end, next_delivery_date,
           cancel_at_period_end, canceled_at, latest_invoice_id, last_payment_status,
           last_payment_at, failed_payment_count, version, created_at, updated_at
    FROM subscriptions
"#;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    customer_id: Uuid,
    product_id: Uuid,
    price_id: Uuid,
    remote_subscription_id: Option<String>,
    remote_item_id: Option<String>,
    status: String,
    quantity: i32,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    next_delivery_date: DateTime<Utc>,
    cancel_at_period_end: bool,
    canceled_at: Option<DateTime<Utc>>,
    latest_invoice_id: Option<String>,
    last_payment_status: Option<String>,
    last_payment_at: Option<DateTime<Utc>>,
    failed_payment_count: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row
            .status
            .parse()
            .map_err(|_| DomainError::database(format!("Invalid status value: {}", row.status)))?;
        let last_payment_status = row
            .last_payment_status
            .as_deref()
            .map(|s| {
                PaymentStatus::parse(s).ok_or_else(|| {
                    DomainError::database(format!("Invalid payment status value: {}", s))
                })
            })
            .transpose()?;
        let period = BillingPeriod::new(
            Timestamp::from_datetime(row.current_period_start),
            Timestamp::from_datetime(row.current_period_end),
        )
        .map_err(|e| DomainError::database(format!("Invalid stored period: {}", e)))?;
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| DomainError::database(format!("Invalid quantity: {}", row.quantity)))?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            product_id: ProductId::from_uuid(row.product_id),
            price_id: PriceId::from_uuid(row.price_id),
            remote_subscription_id: row.remote_subscription_id,
            remote_item_id: row.remote_item_id,
            status,
            quantity,
            period,
            next_delivery_date: Timestamp::from_datetime(row.next_delivery_date),
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            billing: BillingState {
                latest_invoice_id: row.latest_invoice_id,
                last_payment_status,
                last_payment_at: row.last_payment_at.map(Timestamp::from_datetime),
                failed_payment_count: u32::try_from(row.failed_payment_count).unwrap_or(0),
            },
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn quantity_column(subscription: &Subscription) -> Result<i32, DomainError> {
    i32::try_from(subscription.quantity).map_err(|_| {
        DomainError::validation(
            "quantity",
            format!("quantity {} exceeds storage range", subscription.quantity),
        )
    })
}

fn failed_count_column(subscription: &Subscription) -> i32 {
    i32::try_from(subscription.billing.failed_payment_count).unwrap_or(i32::MAX)
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, err))
}

impl PostgresSubscriptionRepository {
    async fn exists(&self, id: SubscriptionId) -> Result<bool, DomainError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM subscriptions WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("check subscription", e))?;
        Ok(exists)
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, customer_id, product_id, price_id, remote_subscription_id, remote_item_id,
                status, quantity, current_period_start, current_period_end, next_delivery_date,
                cancel_at_period_end, canceled_at, latest_invoice_id, last_payment_status,
                last_payment_at, failed_payment_count, version, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.customer_id.as_uuid())
        .bind(subscription.product_id.as_uuid())
        .bind(subscription.price_id.as_uuid())
        .bind(&subscription.remote_subscription_id)
        .bind(&subscription.remote_item_id)
        .bind(subscription.status.as_str())
        .bind(quantity_column(subscription)?)
        .bind(subscription.period.start().as_datetime())
        .bind(subscription.period.end().as_datetime())
        .bind(subscription.next_delivery_date.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(&subscription.billing.latest_invoice_id)
        .bind(subscription.billing.last_payment_status.map(|s| s.as_str()))
        .bind(subscription.billing.last_payment_at.map(|t| *t.as_datetime()))
        .bind(failed_count_column(subscription))
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(REMOTE_ITEM_CONSTRAINT)
                    || db_err.constraint() == Some("subscriptions_pkey")
                {
                    return DomainError::new(
                        ErrorCode::DuplicateSubscription,
                        format!(
                            "subscription for {:?}/{:?} already exists",
                            subscription.remote_subscription_id, subscription.remote_item_id
                        ),
                    );
                }
            }
            db_error("insert subscription", e)
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $3,
                quantity = $4,
                current_period_start = $5,
                current_period_end = $6,
                next_delivery_date = $7,
                cancel_at_period_end = $8,
                canceled_at = $9,
                latest_invoice_id = $10,
                last_payment_status = $11,
                last_payment_at = $12,
                failed_payment_count = $13,
                updated_at = $14,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.version)
        .bind(subscription.status.as_str())
        .bind(quantity_column(subscription)?)
        .bind(subscription.period.start().as_datetime())
        .bind(subscription.period.end().as_datetime())
        .bind(subscription.next_delivery_date.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(&subscription.billing.latest_invoice_id)
        .bind(subscription.billing.last_payment_status.map(|s| s.as_str()))
        .bind(subscription.billing.last_payment_at.map(|t| *t.as_datetime()))
        .bind(failed_count_column(subscription))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update subscription", e))?;

        if result.rows_affected() == 0 {
            if self.exists(subscription.id).await? {
                return Err(DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!(
                        "subscription {} changed since version {}",
                        subscription.id, subscription.version
                    ),
                ));
            }
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find subscription", e))?;
        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "{} WHERE remote_subscription_id = $1 ORDER BY created_at, id",
            SELECT_COLUMNS
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(remote_subscription_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("load subscriptions", e))?;
        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_by_remote_item(
        &self,
        remote_subscription_id: &str,
        remote_item_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "{} WHERE remote_subscription_id = $1 AND remote_item_id = $2",
            SELECT_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(remote_subscription_id)
            .bind(remote_item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find subscription item", e))?;
        row.map(Subscription::try_from).transpose()
    }
}
