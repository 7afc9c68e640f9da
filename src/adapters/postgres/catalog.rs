//! PostgreSQL catalog readers.
//!
//! Products and prices are owned by the storefront and only read here.
//! Customers are created on first sight of a remote customer ID.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Customer, Price, PriceType, Product, Recurrence};
use crate::domain::foundation::{CustomerId, DomainError, PriceId, ProductId};
use crate::ports::{CatalogReader, CustomerDirectory};

pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: Uuid,
    product_id: Uuid,
    amount: i64,
    currency: String,
    price_type: String,
    interval: Option<String>,
    interval_count: Option<i32>,
    remote_price_id: String,
}

impl TryFrom<PriceRow> for Price {
    type Error = DomainError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let price_type: PriceType = row.price_type.parse()?;
        let recurrence = match (row.interval.as_deref(), row.interval_count) {
            (None, None) => None,
            (interval, count) => Some(
                Recurrence::from_parts(interval, count.and_then(|c| u32::try_from(c).ok()))
                    .ok_or_else(|| {
                        DomainError::database(format!(
                            "Invalid recurrence on price {}: {:?} x {:?}",
                            row.id, row.interval, row.interval_count
                        ))
                    })?,
            ),
        };

        Ok(Price::new(
            PriceId::from_uuid(row.id),
            ProductId::from_uuid(row.product_id),
            row.amount,
            row.currency,
            price_type,
            recurrence,
            row.remote_price_id,
        )?)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            active: row.active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    email: String,
    remote_customer_id: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: CustomerId::from_uuid(row.id),
            email: row.email,
            remote_customer_id: row.remote_customer_id,
        }
    }
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, err))
}

const PRICE_COLUMNS: &str = r#"
    SELECT id, product_id, amount, currency, price_type, interval, interval_count, remote_price_id
    FROM prices
"#;

#[async_trait]
impl CatalogReader for PostgresCatalog {
    async fn get_price_by_remote_id(
        &self,
        remote_price_id: &str,
    ) -> Result<Option<Price>, DomainError> {
        let sql = format!("{} WHERE remote_price_id = $1", PRICE_COLUMNS);
        let row: Option<PriceRow> = sqlx::query_as(&sql)
            .bind(remote_price_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find price", e))?;
        row.map(Price::try_from).transpose()
    }

    async fn get_price_by_id(&self, id: PriceId) -> Result<Option<Price>, DomainError> {
        let sql = format!("{} WHERE id = $1", PRICE_COLUMNS);
        let row: Option<PriceRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find price", e))?;
        row.map(Price::try_from).transpose()
    }

    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> =
            sqlx::query_as("SELECT id, name, active FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find product", e))?;
        Ok(row.map(Product::from))
    }
}

#[async_trait]
impl CustomerDirectory for PostgresCatalog {
    async fn get_or_create_by_remote_id(
        &self,
        remote_customer_id: &str,
        email: Option<&str>,
    ) -> Result<Customer, DomainError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: CustomerRow = sqlx::query_as(
            r#"
            INSERT INTO customers (id, email, remote_customer_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (remote_customer_id) DO UPDATE
                SET remote_customer_id = customers.remote_customer_id
            RETURNING id, email, remote_customer_id
            "#,
        )
        .bind(CustomerId::new().as_uuid())
        .bind(email.unwrap_or_default())
        .bind(remote_customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("upsert customer", e))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError> {
        let row: Option<CustomerRow> =
            sqlx::query_as("SELECT id, email, remote_customer_id FROM customers WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find customer", e))?;
        Ok(row.map(Customer::from))
    }
}
