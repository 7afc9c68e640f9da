//! Read-only access to the product catalog and customer directory.
//!
//! Both are owned elsewhere; this crate only reads them, plus the single
//! get-or-create needed to attach a remote customer during checkout.

use async_trait::async_trait;

use crate::domain::billing::{Customer, Price, Product};
use crate::domain::foundation::{CustomerId, DomainError, PriceId, ProductId};

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn get_price_by_remote_id(&self, remote_price_id: &str)
        -> Result<Option<Price>, DomainError>;

    async fn get_price_by_id(&self, id: PriceId) -> Result<Option<Price>, DomainError>;

    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>, DomainError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Customer linked to `remote_customer_id`, created on first sight.
    ///
    /// `email` is used only when creating.
    async fn get_or_create_by_remote_id(
        &self,
        remote_customer_id: &str,
        email: Option<&str>,
    ) -> Result<Customer, DomainError>;

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError>;
}
