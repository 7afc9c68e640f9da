//! In-memory catalog and customer directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Customer, Price, Product};
use crate::domain::foundation::{CustomerId, DomainError, PriceId, ProductId};
use crate::ports::{CatalogReader, CustomerDirectory};

#[derive(Default)]
struct CatalogState {
    prices: HashMap<PriceId, Price>,
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        self.state.write().await.products.insert(product.id, product);
    }

    pub async fn add_price(&self, price: Price) {
        self.state.write().await.prices.insert(price.id, price);
    }

    pub async fn add_customer(&self, customer: Customer) {
        self.state.write().await.customers.insert(customer.id, customer);
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.state.read().await.customers.values().cloned().collect()
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn get_price_by_remote_id(
        &self,
        remote_price_id: &str,
    ) -> Result<Option<Price>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .prices
            .values()
            .find(|p| p.remote_price_id == remote_price_id)
            .cloned())
    }

    async fn get_price_by_id(&self, id: PriceId) -> Result<Option<Price>, DomainError> {
        Ok(self.state.read().await.prices.get(&id).cloned())
    }

    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCatalog {
    async fn get_or_create_by_remote_id(
        &self,
        remote_customer_id: &str,
        email: Option<&str>,
    ) -> Result<Customer, DomainError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .customers
            .values()
            .find(|c| c.remote_customer_id.as_deref() == Some(remote_customer_id))
        {
            return Ok(existing.clone());
        }
        let customer = Customer {
            id: CustomerId::new(),
            email: email.unwrap_or_default().to_string(),
            remote_customer_id: Some(remote_customer_id.to_string()),
        };
        state.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError> {
        Ok(self.state.read().await.customers.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_stable_per_remote_id() {
        let catalog = InMemoryCatalog::new();
        let first = catalog
            .get_or_create_by_remote_id("cus_1", Some("a@example.com"))
            .await
            .unwrap();
        let second = catalog
            .get_or_create_by_remote_id("cus_1", Some("other@example.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "a@example.com");
        assert_eq!(catalog.customers().await.len(), 1);
    }
}
