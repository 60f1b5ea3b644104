/// Process-local catalog and ledger
///
/// Used by tests and for running the HTTP surface without a database.
use crate::db::catalog::CatalogStore;
use crate::db::purchases::{AppendOutcome, PurchaseLedger};
use crate::error::Result;
use crate::models::{Product, PurchaseRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get(&self, product_id: &str) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(product_id).cloned())
    }
}

/// Ledger rows in insertion order
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    records: Arc<Mutex<Vec<PurchaseRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PurchaseRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl PurchaseLedger for InMemoryLedger {
    async fn find_by_payment(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PurchaseRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|r| r.order_id == order_id && r.payment_id == payment_id)
            .cloned())
    }

    async fn append(&self, record: &PurchaseRecord) -> Result<AppendOutcome> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records
            .iter()
            .find(|r| r.order_id == record.order_id && r.payment_id == record.payment_id)
        {
            return Ok(AppendOutcome::Existing(existing.clone()));
        }
        records.push(record.clone());
        Ok(AppendOutcome::Inserted(record.clone()))
    }
}
