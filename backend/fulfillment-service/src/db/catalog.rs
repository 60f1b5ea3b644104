/// Read-only access to the product catalog
use crate::error::Result;
use crate::models::Product;
use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, product_id: &str) -> Result<Option<Product>>;
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get(&self, product_id: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, file_url AS file_ref,
                   thumbnail_url AS thumbnail_ref, description
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }
}
