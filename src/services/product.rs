use async_trait::async_trait;

use crate::db::Database;
use crate::error::AppResult;
use crate::models::product::Product;

/// Read access to the product catalogue.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every stored product, in whatever order the store yields them.
    async fn list(&self) -> AppResult<Vec<Product>>;
}

/// Postgres-backed store. Each call is a fresh round trip; nothing is cached.
#[derive(Clone)]
pub struct ProductService {
    db: Database,
}

impl ProductService {
    pub fn new(db: Database) -> Self {
        ProductService { db }
    }
}

#[async_trait]
impl ProductStore for ProductService {
    async fn list(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products")
            .fetch_all(self.db.pool())
            .await?;

        Ok(products)
    }
}
