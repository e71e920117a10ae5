use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::Product;
use crate::database::{is_foreign_key_violation, DatabaseManager};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, image_url, created_at";

/// Category used when none is given
pub const DEFAULT_CATEGORY: &str = "LOJA";

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Storefront pseudo-categories that mean "everything"
pub fn category_filter(category: Option<&str>) -> Option<&str> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "Todos" && *c != "STORE")
}

pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, category: Option<&str>) -> ServiceResult<Vec<Product>> {
        let products = match category_filter(category) {
            Some(category) => {
                let sql = format!(
                    "SELECT {} FROM products WHERE category = $1 ORDER BY name",
                    PRODUCT_COLUMNS
                );
                sqlx::query_as::<_, Product>(&sql)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS);
                sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(products)
    }

    /// Catalogue entries for the given ids; unknown ids are simply absent
    pub async fn find_many(&self, ids: &[Uuid]) -> ServiceResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn create(&self, new: NewProduct) -> ServiceResult<Product> {
        let category = new
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let sql = format!(
            "INSERT INTO products (name, description, price, category, image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.price)
            .bind(&category)
            .bind(&new.image_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::Conflict("Product has sales or orders and cannot be deleted".to_string())
                } else {
                    e.into()
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }
}
