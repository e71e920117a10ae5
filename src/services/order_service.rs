use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{is_code_collision, order_code, ServiceError, ServiceResult, ORDER_CODE_ATTEMPTS};
use crate::database::models::{Order, OrderDetail, OrderItem, OrderItemDetail, Person, Product};
use crate::database::{DatabaseError, DatabaseManager};

const ORDER_COLUMNS: &str = "id, order_code, person_id, buyer_name, buyer_phone, total, status, \
     proof_url, created_at, paid_at, delivered_at";

const ORDER_CODE_LEN: usize = 4;

/// Cart line as submitted at checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Checkout with an uploaded proof of payment
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer: Person,
    pub proof_url: Option<String>,
    pub items: Vec<CartLine>,
}

/// Keep the lines whose product exists and price them from the catalogue
pub fn price_cart(items: &[CartLine], catalogue: &[Product]) -> (Vec<CartLine>, Decimal) {
    let prices: HashMap<Uuid, Decimal> = catalogue.iter().map(|p| (p.id, p.price)).collect();
    let mut total = Decimal::ZERO;
    let mut kept = Vec::new();
    for line in items {
        if let Some(price) = prices.get(&line.product_id) {
            let quantity = line.quantity.max(1);
            total += *price * Decimal::from(quantity);
            kept.push(CartLine {
                product_id: line.product_id,
                quantity,
            });
        }
    }
    (kept, total)
}

pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a PENDING order priced from the catalogue
    pub async fn create(&self, request: &CheckoutRequest, catalogue: &[Product]) -> ServiceResult<Order> {
        let (lines, total) = price_cart(&request.items, catalogue);
        for attempt in 1..=ORDER_CODE_ATTEMPTS {
            let code = order_code(ORDER_CODE_LEN);
            match self.try_create(request, &lines, total, &code).await {
                Err(ServiceError::Database(DatabaseError::Sqlx(e))) if is_code_collision(&e) => {
                    tracing::warn!("Order code {} already taken (attempt {})", code, attempt);
                }
                other => return other,
            }
        }
        Err(ServiceError::Conflict("Could not allocate an order code".to_string()))
    }

    async fn try_create(
        &self,
        request: &CheckoutRequest,
        lines: &[CartLine],
        total: Decimal,
        code: &str,
    ) -> ServiceResult<Order> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO orders (order_code, person_id, buyer_name, buyer_phone, total, status, proof_url) \
             VALUES ($1, $2, $3, $4, $5, 'PENDING', $6) RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(code)
            .bind(request.buyer.id)
            .bind(&request.buyer.name)
            .bind(request.buyer.phone.as_deref().unwrap_or_default())
            .bind(total)
            .bind(&request.proof_url)
            .fetch_one(&mut *tx)
            .await?;

        for line in lines {
            sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(order.id)
                .bind(line.product_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!("Checkout order {} created for {}", order.order_code, order.buyer_name);
        Ok(order)
    }

    /// Orders with a proof that staff still has to check, newest first
    pub async fn pending_with_proof(&self) -> ServiceResult<Vec<OrderDetail>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE status = 'PENDING' AND proof_url IS NOT NULL ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(orders).await
    }

    pub async fn mark_paid(&self, code: &str) -> ServiceResult<Order> {
        let sql = format!(
            "UPDATE orders SET status = 'PAID', paid_at = now() WHERE order_code = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        self.update_one(&sql, code).await
    }

    pub async fn mark_delivered(&self, code: &str) -> ServiceResult<Order> {
        let sql = format!(
            "UPDATE orders SET status = 'DELIVERED', delivered_at = now() WHERE order_code = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        self.update_one(&sql, code).await
    }

    async fn update_one(&self, sql: &str, code: &str) -> ServiceResult<Order> {
        sqlx::query_as::<_, Order>(sql)
            .bind(normalize_code(code))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Drop a rejected order and its items
    pub async fn reject(&self, code: &str) -> ServiceResult<()> {
        let code = normalize_code(code);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM order_items WHERE order_id IN (SELECT id FROM orders WHERE order_code = $1)",
        )
        .bind(&code)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM orders WHERE order_code = $1")
            .bind(&code)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        tx.commit().await?;
        tracing::info!("Checkout order {} rejected", code);
        Ok(())
    }

    /// Voucher lookup
    pub async fn find_by_code(&self, code: &str) -> ServiceResult<Option<OrderDetail>> {
        let sql = format!("SELECT {} FROM orders WHERE order_code = $1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(normalize_code(code))
            .fetch_optional(&self.pool)
            .await?;
        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Orders of a person that still have to be handed over
    pub async fn open_for_person(&self, person_id: Uuid) -> ServiceResult<Vec<OrderDetail>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE person_id = $1 AND status <> 'DELIVERED' ORDER BY created_at",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(person_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(orders).await
    }

    async fn with_items(&self, orders: Vec<Order>) -> ServiceResult<Vec<OrderDetail>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity FROM order_items WHERE order_id = ANY($1)",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, Product> = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, category, image_url, created_at \
             FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let mut by_order: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItemDetail { item, product });
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                items: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
