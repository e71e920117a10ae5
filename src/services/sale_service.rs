use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{is_code_collision, order_code, ServiceError, ServiceResult, ORDER_CODE_ATTEMPTS};
use crate::database::models::person::PERSON_COLUMNS;
use crate::database::models::{Person, Product, Sale, SaleDetail, SaleItem, SaleItemDetail};
use crate::database::{is_foreign_key_violation, DatabaseError, DatabaseManager};
use crate::types::{Gender, PersonType, SaleStatus};

const SALE_COLUMNS: &str = "id, order_code, external_id, checkpoint_id, person_id, payment_method, \
     total, status, buyer_name, buyer_type, buyer_gender, created_at";

const SALE_CODE_LEN: usize = 6;

/// One product line of a sale, at the price actually charged
#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

/// Σ price × quantity
pub fn sale_total(lines: &[SaleLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

/// Sale registered by staff at a store checkpoint, paid on the spot
#[derive(Debug, Clone)]
pub struct ManualSale {
    pub checkpoint_id: Uuid,
    pub payment_method: String,
    pub buyer_type: PersonType,
    pub buyer_gender: Gender,
    pub items: Vec<SaleLine>,
}

/// Online sale awaiting confirmation from the PIX gateway
#[derive(Debug, Clone)]
pub struct PixSale {
    pub external_id: String,
    pub buyer: Person,
    pub items: Vec<SaleLine>,
}

struct SaleDraft<'a> {
    external_id: Option<&'a str>,
    checkpoint_id: Option<Uuid>,
    person_id: Option<Uuid>,
    payment_method: &'a str,
    status: SaleStatus,
    buyer_name: Option<&'a str>,
    buyer_type: PersonType,
    buyer_gender: Gender,
    items: &'a [SaleLine],
}

pub struct SaleService {
    pool: PgPool,
}

impl SaleService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_manual(&self, sale: &ManualSale) -> ServiceResult<Sale> {
        self.insert(SaleDraft {
            external_id: None,
            checkpoint_id: Some(sale.checkpoint_id),
            person_id: None,
            payment_method: &sale.payment_method,
            status: SaleStatus::Paid,
            buyer_name: None,
            buyer_type: sale.buyer_type,
            buyer_gender: sale.buyer_gender,
            items: &sale.items,
        })
        .await
    }

    pub async fn create_pix(&self, sale: &PixSale) -> ServiceResult<Sale> {
        self.insert(SaleDraft {
            external_id: Some(&sale.external_id),
            checkpoint_id: None,
            person_id: Some(sale.buyer.id),
            payment_method: "PIX",
            status: SaleStatus::Pending,
            buyer_name: Some(&sale.buyer.name),
            buyer_type: sale.buyer.person_type,
            buyer_gender: sale.buyer.gender.unwrap_or(Gender::Male),
            items: &sale.items,
        })
        .await
    }

    async fn insert(&self, draft: SaleDraft<'_>) -> ServiceResult<Sale> {
        for attempt in 1..=ORDER_CODE_ATTEMPTS {
            let code = order_code(SALE_CODE_LEN);
            match self.try_insert(&draft, &code).await {
                Err(ServiceError::Database(DatabaseError::Sqlx(e))) if is_code_collision(&e) => {
                    tracing::warn!("Order code {} already taken (attempt {})", code, attempt);
                }
                Err(ServiceError::Database(DatabaseError::Sqlx(e))) if is_foreign_key_violation(&e) => {
                    return Err(ServiceError::NotFound("Checkpoint or product not found".to_string()));
                }
                other => return other,
            }
        }
        Err(ServiceError::Conflict("Could not allocate an order code".to_string()))
    }

    async fn try_insert(&self, draft: &SaleDraft<'_>, code: &str) -> ServiceResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO sales (order_code, external_id, checkpoint_id, person_id, payment_method, \
               total, status, buyer_name, buyer_type, buyer_gender) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            SALE_COLUMNS
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(code)
            .bind(draft.external_id)
            .bind(draft.checkpoint_id)
            .bind(draft.person_id)
            .bind(draft.payment_method)
            .bind(sale_total(draft.items))
            .bind(draft.status)
            .bind(draft.buyer_name)
            .bind(draft.buyer_type)
            .bind(draft.buyer_gender)
            .fetch_one(&mut *tx)
            .await?;

        insert_items(&mut tx, sale.id, draft.items).await?;
        tx.commit().await?;
        Ok(sale)
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> ServiceResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE external_id = $1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Settle a PENDING sale. Returns the sale in its current state, or `None` when unknown.
    pub async fn mark_paid(&self, external_id: &str) -> ServiceResult<Option<Sale>> {
        let sql = format!(
            "UPDATE sales SET status = 'PAID' WHERE external_id = $1 AND status = 'PENDING' RETURNING {}",
            SALE_COLUMNS
        );
        let updated = sqlx::query_as::<_, Sale>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        match updated {
            Some(sale) => {
                tracing::info!("Sale {} confirmed as paid", sale.order_code);
                Ok(Some(sale))
            }
            None => self.find_by_external_id(external_id).await,
        }
    }

    /// Hand a paid sale over to the buyer
    pub async fn deliver(&self, id: Uuid) -> ServiceResult<Sale> {
        let sale = self
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if sale.status == SaleStatus::Pending {
            return Err(ServiceError::Conflict("Order has not been paid yet".to_string()));
        }
        let sql = format!(
            "UPDATE sales SET status = 'DELIVERED' WHERE id = $1 RETURNING {}",
            SALE_COLUMNS
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!("Order {} delivered", sale.order_code);
        Ok(sale)
    }

    /// Paid sales waiting for pickup, first come first served
    pub async fn awaiting_pickup(&self) -> ServiceResult<Vec<SaleDetail>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE status = 'PAID' ORDER BY created_at ASC",
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .fetch_all(&self.pool)
            .await?;
        if sales.is_empty() {
            return Ok(Vec::new());
        }

        let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, quantity, price FROM sale_items WHERE sale_id = ANY($1)",
        )
        .bind(&sale_ids)
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

        let person_ids: Vec<Uuid> = sales.iter().filter_map(|s| s.person_id).collect();
        let sql = format!("SELECT {} FROM people WHERE id = ANY($1)", PERSON_COLUMNS);
        let people: HashMap<Uuid, Person> = sqlx::query_as::<_, Person>(&sql)
            .bind(&person_ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items_by_sale: HashMap<Uuid, Vec<SaleItemDetail>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            items_by_sale
                .entry(item.sale_id)
                .or_default()
                .push(SaleItemDetail { item, product });
        }

        Ok(sales
            .into_iter()
            .map(|sale| SaleDetail {
                items: items_by_sale.remove(&sale.id).unwrap_or_default(),
                person: sale.person_id.and_then(|id| people.get(&id).cloned()),
                sale,
            })
            .collect())
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    sale_id: Uuid,
    items: &[SaleLine],
) -> Result<(), sqlx::Error> {
    for line in items {
        sqlx::query("INSERT INTO sale_items (sale_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)")
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn total_is_price_times_quantity() {
        let lines = vec![
            SaleLine { product_id: Uuid::nil(), quantity: 2, price: dec("35.50") },
            SaleLine { product_id: Uuid::nil(), quantity: 1, price: dec("10.00") },
        ];
        assert_eq!(sale_total(&lines), dec("81.00"));
        assert_eq!(sale_total(&[]), Decimal::ZERO);
    }
}
