mod common;

use anyhow::Result;
use rust_decimal::Decimal;

use ekklesia_api::database::seed;
use ekklesia_api::services::{
    is_code_collision, Buyer, CartLine, CheckoutRequest, OrderService, PersonService, PixSale, ProductService,
    SaleLine, SaleService, ServiceError,
};
use ekklesia_api::types::{OrderStatus, SaleStatus};

async fn buyer(pool: &sqlx::PgPool) -> Result<ekklesia_api::database::models::Person> {
    let person = PersonService::with_pool(pool.clone())
        .upsert_buyer(&Buyer {
            name: "Ana Souza".into(),
            email: "ana@x.com".into(),
            phone: "61999990000".into(),
            ..Default::default()
        })
        .await?;
    Ok(person)
}

#[tokio::test]
async fn pix_sales_only_move_forward() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    seed::seed(&db.pool, "Ibmg Sede").await?;
    let catalogue = ProductService::with_pool(db.pool.clone()).list(None).await?;
    let sales = SaleService::with_pool(db.pool.clone());

    let shirt = catalogue
        .iter()
        .find(|p| p.name.starts_with("Camiseta"))
        .expect("shirt in catalogue");
    let sale = sales
        .create_pix(&PixSale {
            external_id: "bill_123".into(),
            buyer: buyer(&db.pool).await?,
            items: vec![SaleLine {
                product_id: shirt.id,
                quantity: 2,
                price: shirt.price,
            }],
        })
        .await?;
    assert_eq!(sale.status, SaleStatus::Pending);
    assert_eq!(sale.payment_method, "PIX");
    assert_eq!(sale.order_code.len(), 6);
    assert_eq!(sale.total, Decimal::new(13980, 2));

    // Not paid yet: cannot be handed over
    assert!(matches!(sales.deliver(sale.id).await, Err(ServiceError::Conflict(_))));

    let paid = sales.mark_paid("bill_123").await?.expect("known billing");
    assert_eq!(paid.status, SaleStatus::Paid);
    let queue = sales.awaiting_pickup().await?;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].items.len(), 1);

    let delivered = sales.deliver(sale.id).await?;
    assert_eq!(delivered.status, SaleStatus::Delivered);

    // A late webhook must not turn a delivered sale back into a paid one
    let again = sales.mark_paid("bill_123").await?.expect("known billing");
    assert_eq!(again.status, SaleStatus::Delivered);
    assert!(sales.awaiting_pickup().await?.is_empty());

    assert!(sales.mark_paid("bill_unknown").await?.is_none());
    assert!(matches!(
        sales.deliver(uuid::Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    ));

    db.teardown().await
}

#[tokio::test]
async fn checkout_orders_are_priced_from_the_catalogue() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    seed::seed(&db.pool, "Ibmg Sede").await?;
    let catalogue = ProductService::with_pool(db.pool.clone()).list(None).await?;
    let orders = OrderService::with_pool(db.pool.clone());

    let water = catalogue
        .iter()
        .find(|p| p.name.starts_with("Água"))
        .expect("water in catalogue");
    let request = CheckoutRequest {
        buyer: buyer(&db.pool).await?,
        proof_url: Some("/uploads/proof-1-2.jpg".into()),
        items: vec![
            CartLine {
                product_id: water.id,
                quantity: 3,
            },
            CartLine {
                product_id: uuid::Uuid::new_v4(),
                quantity: 1,
            },
        ],
    };
    let order = orders.create(&request, &catalogue).await?;
    assert_eq!(order.order_code.len(), 4);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::new(900, 2));

    let pending = orders.pending_with_proof().await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].items.len(), 1);

    let code = order.order_code.to_lowercase();
    let found = orders.find_by_code(&code).await?.expect("case-insensitive code");
    assert_eq!(found.order.id, order.id);

    let paid = orders.mark_paid(&order.order_code).await?;
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.paid_at.is_some());
    assert!(orders.pending_with_proof().await?.is_empty());

    orders.reject(&order.order_code).await?;
    assert!(orders.find_by_code(&order.order_code).await?.is_none());
    let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(items, 0);

    db.teardown().await
}

#[tokio::test]
async fn taken_codes_are_recognised_for_retry() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    let insert = "INSERT INTO sales (order_code, external_id, payment_method, total) VALUES ($1, $2, 'PIX', 10)";

    sqlx::query(insert).bind("ABC123").bind("bill_1").execute(&db.pool).await?;

    let same_code = sqlx::query(insert)
        .bind("ABC123")
        .bind("bill_2")
        .execute(&db.pool)
        .await
        .expect_err("duplicate order code");
    assert!(is_code_collision(&same_code));

    // Other unique columns are real conflicts, not a reason to draw a new code
    let same_billing = sqlx::query(insert)
        .bind("XYZ789")
        .bind("bill_1")
        .execute(&db.pool)
        .await
        .expect_err("duplicate billing id");
    assert!(!is_code_collision(&same_billing));

    db.teardown().await
}
