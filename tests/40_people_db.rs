mod common;

use anyhow::Result;
use chrono::Utc;

use ekklesia_api::clock::day_bounds;
use ekklesia_api::database::seed;
use ekklesia_api::services::{
    Buyer, CheckpointService, ManualSale, NewManualEntry, NewPerson, PersonService, ProductService,
    QuickRegistration, SaleLine, SaleService, ServiceError,
};
use ekklesia_api::types::{CheckpointCategory, Gender, PersonType, Role};

async fn people_with_email(pool: &sqlx::PgPool, email: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[tokio::test]
async fn emails_are_unique_regardless_of_case() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    let people = PersonService::with_pool(db.pool.clone());

    let ana = people
        .register(NewPerson {
            name: "Ana Souza".into(),
            email: Some("ana@x.com".into()),
            ..Default::default()
        })
        .await?;

    let duplicate = people
        .register(NewPerson {
            name: "Ana Impostora".into(),
            email: Some("ANA@x.com".into()),
            is_staff: true,
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

    let buyer = people
        .upsert_buyer(&Buyer {
            name: "Ana B".into(),
            email: "Ana@X.com".into(),
            phone: "61999990000".into(),
            ..Default::default()
        })
        .await?;
    assert_eq!(buyer.id, ana.id);
    assert_eq!(buyer.name, "Ana B");

    let quick = people
        .quick_register(QuickRegistration {
            name: "Ana Souza".into(),
            email: Some("ana@X.COM".into()),
            decision: Some("ACEITOU".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(quick.id, ana.id);
    assert_eq!(quick.marketing_source.as_deref(), Some("ACEITOU"));

    assert_eq!(people_with_email(&db.pool, "ana@x.com").await?, 1);
    let found = people.find_by_email(" ANA@X.COM ").await?.expect("ana");
    assert_eq!(found.id, ana.id);
    assert!(people.find_staff_by_email("ana@x.com").await?.is_none());

    db.teardown().await
}

#[tokio::test]
async fn seeding_twice_keeps_one_account_per_staff_email() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };

    seed::seed(&db.pool, "Ibmg Sede").await?;
    let summary = seed::seed(&db.pool, "Ibmg Sede").await?;
    assert_eq!(summary.staff, seed::STAFF.len());

    let (staff,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people WHERE role = 'STAFF'")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(staff as usize, seed::STAFF.len());

    let admin = PersonService::with_pool(db.pool.clone())
        .find_staff_by_email("ADMIN@ibmg.com")
        .await?
        .expect("seeded admin");
    assert_eq!(admin.role, Role::Staff);

    db.teardown().await
}

#[tokio::test]
async fn quick_registration_enters_the_department_checkpoint() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    seed::seed(&db.pool, "Ibmg Sede").await?;
    let people = PersonService::with_pool(db.pool.clone());

    let child = people
        .quick_register(QuickRegistration {
            name: "Joãozinho".into(),
            phone: Some("61988887777".into()),
            age: Some(7),
            department: Some("KIDS".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(child.person_type, PersonType::Visitor);

    let categories: Vec<(CheckpointCategory,)> = sqlx::query_as(
        "SELECT c.category FROM movements m JOIN checkpoints c ON c.id = m.checkpoint_id WHERE m.person_id = $1",
    )
    .bind(child.id)
    .fetch_all(&db.pool)
    .await?;
    assert_eq!(categories, vec![(CheckpointCategory::Kids,)]);

    let walk_in = people
        .quick_register(QuickRegistration {
            name: "Visitante Sem Setor".into(),
            ..Default::default()
        })
        .await?;
    let (moves,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movements WHERE person_id = $1")
        .bind(walk_in.id)
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(moves, 0);

    db.teardown().await
}

#[tokio::test]
async fn reset_keeps_staff_members_and_catalogue() -> Result<()> {
    let Some(db) = common::db::test_db().await? else {
        return Ok(());
    };
    seed::seed(&db.pool, "Ibmg Sede").await?;
    let people = PersonService::with_pool(db.pool.clone());
    let checkpoints = CheckpointService::with_pool(db.pool.clone());

    // Registered as staff without a type, so stored as a VISITOR with the STAFF role
    people
        .register(NewPerson {
            name: "Voluntária Nova".into(),
            email: Some("voluntaria@ibmg.com".into()),
            is_staff: true,
            ..Default::default()
        })
        .await?;
    people
        .register(NewPerson {
            name: "Membro Fiel".into(),
            person_type: PersonType::Member,
            ..Default::default()
        })
        .await?;
    let visitor = people
        .register(NewPerson {
            name: "Visitante Novo".into(),
            ..Default::default()
        })
        .await?;

    let all = checkpoints.list().await?;
    let entrance = all
        .iter()
        .find(|c| c.category == CheckpointCategory::General)
        .expect("general checkpoint");
    let store = all
        .iter()
        .find(|c| c.category == CheckpointCategory::Store)
        .expect("store checkpoint");

    let now = Utc::now();
    let offset = chrono::FixedOffset::west_opt(3 * 3600).expect("offset");
    checkpoints
        .record_count(
            NewManualEntry {
                checkpoint_id: entrance.id,
                person_type: PersonType::Visitor,
                church: "Ibmg Sede".into(),
                quantity: 4,
                age_group: None,
                gender: Some(Gender::Female),
                marketing_source: None,
                is_salvation: false,
                is_healing: false,
                is_deliverance: false,
            },
            now,
            chrono::Duration::milliseconds(500),
            day_bounds(now, offset),
        )
        .await?;
    checkpoints
        .track(visitor.id, entrance.id, now, chrono::Duration::seconds(60), day_bounds(now, offset))
        .await?;

    let catalogue = ProductService::with_pool(db.pool.clone()).list(None).await?;
    SaleService::with_pool(db.pool.clone())
        .create_manual(&ManualSale {
            checkpoint_id: store.id,
            payment_method: "DINHEIRO".into(),
            buyer_type: PersonType::Visitor,
            buyer_gender: Gender::Male,
            items: vec![SaleLine {
                product_id: catalogue[0].id,
                quantity: 1,
                price: catalogue[0].price,
            }],
        })
        .await?;

    let summary = seed::reset_counts(&db.pool).await?;
    assert_eq!(summary.manual_entries, 1);
    assert_eq!(summary.sales, 1);
    assert_eq!(summary.visitors, 1);

    assert!(people.find_staff_by_email("voluntaria@ibmg.com").await?.is_some());
    assert!(people.find(visitor.id).await?.is_none());
    let (moves,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movements")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(moves, 0);
    let (members,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people WHERE type = 'MEMBER'")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(members as usize, seed::STAFF.len() + 1);
    assert_eq!(
        ProductService::with_pool(db.pool.clone()).list(None).await?.len(),
        seed::PRODUCTS.len()
    );

    db.teardown().await
}
