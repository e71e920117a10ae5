//! Reference data for a fresh event database and the between-days reset.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use super::manager::DatabaseError;
use crate::services::MEETING_COUNT_KEY;
use crate::types::CheckpointCategory;

pub const CHECKPOINTS: &[(&str, CheckpointCategory)] = &[
    ("Recepção / Entrada", CheckpointCategory::General),
    ("Kombi Evangelística", CheckpointCategory::General),
    ("Psalms", CheckpointCategory::Store),
    ("Salinha Kids", CheckpointCategory::Kids),
    ("Tenda de Oração", CheckpointCategory::Prayer),
    ("Espaço Gourmet", CheckpointCategory::Prayer),
    ("Casa dos Mártires", CheckpointCategory::Prayer),
    ("Sala Profética", CheckpointCategory::Prophetic),
    ("Livraria", CheckpointCategory::Store),
];

/// (name, price in cents, category, image)
pub const PRODUCTS: &[(&str, i64, &str, &str)] = &[
    ("Água sem Gás", 300, "CANTINA", "https://images.unsplash.com/photo-1563805042-7684c019e1cb?auto=format&fit=crop&q=80&w=500"),
    ("Refrigerante Lata", 600, "CANTINA", "https://images.unsplash.com/photo-1622483767028-3f66f32aef97?auto=format&fit=crop&q=80&w=500"),
    ("Salgado Assado", 800, "CANTINA", "https://images.unsplash.com/photo-1571091718767-18b5b1457add?auto=format&fit=crop&q=80&w=500"),
    ("Café Expresso", 400, "CANTINA", "https://images.unsplash.com/photo-1509042239860-f550ce710b93?auto=format&fit=crop&q=80&w=500"),
    ("Chocolate", 500, "CANTINA", "https://images.unsplash.com/photo-1511381978829-f011418d229d?auto=format&fit=crop&q=80&w=500"),
    ("Camiseta Ekklesia 2026", 6990, "LOJA", "https://images.unsplash.com/photo-1523381210434-271e8be1f52b?auto=format&fit=crop&q=80&w=500"),
    ("Livro: Avivamento", 4500, "LOJA", "https://images.unsplash.com/photo-1544947950-fa07a98d237f?auto=format&fit=crop&q=80&w=500"),
    ("Boné Trucker", 5000, "LOJA", "https://images.unsplash.com/photo-1588850561407-ed78c282e89b?auto=format&fit=crop&q=80&w=500"),
    ("Caneca Personalizada", 3500, "LOJA", "https://images.unsplash.com/photo-1514228742587-6b1558fcca3d?auto=format&fit=crop&q=80&w=500"),
];

/// (name, email, department)
pub const STAFF: &[(&str, &str, &str)] = &[
    ("Admin Geral", "admin@ibmg.com", "ADMIN"),
    ("Ana Recepção", "ana@recepcao.com", "RECEPTION"),
    ("Marcos Gourmet", "marcos@gourmet.com", "CANTINA"),
    ("Luiza Loja", "luiza@store.com", "STORE"),
    ("Carlos Kids", "carlos@kids.com", "KIDS"),
    ("Paulo Evangelismo", "paulo@rua.com", "EVANGELISM"),
    ("Pedro Profético", "pedro@tenda.com", "PROPHETIC"),
    ("Sarah Consolidação", "sarah@ficha.com", "CONSOLIDATION"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub checkpoints: usize,
    pub products: usize,
    pub staff: usize,
}

/// Upsert checkpoints and staff, recreate the catalogue, ensure the meeting counter.
///
/// The catalogue is replaced, so every sale and checkout order is removed first.
pub async fn seed(pool: &PgPool, default_church: &str) -> Result<SeedSummary, DatabaseError> {
    let mut tx = pool.begin().await?;

    for (name, category) in CHECKPOINTS {
        sqlx::query(
            "INSERT INTO checkpoints (name, category) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET category = EXCLUDED.category",
        )
        .bind(name)
        .bind(category)
        .execute(&mut *tx)
        .await?;
    }

    for table in ["sale_items", "sales", "order_items", "orders", "products"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }
    for (name, cents, category, image_url) in PRODUCTS {
        sqlx::query("INSERT INTO products (name, price, category, image_url) VALUES ($1, $2, $3, $4)")
            .bind(name)
            .bind(Decimal::new(*cents, 2))
            .bind(category)
            .bind(image_url)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO global_config (key, value) VALUES ($1, '0') ON CONFLICT (key) DO NOTHING")
        .bind(MEETING_COUNT_KEY)
        .execute(&mut *tx)
        .await?;

    for (name, email, department) in STAFF {
        sqlx::query(
            "INSERT INTO people (name, email, type, role, department, church, age) \
             VALUES ($1, $2, 'MEMBER', 'STAFF', $3, $4, 30) \
             ON CONFLICT ((lower(email))) DO UPDATE SET role = 'STAFF', department = EXCLUDED.department, updated_at = now()",
        )
        .bind(name)
        .bind(email)
        .bind(department)
        .bind(default_church)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Seeded {} checkpoints, {} products, {} staff", CHECKPOINTS.len(), PRODUCTS.len(), STAFF.len());
    Ok(SeedSummary {
        checkpoints: CHECKPOINTS.len(),
        products: PRODUCTS.len(),
        staff: STAFF.len(),
    })
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResetSummary {
    pub manual_entries: u64,
    pub sales: u64,
    pub visitors: u64,
}

/// Wipe headcounts, store sales and visitors; meetings, products, members and staff stay
pub async fn reset_counts(pool: &PgPool) -> Result<ResetSummary, DatabaseError> {
    let mut tx = pool.begin().await?;
    let manual_entries = sqlx::query("DELETE FROM manual_entries")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM sale_items").execute(&mut *tx).await?;
    let sales = sqlx::query("DELETE FROM sales")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let visitors = sqlx::query("DELETE FROM people WHERE type = 'VISITOR' AND role <> 'STAFF'")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    info!(
        "Reset removed {} manual entries, {} sales, {} visitors",
        manual_entries, sales, visitors
    );
    Ok(ResetSummary {
        manual_entries,
        sales,
        visitors,
    })
}
